use std::collections::BTreeSet;

use crate::{Comment, Content, Subcomment, Thread};

/// Content produced by one actor that was already shown to the viewer
///
/// Only ever grows: there is no way to remove an item.
#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub struct Activity {
    pub threads_created: BTreeSet<Thread>,
    pub comments: BTreeSet<Comment>,
    pub subcomments: BTreeSet<Subcomment>,
}

impl Activity {
    pub fn new() -> Activity {
        Activity::default()
    }

    pub fn merge<T, C, S>(&mut self, threads: T, comments: C, subcomments: S)
    where
        T: IntoIterator<Item = Thread>,
        C: IntoIterator<Item = Comment>,
        S: IntoIterator<Item = Subcomment>,
    {
        self.threads_created.extend(threads);
        self.comments.extend(comments);
        self.subcomments.extend(subcomments);
    }

    pub fn merge_activity(&mut self, other: Activity) {
        self.merge(other.threads_created, other.comments, other.subcomments)
    }

    /// Returns true iff the item was not already in the bundle
    pub fn add(&mut self, c: Content) -> bool {
        match c {
            Content::Thread(t) => self.threads_created.insert(t),
            Content::Comment(c) => self.comments.insert(c),
            Content::Subcomment(s) => self.subcomments.insert(s),
        }
    }

    pub fn contains(&self, c: &Content) -> bool {
        match c {
            Content::Thread(t) => self.threads_created.contains(t),
            Content::Comment(c) => self.comments.contains(c),
            Content::Subcomment(s) => self.subcomments.contains(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.threads_created.is_empty() && self.comments.is_empty() && self.subcomments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.threads_created.len() + self.comments.len() + self.subcomments.len()
    }

    pub fn is_superset(&self, other: &Activity) -> bool {
        self.threads_created.is_superset(&other.threads_created)
            && self.comments.is_superset(&other.comments)
            && self.subcomments.is_superset(&other.subcomments)
    }
}

impl Extend<Content> for Activity {
    fn extend<I: IntoIterator<Item = Content>>(&mut self, iter: I) {
        for c in iter {
            self.add(c);
        }
    }
}

impl FromIterator<Content> for Activity {
    fn from_iter<I: IntoIterator<Item = Content>>(iter: I) -> Activity {
        let mut res = Activity::new();
        res.extend(iter);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(id: &str) -> Thread {
        Thread::new("news", id).unwrap()
    }

    #[test]
    fn merge_is_idempotent() {
        let c = Comment::new(thread("t1"), "c1").unwrap();
        let mut a = Activity::new();
        a.merge([thread("t1")], [c.clone()], []);
        let once = a.clone();
        a.merge([thread("t1")], [c], []);
        assert_eq!(a, once);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn empty_iff_all_three_sets_are_empty() {
        let mut a = Activity::new();
        assert!(a.is_empty());
        let s = Subcomment::new(Comment::new(thread("t1"), "c1").unwrap(), "s1").unwrap();
        assert!(a.add(Content::Subcomment(s.clone())));
        assert!(!a.is_empty());
        assert!(!a.add(Content::Subcomment(s)));
    }

    #[test]
    fn merging_only_grows() {
        bolero::check!()
            .with_type::<(Activity, Activity)>()
            .cloned()
            .for_each(|(mut a, b)| {
                let before = a.clone();
                a.merge_activity(b.clone());
                assert!(a.is_superset(&before));
                assert!(a.is_superset(&b));
            })
    }
}
