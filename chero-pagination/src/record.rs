use crate::{
    api::{ActivityView, Content, Page, Recycle, ThreadsView},
    DiscardIds,
};

impl DiscardIds {
    /// Records a page the backend returned for `recycle`, under the entries
    /// of the recycled view
    ///
    /// Items that cannot belong to the view (a comment in a thread listing,
    /// a thread of another section...) are skipped. Returns the number of
    /// newly recorded items.
    pub fn record_page(&mut self, recycle: &Recycle, page: &Page) -> usize {
        let view = recycle.view();
        let mut added = 0;
        for item in &page.items {
            added += match (recycle, &item.content) {
                (Recycle::UserActivity { user, .. }, content) => {
                    if item.author != *user {
                        tracing::warn!(view = view.as_str(), author = %item.author, "skipping item from another author");
                        continue;
                    }
                    self.record_activity(
                        ActivityView::User,
                        user.clone(),
                        std::iter::once(content.clone()).collect(),
                    )
                }
                (Recycle::FeedActivity { .. }, content) => self.record_activity(
                    ActivityView::Feed,
                    item.author.clone(),
                    std::iter::once(content.clone()).collect(),
                ),
                (Recycle::ThreadsSaved { .. }, Content::Thread(t)) => {
                    self.record_threads(ThreadsView::Saved, t.section.clone(), [t.id.clone()])
                }
                (Recycle::GeneralThreads { .. }, Content::Thread(t)) => {
                    self.record_threads(ThreadsView::General, t.section.clone(), [t.id.clone()])
                }
                (Recycle::SectionThreads { section, .. }, Content::Thread(t))
                    if t.section == *section =>
                {
                    self.record_threads(ThreadsView::Section, section.clone(), [t.id.clone()])
                }
                (Recycle::ThreadComments { thread, .. }, Content::Comment(c))
                    if c.thread == *thread =>
                {
                    self.record_comments(thread.clone(), [c.id.clone()])
                }
                (_, content) => {
                    tracing::warn!(view = view.as_str(), ?content, "skipping item not belonging to the view");
                    continue;
                }
            };
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::api::{
        Activity, Comment, CommentId, Delivered, SectionName, Subcomment, Thread, ThreadId, UserId,
    };

    use super::*;

    fn delivered(author: &str, content: impl Into<Content>) -> Delivered {
        Delivered {
            author: UserId::from(author),
            content: content.into(),
        }
    }

    fn thread(section: &str, id: &str) -> Thread {
        Thread::new(section, id).unwrap()
    }

    #[test]
    fn feed_pages_are_grouped_by_author() {
        let t1 = thread("news", "t1");
        let c1 = Comment::new(thread("sports", "t2"), "c1").unwrap();
        let s1 = Subcomment::new(c1.clone(), "s1").unwrap();
        let page = Page {
            items: vec![
                delivered("alice", t1.clone()),
                delivered("bob", c1.clone()),
                delivered("alice", s1.clone()),
            ],
        };
        let recycle = Recycle::FeedActivity {
            user: UserId::from("viewer"),
            discard: BTreeMap::new(),
        };
        let mut d = DiscardIds::new();
        assert_eq!(d.record_page(&recycle, &page), 3);
        let mut alice = Activity::new();
        alice.merge([t1], [], [s1]);
        assert_eq!(d.activity(ActivityView::Feed, &UserId::from("alice")), &alice);
        let mut bob = Activity::new();
        bob.merge([], [c1], []);
        assert_eq!(d.activity(ActivityView::Feed, &UserId::from("bob")), &bob);
        assert!(d
            .activity(ActivityView::User, &UserId::from("viewer"))
            .is_empty());

        // The same page again is recorded as nothing new
        assert_eq!(d.record_page(&recycle, &page), 0);
    }

    #[test]
    fn own_activity_skips_other_authors() {
        let recycle = Recycle::UserActivity {
            user: UserId::from("viewer"),
            discard: BTreeMap::new(),
        };
        let page = Page {
            items: vec![
                delivered("viewer", thread("news", "t1")),
                delivered("mallory", thread("news", "t2")),
            ],
        };
        let mut d = DiscardIds::new();
        assert_eq!(d.record_page(&recycle, &page), 1);
        assert_eq!(
            d.activity(ActivityView::User, &UserId::from("viewer"))
                .threads_created
                .len(),
            1
        );
    }

    #[test]
    fn thread_listings_are_keyed_by_section() {
        let page = Page {
            items: vec![
                delivered("a", thread("news", "t1")),
                delivered("a", thread("sports", "t2")),
                delivered("a", Comment::new(thread("news", "t3"), "c1").unwrap()),
            ],
        };
        let mut d = DiscardIds::new();
        let general = Recycle::GeneralThreads {
            discard: BTreeMap::new(),
        };
        assert_eq!(d.record_page(&general, &page), 2);
        assert_eq!(
            d.threads(ThreadsView::General, &SectionName::from("news")),
            &[ThreadId::from("t1")][..]
        );
        assert_eq!(
            d.threads(ThreadsView::General, &SectionName::from("sports")),
            &[ThreadId::from("t2")][..]
        );

        let section = Recycle::SectionThreads {
            section: SectionName::from("news"),
            discard: Vec::new(),
        };
        assert_eq!(d.record_page(&section, &page), 1);
        assert!(d
            .threads(ThreadsView::Section, &SectionName::from("sports"))
            .is_empty());
    }

    #[test]
    fn thread_comments_only_take_comments_of_that_thread() {
        let t1 = thread("news", "t1");
        let page = Page {
            items: vec![
                delivered("a", Comment::new(t1.clone(), "c1").unwrap()),
                delivered("a", Comment::new(thread("news", "t9"), "c2").unwrap()),
                delivered(
                    "a",
                    Subcomment::new(Comment::new(t1.clone(), "c1").unwrap(), "s1").unwrap(),
                ),
            ],
        };
        let recycle = Recycle::ThreadComments {
            thread: t1,
            discard: Vec::new(),
        };
        let mut d = DiscardIds::new();
        assert_eq!(d.record_page(&recycle, &page), 1);
        assert_eq!(
            d.comments(&thread("news", "t1")),
            &[CommentId::from("c1")][..]
        );
        assert!(d.comments(&thread("sports", "t1")).is_empty());
    }
}
