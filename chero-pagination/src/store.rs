use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

use crate::api::{
    Activity, ActivityView, CommentId, Error, FeedView, SectionName, Thread, ThreadId,
    ThreadsView, UserId,
};

lazy_static::lazy_static! {
    static ref EMPTY_ACTIVITY: Activity = Activity::new();
}

/// Identifiers already delivered to one browsing session, per feed view
///
/// Every entry only ever grows for the lifetime of the session, unless
/// `bound_sequences` is explicitly called. Sequences keep delivery order.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DiscardIds {
    /// Content created by the viewer, keyed by the viewer's id
    user_activity: HashMap<UserId, Activity>,

    /// Content making up the viewer's home feed, keyed by author
    feed_activity: HashMap<UserId, Activity>,

    /// Saved threads, keyed by section
    threads_saved: HashMap<SectionName, Vec<ThreadId>>,

    /// Threads of a section page
    section_threads: HashMap<SectionName, Vec<ThreadId>>,

    /// Explore feed threads, keyed by section
    general_threads: HashMap<SectionName, Vec<ThreadId>>,

    /// Comments of a thread page, keyed by section then thread, as thread ids
    /// are only unique within their section
    thread_comments: HashMap<SectionName, HashMap<ThreadId, Vec<CommentId>>>,
}

/// What a discard set is keyed by, depending on its view
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DiscardKey {
    /// The viewer for own activity, an author for the home feed
    Actor(UserId),
    Section(SectionName),
    Thread(Thread),
}

impl DiscardKey {
    fn mismatch(view: FeedView) -> Error {
        Error::ViewMismatch(String::from(view.as_str()))
    }
}

/// Current discard set of one `(view, key)` entry
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiscardSet<'a> {
    Activity(&'a Activity),
    Threads(&'a [ThreadId]),
    Comments(&'a [CommentId]),
}

impl DiscardSet<'_> {
    pub fn len(&self) -> usize {
        match self {
            DiscardSet::Activity(a) => a.len(),
            DiscardSet::Threads(ids) => ids.len(),
            DiscardSet::Comments(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `self` has everything `other` has. Sequences must also keep
    /// `other` as their prefix.
    pub fn extends(&self, other: &DiscardSet<'_>) -> bool {
        match (self, other) {
            (DiscardSet::Activity(a), DiscardSet::Activity(b)) => a.is_superset(b),
            (DiscardSet::Threads(a), DiscardSet::Threads(b)) => a.starts_with(b),
            (DiscardSet::Comments(a), DiscardSet::Comments(b)) => a.starts_with(b),
            _ => false,
        }
    }
}

/// Newly delivered items, to be added to one `(view, key)` entry
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Delivery {
    Activity(Activity),
    Threads(Vec<ThreadId>),
    Comments(Vec<CommentId>),
}

/// Appends the ids not already in `seq`, returning how many were added
fn append_unseen<T>(seq: &mut Vec<T>, ids: impl IntoIterator<Item = T>) -> usize
where
    T: Clone + Eq + Hash,
{
    let before = seq.len();
    let mut seen = seq.iter().cloned().collect::<HashSet<T>>();
    for id in ids {
        if seen.insert(id.clone()) {
            seq.push(id);
        }
    }
    seq.len() - before
}

impl DiscardIds {
    pub fn new() -> DiscardIds {
        DiscardIds::default()
    }

    pub fn is_empty(&self) -> bool {
        self.user_activity.is_empty()
            && self.feed_activity.is_empty()
            && self.threads_saved.is_empty()
            && self.section_threads.is_empty()
            && self.general_threads.is_empty()
            && self.thread_comments.is_empty()
    }

    fn activity_map(&self, view: ActivityView) -> &HashMap<UserId, Activity> {
        match view {
            ActivityView::User => &self.user_activity,
            ActivityView::Feed => &self.feed_activity,
        }
    }

    fn activity_map_mut(&mut self, view: ActivityView) -> &mut HashMap<UserId, Activity> {
        match view {
            ActivityView::User => &mut self.user_activity,
            ActivityView::Feed => &mut self.feed_activity,
        }
    }

    fn threads_map(&self, view: ThreadsView) -> &HashMap<SectionName, Vec<ThreadId>> {
        match view {
            ThreadsView::Saved => &self.threads_saved,
            ThreadsView::Section => &self.section_threads,
            ThreadsView::General => &self.general_threads,
        }
    }

    fn threads_map_mut(&mut self, view: ThreadsView) -> &mut HashMap<SectionName, Vec<ThreadId>> {
        match view {
            ThreadsView::Saved => &mut self.threads_saved,
            ThreadsView::Section => &mut self.section_threads,
            ThreadsView::General => &mut self.general_threads,
        }
    }

    pub fn activity(&self, view: ActivityView, user: &UserId) -> &Activity {
        self.activity_map(view)
            .get(user)
            .unwrap_or(&*EMPTY_ACTIVITY)
    }

    pub fn threads(&self, view: ThreadsView, section: &SectionName) -> &[ThreadId] {
        self.threads_map(view)
            .get(section)
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn comments(&self, thread: &Thread) -> &[CommentId] {
        self.thread_comments
            .get(&thread.section)
            .and_then(|threads| threads.get(&thread.id))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Returns the number of items that were not already recorded
    pub fn record_activity(&mut self, view: ActivityView, user: UserId, delivered: Activity) -> usize {
        let entry = self.activity_map_mut(view).entry(user).or_default();
        let before = entry.len();
        entry.merge_activity(delivered);
        let added = entry.len() - before;
        tracing::debug!(view = FeedView::from(view).as_str(), added, "recorded delivered activity");
        added
    }

    /// Returns the number of ids that were not already recorded
    pub fn record_threads<I>(&mut self, view: ThreadsView, section: SectionName, ids: I) -> usize
    where
        I: IntoIterator<Item = ThreadId>,
    {
        let added = append_unseen(self.threads_map_mut(view).entry(section).or_default(), ids);
        tracing::debug!(view = FeedView::from(view).as_str(), added, "recorded delivered threads");
        added
    }

    /// Returns the number of ids that were not already recorded
    pub fn record_comments<I>(&mut self, thread: Thread, ids: I) -> usize
    where
        I: IntoIterator<Item = CommentId>,
    {
        let seq = self
            .thread_comments
            .entry(thread.section)
            .or_default()
            .entry(thread.id)
            .or_default();
        let added = append_unseen(seq, ids);
        tracing::debug!(added, "recorded delivered comments");
        added
    }

    /// Looks up any view, absent keys giving an empty set
    ///
    /// Fails if `key` is not the kind of key `view` is addressed by.
    pub fn discard_set(&self, view: FeedView, key: &DiscardKey) -> Result<DiscardSet<'_>, Error> {
        Ok(match (view, key) {
            (FeedView::ThreadComments, DiscardKey::Thread(t)) => {
                DiscardSet::Comments(self.comments(t))
            }
            (view, DiscardKey::Actor(u)) => match view.activity_view() {
                Some(v) => DiscardSet::Activity(self.activity(v, u)),
                None => return Err(DiscardKey::mismatch(view)),
            },
            (view, DiscardKey::Section(s)) => match view.threads_view() {
                Some(v) => DiscardSet::Threads(self.threads(v, s)),
                None => return Err(DiscardKey::mismatch(view)),
            },
            (view, DiscardKey::Thread(_)) => return Err(DiscardKey::mismatch(view)),
        })
    }

    /// Adds `delivery` to the `(view, key)` entry, creating it if needed
    ///
    /// Must be called once per page actually shown: recording a page that was
    /// not rendered makes the backend skip its items forever.
    pub fn record_delivered(
        &mut self,
        view: FeedView,
        key: DiscardKey,
        delivery: Delivery,
    ) -> Result<usize, Error> {
        Ok(match (view, key, delivery) {
            (FeedView::ThreadComments, DiscardKey::Thread(t), Delivery::Comments(ids)) => {
                self.record_comments(t, ids)
            }
            (view, DiscardKey::Actor(u), Delivery::Activity(a)) => match view.activity_view() {
                Some(v) => self.record_activity(v, u, a),
                None => return Err(DiscardKey::mismatch(view)),
            },
            (view, DiscardKey::Section(s), Delivery::Threads(ids)) => match view.threads_view() {
                Some(v) => self.record_threads(v, s, ids),
                None => return Err(DiscardKey::mismatch(view)),
            },
            (view, _, _) => return Err(DiscardKey::mismatch(view)),
        })
    }

    /// Keeps only the `max` most recent ids of every sequence
    ///
    /// This lets evicted items resurface in later pages. Activity bundles are
    /// not bounded. Returns the number of evicted ids.
    pub fn bound_sequences(&mut self, max: usize) -> usize {
        fn bound<'a, T: 'a>(seqs: impl Iterator<Item = &'a mut Vec<T>>, max: usize) -> usize {
            let mut evicted = 0;
            for seq in seqs {
                if seq.len() > max {
                    let excess = seq.len() - max;
                    *seq = seq.split_off(excess);
                    evicted += excess;
                }
            }
            evicted
        }
        let evicted = bound(self.threads_saved.values_mut(), max)
            + bound(self.section_threads.values_mut(), max)
            + bound(self.general_threads.values_mut(), max)
            + bound(
                self.thread_comments
                    .values_mut()
                    .flat_map(|threads| threads.values_mut()),
                max,
            );
        if evicted > 0 {
            tracing::debug!(evicted, max, "evicted oldest discarded ids");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Comment, Content, Subcomment};

    fn tids(ids: &[&str]) -> Vec<ThreadId> {
        ids.iter().map(|id| ThreadId::from(*id)).collect()
    }

    fn news() -> DiscardKey {
        DiscardKey::Section(SectionName::from("news"))
    }

    #[test]
    fn section_threads_grow_in_delivery_order() {
        let mut d = DiscardIds::new();
        assert_eq!(
            d.discard_set(FeedView::SectionThreads, &news()),
            Ok(DiscardSet::Threads(&[]))
        );
        d.record_delivered(
            FeedView::SectionThreads,
            news(),
            Delivery::Threads(tids(&["t1", "t2"])),
        )
        .unwrap();
        assert_eq!(
            d.discard_set(FeedView::SectionThreads, &news()),
            Ok(DiscardSet::Threads(&tids(&["t1", "t2"])))
        );
        d.record_delivered(FeedView::SectionThreads, news(), Delivery::Threads(tids(&["t3"])))
            .unwrap();
        assert_eq!(
            d.discard_set(FeedView::SectionThreads, &news()),
            Ok(DiscardSet::Threads(&tids(&["t1", "t2", "t3"])))
        );
        // Other views and keys are untouched
        assert!(d
            .discard_set(FeedView::GeneralThreads, &news())
            .unwrap()
            .is_empty());
        assert!(d
            .discard_set(
                FeedView::SectionThreads,
                &DiscardKey::Section(SectionName::from("sports"))
            )
            .unwrap()
            .is_empty());
    }

    #[test]
    fn recording_twice_is_a_no_op() {
        let mut d = DiscardIds::new();
        let section = SectionName::from("news");
        assert_eq!(d.record_threads(ThreadsView::Saved, section.clone(), tids(&["t1", "t2"])), 2);
        let once = d.clone();
        assert_eq!(d.record_threads(ThreadsView::Saved, section.clone(), tids(&["t2", "t1"])), 0);
        assert_eq!(d, once);

        let t = Thread::new("news", "t1").unwrap();
        let s = Subcomment::new(Comment::new(t.clone(), "c1").unwrap(), "s1").unwrap();
        let a: Activity = [Content::Thread(t), Content::Subcomment(s)].into_iter().collect();
        let user = UserId::from("u1");
        assert_eq!(d.record_activity(ActivityView::User, user.clone(), a.clone()), 2);
        let once = d.clone();
        assert_eq!(d.record_activity(ActivityView::User, user.clone(), a.clone()), 0);
        assert_eq!(d, once);
        assert_eq!(d.activity(ActivityView::User, &user), &a);
        assert!(d.activity(ActivityView::Feed, &user).is_empty());
    }

    #[test]
    fn repeated_ids_within_one_delivery_are_recorded_once() {
        let mut d = DiscardIds::new();
        let news = SectionName::from("news");
        assert_eq!(
            d.record_threads(ThreadsView::General, news.clone(), tids(&["t1", "t2", "t1", "t2"])),
            2
        );
        assert_eq!(
            d.record_threads(ThreadsView::General, news.clone(), tids(&["t3", "t1", "t3"])),
            1
        );
        assert_eq!(
            d.threads(ThreadsView::General, &news),
            &tids(&["t1", "t2", "t3"])[..]
        );
    }

    #[test]
    fn same_thread_id_in_two_sections_has_two_comment_sets() {
        let mut d = DiscardIds::new();
        let in_news = Thread::new("news", "t1").unwrap();
        let in_sports = Thread::new("sports", "t1").unwrap();
        assert_eq!(d.record_comments(in_news.clone(), [CommentId::from("c1")]), 1);
        assert_eq!(d.comments(&in_news), &[CommentId::from("c1")][..]);
        assert!(d.comments(&in_sports).is_empty());
        assert_eq!(d.record_comments(in_sports.clone(), [CommentId::from("c1")]), 1);
        assert_eq!(d.comments(&in_sports), &[CommentId::from("c1")][..]);
    }

    #[test]
    fn mismatched_keys_and_deliveries_are_rejected() {
        let mut d = DiscardIds::new();
        let t1 = DiscardKey::Thread(Thread::new("news", "t1").unwrap());
        assert_eq!(
            d.record_delivered(
                FeedView::UserActivity,
                DiscardKey::Actor(UserId::from("u1")),
                Delivery::Threads(tids(&["t1"]))
            ),
            Err(Error::ViewMismatch(String::from("user-activity")))
        );
        assert_eq!(
            d.record_delivered(
                FeedView::ThreadComments,
                t1.clone(),
                Delivery::Activity(Activity::new())
            ),
            Err(Error::ViewMismatch(String::from("thread-comments")))
        );
        assert_eq!(
            d.record_delivered(
                FeedView::SectionThreads,
                news(),
                Delivery::Comments(vec![CommentId::from("c1")])
            ),
            Err(Error::ViewMismatch(String::from("section-threads")))
        );
        assert_eq!(
            d.record_delivered(
                FeedView::ThreadComments,
                news(),
                Delivery::Comments(vec![CommentId::from("c1")])
            ),
            Err(Error::ViewMismatch(String::from("thread-comments")))
        );
        assert!(d.is_empty());
        assert_eq!(
            d.discard_set(FeedView::SectionThreads, &t1),
            Err(Error::ViewMismatch(String::from("section-threads")))
        );
        assert_eq!(
            d.discard_set(FeedView::ThreadComments, &news()),
            Err(Error::ViewMismatch(String::from("thread-comments")))
        );
    }

    #[test]
    fn bounding_evicts_the_oldest_ids() {
        let mut d = DiscardIds::new();
        let news = SectionName::from("news");
        let t1 = Thread::new("news", "t1").unwrap();
        d.record_threads(ThreadsView::General, news.clone(), tids(&["t1", "t2", "t3"]));
        d.record_comments(
            t1.clone(),
            vec![CommentId::from("c1"), CommentId::from("c2"), CommentId::from("c3")],
        );
        assert_eq!(d.bound_sequences(2), 2);
        assert_eq!(d.threads(ThreadsView::General, &news), &tids(&["t2", "t3"])[..]);
        assert_eq!(
            d.comments(&t1),
            &[CommentId::from("c2"), CommentId::from("c3")][..]
        );
        assert_eq!(d.bound_sequences(2), 0);
    }

    #[derive(Clone, Debug, bolero::generator::TypeGenerator)]
    enum Op {
        Activity {
            view: ActivityView,
            user: UserId,
            delivered: Activity,
        },
        Threads {
            view: ThreadsView,
            section: SectionName,
            #[generator(bolero::generator::gen_with::<Vec<ThreadId>>().len(0..8usize))]
            ids: Vec<ThreadId>,
        },
        Comments {
            thread: Thread,
            #[generator(bolero::generator::gen_with::<Vec<CommentId>>().len(0..8usize))]
            ids: Vec<CommentId>,
        },
    }

    impl Op {
        fn view_and_key(&self) -> (FeedView, DiscardKey) {
            match self {
                Op::Activity { view, user, .. } => {
                    (FeedView::from(*view), DiscardKey::Actor(user.clone()))
                }
                Op::Threads { view, section, .. } => {
                    (FeedView::from(*view), DiscardKey::Section(section.clone()))
                }
                Op::Comments { thread, .. } => {
                    (FeedView::ThreadComments, DiscardKey::Thread(thread.clone()))
                }
            }
        }

        fn delivery(self) -> Delivery {
            match self {
                Op::Activity { delivered, .. } => Delivery::Activity(delivered),
                Op::Threads { ids, .. } => Delivery::Threads(ids),
                Op::Comments { ids, .. } => Delivery::Comments(ids),
            }
        }
    }

    #[test]
    fn entries_only_grow_and_duplicates_are_no_ops() {
        bolero::check!()
            .with_generator(bolero::generator::gen_with::<Vec<Op>>().len(1..20usize))
            .cloned()
            .for_each(|ops| {
                let mut d = DiscardIds::new();
                for op in ops {
                    let (view, key) = op.view_and_key();
                    let before = d.clone();
                    d.record_delivered(view, key.clone(), op.clone().delivery())
                        .expect("recording a well-shaped delivery");
                    let now = d.discard_set(view, &key).unwrap();
                    assert!(now.extends(&before.discard_set(view, &key).unwrap()));
                    let once = d.clone();
                    d.record_delivered(view, key, op.delivery())
                        .expect("recording a well-shaped delivery");
                    assert_eq!(d, once);
                }
            })
    }
}
