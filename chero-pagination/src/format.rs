use std::collections::BTreeMap;

use crate::{
    api::{
        ActivityCtx, ActivityView, CommentId, Error, SectionName, Thread, ThreadId, ThreadsView,
        UserId,
    },
    DiscardIds,
};

// The formatter trusts its caller to have checked the viewer may see these
// entries; it only rejects keys that cannot name anything.

fn check_actor(user: &UserId) -> Result<(), Error> {
    user.validate()
        .map_err(|_| Error::NoSuchActor(user.0.clone()))
}

fn check_section(section: &SectionName) -> Result<(), Error> {
    section
        .validate()
        .map_err(|_| Error::NoSuchSection(section.0.clone()))
}

impl DiscardIds {
    /// Exclusion record of the viewer's own activity, keyed by the viewer
    pub fn format_user_activity(
        &self,
        user: &UserId,
    ) -> Result<BTreeMap<UserId, ActivityCtx>, Error> {
        check_actor(user)?;
        let mut res = BTreeMap::new();
        res.insert(
            user.clone(),
            ActivityCtx::from(self.activity(ActivityView::User, user)),
        );
        Ok(res)
    }

    /// One exclusion record per author of the home feed
    ///
    /// Authors with nothing delivered yet still get an (empty) record, so the
    /// backend knows about them. Malformed author ids are left out, without
    /// affecting the records of the other authors.
    pub fn format_feed_activity(&self, authors: &[UserId]) -> BTreeMap<UserId, ActivityCtx> {
        let mut res = BTreeMap::new();
        for u in authors {
            if let Err(err) = check_actor(u) {
                tracing::warn!(?err, "leaving malformed author out of feed exclusions");
                continue;
            }
            res.insert(
                u.clone(),
                ActivityCtx::from(self.activity(ActivityView::Feed, u)),
            );
        }
        res
    }

    pub fn format_threads(
        &self,
        view: ThreadsView,
        section: &SectionName,
    ) -> Result<Vec<ThreadId>, Error> {
        check_section(section)?;
        Ok(self.threads(view, section).to_vec())
    }

    /// Exclusions of a view spanning several sections, one entry per section
    pub fn format_sections(
        &self,
        view: ThreadsView,
        sections: &[SectionName],
    ) -> Result<BTreeMap<SectionName, Vec<ThreadId>>, Error> {
        sections
            .iter()
            .map(|s| Ok((s.clone(), self.format_threads(view, s)?)))
            .collect()
    }

    pub fn format_comments(&self, thread: &Thread) -> Result<Vec<CommentId>, Error> {
        thread
            .validate()
            .map_err(|_| Error::NoSuchThread(thread.id.0.clone()))?;
        Ok(self.comments(thread).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{Activity, Comment, Subcomment};

    use super::*;

    #[test]
    fn feed_gives_one_record_per_author() {
        let mut d = DiscardIds::new();
        let a = UserId::from("A");
        let b = UserId::from("B");
        let mut activity = Activity::new();
        activity.merge([Thread::new("news", "t1").unwrap()], [], []);
        d.record_activity(ActivityView::Feed, a.clone(), activity.clone());

        let res = d.format_feed_activity(&[a.clone(), b.clone()]);
        assert_eq!(res.len(), 2);
        assert_eq!(res[&a], ActivityCtx::from(&activity));
        assert!(!res[&a].is_empty());
        assert!(res[&b].is_empty());
    }

    #[test]
    fn subcomment_record_carries_its_ancestry() {
        let mut d = DiscardIds::new();
        let viewer = UserId::from("viewer");
        let s = Subcomment::new(
            Comment::new(Thread::new("news", "t1").unwrap(), "c1").unwrap(),
            "s1",
        )
        .unwrap();
        let mut activity = Activity::new();
        activity.merge([], [], [s]);
        d.record_activity(ActivityView::User, viewer.clone(), activity);

        let res = d.format_user_activity(&viewer).unwrap();
        assert_eq!(res.len(), 1);
        let record = &res[&viewer];
        assert!(record.threads_created.is_empty());
        assert!(record.comments.is_empty());
        let ctx = &record.subcomments[0].comment_ctx;
        assert_eq!(ctx.id.as_str(), "c1");
        assert_eq!(ctx.thread_ctx.id.as_str(), "t1");
        assert_eq!(ctx.thread_ctx.section_ctx.name.as_str(), "news");
    }

    #[test]
    fn unknown_keys_format_as_empty() {
        let d = DiscardIds::new();
        let viewer = UserId::from("viewer");
        assert!(d.format_user_activity(&viewer).unwrap()[&viewer].is_empty());
        assert_eq!(
            d.format_threads(ThreadsView::Section, &SectionName::from("news")),
            Ok(Vec::new())
        );
        assert_eq!(
            d.format_comments(&Thread::new("news", "t1").unwrap()),
            Ok(Vec::new())
        );
    }

    #[test]
    fn malformed_keys_are_reported() {
        let d = DiscardIds::new();
        assert_eq!(
            d.format_user_activity(&UserId::from("")),
            Err(Error::NoSuchActor(String::new()))
        );
        assert_eq!(
            d.format_sections(
                ThreadsView::General,
                &[SectionName::from("news"), SectionName::from("a\0")]
            ),
            Err(Error::NoSuchSection(String::from("a\0")))
        );
        let mut unnamed = Thread::new("news", "t1").unwrap();
        unnamed.id = ThreadId::from("");
        assert_eq!(
            d.format_comments(&unnamed),
            Err(Error::NoSuchThread(String::new()))
        );
    }

    #[test]
    fn malformed_feed_author_only_drops_its_own_record() {
        let mut d = DiscardIds::new();
        let a = UserId::from("A");
        let mut activity = Activity::new();
        activity.merge([Thread::new("news", "t1").unwrap()], [], []);
        d.record_activity(ActivityView::Feed, a.clone(), activity.clone());

        let res = d.format_feed_activity(&[UserId::from(""), a.clone(), UserId::from("b\0")]);
        assert_eq!(res.len(), 1);
        assert_eq!(res[&a], ActivityCtx::from(&activity));
    }

    #[test]
    fn sections_keep_delivery_order() {
        let mut d = DiscardIds::new();
        let news = SectionName::from("news");
        d.record_threads(
            ThreadsView::Saved,
            news.clone(),
            [ThreadId::from("t2"), ThreadId::from("t1")],
        );
        let res = d
            .format_sections(ThreadsView::Saved, &[news.clone(), SectionName::from("sports")])
            .unwrap();
        assert_eq!(res[&news], vec![ThreadId::from("t2"), ThreadId::from("t1")]);
        assert!(res[&SectionName::from("sports")].is_empty());
    }
}
