/// The six independent paginated listings a session can scroll through
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FeedView {
    /// The viewer's own activity
    UserActivity,
    /// Home feed, content of the users the viewer follows
    FeedActivity,
    /// Saved threads, per section
    ThreadsSaved,
    /// Threads of a single section
    SectionThreads,
    /// Explore feed, threads across all sections
    GeneralThreads,
    /// Comments of a single thread
    ThreadComments,
}

impl FeedView {
    pub const ALL: [FeedView; 6] = [
        FeedView::UserActivity,
        FeedView::FeedActivity,
        FeedView::ThreadsSaved,
        FeedView::SectionThreads,
        FeedView::GeneralThreads,
        FeedView::ThreadComments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedView::UserActivity => "user-activity",
            FeedView::FeedActivity => "feed-activity",
            FeedView::ThreadsSaved => "threads-saved",
            FeedView::SectionThreads => "section-threads",
            FeedView::GeneralThreads => "general-threads",
            FeedView::ThreadComments => "thread-comments",
        }
    }

    pub fn activity_view(self) -> Option<ActivityView> {
        match self {
            FeedView::UserActivity => Some(ActivityView::User),
            FeedView::FeedActivity => Some(ActivityView::Feed),
            _ => None,
        }
    }

    pub fn threads_view(self) -> Option<ThreadsView> {
        match self {
            FeedView::ThreadsSaved => Some(ThreadsView::Saved),
            FeedView::SectionThreads => Some(ThreadsView::Section),
            FeedView::GeneralThreads => Some(ThreadsView::General),
            _ => None,
        }
    }
}

/// Views whose discard sets are Activity bundles keyed by user
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub enum ActivityView {
    User,
    Feed,
}

/// Views whose discard sets are thread id sequences keyed by section
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub enum ThreadsView {
    Saved,
    Section,
    General,
}

impl From<ActivityView> for FeedView {
    fn from(v: ActivityView) -> FeedView {
        match v {
            ActivityView::User => FeedView::UserActivity,
            ActivityView::Feed => FeedView::FeedActivity,
        }
    }
}

impl From<ThreadsView> for FeedView {
    fn from(v: ThreadsView) -> FeedView {
        match v {
            ThreadsView::Saved => FeedView::ThreadsSaved,
            ThreadsView::Section => FeedView::SectionThreads,
            ThreadsView::General => FeedView::GeneralThreads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_views_map_back_to_themselves() {
        for v in FeedView::ALL {
            if let Some(a) = v.activity_view() {
                assert_eq!(FeedView::from(a), v);
            }
            if let Some(t) = v.threads_view() {
                assert_eq!(FeedView::from(t), v);
            }
        }
        assert_eq!(FeedView::ThreadComments.activity_view(), None);
        assert_eq!(FeedView::ThreadComments.threads_view(), None);
    }

    #[test]
    fn names_match_serde() {
        for v in FeedView::ALL {
            assert_eq!(
                serde_json::to_value(v).unwrap(),
                serde_json::Value::from(v.as_str())
            );
        }
    }
}
