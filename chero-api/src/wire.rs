use std::collections::BTreeMap;

use crate::{
    Activity, Comment, CommentId, Content, Error, FeedView, SectionName, Subcomment,
    SubcommentId, Thread, ThreadId, UserId,
};

// Every context below carries its full ancestor chain: the backend handles
// each record on its own, without re-deriving where it lives.

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SectionCtx {
    pub name: SectionName,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ThreadCtx {
    pub id: ThreadId,
    pub section_ctx: SectionCtx,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentCtx {
    pub id: CommentId,
    pub thread_ctx: ThreadCtx,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SubcommentCtx {
    pub id: SubcommentId,
    pub comment_ctx: CommentCtx,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ActivityCtx {
    pub threads_created: Vec<ThreadCtx>,
    pub comments: Vec<CommentCtx>,
    pub subcomments: Vec<SubcommentCtx>,
}

impl From<&Thread> for ThreadCtx {
    fn from(t: &Thread) -> ThreadCtx {
        ThreadCtx {
            id: t.id.clone(),
            section_ctx: SectionCtx {
                name: t.section.clone(),
            },
        }
    }
}

impl From<&Comment> for CommentCtx {
    fn from(c: &Comment) -> CommentCtx {
        CommentCtx {
            id: c.id.clone(),
            thread_ctx: ThreadCtx::from(&c.thread),
        }
    }
}

impl From<&Subcomment> for SubcommentCtx {
    fn from(s: &Subcomment) -> SubcommentCtx {
        SubcommentCtx {
            id: s.id.clone(),
            comment_ctx: CommentCtx::from(&s.comment),
        }
    }
}

impl From<&Activity> for ActivityCtx {
    fn from(a: &Activity) -> ActivityCtx {
        ActivityCtx {
            threads_created: a.threads_created.iter().map(ThreadCtx::from).collect(),
            comments: a.comments.iter().map(CommentCtx::from).collect(),
            subcomments: a.subcomments.iter().map(SubcommentCtx::from).collect(),
        }
    }
}

impl ThreadCtx {
    pub fn to_thread(&self) -> Result<Thread, Error> {
        let res = Thread {
            section: self.section_ctx.name.clone(),
            id: self.id.clone(),
        };
        res.validate()?;
        Ok(res)
    }
}

impl CommentCtx {
    pub fn to_comment(&self) -> Result<Comment, Error> {
        Comment::new(self.thread_ctx.to_thread()?, self.id.0.clone())
    }
}

impl SubcommentCtx {
    pub fn to_subcomment(&self) -> Result<Subcomment, Error> {
        Subcomment::new(self.comment_ctx.to_comment()?, self.id.0.clone())
    }
}

impl ActivityCtx {
    pub fn is_empty(&self) -> bool {
        self.threads_created.is_empty() && self.comments.is_empty() && self.subcomments.is_empty()
    }

    /// Parses the wire form back, validating every chain
    pub fn to_activity(&self) -> Result<Activity, Error> {
        let mut res = Activity::new();
        for t in &self.threads_created {
            res.threads_created.insert(t.to_thread()?);
        }
        for c in &self.comments {
            res.comments.insert(c.to_comment()?);
        }
        for s in &self.subcomments {
            res.subcomments.insert(s.to_subcomment()?);
        }
        Ok(res)
    }
}

/// A "load more" request for one feed view, with everything the backend
/// must skip
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "view", rename_all = "kebab-case")]
pub enum Recycle {
    UserActivity {
        user: UserId,
        discard: BTreeMap<UserId, ActivityCtx>,
    },
    FeedActivity {
        user: UserId,
        discard: BTreeMap<UserId, ActivityCtx>,
    },
    ThreadsSaved {
        user: UserId,
        discard: BTreeMap<SectionName, Vec<ThreadId>>,
    },
    SectionThreads {
        section: SectionName,
        discard: Vec<ThreadId>,
    },
    GeneralThreads {
        discard: BTreeMap<SectionName, Vec<ThreadId>>,
    },
    ThreadComments {
        thread: Thread,
        discard: Vec<CommentId>,
    },
}

impl Recycle {
    pub fn view(&self) -> FeedView {
        match self {
            Recycle::UserActivity { .. } => FeedView::UserActivity,
            Recycle::FeedActivity { .. } => FeedView::FeedActivity,
            Recycle::ThreadsSaved { .. } => FeedView::ThreadsSaved,
            Recycle::SectionThreads { .. } => FeedView::SectionThreads,
            Recycle::GeneralThreads { .. } => FeedView::GeneralThreads,
            Recycle::ThreadComments { .. } => FeedView::ThreadComments,
        }
    }

    /// Number of excluded items, for logging
    pub fn discard_len(&self) -> usize {
        match self {
            Recycle::UserActivity { discard, .. } | Recycle::FeedActivity { discard, .. } => {
                discard
                    .values()
                    .map(|a| a.threads_created.len() + a.comments.len() + a.subcomments.len())
                    .sum()
            }
            Recycle::ThreadsSaved { discard, .. } | Recycle::GeneralThreads { discard } => {
                discard.values().map(|ids| ids.len()).sum()
            }
            Recycle::SectionThreads { discard, .. } => discard.len(),
            Recycle::ThreadComments { discard, .. } => discard.len(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RecycleRequest {
    pub recycle: Recycle,
    pub page_size: u32,
}

/// One item of a page, attributed to the user who created it
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Delivered {
    pub author: UserId,
    pub content: Content,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Page {
    pub items: Vec<Delivered>,
}
