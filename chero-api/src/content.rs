use std::{borrow::Borrow, fmt};

use crate::{validate_id, Error};

macro_rules! string_id {
    ($name:ident, $kind:expr) => {
        #[derive(
            Clone,
            Debug,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            bolero::generator::TypeGenerator,
            serde::Deserialize,
            serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(
            #[generator(bolero::generator::gen_with::<String>().len(1..8usize))] pub String,
        );

        impl $name {
            pub fn new(id: impl Into<String>) -> $name {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn validate(&self) -> Result<(), Error> {
                validate_id($kind, &self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> $name {
                $name(String::from(id))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(UserId, "user");
string_id!(SectionName, "section");
string_id!(ThreadId, "thread");
string_id!(CommentId, "comment");
string_id!(SubcommentId, "subcomment");

/// A thread is in a section and has an id. `(section, id)` is unique
/// system-wide.
#[derive(
    Clone,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub struct Thread {
    pub section: SectionName,
    pub id: ThreadId,
}

/// A comment is in a thread and has an id unique within that thread.
///
/// The whole thread is embedded rather than referenced, so that a comment
/// can be reported to the backend without looking anything up.
#[derive(
    Clone,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub struct Comment {
    pub thread: Thread,
    pub id: CommentId,
}

/// A subcomment is in a comment and has an id unique within that comment.
#[derive(
    Clone,
    Debug,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
pub struct Subcomment {
    pub comment: Comment,
    pub id: SubcommentId,
}

impl Thread {
    pub fn new(section: impl Into<String>, id: impl Into<String>) -> Result<Thread, Error> {
        let res = Thread {
            section: SectionName(section.into()),
            id: ThreadId(id.into()),
        };
        res.validate()?;
        Ok(res)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.section.validate()?;
        self.id.validate()
    }
}

impl Comment {
    pub fn new(thread: Thread, id: impl Into<String>) -> Result<Comment, Error> {
        let res = Comment {
            thread,
            id: CommentId(id.into()),
        };
        res.validate()?;
        Ok(res)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.thread.validate()?;
        self.id.validate()
    }
}

impl Subcomment {
    pub fn new(comment: Comment, id: impl Into<String>) -> Result<Subcomment, Error> {
        let res = Subcomment {
            comment,
            id: SubcommentId(id.into()),
        };
        res.validate()?;
        Ok(res)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.comment.validate()?;
        self.id.validate()
    }
}

/// Walks up the parent chain to the owning thread
pub trait InThread {
    fn thread(&self) -> &Thread;

    fn section(&self) -> &SectionName {
        &self.thread().section
    }
}

impl InThread for Thread {
    fn thread(&self) -> &Thread {
        self
    }
}

impl InThread for Comment {
    fn thread(&self) -> &Thread {
        &self.thread
    }
}

impl InThread for Subcomment {
    fn thread(&self) -> &Thread {
        &self.comment.thread
    }
}

#[derive(
    Clone,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Thread(Thread),
    Comment(Comment),
    Subcomment(Subcomment),
}

impl Content {
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Content::Thread(t) => t.validate(),
            Content::Comment(c) => c.validate(),
            Content::Subcomment(s) => s.validate(),
        }
    }
}

impl InThread for Content {
    fn thread(&self) -> &Thread {
        match self {
            Content::Thread(t) => t.thread(),
            Content::Comment(c) => c.thread(),
            Content::Subcomment(s) => s.thread(),
        }
    }
}

impl From<Thread> for Content {
    fn from(t: Thread) -> Content {
        Content::Thread(t)
    }
}

impl From<Comment> for Content {
    fn from(c: Comment) -> Content {
        Content::Comment(c)
    }
}

impl From<Subcomment> for Content {
    fn from(s: Subcomment) -> Content {
        Content::Subcomment(s)
    }
}
