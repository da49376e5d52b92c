mod activity;
pub use activity::Activity;

mod content;
pub use content::{
    Comment, CommentId, Content, InThread, SectionName, Subcomment, SubcommentId, Thread, ThreadId,
    UserId,
};

mod error;
pub use error::Error;

mod service;
pub use service::{ContentService, SessionData, SessionId, SessionStore};

mod view;
pub use view::{ActivityView, FeedView, ThreadsView};

mod wire;
pub use wire::{
    ActivityCtx, CommentCtx, Delivered, Page, Recycle, RecycleRequest, SectionCtx, SubcommentCtx,
    ThreadCtx,
};

pub use uuid::Uuid;

// Identifiers travel through cookies, urls and the backend's storage, none of
// which handle null bytes gracefully
pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}

pub(crate) fn validate_id(kind: &'static str, s: &str) -> Result<(), Error> {
    if s.is_empty() {
        return Err(Error::EmptyIdentifier(String::from(kind)));
    }
    validate_string(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_id_rejects_empty_and_null_bytes() {
        assert_eq!(
            validate_id("thread", ""),
            Err(Error::EmptyIdentifier(String::from("thread")))
        );
        assert_eq!(
            validate_id("thread", "a\0b"),
            Err(Error::NullByteInString(String::from("a\0b")))
        );
        assert_eq!(validate_id("thread", "t1"), Ok(()));
    }
}
