use async_trait::async_trait;
use uuid::Uuid;

use crate::{Page, RecycleRequest, UserId};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn random() -> SessionId {
        SessionId(Uuid::new_v4())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionData {
    /// None for anonymous browsing sessions
    pub viewer: Option<UserId>,

    /// Encoded discard sets, empty for a session that never recycled anything
    pub discard: Vec<u8>,
}

/// The remote service that stores and ranks content
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Returns a page of items, none of which is in the request's exclusions
    async fn recycle(&self, req: &RecycleRequest) -> anyhow::Result<Page>;

    /// Users whose content makes up `user`'s home feed
    async fn following(&self, user: &UserId) -> anyhow::Result<Vec<UserId>>;
}

/// Byte-oriented persistence of browsing sessions
///
/// `save` overwrites the whole value: two concurrent requests of one session
/// race, and the last one to save wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, viewer: Option<UserId>) -> anyhow::Result<SessionId>;
    async fn load(&self, id: SessionId) -> anyhow::Result<Option<SessionData>>;
    async fn save(&self, id: SessionId, discard: Vec<u8>) -> anyhow::Result<()>;

    /// Returns false if there was no such session
    async fn invalidate(&self, id: SessionId) -> anyhow::Result<bool>;
}
