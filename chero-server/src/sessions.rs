use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chero_api::{SessionData, SessionId, SessionStore, UserId};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

#[derive(Debug)]
struct Stored {
    viewer: Option<UserId>,
    discard: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// Process-local sessions, lost on restart
///
/// Each save pushes the expiration back by `ttl`.
#[derive(Clone)]
pub struct MemorySessions {
    sessions: Arc<RwLock<HashMap<SessionId, Stored>>>,
    ttl: Duration,
}

impl MemorySessions {
    pub fn new(ttl: Duration) -> MemorySessions {
        MemorySessions {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    #[cfg(test)]
    pub async fn test_len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns the number of sessions dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn create(&self, viewer: Option<UserId>) -> anyhow::Result<SessionId> {
        let id = SessionId::random();
        let stored = Stored {
            viewer,
            discard: Vec::new(),
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions.write().await.insert(id, stored);
        Ok(id)
    }

    async fn load(&self, id: SessionId) -> anyhow::Result<Option<SessionData>> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            None => Ok(None),
            Some(s) if s.expires_at <= Utc::now() => {
                sessions.remove(&id);
                Ok(None)
            }
            Some(s) => Ok(Some(SessionData {
                viewer: s.viewer.clone(),
                discard: s.discard.clone(),
            })),
        }
    }

    async fn save(&self, id: SessionId, discard: Vec<u8>) -> anyhow::Result<()> {
        match self.sessions.write().await.get_mut(&id) {
            Some(s) => {
                s.discard = discard;
                s.expires_at = Utc::now() + self.ttl;
            }
            // logged out or expired while the request was running
            None => tracing::warn!(?id, "dropping save of a vanished session"),
        }
        Ok(())
    }

    async fn invalidate(&self, id: SessionId) -> anyhow::Result<bool> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_live_until_invalidated() {
        let store = MemorySessions::new(Duration::hours(1));
        let viewer = UserId::from("alice");
        let id = store.create(Some(viewer.clone())).await.unwrap();
        assert_eq!(
            store.load(id).await.unwrap(),
            Some(SessionData {
                viewer: Some(viewer.clone()),
                discard: Vec::new(),
            })
        );

        store.save(id, b"abc".to_vec()).await.unwrap();
        assert_eq!(store.load(id).await.unwrap().unwrap().discard, b"abc");

        assert!(store.invalidate(id).await.unwrap());
        assert!(!store.invalidate(id).await.unwrap());
        assert_eq!(store.load(id).await.unwrap(), None);

        // saving to a vanished session is not an error, but does not revive it
        store.save(id, b"def".to_vec()).await.unwrap();
        assert_eq!(store.load(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_sessions_are_gone() {
        let store = MemorySessions::new(Duration::seconds(-1));
        let a = store.create(None).await.unwrap();
        store.create(None).await.unwrap();
        assert_eq!(store.load(a).await.unwrap(), None);
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.purge_expired().await, 0);
    }
}
