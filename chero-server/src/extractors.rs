use std::sync::Arc;

use anyhow::Context;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{self, request},
};
use chero_api::{ContentService, SectionName, SessionId, SessionStore, UserId, Uuid};
use chero_pagination::DiscardIds;

use crate::Error;

pub const SESSION_COOKIE: &str = "chero_session";

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub content: Arc<dyn ContentService>,
    pub settings: Arc<Settings>,
}

#[derive(Debug)]
pub struct Settings {
    /// Sections served by this site, in display order
    pub sections: Vec<SectionName>,
    pub page_size: u32,

    /// Bound on each thread and comment listing of a session
    pub max_discard_per_key: Option<usize>,
}

impl Settings {
    pub fn section(&self, name: &str) -> Result<SectionName, Error> {
        self.sections
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| Error::no_such_section(String::from(name)))
    }
}

fn session_cookie(req: &request::Parts) -> Option<SessionId> {
    for header in req.headers.get_all(http::header::COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for pair in header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == SESSION_COOKIE {
                    return Uuid::try_parse(value).ok().map(SessionId);
                }
            }
        }
    }
    None
}

/// The browsing session of the request, along with its discard sets
///
/// `id` is None when the request came without a live session. Nothing is
/// stored for it until a page was actually recycled.
pub struct CurrentSession {
    pub id: Option<SessionId>,
    pub discard: DiscardIds,
}

impl CurrentSession {
    pub fn stored(id: SessionId, discard: DiscardIds) -> CurrentSession {
        CurrentSession {
            id: Some(id),
            discard,
        }
    }

    async fn existing(
        req: &request::Parts,
        state: &AppState,
    ) -> Result<Option<Auth<Option<UserId>>>, Error> {
        let Some(id) = session_cookie(req) else {
            return Ok(None);
        };
        let data = state
            .sessions
            .load(id)
            .await
            .with_context(|| format!("loading session {id:?}"))?;
        let Some(data) = data else {
            tracing::debug!(?id, "unknown or expired session");
            return Ok(None);
        };
        Ok(Some(Auth {
            id,
            viewer: data.viewer,
            discard: DiscardIds::decode_or_fresh(&data.discard),
        }))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Error;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &AppState,
    ) -> Result<CurrentSession, Error> {
        Ok(match CurrentSession::existing(req, state).await? {
            Some(existing) => CurrentSession::stored(existing.id, existing.discard),
            None => CurrentSession {
                id: None,
                discard: DiscardIds::new(),
            },
        })
    }
}

/// A stored session, with a logged-in viewer when extracted as such
///
/// Logging in is done by an external collaborator, which creates the session
/// with `SessionStore::create(Some(viewer))`.
pub struct Auth<V = UserId> {
    pub id: SessionId,
    pub viewer: V,
    pub discard: DiscardIds,
}

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, state: &AppState) -> Result<Auth, Error> {
        let session = CurrentSession::existing(req, state)
            .await?
            .ok_or_else(Error::permission_denied)?;
        match session.viewer {
            Some(viewer) => Ok(Auth {
                id: session.id,
                viewer,
                discard: session.discard,
            }),
            None => Err(Error::permission_denied()),
        }
    }
}
