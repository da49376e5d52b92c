use anyhow::Context;
use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chero_api::{Error as ApiError, FeedView, Page, Recycle, RecycleRequest, SessionId};

use crate::{
    extractors::{AppState, CurrentSession, SESSION_COOKIE},
    Error,
};

/// A recycled page, along with the cookie of the session if it was just
/// started
#[derive(Debug)]
pub struct Recycled {
    pub page: Page,
    pub new_session: Option<SessionId>,
}

impl IntoResponse for Recycled {
    fn into_response(self) -> Response {
        let mut resp = Json(self.page).into_response();
        if let Some(id) = self.new_session {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", id.0);
            match HeaderValue::from_str(&cookie) {
                Ok(v) => {
                    resp.headers_mut().insert(header::SET_COOKIE, v);
                }
                Err(err) => tracing::error!(?err, "building session cookie"),
            }
        }
        resp
    }
}

/// Falls back to excluding nothing when the exclusions could not be formatted
///
/// The user may then see already-seen items again, which beats not seeing
/// anything.
pub fn or_nothing<T: Default>(view: FeedView, formatted: Result<T, ApiError>) -> T {
    formatted.unwrap_or_else(|err| {
        tracing::warn!(view = view.as_str(), ?err, "recycling without exclusions");
        T::default()
    })
}

/// Asks the content service for the next page of `recycle`, then records
/// what it returned in the session
///
/// Nothing is recorded if the content service fails. A request without a
/// session only gets one stored once its page was recycled.
pub async fn recycle(
    state: &AppState,
    mut session: CurrentSession,
    recycle: Recycle,
) -> Result<Recycled, Error> {
    let view = recycle.view();
    tracing::debug!(
        view = view.as_str(),
        excluded = recycle.discard_len(),
        "recycling"
    );
    let req = RecycleRequest {
        recycle,
        page_size: state.settings.page_size,
    };
    let page = state
        .content
        .recycle(&req)
        .await
        .with_context(|| format!("recycling {}", view.as_str()))?;

    let added = session.discard.record_page(&req.recycle, &page);
    if let Some(max) = state.settings.max_discard_per_key {
        session.discard.bound_sequences(max);
    }
    tracing::debug!(view = view.as_str(), delivered = page.items.len(), added, "recycled");

    let (id, new_session) = match session.id {
        Some(id) => (id, None),
        None => {
            let id = state
                .sessions
                .create(None)
                .await
                .context("creating anonymous session")?;
            tracing::debug!(?id, "started anonymous session");
            (id, Some(id))
        }
    };
    state
        .sessions
        .save(id, session.discard.encode())
        .await
        .with_context(|| format!("saving session {id:?}"))?;

    Ok(Recycled { page, new_session })
}
