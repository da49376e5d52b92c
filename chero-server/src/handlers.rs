use anyhow::Context;
use axum::extract::{Path, Query, State};
use chero_api::{FeedView, Recycle, Thread, ThreadsView, UserId};

use crate::{
    extractors::{AppState, Auth, CurrentSession},
    recycle::{or_nothing, recycle, Recycled},
    Error,
};

pub async fn recycle_feed(
    State(state): State<AppState>,
    Auth { id, viewer, discard }: Auth,
) -> Result<Recycled, Error> {
    let authors = state
        .content
        .following(&viewer)
        .await
        .with_context(|| format!("listing authors followed by {viewer}"))?;
    let exclusions = discard.format_feed_activity(&authors);
    recycle(
        &state,
        CurrentSession::stored(id, discard),
        Recycle::FeedActivity {
            user: viewer,
            discard: exclusions,
        },
    )
    .await
}

pub async fn recycle_activity(
    State(state): State<AppState>,
    Auth { id, viewer, discard }: Auth,
) -> Result<Recycled, Error> {
    let exclusions = or_nothing(
        FeedView::UserActivity,
        discard.format_user_activity(&viewer),
    );
    recycle(
        &state,
        CurrentSession::stored(id, discard),
        Recycle::UserActivity {
            user: viewer,
            discard: exclusions,
        },
    )
    .await
}

pub async fn recycle_saved(
    State(state): State<AppState>,
    Auth { id, viewer, discard }: Auth,
) -> Result<Recycled, Error> {
    let exclusions = or_nothing(
        FeedView::ThreadsSaved,
        discard.format_sections(ThreadsView::Saved, &state.settings.sections),
    );
    recycle(
        &state,
        CurrentSession::stored(id, discard),
        Recycle::ThreadsSaved {
            user: viewer,
            discard: exclusions,
        },
    )
    .await
}

pub async fn recycle_explore(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<Recycled, Error> {
    let discard = or_nothing(
        FeedView::GeneralThreads,
        session
            .discard
            .format_sections(ThreadsView::General, &state.settings.sections),
    );
    recycle(&state, session, Recycle::GeneralThreads { discard }).await
}

pub async fn recycle_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    session: CurrentSession,
) -> Result<Recycled, Error> {
    let section = state.settings.section(&section)?;
    let discard = or_nothing(
        FeedView::SectionThreads,
        session.discard.format_threads(ThreadsView::Section, &section),
    );
    recycle(&state, session, Recycle::SectionThreads { section, discard }).await
}

pub async fn recycle_comments(
    State(state): State<AppState>,
    Path((section, thread)): Path<(String, String)>,
    session: CurrentSession,
) -> Result<Recycled, Error> {
    let section = state.settings.section(&section)?;
    let thread = Thread::new(section.0, thread)?;
    let discard = or_nothing(
        FeedView::ThreadComments,
        session.discard.format_comments(&thread),
    );
    recycle(&state, session, Recycle::ThreadComments { thread, discard }).await
}

/// Ends the session, and with it every discard set it held
pub async fn logout(
    State(state): State<AppState>,
    Auth { id, viewer, .. }: Auth,
) -> Result<(), Error> {
    state
        .sessions
        .invalidate(id)
        .await
        .with_context(|| format!("invalidating session {id:?}"))?;
    tracing::info!(%viewer, "logged out");
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
pub struct ProfileQuery {
    userid: UserId,
}

/// Another user's activity, as seen on their profile
pub async fn recycle_profile(
    State(state): State<AppState>,
    Query(ProfileQuery { userid }): Query<ProfileQuery>,
    session: CurrentSession,
) -> Result<Recycled, Error> {
    userid.validate()?;
    let discard = or_nothing(
        FeedView::UserActivity,
        session.discard.format_user_activity(&userid),
    );
    recycle(
        &state,
        session,
        Recycle::UserActivity {
            user: userid,
            discard,
        },
    )
    .await
}
