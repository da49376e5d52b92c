use std::{net::SocketAddr, sync::Arc};

use anyhow::{anyhow, Context};
use axum::{routing::get, Router};
use chero_api::SectionName;

mod content;
mod error;
mod extractors;
mod fuzz;
mod handlers;
mod recycle;
mod sessions;

pub use content::HttpContent;
pub use error::Error;
pub use extractors::{AppState, Settings};
pub use sessions::MemorySessions;

/// Names whose recycle route is already taken by another page
const RESERVED_SECTIONS: &[&str] = &["explore", "profile"];

#[derive(structopt::StructOpt)]
struct Opt {
    /// Address to listen on
    #[structopt(long, env = "CHERO_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Base url of the content service
    #[structopt(long, env = "CHERO_CONTENT_URL")]
    content_url: String,

    /// Sections of the site, in display order
    #[structopt(long = "section", env = "CHERO_SECTIONS", use_delimiter = true)]
    sections: Vec<String>,

    /// Number of items returned by each recycle
    #[structopt(long, default_value = "10")]
    page_size: u32,

    #[structopt(long, default_value = "168")]
    session_ttl_hours: i64,

    /// Keep only this many ids per thread listing and comment listing
    #[structopt(long)]
    max_discard_per_key: Option<usize>,
}

fn parse_sections(names: &[String]) -> anyhow::Result<Vec<SectionName>> {
    if names.is_empty() {
        return Err(anyhow!("at least one section must be configured"));
    }
    let mut sections = Vec::with_capacity(names.len());
    for name in names {
        let section = SectionName::from(name.as_str());
        section
            .validate()
            .with_context(|| format!("validating section name {name:?}"))?;
        if name.contains('/') || RESERVED_SECTIONS.contains(&name.as_str()) {
            return Err(anyhow!("section name {name:?} would shadow another route"));
        }
        if sections.contains(&section) {
            return Err(anyhow!("section {name:?} is configured twice"));
        }
        sections.push(section);
    }
    Ok(sections)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let settings = Settings {
        sections: parse_sections(&opt.sections)?,
        page_size: opt.page_size,
        max_discard_per_key: opt.max_discard_per_key,
    };
    let content = HttpContent::new(&opt.content_url).context("configuring content service")?;
    let sessions = MemorySessions::new(chrono::Duration::hours(opt.session_ttl_hours));

    tokio::spawn({
        let sessions = sessions.clone();
        async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
            loop {
                interval.tick().await;
                let purged = sessions.purge_expired().await;
                tracing::debug!(purged, "purged expired sessions");
            }
        }
    });

    let app = app(AppState {
        sessions: Arc::new(sessions),
        content: Arc::new(content),
        settings: Arc::new(settings),
    });

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/recyclefeed", get(handlers::recycle_feed))
        .route("/recycleactivity", get(handlers::recycle_activity))
        .route("/recyclesaved", get(handlers::recycle_saved))
        .route("/explore/recycle", get(handlers::recycle_explore))
        .route("/profile/recycle", get(handlers::recycle_profile))
        .route("/logout", get(handlers::logout))
        .route("/:section/recycle", get(handlers::recycle_section))
        .route("/:section/:thread/recycle", get(handlers::recycle_comments))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
