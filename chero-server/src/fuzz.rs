#![cfg(test)]

use std::{collections::HashSet, panic::AssertUnwindSafe, sync::Arc};

use axum::{
    body::Body,
    http::{self, request, StatusCode},
    Router,
};
use chero_api::{
    Comment, Content, Error as ApiError, Page, Recycle, SectionName, SessionId, SessionStore,
    Subcomment, Thread, ThreadId, UserId, Uuid,
};
use chero_mock_server::MockContent;
use tower::{Service, ServiceExt};

use crate::{extractors::SESSION_COOKIE, *};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

struct Site {
    app: Router,
    content: Arc<MockContent>,
    sessions: MemorySessions,
}

impl Site {
    fn new(page_size: u32, max_discard_per_key: Option<usize>) -> Site {
        let content = Arc::new(MockContent::new());
        let sessions = MemorySessions::new(chrono::Duration::hours(1));
        let app = app(AppState {
            sessions: Arc::new(sessions.clone()),
            content: content.clone(),
            settings: Arc::new(Settings {
                sections: vec!["news".into(), "sports".into()],
                page_size,
                max_discard_per_key,
            }),
        });
        Site {
            app,
            content,
            sessions,
        }
    }

    async fn login(&self, viewer: &str) -> SessionId {
        self.sessions
            .create(Some(UserId::from(viewer)))
            .await
            .expect("creating logged-in session")
    }

    /// Returns the page, along with the session cookie the server set if any
    async fn get(
        &mut self,
        uri: &str,
        session: Option<SessionId>,
    ) -> (Result<Page, ApiError>, Option<SessionId>) {
        let req = request::Builder::new().method("GET").uri(uri);
        let req = match session {
            Some(id) => req.header(http::header::COOKIE, format!("{SESSION_COOKIE}={}", id.0)),
            None => req,
        };
        let req = req.body(Body::empty()).expect("building request");

        self.app.ready().await.expect("waiting for app to be ready");
        let resp = self.app.call(req).await.expect("running request");
        let status = resp.status();
        let cookie = resp
            .headers()
            .get(http::header::SET_COOKIE)
            .map(|v| parse_set_cookie(v.to_str().expect("non-ascii set-cookie")));
        let body = hyper::body::to_bytes(resp.into_body())
            .await
            .expect("recovering resp bytes");
        if status == StatusCode::OK {
            if body.is_empty() {
                // logout answers nothing
                return (Ok(Page::default()), cookie);
            }
            let page = serde_json::from_slice(&body)
                .unwrap_or_else(|err| panic!("failed parsing page {err}, body is {body:?}"));
            return (Ok(page), cookie);
        }
        let err = ApiError::parse(&body)
            .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}"));
        assert_eq!(status, err.status_code(), "status code of {err:?}");
        (Err(err), cookie)
    }

    async fn last_request(&self) -> Recycle {
        self.content
            .test_requests()
            .await
            .pop()
            .expect("content service was not called")
            .recycle
    }
}

fn parse_set_cookie(value: &str) -> SessionId {
    let pair = value.split(';').next().unwrap_or_default();
    let (name, id) = pair.split_once('=').expect("cookie without value");
    assert_eq!(name, SESSION_COOKIE);
    SessionId(Uuid::try_parse(id).expect("session id is not a uuid"))
}

fn ids(page: &Page) -> Vec<&str> {
    page.items
        .iter()
        .map(|d| match &d.content {
            Content::Thread(t) => t.id.as_str(),
            Content::Comment(c) => c.id.as_str(),
            Content::Subcomment(s) => s.id.as_str(),
        })
        .collect()
}

fn thread(section: &str, id: &str) -> Thread {
    Thread::new(section, id).unwrap()
}

#[tokio::test]
async fn anonymous_section_browsing_never_repeats() {
    let mut site = Site::new(2, None);
    for id in ["t1", "t2", "t3", "t4", "t5"] {
        site.content
            .add_thread(UserId::from("a"), thread("news", id))
            .await;
    }
    site.content
        .add_thread(UserId::from("a"), thread("sports", "t6"))
        .await;

    let (page, cookie) = site.get("/news/recycle", None).await;
    assert_eq!(ids(&page.unwrap()), ["t1", "t2"]);
    let session = cookie.expect("anonymous session was not started");

    let (page, cookie) = site.get("/news/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["t3", "t4"]);
    assert_eq!(cookie, None);
    assert_eq!(
        site.last_request().await,
        Recycle::SectionThreads {
            section: "news".into(),
            discard: vec![ThreadId::from("t1"), ThreadId::from("t2")],
        }
    );

    let (page, _) = site.get("/news/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["t5"]);
    let (page, _) = site.get("/news/recycle", Some(session)).await;
    assert!(page.unwrap().items.is_empty());

    // other sections and other sessions start from scratch
    let (page, _) = site.get("/sports/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["t6"]);
    let (page, _) = site.get("/news/recycle", None).await;
    assert_eq!(ids(&page.unwrap()), ["t1", "t2"]);
}

#[tokio::test]
async fn unknown_session_cookie_starts_a_fresh_session() {
    let mut site = Site::new(10, None);
    let stale = SessionId::random();
    let (page, cookie) = site.get("/explore/recycle", Some(stale)).await;
    assert!(page.unwrap().items.is_empty());
    let fresh = cookie.expect("no new session cookie");
    assert_ne!(fresh, stale);
}

#[tokio::test]
async fn unknown_sections_are_not_found() {
    let mut site = Site::new(10, None);
    let (res, cookie) = site.get("/cooking/recycle", None).await;
    assert_eq!(res, Err(ApiError::NoSuchSection(String::from("cooking"))));
    assert_eq!(cookie, None);
    let (res, cookie) = site.get("/cooking/t1/recycle", None).await;
    assert_eq!(res, Err(ApiError::NoSuchSection(String::from("cooking"))));
    assert_eq!(cookie, None);
    assert!(site.content.test_requests().await.is_empty());
    assert_eq!(site.sessions.test_len().await, 0);
}

#[tokio::test]
async fn rejected_requests_store_no_session() {
    let mut site = Site::new(10, None);
    let (res, cookie) = site.get("/news/t%00/recycle", None).await;
    assert_eq!(res, Err(ApiError::NullByteInString(String::from("t\0"))));
    assert_eq!(cookie, None);
    let (res, cookie) = site.get("/profile/recycle?userid=", None).await;
    assert_eq!(res, Err(ApiError::EmptyIdentifier(String::from("user"))));
    assert_eq!(cookie, None);

    site.content.fail_next_recycle().await;
    let (res, cookie) = site.get("/news/recycle", None).await;
    assert!(matches!(res, Err(ApiError::Unknown(_))));
    assert_eq!(cookie, None);
    assert_eq!(site.sessions.test_len().await, 0);

    // only a recycled page starts a session
    let (res, cookie) = site.get("/news/recycle", None).await;
    assert!(res.unwrap().items.is_empty());
    assert!(cookie.is_some());
    assert_eq!(site.sessions.test_len().await, 1);
}

#[tokio::test]
async fn viewer_routes_need_a_logged_in_session() {
    let mut site = Site::new(10, None);
    let anonymous = site.sessions.create(None).await.unwrap();
    for uri in ["/recyclefeed", "/recycleactivity", "/recyclesaved", "/logout"] {
        let (res, cookie) = site.get(uri, None).await;
        assert_eq!(res, Err(ApiError::PermissionDenied), "{uri} without session");
        assert_eq!(cookie, None);
        let (res, _) = site.get(uri, Some(anonymous)).await;
        assert_eq!(res, Err(ApiError::PermissionDenied), "{uri} when anonymous");
    }
    assert!(site.content.test_requests().await.is_empty());
}

#[tokio::test]
async fn feed_exclusions_are_grouped_by_author() {
    let mut site = Site::new(10, None);
    let viewer = site.login("viewer").await;
    let (alice, bob) = (UserId::from("alice"), UserId::from("bob"));
    site.content.follow("viewer".into(), alice.clone()).await;
    site.content.follow("viewer".into(), bob.clone()).await;
    let t1 = thread("news", "t1");
    let c1 = Comment::new(t1.clone(), "c1").unwrap();
    site.content.add_thread(alice.clone(), t1.clone()).await;
    site.content.add_comment(bob.clone(), c1.clone()).await;
    site.content
        .add_subcomment(alice.clone(), Subcomment::new(c1, "s1").unwrap())
        .await;
    site.content
        .add_thread("mallory".into(), thread("news", "t2"))
        .await;

    let (page, cookie) = site.get("/recyclefeed", Some(viewer)).await;
    assert_eq!(ids(&page.unwrap()), ["t1", "c1", "s1"]);
    assert_eq!(cookie, None);

    let (page, _) = site.get("/recyclefeed", Some(viewer)).await;
    assert!(page.unwrap().items.is_empty());
    let Recycle::FeedActivity { user, discard } = site.last_request().await else {
        panic!("feed recycled another view");
    };
    assert_eq!(user, UserId::from("viewer"));
    assert_eq!(discard.len(), 2);
    assert_eq!(discard[&alice].threads_created.len(), 1);
    assert_eq!(discard[&alice].subcomments.len(), 1);
    assert_eq!(discard[&bob].comments.len(), 1);

    // the viewer's own activity is tracked separately from the feed
    let (page, _) = site.get("/recycleactivity", Some(viewer)).await;
    assert!(page.unwrap().items.is_empty());
    let Recycle::UserActivity { discard, .. } = site.last_request().await else {
        panic!("activity recycled another view");
    };
    assert!(discard[&UserId::from("viewer")].is_empty());
}

#[tokio::test]
async fn malformed_feed_author_keeps_other_exclusions() {
    let mut site = Site::new(10, None);
    let viewer = site.login("viewer").await;
    site.content.follow("viewer".into(), "".into()).await;
    site.content.follow("viewer".into(), "alice".into()).await;
    site.content
        .add_thread("alice".into(), thread("news", "t1"))
        .await;

    let (page, _) = site.get("/recyclefeed", Some(viewer)).await;
    assert_eq!(ids(&page.unwrap()), ["t1"]);
    let (page, _) = site.get("/recyclefeed", Some(viewer)).await;
    assert!(page.unwrap().items.is_empty());
    let Recycle::FeedActivity { discard, .. } = site.last_request().await else {
        panic!("feed recycled another view");
    };
    assert_eq!(discard.len(), 1);
    assert_eq!(discard[&UserId::from("alice")].threads_created.len(), 1);
}

#[tokio::test]
async fn profiles_page_through_the_profiled_user() {
    let mut site = Site::new(1, None);
    site.content
        .add_thread("alice".into(), thread("news", "t1"))
        .await;
    site.content
        .add_thread("alice".into(), thread("sports", "t2"))
        .await;
    site.content
        .add_thread("bob".into(), thread("news", "t3"))
        .await;

    let (page, cookie) = site.get("/profile/recycle?userid=alice", None).await;
    assert_eq!(ids(&page.unwrap()), ["t1"]);
    let session = cookie.unwrap();
    let (page, _) = site.get("/profile/recycle?userid=alice", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["t2"]);
    let (page, _) = site.get("/profile/recycle?userid=bob", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["t3"]);

    let (res, _) = site.get("/profile/recycle?userid=", Some(session)).await;
    assert_eq!(res, Err(ApiError::EmptyIdentifier(String::from("user"))));
}

#[tokio::test]
async fn saved_threads_span_every_section() {
    let mut site = Site::new(10, None);
    let viewer = site.login("viewer").await;
    for (section, id) in [("news", "t1"), ("sports", "t2"), ("news", "t3")] {
        site.content
            .add_thread("a".into(), thread(section, id))
            .await;
    }
    site.content
        .save_thread("viewer".into(), thread("sports", "t2"))
        .await;
    site.content
        .save_thread("viewer".into(), thread("news", "t3"))
        .await;

    let (page, _) = site.get("/recyclesaved", Some(viewer)).await;
    assert_eq!(ids(&page.unwrap()), ["t2", "t3"]);
    let (page, _) = site.get("/recyclesaved", Some(viewer)).await;
    assert!(page.unwrap().items.is_empty());
    let Recycle::ThreadsSaved { discard, .. } = site.last_request().await else {
        panic!("saved recycled another view");
    };
    assert_eq!(discard[&SectionName::from("news")], vec![ThreadId::from("t3")]);
    assert_eq!(discard[&SectionName::from("sports")], vec![ThreadId::from("t2")]);
}

#[tokio::test]
async fn thread_comments_are_paged() {
    let mut site = Site::new(2, None);
    let t1 = thread("news", "t1");
    for id in ["c1", "c2", "c3"] {
        site.content
            .add_comment("a".into(), Comment::new(t1.clone(), id).unwrap())
            .await;
    }
    site.content
        .add_comment("a".into(), Comment::new(thread("news", "t2"), "c4").unwrap())
        .await;

    let (page, cookie) = site.get("/news/t1/recycle", None).await;
    assert_eq!(ids(&page.unwrap()), ["c1", "c2"]);
    let session = cookie.unwrap();
    let (page, _) = site.get("/news/t1/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["c3"]);
    let (page, _) = site.get("/news/t2/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["c4"]);
}

#[tokio::test]
async fn same_thread_id_in_two_sections_pages_separately() {
    let mut site = Site::new(10, None);
    for section in ["news", "sports"] {
        site.content
            .add_comment("a".into(), Comment::new(thread(section, "t1"), "c1").unwrap())
            .await;
    }

    let (page, cookie) = site.get("/news/t1/recycle", None).await;
    assert_eq!(ids(&page.unwrap()), ["c1"]);
    let session = cookie.unwrap();
    let (page, _) = site.get("/sports/t1/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["c1"]);
    assert_eq!(
        site.last_request().await,
        Recycle::ThreadComments {
            thread: thread("sports", "t1"),
            discard: Vec::new(),
        }
    );
    let (page, _) = site.get("/news/t1/recycle", Some(session)).await;
    assert!(page.unwrap().items.is_empty());
}

#[tokio::test]
async fn failed_recycle_records_nothing() {
    let mut site = Site::new(10, None);
    site.content
        .add_thread("a".into(), thread("news", "t1"))
        .await;
    let session = site.sessions.create(None).await.unwrap();

    site.content.fail_next_recycle().await;
    let (res, _) = site.get("/news/recycle", Some(session)).await;
    assert!(matches!(res, Err(ApiError::Unknown(_))));

    let (page, _) = site.get("/news/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["t1"]);
    assert_eq!(
        site.content.test_requests().await[1].recycle,
        Recycle::SectionThreads {
            section: "news".into(),
            discard: Vec::new(),
        }
    );
}

#[tokio::test]
async fn corrupt_session_state_starts_over() {
    let mut site = Site::new(10, None);
    site.content
        .add_thread("a".into(), thread("news", "t1"))
        .await;
    let session = site.sessions.create(None).await.unwrap();
    site.sessions
        .save(session, b"\xffnot json".to_vec())
        .await
        .unwrap();

    let (page, cookie) = site.get("/news/recycle", Some(session)).await;
    assert_eq!(ids(&page.unwrap()), ["t1"]);
    assert_eq!(cookie, None);
    let (page, _) = site.get("/news/recycle", Some(session)).await;
    assert!(page.unwrap().items.is_empty());
}

#[tokio::test]
async fn logout_drops_discard_sets() {
    let mut site = Site::new(10, None);
    site.content
        .add_thread("a".into(), thread("news", "t1"))
        .await;
    let viewer = site.login("viewer").await;
    let (page, _) = site.get("/news/recycle", Some(viewer)).await;
    assert_eq!(ids(&page.unwrap()), ["t1"]);

    let (res, _) = site.get("/logout", Some(viewer)).await;
    assert_eq!(res, Ok(Page::default()));
    let (res, _) = site.get("/recyclefeed", Some(viewer)).await;
    assert_eq!(res, Err(ApiError::PermissionDenied));

    let (page, cookie) = site.get("/news/recycle", Some(viewer)).await;
    assert_eq!(ids(&page.unwrap()), ["t1"]);
    assert_ne!(cookie, None);
}

#[tokio::test]
async fn bounded_listings_forget_oldest_ids() {
    let mut site = Site::new(1, Some(2));
    for id in ["t1", "t2", "t3", "t4"] {
        site.content
            .add_thread("a".into(), thread("news", id))
            .await;
    }
    let (_, cookie) = site.get("/news/recycle", None).await;
    let session = cookie.unwrap();
    site.get("/news/recycle", Some(session)).await.0.unwrap();
    site.get("/news/recycle", Some(session)).await.0.unwrap();
    let (page, _) = site.get("/news/recycle", Some(session)).await;

    // t1 was evicted, so it comes back
    assert_eq!(ids(&page.unwrap()), ["t1"]);
    assert_eq!(
        site.last_request().await,
        Recycle::SectionThreads {
            section: "news".into(),
            discard: vec![ThreadId::from("t2"), ThreadId::from("t3")],
        }
    );
}

async fn browse_without_repeats(ops: Vec<u8>) {
    let mut site = Site::new(2, None);
    for (section, id) in [
        ("news", "t1"),
        ("sports", "t2"),
        ("news", "t3"),
        ("news", "t4"),
        ("sports", "t5"),
    ] {
        site.content
            .add_thread("a".into(), thread(section, id))
            .await;
    }
    for id in ["c1", "c2", "c3"] {
        site.content
            .add_comment("b".into(), Comment::new(thread("news", "t1"), id).unwrap())
            .await;
    }

    let uris = [
        "/news/recycle",
        "/sports/recycle",
        "/explore/recycle",
        "/news/t1/recycle",
    ];
    let mut seen = vec![HashSet::new(); uris.len()];
    let mut session = None;
    for op in ops {
        let view = op as usize % uris.len();
        let (page, cookie) = site.get(uris[view], session).await;
        session = session.or(cookie);
        for id in ids(&page.unwrap()) {
            assert!(
                seen[view].insert(String::from(id)),
                "{id} delivered twice on {}",
                uris[view]
            );
        }
    }
}

do_tokio_test!(fuzz_browse_without_repeats, Vec<u8>, browse_without_repeats);
