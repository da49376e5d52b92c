use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chero_api::{
    Activity, ActivityCtx, Comment, Content, ContentService, Delivered, Page, Recycle,
    RecycleRequest, SectionName, Subcomment, Thread, ThreadId, UserId,
};
use tokio::sync::RwLock;

/// In-memory content backend, returning items in insertion order
pub struct MockContent(RwLock<Catalogue>);

#[derive(Debug, Default)]
struct Catalogue {
    items: Vec<Delivered>,
    saved: HashMap<UserId, Vec<Thread>>,
    following: HashMap<UserId, Vec<UserId>>,
    requests: Vec<RecycleRequest>,
    fail_next: bool,
}

fn excluded_activity(
    discard: &BTreeMap<UserId, ActivityCtx>,
    author: &UserId,
) -> anyhow::Result<Activity> {
    match discard.get(author) {
        None => Ok(Activity::new()),
        Some(ctx) => ctx
            .to_activity()
            .with_context(|| format!("parsing exclusions of author {author}")),
    }
}

fn excluded_thread(discard: &BTreeMap<SectionName, Vec<ThreadId>>, t: &Thread) -> bool {
    discard
        .get(&t.section)
        .map_or(false, |ids| ids.contains(&t.id))
}

impl MockContent {
    pub fn new() -> MockContent {
        MockContent(RwLock::new(Catalogue::default()))
    }

    async fn add(&self, author: UserId, content: Content) {
        self.0.write().await.items.push(Delivered { author, content });
    }

    pub async fn add_thread(&self, author: UserId, t: Thread) {
        self.add(author, Content::Thread(t)).await
    }

    pub async fn add_comment(&self, author: UserId, c: Comment) {
        self.add(author, Content::Comment(c)).await
    }

    pub async fn add_subcomment(&self, author: UserId, s: Subcomment) {
        self.add(author, Content::Subcomment(s)).await
    }

    pub async fn save_thread(&self, user: UserId, t: Thread) {
        self.0.write().await.saved.entry(user).or_default().push(t);
    }

    pub async fn follow(&self, user: UserId, author: UserId) {
        self.0
            .write()
            .await
            .following
            .entry(user)
            .or_default()
            .push(author);
    }

    /// Makes the next `recycle` call fail, as an unreachable backend would
    pub async fn fail_next_recycle(&self) {
        self.0.write().await.fail_next = true;
    }

    /// Return all the requests received so far
    pub async fn test_requests(&self) -> Vec<RecycleRequest> {
        self.0.read().await.requests.clone()
    }

    fn candidates(c: &Catalogue, recycle: &Recycle) -> anyhow::Result<Vec<Delivered>> {
        let mut res = Vec::new();
        match recycle {
            Recycle::UserActivity { user, discard } => {
                let excluded = excluded_activity(discard, user)?;
                res.extend(
                    c.items
                        .iter()
                        .filter(|d| d.author == *user && !excluded.contains(&d.content))
                        .cloned(),
                );
            }
            Recycle::FeedActivity { user, discard } => {
                let authors = c.following.get(user).map_or(&[][..], Vec::as_slice);
                let mut excluded = HashMap::new();
                for a in authors {
                    excluded.insert(a, excluded_activity(discard, a)?);
                }
                res.extend(
                    c.items
                        .iter()
                        .filter(|d| {
                            excluded
                                .get(&d.author)
                                .map_or(false, |ex| !ex.contains(&d.content))
                        })
                        .cloned(),
                );
            }
            Recycle::ThreadsSaved { user, discard } => {
                for t in c.saved.get(user).map_or(&[][..], Vec::as_slice) {
                    if excluded_thread(discard, t) {
                        continue;
                    }
                    let item = c
                        .items
                        .iter()
                        .find(|d| d.content == Content::Thread(t.clone()))
                        .ok_or_else(|| anyhow!("saved thread {t:?} does not exist"))?;
                    res.push(item.clone());
                }
            }
            Recycle::SectionThreads { section, discard } => res.extend(
                c.items
                    .iter()
                    .filter(|d| match &d.content {
                        Content::Thread(t) => t.section == *section && !discard.contains(&t.id),
                        _ => false,
                    })
                    .cloned(),
            ),
            Recycle::GeneralThreads { discard } => res.extend(
                c.items
                    .iter()
                    .filter(|d| match &d.content {
                        Content::Thread(t) => !excluded_thread(discard, t),
                        _ => false,
                    })
                    .cloned(),
            ),
            Recycle::ThreadComments { thread, discard } => res.extend(
                c.items
                    .iter()
                    .filter(|d| match &d.content {
                        Content::Comment(cm) => cm.thread == *thread && !discard.contains(&cm.id),
                        _ => false,
                    })
                    .cloned(),
            ),
        }
        Ok(res)
    }
}

#[async_trait]
impl ContentService for MockContent {
    async fn recycle(&self, req: &RecycleRequest) -> anyhow::Result<Page> {
        let mut c = self.0.write().await;
        c.requests.push(req.clone());
        if std::mem::take(&mut c.fail_next) {
            return Err(anyhow!("content service unavailable"));
        }
        let mut items = MockContent::candidates(&c, &req.recycle)?;
        items.truncate(req.page_size as usize);
        Ok(Page { items })
    }

    async fn following(&self, user: &UserId) -> anyhow::Result<Vec<UserId>> {
        Ok(self
            .0
            .read()
            .await
            .following
            .get(user)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chero_api::ThreadCtx;

    use super::*;

    fn u(id: &str) -> UserId {
        UserId::from(id)
    }

    fn section_req(discard: Vec<ThreadId>, page_size: u32) -> RecycleRequest {
        RecycleRequest {
            recycle: Recycle::SectionThreads {
                section: SectionName::from("news"),
                discard,
            },
            page_size,
        }
    }

    #[tokio::test]
    async fn skips_excluded_threads() {
        let mock = MockContent::new();
        for id in ["t1", "t2", "t3"] {
            mock.add_thread(u("a"), Thread::new("news", id).unwrap())
                .await;
        }
        mock.add_thread(u("a"), Thread::new("sports", "t4").unwrap())
            .await;
        let page = mock
            .recycle(&section_req(vec![ThreadId::from("t1")], 10))
            .await
            .unwrap();
        let ids = page
            .items
            .iter()
            .map(|d| match &d.content {
                Content::Thread(t) => t.id.as_str(),
                _ => panic!("got non-thread item"),
            })
            .collect::<Vec<_>>();
        assert_eq!(ids, ["t2", "t3"]);

        let page = mock.recycle(&section_req(Vec::new(), 1)).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn rejects_malformed_exclusions() {
        let mock = MockContent::new();
        let mut discard = BTreeMap::new();
        discard.insert(
            u("a"),
            ActivityCtx {
                threads_created: vec![ThreadCtx::from(&Thread::new("news", "t1").unwrap())],
                comments: Vec::new(),
                subcomments: Vec::new(),
            },
        );
        discard.get_mut(&u("a")).unwrap().threads_created[0]
            .section_ctx
            .name = SectionName::from("");
        let res = mock
            .recycle(&RecycleRequest {
                recycle: Recycle::UserActivity {
                    user: u("a"),
                    discard,
                },
                page_size: 10,
            })
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn failure_is_one_shot() {
        let mock = MockContent::new();
        mock.fail_next_recycle().await;
        assert!(mock.recycle(&section_req(Vec::new(), 10)).await.is_err());
        assert!(mock.recycle(&section_req(Vec::new(), 10)).await.is_ok());
        assert_eq!(mock.test_requests().await.len(), 2);
    }
}
