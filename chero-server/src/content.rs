use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chero_api::{ContentService, Page, RecycleRequest, UserId};
use reqwest::Url;

/// Content service reached over HTTP
pub struct HttpContent {
    client: reqwest::Client,
    base: Url,
}

impl HttpContent {
    pub fn new(base: &str) -> anyhow::Result<HttpContent> {
        let base = Url::parse(base).with_context(|| format!("parsing url {base:?}"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("url {base} cannot be used as a base"));
        }
        Ok(HttpContent {
            client: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("url {} cannot be used as a base", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ContentService for HttpContent {
    async fn recycle(&self, req: &RecycleRequest) -> anyhow::Result<Page> {
        self.client
            .post(self.endpoint(&["recycle"])?)
            .json(req)
            .send()
            .await
            .context("sending recycle request")?
            .error_for_status()
            .context("content service rejected recycle request")?
            .json()
            .await
            .context("parsing recycled page")
    }

    async fn following(&self, user: &UserId) -> anyhow::Result<Vec<UserId>> {
        self.client
            .get(self.endpoint(&["users", user.as_str(), "following"])?)
            .send()
            .await
            .with_context(|| format!("fetching authors followed by {user}"))?
            .error_for_status()
            .context("content service rejected following request")?
            .json()
            .await
            .context("parsing followed authors")
    }
}
