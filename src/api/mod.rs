use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::internal::cache::{PageCache, PageKey};
use crate::internal::models::{FeedPage, MediaItem, WatchOutcome};
use crate::session::SessionStore;

/// Errors from the media catalog backend.
///
/// `SessionExpired` is the structural form of HTTP 401: the token store has
/// already been cleared by the time the caller sees it, and every view must
/// treat the current user as gone.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("session expired")]
    SessionExpired,
    #[error("request to {url} failed with status {status}")]
    Http { status: StatusCode, url: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

const PAGE_CACHE_TTL: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed client for the media catalog service.
///
/// Attaches the bearer token from the session store to every request and
/// raises `ApiError::SessionExpired` (clearing the store) on 401. Feed pages
/// go through a short-TTL cache that the watch flow invalidates.
#[derive(Clone)]
pub struct CatalogService {
    client: Client,
    base_url: String,
    session: SessionStore,
    page_cache: PageCache,
}

impl CatalogService {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            page_cache: PageCache::new(PAGE_CACHE_TTL),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T>(&self, builder: RequestBuilder, url: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let resp = self.authorize(builder).send().await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            return Err(ApiError::Http {
                status,
                url: url.to_string(),
            });
        }

        Ok(resp.json::<T>().await?)
    }

    /// Fetch one page of the feed. `search` and `tags` are optional filters.
    /// Successful pages are cached briefly; `invalidate_feed` flushes them.
    pub async fn get_media(
        &self,
        page: u32,
        per_page: u32,
        search: Option<&str>,
        tags: &[String],
    ) -> ApiResult<FeedPage> {
        let search_key = search.unwrap_or("").to_string();
        let cache_key = PageKey {
            page,
            per_page,
            search: search_key,
        };
        if tags.is_empty() {
            if let Some(cached) = self.page_cache.get(&cache_key) {
                return Ok(cached);
            }
        }

        let mut params: Vec<(String, String)> = vec![
            ("page".to_string(), page.to_string()),
            ("per_page".to_string(), per_page.to_string()),
        ];
        if let Some(s) = search {
            if !s.is_empty() {
                params.push(("search".to_string(), s.to_string()));
            }
        }
        for tag in tags {
            params.push(("tags[]".to_string(), tag.clone()));
        }

        let url = self.url("/media");
        let builder = self.client.get(&url).query(&params);
        let page_data: FeedPage = self.send_json(builder, &url).await?;

        if tags.is_empty() {
            self.page_cache.set(cache_key, page_data.clone());
        }
        Ok(page_data)
    }

    /// Fetch a single media item by id.
    pub async fn get_media_by_id(&self, id: &str) -> ApiResult<MediaItem> {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            data: MediaItem,
        }
        let url = self.url(&format!("/media/{id}"));
        let builder = self.client.get(&url);
        let wrapper: Wrapper = self.send_json(builder, &url).await?;
        Ok(wrapper.data)
    }

    /// Record that `viewer_id` watched `media_id`. The response may carry a
    /// quiz challenge for the viewer to accept.
    pub async fn mark_watched(&self, media_id: &str, viewer_id: &str) -> ApiResult<WatchOutcome> {
        let url = self.url(&format!("/media-watched/{media_id}/{viewer_id}"));
        let builder = self.client.post(&url);
        self.send_json(builder, &url).await
    }

    /// Report a quiz result for the given media item.
    pub async fn submit_quiz_result(&self, is_correct: bool, media_id: &str) -> ApiResult<()> {
        let url = self.url("/quiz/result");
        let body = serde_json::json!({
            "is_correct": is_correct,
            "media_id": media_id,
        });
        let resp = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            return Err(ApiError::Http { status, url });
        }
        Ok(())
    }

    /// Query-cache collaborator hook: flush cached feed pages so every
    /// consumer refetches after a watch-completion.
    pub fn invalidate_feed(&self) {
        self.page_cache.invalidate_all();
    }
}
