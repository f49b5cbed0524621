use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::models::FeedPage;

/// Cache key for one feed query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page: u32,
    pub per_page: u32,
    pub search: String,
}

struct Entry {
    page: FeedPage,
    expires_at: Instant,
}

/// In-memory TTL cache for fetched feed pages.
///
/// This is the client-side copy of feed data the watch flow must invalidate
/// after a watch record, so a refetch observes the new `has_watched` state
/// instead of serving a stale page.
pub struct PageCache {
    entries: Arc<RwLock<HashMap<PageKey, Entry>>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn get(&self, key: &PageKey) -> Option<FeedPage> {
        let entries = self.entries.read().ok()?;
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                tracing::debug!(page = key.page, search = %key.search, "feed cache hit");
                Some(entry.page.clone())
            }
            _ => None,
        }
    }

    pub fn set(&self, key: PageKey, page: FeedPage) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                Entry {
                    page,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
    }

    /// Drop every cached page. Called after a watch-completion so other
    /// consumers of the feed query refetch.
    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let dropped = entries.len();
            entries.clear();
            tracing::debug!(dropped, "feed cache invalidated");
        }
    }
}

impl Clone for PageCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::models::{MediaItem, MediaKind, PageMeta};
    use jiff::Timestamp;
    use std::thread;

    fn page() -> FeedPage {
        FeedPage {
            data: vec![MediaItem {
                id: "m-1".to_string(),
                kind: MediaKind::Image,
                url: "u".to_string(),
                thumbnail: None,
                description: None,
                reward: 0,
                uploader_id: "u-1".to_string(),
                uploader_username: "x".to_string(),
                tags: Vec::new(),
                view_count: 0,
                created_at: Timestamp::UNIX_EPOCH,
                updated_at: Timestamp::UNIX_EPOCH,
                has_watched: false,
                quiz_number: None,
            }],
            meta: PageMeta {
                current_page: 1,
                last_page: 1,
                per_page: 20,
                total: 1,
            },
        }
    }

    fn key(page: u32, search: &str) -> PageKey {
        PageKey {
            page,
            per_page: 20,
            search: search.to_string(),
        }
    }

    #[test]
    fn test_set_and_get() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.set(key(1, ""), page());
        assert!(cache.get(&key(1, "")).is_some());
        assert!(cache.get(&key(2, "")).is_none());
        assert!(cache.get(&key(1, "cats")).is_none());
    }

    #[test]
    fn test_expiry() {
        let cache = PageCache::new(Duration::from_millis(50));
        cache.set(key(1, ""), page());
        assert!(cache.get(&key(1, "")).is_some());
        thread::sleep(Duration::from_millis(80));
        assert!(cache.get(&key(1, "")).is_none());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.set(key(1, ""), page());
        cache.set(key(2, ""), page());
        cache.invalidate_all();
        assert!(cache.get(&key(1, "")).is_none());
        assert!(cache.get(&key(2, "")).is_none());
    }
}
