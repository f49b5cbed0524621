use std::collections::HashSet;

use super::models::{FeedPage, MediaItem};

/// A page fetch the cursor has handed out. The app executes it and feeds the
/// result back with the same request value, so responses that raced a
/// search-term reset can be recognized and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub search: String,
}

/// Client-side aggregate over the paginated feed.
///
/// Accumulates items in first-seen order across pages, deduplicated by id
/// with a set-backed membership check. At most one fetch is outstanding at a
/// time; `load_more` and `initial_request` both gate on the loading flag.
#[derive(Debug)]
pub struct FeedCursor {
    items: Vec<MediaItem>,
    seen: HashSet<String>,
    page: u32,
    per_page: u32,
    search: String,
    has_more: bool,
    loading: bool,
    initial_loaded: bool,
    error: Option<String>,
}

impl FeedCursor {
    pub fn new(per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            page: 1,
            per_page: per_page.max(1),
            search: String::new(),
            has_more: true,
            loading: false,
            initial_loaded: false,
            error: None,
        }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True only while the very first page (of the current search term) is
    /// outstanding; the UI shows the blocking spinner for this case alone.
    pub fn is_initial_loading(&self) -> bool {
        self.loading && !self.initial_loaded
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    /// Error from the initial load, if any. Background page failures are not
    /// recorded here; they only show up in the logs.
    pub fn initial_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn request_for(&self, page: u32) -> PageRequest {
        PageRequest {
            page,
            per_page: self.per_page,
            search: self.search.clone(),
        }
    }

    /// Begin (or retry) the initial page-1 load.
    pub fn initial_request(&mut self) -> Option<PageRequest> {
        if self.loading {
            return None;
        }
        self.loading = true;
        self.error = None;
        Some(self.request_for(1))
    }

    /// Advance to the next page if eligible: more pages exist, nothing is in
    /// flight, and the initial load has completed.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if !self.has_more || self.loading || !self.initial_loaded {
            return None;
        }
        self.loading = true;
        self.page += 1;
        Some(self.request_for(self.page))
    }

    /// Merge a fetched page. Responses for a stale search term are discarded
    /// outright; page 1 replaces the accumulated list, later pages append
    /// only unseen ids.
    pub fn apply_page(&mut self, request: &PageRequest, page: FeedPage) {
        if request.search != self.search {
            tracing::debug!(
                stale = %request.search,
                live = %self.search,
                "discarding feed page for stale search term"
            );
            return;
        }

        if request.page == 1 {
            self.items = page.data;
            self.seen = self.items.iter().map(|m| m.id.clone()).collect();
        } else {
            for item in page.data {
                if self.seen.insert(item.id.clone()) {
                    self.items.push(item);
                }
            }
        }

        self.page = page.meta.current_page;
        self.has_more = page.meta.current_page < page.meta.last_page;
        self.loading = false;
        self.initial_loaded = true;
        self.error = None;
    }

    /// A page fetch failed. Accumulated items are left untouched; the page
    /// pointer is rolled back so the caller may retry `load_more`.
    pub fn fetch_failed(&mut self, request: &PageRequest, error: impl Into<String>) {
        if request.search != self.search {
            return;
        }
        self.loading = false;
        if request.page > 1 {
            self.page = self.page.saturating_sub(1).max(1);
        } else if !self.initial_loaded {
            self.error = Some(error.into());
        }
    }

    /// Change the active search term, resetting all accumulated state and
    /// handing out the fresh page-1 request. No-op for an unchanged term.
    pub fn set_search(&mut self, term: impl Into<String>) -> Option<PageRequest> {
        let term = term.into();
        if term == self.search {
            return None;
        }
        self.search = term;
        self.items.clear();
        self.seen.clear();
        self.page = 1;
        self.has_more = true;
        self.loading = true;
        self.initial_loaded = false;
        self.error = None;
        Some(self.request_for(1))
    }

    /// Patch the in-memory item after a watch was recorded elsewhere. The
    /// network call belongs to the watch session, not the cursor.
    pub fn mark_watched(&mut self, media_id: &str) {
        if let Some(item) = self.items.iter_mut().find(|m| m.id == media_id) {
            item.has_watched = true;
        }
    }
}
