//! Application state and its transitions.
//!
//! The store owns the latest search results, pagination, detail record and
//! per-concern request status. State is published on a `watch` channel so a
//! front end can re-render on every transition.
//!
//! Every fetch is tagged with a per-concern sequence number, taken and
//! checked under the state lock. Only the fetch holding the current number
//! may touch state. The number doubles as the gateway generation, so a
//! superseded fetch can neither cancel its replacement nor write its outcome.

use crate::api::{AnimeApi, ApiError};
use crate::gateway::RequestGateway;
use crate::retry::RetryPolicy;
use shared::{DetailRecord, PaginationInfo, SummaryRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Status of one concern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
}

impl RequestStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestStatus::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Snapshot of everything the front end renders
#[derive(Debug, Clone, PartialEq)]
pub struct AnimeState {
    /// Raw input text
    pub query: String,
    /// Last query that settled and was acted upon
    pub settled_query: String,
    /// Page cursor, always >= 1
    pub page: u32,
    pub search_results: Vec<SummaryRecord>,
    pub pagination: PaginationInfo,
    pub search_status: RequestStatus,
    pub current_anime: Option<DetailRecord>,
    pub detail_status: RequestStatus,
}

impl Default for AnimeState {
    fn default() -> Self {
        Self {
            query: String::new(),
            settled_query: String::new(),
            page: 1,
            search_results: Vec::new(),
            pagination: PaginationInfo::default(),
            search_status: RequestStatus::Idle,
            current_anime: None,
            detail_status: RequestStatus::Idle,
        }
    }
}

/// What the search page shows, in precedence order
#[derive(Debug, Clone, PartialEq)]
pub enum SearchView<'a> {
    Error(&'a str),
    /// Nothing typed yet
    Prompt,
    Loading,
    NoResults { query: &'a str },
    Results {
        items: &'a [SummaryRecord],
        page: u32,
        can_prev: bool,
        can_next: bool,
    },
}

/// What the detail page shows
#[derive(Debug, Clone, PartialEq)]
pub enum DetailView<'a> {
    Error(&'a str),
    Loading,
    Loaded(&'a DetailRecord),
}

impl AnimeState {
    pub fn is_loading(&self) -> bool {
        self.search_status.is_loading()
    }

    pub fn is_loading_detail(&self) -> bool {
        self.detail_status.is_loading()
    }

    /// Search error message
    pub fn error(&self) -> Option<&str> {
        self.search_status.error()
    }

    pub fn detail_error(&self) -> Option<&str> {
        self.detail_status.error()
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.has_next_page
    }

    pub fn total_pages(&self) -> u32 {
        self.pagination.last_page
    }

    pub fn search_view(&self) -> SearchView<'_> {
        let loading = self.is_loading();
        let query = self.settled_query.trim();

        if let (Some(message), false) = (self.error(), loading) {
            return SearchView::Error(message);
        }
        if query.is_empty() && !loading {
            return SearchView::Prompt;
        }
        if loading {
            return SearchView::Loading;
        }
        if self.search_results.is_empty() {
            return SearchView::NoResults { query };
        }

        SearchView::Results {
            items: &self.search_results,
            page: self.pagination.current_page,
            can_prev: self.pagination.current_page > 1,
            can_next: self.pagination.has_next_page,
        }
    }

    pub fn detail_view(&self) -> DetailView<'_> {
        if let Some(message) = self.detail_error() {
            return DetailView::Error(message);
        }
        match (&self.current_anime, self.is_loading_detail()) {
            (Some(record), false) => DetailView::Loaded(record),
            _ => DetailView::Loading,
        }
    }
}

struct Inner<A> {
    gateway: RequestGateway<A>,
    retry: RetryPolicy,
    state: watch::Sender<AnimeState>,
    search_seq: AtomicU64,
    detail_seq: AtomicU64,
}

/// Application state store. Cheap to clone; clones share state.
pub struct AnimeStore<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for AnimeStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: AnimeApi> AnimeStore<A> {
    pub fn new(gateway: RequestGateway<A>, retry: RetryPolicy) -> Self {
        let (state, _) = watch::channel(AnimeState::default());
        Self {
            inner: Arc::new(Inner {
                gateway,
                retry,
                state,
                search_seq: AtomicU64::new(0),
                detail_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn gateway(&self) -> &RequestGateway<A> {
        &self.inner.gateway
    }

    /// Receive a notification after every transition
    pub fn subscribe(&self) -> watch::Receiver<AnimeState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> AnimeState {
        self.inner.state.borrow().clone()
    }

    /// Read the current state without cloning it
    pub fn with_state<R>(&self, f: impl FnOnce(&AnimeState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    fn update(&self, f: impl FnOnce(&mut AnimeState)) {
        self.inner.state.send_modify(f);
    }

    /// Record new input text. A changed query resets the page cursor.
    ///
    /// Does not search; the debounced value arrives via `query_settled`.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.state.send_if_modified(|state| {
            if state.query == text {
                return false;
            }
            state.query = text;
            state.page = 1;
            true
        });
    }

    /// Act on a debounced query
    ///
    /// A query that differs from the last settled one always starts at page 1.
    pub async fn query_settled(&self, query: String) {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            self.clear_search_results();
            return;
        }

        let page = self.with_state(|state| {
            if state.settled_query.trim() == trimmed {
                state.page
            } else {
                1
            }
        });
        self.search(trimmed.to_string(), page).await;
    }

    /// Drop results and pagination without calling the API
    pub fn clear_search_results(&self) {
        let inner = &self.inner;
        let mut seq = 0;

        self.update(|state| {
            seq = inner.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
            state.settled_query.clear();
            state.search_results.clear();
            state.page = 1;
            state.pagination = PaginationInfo::default();
            state.search_status = RequestStatus::Idle;
        });
        inner.gateway.cancel_search_before(seq);
        debug!("Search results cleared");
    }

    /// Search `query` at `page`, superseding any search in progress
    pub async fn search(&self, query: String, page: u32) {
        let inner = &self.inner;
        let mut seq = 0;
        let mut input = String::new();

        // Sequence numbers only move under the state lock, so a completion
        // that sees its own number is still the newest when it writes.
        self.update(|state| {
            seq = inner.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
            input = state.query.clone();
            state.settled_query = query.clone();
            state.page = page;
            state.search_status = RequestStatus::Loading;
        });
        info!(query = %query, page = page, "Searching");

        let text = query.as_str();
        let result = inner
            .retry
            .run_classified(
                move || async move {
                    if inner.search_seq.load(Ordering::SeqCst) != seq {
                        return Err(ApiError::Cancelled);
                    }
                    inner.gateway.search_generation(seq, text, page).await
                },
                ApiError::is_retryable,
            )
            .await;

        let applied = inner.state.send_if_modified(|state| {
            if inner.search_seq.load(Ordering::SeqCst) != seq {
                return false;
            }

            match result {
                Ok(found) => {
                    info!(
                        query = %query,
                        results = found.items.len(),
                        page = found.pagination.current_page,
                        last_page = found.pagination.last_page,
                        "Search complete"
                    );
                    // Input typed since dispatch already reset the cursor
                    if state.query == input {
                        state.page = found.pagination.current_page;
                    }
                    state.search_results = found.items;
                    state.pagination = found.pagination;
                    state.search_status = RequestStatus::Idle;
                }
                Err(err) if err.is_cancelled() => {
                    state.search_status = RequestStatus::Idle;
                }
                Err(err) => {
                    warn!(query = %query, error = %err, "Search failed");
                    state.search_status = RequestStatus::Error(err.to_string());
                }
            }
            true
        });

        if !applied {
            debug!(query = %query, page = page, "Dropping outcome of superseded search");
        }
    }

    /// Move the page cursor and re-run the settled query
    ///
    /// Returns false without searching when there is no settled query or
    /// `page` is 0.
    pub async fn go_to_page(&self, page: u32) -> bool {
        let query = self.with_state(|state| state.settled_query.trim().to_string());
        if query.is_empty() || page == 0 {
            debug!(page = page, "Ignoring page change");
            return false;
        }

        self.search(query, page).await;
        true
    }

    /// Next page, if there is one and no search is loading
    pub async fn next_page(&self) -> bool {
        let target = self.with_state(|state| {
            (state.has_next_page() && !state.is_loading()).then_some(state.pagination.current_page + 1)
        });
        match target {
            Some(page) => self.go_to_page(page).await,
            None => false,
        }
    }

    /// Previous page, if not on the first and no search is loading
    pub async fn previous_page(&self) -> bool {
        let target = self.with_state(|state| {
            (state.pagination.current_page > 1 && !state.is_loading())
                .then(|| state.pagination.current_page - 1)
        });
        match target {
            Some(page) => self.go_to_page(page).await,
            None => false,
        }
    }

    /// Load the detail record for `id`, superseding any detail fetch in progress
    ///
    /// The previous record is cleared as soon as the fetch starts, so a failed
    /// fetch never shows another anime's details.
    pub async fn open_detail(&self, id: u32) {
        let inner = &self.inner;
        let mut seq = 0;

        self.update(|state| {
            seq = inner.detail_seq.fetch_add(1, Ordering::SeqCst) + 1;
            state.current_anime = None;
            state.detail_status = RequestStatus::Loading;
        });
        info!(mal_id = id, "Loading anime details");

        let result = inner
            .retry
            .run_classified(
                move || async move {
                    if inner.detail_seq.load(Ordering::SeqCst) != seq {
                        return Err(ApiError::Cancelled);
                    }
                    inner.gateway.get_by_id_generation(seq, id).await
                },
                ApiError::is_retryable,
            )
            .await;

        let applied = inner.state.send_if_modified(|state| {
            if inner.detail_seq.load(Ordering::SeqCst) != seq {
                return false;
            }

            match result {
                Ok(record) => {
                    info!(mal_id = id, title = %record.title(), "Anime details loaded");
                    state.current_anime = Some(record);
                    state.detail_status = RequestStatus::Idle;
                }
                Err(err) if err.is_cancelled() => {
                    state.detail_status = RequestStatus::Idle;
                }
                Err(err) => {
                    warn!(mal_id = id, error = %err, "Detail fetch failed");
                    state.detail_status = RequestStatus::Error(err.to_string());
                }
            }
            true
        });

        if !applied {
            debug!(mal_id = id, "Dropping outcome of superseded detail fetch");
        }
    }

    /// Reset any errored concern to idle
    pub fn clear_error(&self) {
        self.inner.state.send_if_modified(|state| {
            let mut modified = false;
            for status in [&mut state.search_status, &mut state.detail_status] {
                if status.error().is_some() {
                    *status = RequestStatus::Idle;
                    modified = true;
                }
            }
            modified
        });
    }
}
