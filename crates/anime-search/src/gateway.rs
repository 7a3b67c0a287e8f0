//! Single-flight request gateway.
//!
//! Each concern (search, detail) has one slot holding the abort signal of its
//! outstanding call. Starting a call replaces the slot, and dropping the old
//! sender resolves the old call's signal, so the superseded call finishes with
//! `ApiError::Cancelled` and its HTTP future is dropped.
//!
//! Calls may carry a generation number. A slot remembers the highest
//! generation it has seen and refuses calls from older generations, so a late
//! retry of a superseded fetch cannot cancel the call that replaced it.

use crate::api::{AnimeApi, ApiError, SearchPage};
use shared::DetailRecord;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug)]
struct Flight {
    concern: &'static str,
    slot: Mutex<FlightSlot>,
}

#[derive(Debug)]
struct Outstanding {
    id: u64,
    generation: u64,
    /// Dropping this resolves the call's abort signal
    _abort: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct FlightSlot {
    next_id: u64,
    /// Highest generation seen; older calls are refused
    generation: u64,
    current: Option<Outstanding>,
}

impl Flight {
    fn new(concern: &'static str) -> Self {
        Self {
            concern,
            slot: Mutex::new(FlightSlot::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlightSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new call, cancelling the outstanding one
    ///
    /// Returns `None` when `generation` is older than one already seen.
    fn begin(&self, generation: Option<u64>) -> Option<(u64, oneshot::Receiver<()>)> {
        let mut slot = self.lock();

        let generation = match generation {
            Some(generation) if generation < slot.generation => {
                debug!(
                    concern = self.concern,
                    generation = generation,
                    current = slot.generation,
                    "Refusing request from superseded generation"
                );
                return None;
            }
            Some(generation) => generation,
            None => slot.generation,
        };

        let (tx, rx) = oneshot::channel();
        slot.generation = generation;
        slot.next_id += 1;
        let id = slot.next_id;

        let outstanding = Outstanding {
            id,
            generation,
            _abort: tx,
        };
        if let Some(previous) = slot.current.replace(outstanding) {
            debug!(concern = self.concern, superseded = previous.id, "Cancelling in-flight request");
        }

        Some((id, rx))
    }

    /// Clear the slot if it still belongs to call `id`
    fn finish(&self, id: u64) {
        let mut slot = self.lock();
        if slot.current.as_ref().is_some_and(|current| current.id == id) {
            slot.current = None;
        }
    }

    fn cancel(&self) -> bool {
        let cancelled = self.lock().current.take();
        if let Some(outstanding) = &cancelled {
            debug!(concern = self.concern, cancelled = outstanding.id, "Cancelling in-flight request");
        }
        cancelled.is_some()
    }

    /// Cancel the outstanding call if it is older than `generation`, and
    /// refuse older calls from now on
    fn cancel_before(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        slot.generation = slot.generation.max(generation);

        if !slot.current.as_ref().is_some_and(|current| current.generation < generation) {
            return false;
        }
        if let Some(outstanding) = slot.current.take() {
            debug!(concern = self.concern, cancelled = outstanding.id, "Cancelling in-flight request");
        }
        true
    }

    fn in_flight(&self) -> bool {
        self.lock().current.is_some()
    }

    async fn run<T, Fut>(&self, generation: Option<u64>, call: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let Some((id, mut abort)) = self.begin(generation) else {
            return Err(ApiError::Cancelled);
        };

        let result = tokio::select! {
            biased;
            _ = &mut abort => Err(ApiError::Cancelled),
            result = call => result,
        };

        self.finish(id);
        result
    }
}

/// Issues API calls with at most one call in flight per concern
#[derive(Debug)]
pub struct RequestGateway<A> {
    api: A,
    search: Flight,
    detail: Flight,
}

impl<A: AnimeApi> RequestGateway<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            search: Flight::new("search"),
            detail: Flight::new("detail"),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Search, superseding any outstanding search
    pub async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ApiError> {
        self.search.run(None, self.api.search(query, page)).await
    }

    /// Search on behalf of `generation`
    ///
    /// Supersedes calls from the same or older generations. Resolves
    /// `Cancelled` without calling the API if a newer generation has already
    /// started.
    pub async fn search_generation(
        &self,
        generation: u64,
        query: &str,
        page: u32,
    ) -> Result<SearchPage, ApiError> {
        self.search.run(Some(generation), self.api.search(query, page)).await
    }

    /// Fetch one record, superseding any outstanding detail fetch
    pub async fn get_by_id(&self, id: u32) -> Result<DetailRecord, ApiError> {
        self.detail.run(None, self.api.get_by_id(id)).await
    }

    /// Fetch one record on behalf of `generation`
    pub async fn get_by_id_generation(&self, generation: u64, id: u32) -> Result<DetailRecord, ApiError> {
        self.detail.run(Some(generation), self.api.get_by_id(id)).await
    }

    /// Cancel the outstanding search, if any
    pub fn cancel_search(&self) -> bool {
        self.search.cancel()
    }

    /// Cancel an outstanding search older than `generation` and refuse
    /// older searches afterwards
    pub fn cancel_search_before(&self, generation: u64) -> bool {
        self.search.cancel_before(generation)
    }

    /// Cancel the outstanding detail fetch, if any
    pub fn cancel_detail(&self) -> bool {
        self.detail.cancel()
    }

    pub fn search_in_flight(&self) -> bool {
        self.search.in_flight()
    }

    pub fn detail_in_flight(&self) -> bool {
        self.detail.in_flight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{detail, network_error, search_page, FakeApi};
    use std::sync::Arc;
    use std::time::Duration;

    fn gateway() -> Arc<RequestGateway<FakeApi>> {
        Arc::new(RequestGateway::new(FakeApi::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_search_cancels_first() {
        let gateway = gateway();
        gateway.api().push_search(Duration::from_secs(2), Ok(search_page("first", 3, 1, 1, false)));
        gateway.api().push_search(Duration::from_millis(100), Ok(search_page("second", 2, 1, 1, false)));

        let first = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.search("first", 1).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(gateway.search_in_flight());

        let second = gateway.search("second", 1).await.unwrap();
        assert_eq!(second.items.len(), 2);

        let first = first.await.unwrap();
        assert!(matches!(first, Err(ApiError::Cancelled)));
        assert!(!gateway.search_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concerns_are_independent() {
        let gateway = gateway();
        gateway.api().push_detail(Duration::from_secs(1), Ok(detail(20, "Naruto")));

        let pending_detail = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.get_by_id(20).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        gateway.search("bebop", 1).await.unwrap();

        let record = pending_detail.await.unwrap().unwrap();
        assert_eq!(record.mal_id(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_search() {
        let gateway = gateway();
        assert!(!gateway.cancel_search());

        gateway.api().push_search(Duration::from_secs(1), Ok(search_page("slow", 1, 1, 1, false)));
        let pending = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.search("slow", 1).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(gateway.cancel_search());
        let result = pending.await.unwrap();
        assert!(result.unwrap_err().is_cancelled());
        assert!(!gateway.detail_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_call_leaves_slot_empty() {
        let gateway = gateway();
        gateway.api().push_search(Duration::from_millis(10), Err(network_error()));

        let err = gateway.search("naruto", 1).await.unwrap_err();
        assert!(!err.is_cancelled());
        assert!(!gateway.search_in_flight());

        // A later call is not affected by the finished one
        let page = gateway.search("naruto", 2).await.unwrap();
        assert_eq!(page.pagination.current_page, 2);
        assert!(!gateway.cancel_search());
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_generation_cannot_supersede_newer() {
        let gateway = gateway();
        gateway.api().push_search(Duration::from_millis(500), Ok(search_page("newer", 4, 1, 1, false)));

        let newer = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.search_generation(2, "newer", 1).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let stale = gateway.search_generation(1, "stale", 1).await;
        assert!(stale.unwrap_err().is_cancelled());

        let page = newer.await.unwrap().unwrap();
        assert_eq!(page.items.len(), 4);
        // The refused call never reached the API
        assert_eq!(gateway.api().search_calls(), vec![("newer".to_string(), 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_generation_retry_replaces_call() {
        let gateway = gateway();
        gateway.api().push_search(Duration::from_secs(1), Ok(search_page("first", 1, 1, 1, false)));
        gateway.api().push_search(Duration::ZERO, Ok(search_page("again", 2, 1, 1, false)));

        let first = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.search_generation(3, "naruto", 1).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let again = gateway.search_generation(3, "naruto", 1).await.unwrap();
        assert_eq!(again.items.len(), 2);
        assert!(first.await.unwrap().unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_spares_newer_call() {
        let gateway = gateway();
        gateway.api().push_search(Duration::from_millis(200), Ok(search_page("newer", 1, 1, 1, false)));

        let newer = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.search_generation(5, "newer", 1).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!gateway.cancel_search_before(4));
        assert!(newer.await.unwrap().is_ok());

        assert!(gateway
            .search_generation(4, "older", 1)
            .await
            .unwrap_err()
            .is_cancelled());
    }
}
