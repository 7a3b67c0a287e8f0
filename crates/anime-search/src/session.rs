//! Search session: query input → debouncer → store.

use crate::api::AnimeApi;
use crate::debounce::Debouncer;
use crate::store::AnimeStore;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Feeds query text through a debouncer into the store
///
/// Every settled query is handed to the store on its own task, so typing is
/// never blocked on a request. The store takes care of superseding.
pub struct SearchSession<A> {
    store: AnimeStore<A>,
    input: watch::Sender<String>,
    worker: JoinHandle<()>,
}

impl<A: AnimeApi + 'static> SearchSession<A> {
    /// Spawn the debounce worker. Must be called inside a tokio runtime.
    pub fn start(store: AnimeStore<A>, settle: Duration) -> Self {
        let (input, mut debouncer) = Debouncer::channel(String::new(), settle);

        let worker_store = store.clone();
        let worker = tokio::spawn(async move {
            while let Some(query) = debouncer.settled().await {
                debug!(query = %query, "Query settled");
                let store = worker_store.clone();
                tokio::spawn(async move { store.query_settled(query).await });
            }
        });

        Self {
            store,
            input,
            worker,
        }
    }

    pub fn store(&self) -> &AnimeStore<A> {
        &self.store
    }

    /// Record the current input text
    pub fn input(&self, text: &str) {
        self.store.set_query(text);
        self.input.send_replace(text.to_string());
    }
}

impl<A> Drop for SearchSession<A> {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
