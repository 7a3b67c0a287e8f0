//! Anime search library backed by the Jikan API.
//!
//! This library provides the request lifecycle behind an anime search front
//! end: debounced query input, single-flight requests with retry and backoff,
//! and an observable application state store.

pub mod api;
pub mod debounce;
pub mod gateway;
pub mod retry;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{AnimeApi, ApiError, JikanClient, SearchPage};
pub use debounce::Debouncer;
pub use gateway::RequestGateway;
pub use retry::RetryPolicy;
pub use session::SearchSession;
pub use store::{AnimeState, AnimeStore, DetailView, RequestStatus, SearchView};
