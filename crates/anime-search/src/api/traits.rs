//! The seam between the request lifecycle and the HTTP client.
//!
//! `JikanClient` implements this against the network; tests implement it with
//! scripted in-memory fakes.

use std::future::Future;

use shared::{DetailRecord, PaginationInfo, SummaryRecord};

use super::error::ApiError;

/// One page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<SummaryRecord>,
    pub pagination: PaginationInfo,
}

/// The two supported API calls
pub trait AnimeApi: Send + Sync {
    /// List anime matching `query`, one page at a time
    fn search(
        &self,
        query: &str,
        page: u32,
    ) -> impl Future<Output = Result<SearchPage, ApiError>> + Send;

    /// Fetch the full record for one anime
    fn get_by_id(&self, id: u32) -> impl Future<Output = Result<DetailRecord, ApiError>> + Send;
}
