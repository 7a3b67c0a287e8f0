//! Jikan API client.
//!
//! Each method issues exactly one HTTP request. Retrying and single-flight
//! cancellation are layered on top by `RetryPolicy` and `RequestGateway`.

use super::error::ApiError;
use super::traits::{AnimeApi, SearchPage};
use super::types::*;
use anyhow::{Context, Result};
use reqwest::{Client, Response};
use shared::config::ApiConfig;
use shared::{DetailRecord, PaginationInfo, SummaryRecord};
use tracing::{debug, warn};

const SEARCH_CONTEXT: &str = "Failed to fetch anime";
const DETAIL_CONTEXT: &str = "Failed to fetch anime details";

/// Jikan API v4 client
#[derive(Debug, Clone)]
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API
    base_url: String,
    /// Results per search page
    page_limit: u32,
}

impl JikanClient {
    /// Create a new Jikan client
    ///
    /// No request timeout is configured; superseding a request is the only
    /// way one ends early.
    pub fn new(base_url: impl Into<String>, page_limit: u32, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_limit,
        })
    }

    /// Create a client from the `[api]` config section
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.page_limit, &config.user_agent)
    }

    /// Check the status and decode a JSON body
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: Response,
        context: &'static str,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string();
            warn!(status = %status, "Request failed");
            return Err(ApiError::Status {
                context,
                status: status.as_u16(),
                reason,
            });
        }

        response.json::<T>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse response");
            ApiError::Decode(e.to_string())
        })
    }
}

impl AnimeApi for JikanClient {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ApiError> {
        let url = format!("{}/anime", self.base_url);
        debug!(url = %url, query = query, page = page, "Making search request");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.to_string()),
                ("page", page.to_string()),
                ("limit", self.page_limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let body: PaginatedResponse<AnimeEntry> = Self::read_json(response, SEARCH_CONTEXT).await?;
        debug!(results = body.data.len(), "Search request successful");

        Ok(SearchPage {
            items: body.data.iter().map(SummaryRecord::from).collect(),
            pagination: PaginationInfo::from(&body.pagination),
        })
    }

    async fn get_by_id(&self, id: u32) -> Result<DetailRecord, ApiError> {
        let url = format!("{}/anime/{}", self.base_url, id);
        debug!(url = %url, mal_id = id, "Making detail request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let body: DataResponse<AnimeEntry> = Self::read_json(response, DETAIL_CONTEXT).await?;
        Ok(DetailRecord::from(body.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn search_body(count: usize) -> String {
        let items: Vec<String> = (1..=count)
            .map(|id| format!(r#"{{"mal_id": {id}, "title": "Naruto {id}", "score": 7.5}}"#))
            .collect();
        format!(
            r#"{{"data": [{}], "pagination": {{"last_visible_page": 5, "has_next_page": true, "current_page": 1}}}}"#,
            items.join(",")
        )
    }

    #[test]
    fn test_client_creation() {
        let client = JikanClient::from_config(&ApiConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_search_sends_query_page_and_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/anime")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "naruto shippuden".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("limit".into(), "20".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(search_body(20))
            .create_async()
            .await;

        let client = JikanClient::new(server.url(), 20, "test-agent").unwrap();
        let page = client.search("naruto shippuden", 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.items.len(), 20);
        assert_eq!(page.items[0].title, "Naruto 1");
        assert_eq!(page.pagination.last_page, 5);
        assert!(page.pagination.has_next_page);
    }

    #[tokio::test]
    async fn test_search_non_success_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/anime")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"status": 429, "type": "RateLimitException"}"#)
            .create_async()
            .await;

        let client = JikanClient::new(server.url(), 20, "test-agent").unwrap();
        let err = client.search("naruto", 1).await.unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 429, .. }));
        assert_eq!(err.to_string(), "Failed to fetch anime: Too Many Requests");
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/anime/5114")
            .with_status(200)
            .with_body(
                r#"{"data": {"mal_id": 5114, "title": "Fullmetal Alchemist: Brotherhood",
                    "genres": [{"mal_id": 1, "name": "Action"}]}}"#,
            )
            .create_async()
            .await;

        let client = JikanClient::new(format!("{}/", server.url()), 20, "test-agent").unwrap();
        let record = client.get_by_id(5114).await.unwrap();

        mock.assert_async().await;
        assert_eq!(record.mal_id(), 5114);
        assert_eq!(record.genres, vec!["Action"]);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/anime/999999")
            .with_status(404)
            .create_async()
            .await;

        let client = JikanClient::new(server.url(), 20, "test-agent").unwrap();
        let err = client.get_by_id(999999).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to fetch anime details: Not Found");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/anime/1")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = JikanClient::new(server.url(), 20, "test-agent").unwrap();
        let err = client.get_by_id(1).await.unwrap_err();

        assert!(matches!(err, ApiError::Decode(_)));
        assert!(err.is_retryable());
    }
}
