//! Scripted in-memory `AnimeApi` used by the gateway, store and session tests.

use crate::api::{AnimeApi, ApiError, SearchPage};
use shared::{DetailRecord, PaginationInfo, SummaryRecord};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Search { query: String, page: u32 },
    Detail(u32),
}

struct Step<T> {
    delay: Duration,
    outcome: Result<T, ApiError>,
}

/// Responses are consumed in order. With nothing scripted, search answers a
/// one-item page and detail answers a bare record, both immediately.
#[derive(Default)]
pub(crate) struct FakeApi {
    searches: Mutex<VecDeque<Step<SearchPage>>>,
    details: Mutex<VecDeque<Step<DetailRecord>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn push_search(&self, delay: Duration, outcome: Result<SearchPage, ApiError>) {
        self.searches.lock().unwrap().push_back(Step { delay, outcome });
    }

    pub fn push_detail(&self, delay: Duration, outcome: Result<DetailRecord, ApiError>) {
        self.details.lock().unwrap().push_back(Step { delay, outcome });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Search { query, page } => Some((query, page)),
                Call::Detail(_) => None,
            })
            .collect()
    }
}

impl AnimeApi for FakeApi {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, ApiError> {
        self.calls.lock().unwrap().push(Call::Search {
            query: query.to_string(),
            page,
        });
        let step = self.searches.lock().unwrap().pop_front();

        match step {
            Some(step) => {
                sleep(step.delay).await;
                step.outcome
            }
            None => Ok(search_page(query, 1, page, page, false)),
        }
    }

    async fn get_by_id(&self, id: u32) -> Result<DetailRecord, ApiError> {
        self.calls.lock().unwrap().push(Call::Detail(id));
        let step = self.details.lock().unwrap().pop_front();

        match step {
            Some(step) => {
                sleep(step.delay).await;
                step.outcome
            }
            None => Ok(detail(id, &format!("Anime {id}"))),
        }
    }
}

pub(crate) fn summary(mal_id: u32, title: &str) -> SummaryRecord {
    SummaryRecord {
        mal_id,
        title: title.to_string(),
        title_english: None,
        image_url: None,
        score: Some(7.9),
        kind: Some("TV".to_string()),
        episodes: Some(12),
        status: None,
        year: None,
    }
}

pub(crate) fn search_page(
    prefix: &str,
    count: u32,
    current_page: u32,
    last_page: u32,
    has_next_page: bool,
) -> SearchPage {
    SearchPage {
        items: (1..=count)
            .map(|n| summary(current_page * 100 + n, &format!("{prefix} {n}")))
            .collect(),
        pagination: PaginationInfo {
            current_page,
            last_page,
            has_next_page,
        },
    }
}

pub(crate) fn detail(mal_id: u32, title: &str) -> DetailRecord {
    DetailRecord {
        summary: summary(mal_id, title),
        title_japanese: None,
        synopsis: Some("A synopsis.".to_string()),
        background: None,
        genres: vec!["Action".to_string()],
        themes: Vec::new(),
        studios: vec!["Studio Pierrot".to_string()],
        aired: None,
        aired_from: None,
        season: None,
        duration: None,
        rating: None,
        rank: None,
        popularity: None,
        members: None,
        scored_by: None,
        trailer: None,
    }
}

pub(crate) fn network_error() -> ApiError {
    ApiError::Network("error sending request: connection refused".to_string())
}
