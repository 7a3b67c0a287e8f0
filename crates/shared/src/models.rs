//! Data models for the anime search application.
//!
//! These are the records the application state holds and the presentation
//! layer renders. They are decoupled from the Jikan wire format, which lives
//! in the `anime-search` crate and is converted into these types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lightweight anime descriptor used for list rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub mal_id: u32,

    // Titles
    pub title: String,
    pub title_english: Option<String>,

    /// Poster image (large JPG when available)
    pub image_url: Option<String>,

    pub score: Option<f64>,
    pub kind: Option<String>, // TV, Movie, OVA, etc.
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub year: Option<u32>,
}

/// Full anime descriptor fetched by identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub summary: SummaryRecord,

    pub title_japanese: Option<String>,

    // Text
    pub synopsis: Option<String>,
    pub background: Option<String>,

    // Classifications
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub studios: Vec<String>,

    // Airing metadata
    pub aired: Option<String>,
    pub aired_from: Option<NaiveDate>,
    pub season: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<String>,

    // Rankings
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u32>,
    pub scored_by: Option<u32>,

    pub trailer: Option<Trailer>,
}

impl DetailRecord {
    pub fn mal_id(&self) -> u32 {
        self.summary.mal_id
    }

    pub fn title(&self) -> &str {
        &self.summary.title
    }

    /// English title, only when it differs from the main title
    pub fn alternate_title(&self) -> Option<&str> {
        self.summary
            .title_english
            .as_deref()
            .filter(|english| *english != self.summary.title)
    }
}

/// Trailer reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trailer {
    pub youtube_id: Option<String>,
    pub url: Option<String>,
    pub embed_url: Option<String>,
}

/// Pagination state accompanying a search result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub last_page: u32,
    pub has_next_page: bool,
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            current_page: 1,
            last_page: 1,
            has_next_page: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(title: &str, english: Option<&str>) -> SummaryRecord {
        SummaryRecord {
            mal_id: 20,
            title: title.to_string(),
            title_english: english.map(str::to_string),
            image_url: None,
            score: None,
            kind: None,
            episodes: None,
            status: None,
            year: None,
        }
    }

    fn detail(summary: SummaryRecord) -> DetailRecord {
        DetailRecord {
            summary,
            title_japanese: None,
            synopsis: None,
            background: None,
            genres: Vec::new(),
            themes: Vec::new(),
            studios: Vec::new(),
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

    #[test]
    fn test_default_pagination() {
        let pagination = PaginationInfo::default();
        assert_eq!(pagination.current_page, 1);
        assert_eq!(pagination.last_page, 1);
        assert!(!pagination.has_next_page);
    }

    #[test]
    fn test_alternate_title_hidden_when_identical() {
        let record = detail(summary("Naruto", Some("Naruto")));
        assert_eq!(record.alternate_title(), None);

        let record = detail(summary("Shingeki no Kyojin", Some("Attack on Titan")));
        assert_eq!(record.alternate_title(), Some("Attack on Titan"));
        assert_eq!(record.title(), "Shingeki no Kyojin");
        assert_eq!(record.mal_id(), 20);
    }
}
