//! Jikan API v4 response types.
//!
//! These types represent the JSON responses from the Jikan API. Most fields
//! are nullable upstream, so they default when absent.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use shared::{DetailRecord, PaginationInfo, SummaryRecord, Trailer};

/// Generic pagination wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Single object wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub last_visible_page: u32,
    pub has_next_page: bool,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default)]
    pub items: Option<PaginationItems>,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

/// Anime entry, shared by search results and the by-id endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeEntry {
    pub mal_id: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<AnimeImages>,
    #[serde(default)]
    pub trailer: Option<TrailerEntry>,

    // Titles
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,

    // Type and status
    #[serde(rename = "type", default)]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,

    // Dates
    #[serde(default)]
    pub aired: Option<Aired>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,

    // Scores and rankings
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub scored_by: Option<u32>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub members: Option<u32>,

    // Synopsis
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub background: Option<String>,

    // Season
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,

    #[serde(default)]
    pub studios: Vec<MalEntity>,
    #[serde(default)]
    pub genres: Vec<MalEntity>,
    #[serde(default)]
    pub themes: Vec<MalEntity>,
}

/// Anime images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeImages {
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub small_image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

/// Aired dates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aired {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// Display form, e.g. "Oct 3, 2002 to Feb 8, 2007"
    #[serde(default)]
    pub string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailerEntry {
    #[serde(default)]
    pub youtube_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
}

/// MAL entity (genre, studio, producer, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalEntity {
    pub mal_id: u32,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Error body returned by Jikan alongside non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanError {
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl AnimeEntry {
    /// Large JPG poster, falling back to the regular one
    fn poster_url(&self) -> Option<String> {
        let jpg = &self.images.as_ref()?.jpg;
        jpg.large_image_url
            .clone()
            .or_else(|| jpg.image_url.clone())
    }

    /// Parse the start of airing. Jikan sends RFC 3339 timestamps.
    fn aired_from(&self) -> Option<NaiveDate> {
        let from = self.aired.as_ref()?.from.as_deref()?;
        DateTime::parse_from_rfc3339(from)
            .map(|date| date.date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(from.get(..10)?, "%Y-%m-%d").ok())
    }
}

impl From<&AnimeEntry> for SummaryRecord {
    fn from(entry: &AnimeEntry) -> Self {
        Self {
            mal_id: entry.mal_id,
            title: entry.title.clone(),
            title_english: entry.title_english.clone(),
            image_url: entry.poster_url(),
            score: entry.score,
            kind: entry.anime_type.clone(),
            episodes: entry.episodes,
            status: entry.status.clone(),
            year: entry.year,
        }
    }
}

impl From<AnimeEntry> for DetailRecord {
    fn from(entry: AnimeEntry) -> Self {
        let summary = SummaryRecord::from(&entry);
        let aired_from = entry.aired_from();
        let names = |entities: Vec<MalEntity>| -> Vec<String> {
            entities.into_iter().map(|e| e.name).collect()
        };

        Self {
            summary,
            title_japanese: entry.title_japanese,
            synopsis: entry.synopsis,
            background: entry.background,
            genres: names(entry.genres),
            themes: names(entry.themes),
            studios: names(entry.studios),
            aired: entry.aired.and_then(|aired| aired.string),
            aired_from,
            season: entry.season,
            duration: entry.duration,
            rating: entry.rating,
            rank: entry.rank,
            popularity: entry.popularity,
            members: entry.members,
            scored_by: entry.scored_by,
            trailer: entry.trailer.map(|t| Trailer {
                youtube_id: t.youtube_id,
                url: t.url,
                embed_url: t.embed_url,
            }),
        }
    }
}

impl From<&Pagination> for PaginationInfo {
    fn from(pagination: &Pagination) -> Self {
        Self {
            // Page cursor never drops below 1
            current_page: pagination.current_page.max(1),
            last_page: pagination.last_visible_page,
            has_next_page: pagination.has_next_page,
        }
    }
}
