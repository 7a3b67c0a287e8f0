//! Jikan API v4 client implementation.
//!
//! This module provides the wire types, the error taxonomy and a plain
//! (non-retrying) client for the two endpoints the application uses.

pub mod client;
pub mod error;
pub mod traits;
pub mod types;

pub use client::JikanClient;
pub use error::ApiError;
pub use traits::{AnimeApi, SearchPage};
