//! Shared library for the anime search application.
//!
//! This crate provides common functionality used by the search crate and binary:
//! - Configuration management
//! - Logging infrastructure
//! - Domain records (summary, detail, pagination)

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
