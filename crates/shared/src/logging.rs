//! Tracing setup shared by the anime search binaries.
//!
//! Events go to a daily rolling file under the data directory and, when
//! enabled, to stderr. Stdout is left to the front end.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::{Layered, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log directory path
    pub log_dir: String,
    /// Component name (used for log file naming)
    pub component: String,
    /// Default log level
    pub default_level: Level,
    /// Enable console output
    pub console: bool,
    /// Enable file output
    pub file: bool,
    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "data/logs".to_string(),
            component: "anime-search".to_string(),
            default_level: Level::INFO,
            console: false,
            file: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Build a logging configuration from the `[logging]` config section
    ///
    /// Unknown level names fall back to INFO.
    pub fn from_settings(settings: &LoggingConfig, log_dir: &Path, component: &str) -> Self {
        Self {
            log_dir: log_dir.to_string_lossy().to_string(),
            component: component.to_string(),
            default_level: parse_level(&settings.default_level).unwrap_or(Level::INFO),
            console: settings.console,
            file: settings.file,
            json_format: settings.json_format,
        }
    }

    fn filter_directives(&self) -> String {
        // Targets use the crate name, which has underscores instead of dashes
        let target = self.component.replace('-', "_");
        format!(
            "{}={},shared={},anime_search={},hyper=warn,reqwest=warn,h2=warn",
            target, self.default_level, self.default_level, self.default_level
        )
    }
}

/// Parse a level name such as "debug" or "WARN"
pub fn parse_level(name: &str) -> Option<Level> {
    name.trim().parse::<Level>().ok()
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Install the global subscriber
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let layers: Vec<BoxedLayer<Layered<EnvFilter, Registry>>> =
        [console_layer(&config), file_layer(&config)?]
            .into_iter()
            .flatten()
            .collect();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(
        component = %config.component,
        log_dir = %config.log_dir,
        console = config.console,
        file = config.file,
        "Logging initialized"
    );

    Ok(())
}

fn console_layer<S>(config: &LogConfig) -> Option<BoxedLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    config.console.then(|| {
        fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .boxed()
    })
}

fn file_layer<S>(config: &LogConfig) -> Result<Option<BoxedLayer<S>>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if !config.file {
        return Ok(None);
    }

    let log_dir = Path::new(&config.log_dir);
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;
    let appender = tracing_appender::rolling::daily(log_dir, &config.component);

    let layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(appender)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(appender)
            .boxed()
    };

    Ok(Some(layer))
}
