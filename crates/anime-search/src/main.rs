//! Anime search terminal front end.
//!
//! Without `--query` or `--id` this reads stdin line by line: plain text
//! replaces the search input, lines starting with `:` are commands.

use anime_search::{
    AnimeApi, AnimeState, AnimeStore, DetailView, JikanClient, RequestGateway, RetryPolicy,
    SearchSession, SearchView,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use shared::{Config, DetailRecord, LogConfig, SummaryRecord};
use std::fmt::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging (also logs to stderr)
    #[arg(short, long)]
    verbose: bool,

    /// Search once for this query and exit
    #[arg(short, long, conflicts_with = "id")]
    query: Option<String>,

    /// Result page for --query
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,

    /// Show details for one MyAnimeList ID and exit
    #[arg(long)]
    id: Option<u32>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Input(String),
    Next,
    Previous,
    Open(u32),
    ClearError,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let Some(command) = line.trim().strip_prefix(':') else {
            return Command::Input(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("next" | "n"), None) => Command::Next,
            (Some("prev" | "p"), None) => Command::Previous,
            (Some("open" | "o"), Some(id)) => match id.parse() {
                Ok(id) => Command::Open(id),
                Err(_) => Command::Invalid(format!("Not an anime ID: {id}")),
            },
            (Some("clear"), None) => Command::ClearError,
            (Some("help" | "h"), None) => Command::Help,
            (Some("quit" | "q"), None) => Command::Quit,
            _ => Command::Invalid(format!("Unknown command: {}", line.trim())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = LogConfig::from_settings(&config.logging, &config.log_dir(), "anime-search");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
        log_config.console = true;
    }
    shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "Anime search starting");

    let client = JikanClient::from_config(&config.api).context("Failed to create Jikan client")?;
    let store = AnimeStore::new(
        RequestGateway::new(client),
        RetryPolicy::from_config(&config.retry),
    );

    if let Some(query) = args.query {
        return search_once(&store, &query, args.page).await;
    }
    if let Some(id) = args.id {
        return detail_once(&store, id).await;
    }

    interactive(store, config.search.debounce()).await
}

async fn search_once<A: AnimeApi>(store: &AnimeStore<A>, query: &str, page: u32) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Query is empty");
    }

    store.search(query.trim().to_string(), page).await;
    let state = store.snapshot();
    println!("{}", render_search(&state));

    match state.error() {
        Some(message) => bail!("Search failed: {message}"),
        None => Ok(()),
    }
}

async fn detail_once<A: AnimeApi>(store: &AnimeStore<A>, id: u32) -> Result<()> {
    store.open_detail(id).await;
    let state = store.snapshot();
    println!("{}", render_detail(&state));

    match state.detail_error() {
        Some(message) => bail!("Detail lookup failed: {message}"),
        None => Ok(()),
    }
}

async fn interactive<A: AnimeApi + 'static>(store: AnimeStore<A>, settle: Duration) -> Result<()> {
    println!("{}", HELP);

    let session = SearchSession::start(store.clone(), settle);
    let renderer = tokio::spawn(render_loop(store.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match Command::parse(&line) {
            Command::Input(text) => session.input(&text),
            Command::Next => {
                let store = store.clone();
                tokio::spawn(async move { store.next_page().await });
            }
            Command::Previous => {
                let store = store.clone();
                tokio::spawn(async move { store.previous_page().await });
            }
            Command::Open(id) => {
                let store = store.clone();
                tokio::spawn(async move { store.open_detail(id).await });
            }
            Command::ClearError => store.clear_error(),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Invalid(message) => eprintln!("{message}"),
        }
    }

    renderer.abort();
    info!("Anime search finished");
    Ok(())
}

const HELP: &str = "Type to search. Commands: :next  :prev  :open <id>  :clear  :help  :quit";

/// Print a frame whenever the rendered output changes
async fn render_loop(mut state: watch::Receiver<AnimeState>) {
    let mut last = String::new();

    while state.changed().await.is_ok() {
        let frame = {
            let state = state.borrow_and_update();
            let mut frame = render_search(&state);
            if state.current_anime.is_some() || state.detail_status != Default::default() {
                frame.push_str("\n\n");
                frame.push_str(&render_detail(&state));
            }
            frame
        };

        if frame != last {
            println!("{frame}\n");
            last = frame;
        }
    }
}

fn render_search(state: &AnimeState) -> String {
    let mut out = String::new();

    match state.search_view() {
        SearchView::Error(message) => {
            let _ = write!(out, "Error! {message}");
        }
        SearchView::Prompt => out.push_str("Search for your favourite anime"),
        SearchView::Loading => out.push_str("Loading..."),
        SearchView::NoResults { query } => {
            let _ = write!(out, "No anime found for \"{query}\"");
        }
        SearchView::Results {
            items,
            page,
            can_prev,
            can_next,
        } => {
            for item in items {
                let _ = writeln!(out, "{}", summary_line(item));
            }
            let _ = write!(
                out,
                "{} Page {page} of {} {}",
                if can_prev { "<prev" } else { "     " },
                state.total_pages(),
                if can_next { "next>" } else { "" }
            );
        }
    }

    out
}

fn summary_line(item: &SummaryRecord) -> String {
    let mut line = format!("[{:>6}] {}", item.mal_id, item.title);
    if let Some(score) = item.score {
        let _ = write!(line, "  ★ {score:.2}");
    }
    if let Some(kind) = &item.kind {
        let _ = write!(line, "  {kind}");
    }
    if let Some(episodes) = item.episodes {
        let _ = write!(line, "  {episodes} eps");
    }
    line
}

fn render_detail(state: &AnimeState) -> String {
    match state.detail_view() {
        DetailView::Error(message) => format!("Error! {message}"),
        DetailView::Loading => "Loading details...".to_string(),
        DetailView::Loaded(record) => detail_text(record),
    }
}

fn detail_text(record: &DetailRecord) -> String {
    let summary = &record.summary;
    let mut out = record.title().to_string();

    if let Some(english) = record.alternate_title() {
        let _ = write!(out, "\n{english}");
    }

    let facts: Vec<String> = [
        summary.score.map(|s| format!("Score {s:.2}")),
        record.rank.map(|r| format!("Rank #{r}")),
        summary.kind.clone(),
        summary.episodes.map(|e| format!("{e} episodes")),
        summary.status.clone(),
        record.aired.clone(),
        record.duration.clone(),
        record.members.map(|m| format!("{m} members")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !facts.is_empty() {
        let _ = write!(out, "\n{}", facts.join(" | "));
    }

    for (label, values) in [("Genres", &record.genres), ("Studios", &record.studios)] {
        if !values.is_empty() {
            let _ = write!(out, "\n{label}: {}", values.join(", "));
        }
    }

    if let Some(synopsis) = &record.synopsis {
        let _ = write!(out, "\n\n{synopsis}");
    }
    if let Some(background) = &record.background {
        let _ = write!(out, "\n\nBackground: {background}");
    }
    if let Some(url) = record.trailer.as_ref().and_then(|t| t.url.as_deref()) {
        let _ = write!(out, "\n\nTrailer: {url}");
    }

    out
}
