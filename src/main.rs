use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use threadline::config::Config;
use threadline::display::{render_forest, RenderOptions};
use threadline::item::ItemId;
use threadline::source::HttpSource;
use threadline::store::{ExpandOutcome, FeedType, FetchOutcome, Stories};

/// Default config path (~/.config/threadline/config.toml)
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("threadline")
            .join("config.toml"),
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "threadline",
    about = "Browse a story feed and expand comment threads from the terminal"
)]
struct Args {
    /// Config file (defaults to ~/.config/threadline/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Item API base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Feed to load: top, new, best, ask, show, job
    #[arg(long = "type", value_name = "TYPE")]
    feed_type: Option<FeedType>,

    /// Stories per page
    #[arg(long)]
    limit: Option<usize>,

    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pages: usize,

    /// Expand the hidden replies of this item (repeatable)
    #[arg(long, value_name = "ID")]
    expand: Vec<ItemId>,

    /// Output line width
    #[arg(long, default_value_t = 100)]
    width: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match args.config.clone().or_else(default_config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(base_url) = args.base_url {
        config.api_base_url = base_url;
    }
    if let Some(feed_type) = args.feed_type {
        config.feed_type = feed_type;
    }
    if let Some(limit) = args.limit {
        anyhow::ensure!(limit > 0, "--limit must be at least 1");
        config.page_size = limit;
    }

    let source = HttpSource::new(
        &config.api_base_url,
        config.request_timeout(),
        config.max_response_bytes,
    )
    .context("Failed to set up item API client")?;

    let stories = Arc::new(Stories::new(source, config.feed_type, config.page_size));

    // Mirror store events into the log, the way a UI would re-render on them
    let mut events = stories.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::trace!(?event, "Store event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event log fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = run(&stories, &args.expand, args.pages).await;

    println!("{}", config.feed_type.pretty_name());
    print!(
        "{}",
        render_forest(
            &stories.snapshot(),
            &RenderOptions {
                max_indent_level: config.max_indent_level,
                line_width: args.width,
                ..RenderOptions::default()
            }
        )
    );

    stories.dispose();
    if let Err(e) = event_log.await {
        tracing::warn!(error = %e, "Event log task failed");
    }

    result
}

/// Drives the store the way the screen layer does: first page, then one
/// end-of-list load per extra page, then the requested expansions.
async fn run(stories: &Stories<HttpSource>, expand: &[ItemId], pages: usize) -> Result<()> {
    let limit = stories.cursor().limit();
    let outcome = stories.fetch_stories(0, limit).await.map_err(|e| {
        if e.is_connectivity() {
            eprintln!("You are offline");
        }
        e
    })?;
    tracing::info!(?outcome, "Loaded first page");

    for _ in 1..pages {
        match stories.on_end_reached().await? {
            FetchOutcome::Applied { appended: 0 } => break,
            outcome => tracing::info!(?outcome, offset = stories.cursor().offset(), "Loaded page"),
        }
    }

    for id in expand {
        match stories.expand(id).await {
            Ok(ExpandOutcome::Expanded { added, remaining }) => {
                tracing::info!(item = %id, added, remaining, "Expanded replies");
            }
            Ok(ExpandOutcome::NotFrontier) => {
                eprintln!("Item {id} has no hidden replies");
            }
            Ok(outcome) => tracing::debug!(item = %id, ?outcome, "Expansion not applied"),
            // Other items stay usable; report and keep going
            Err(e) => eprintln!("Warning: {e}"),
        }
    }
    Ok(())
}
