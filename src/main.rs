use anyhow::{Context, Result, bail};
use clap::Parser;
use flickr_archive::{
    Archivist, BatchReport, Config, FailurePolicy, FsStore, ItemId, Query, cancel_on_signal,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flickr-archive")]
#[command(about = "Archive Flickr photos and their metadata to a local directory", long_about = None)]
struct Cli {
    /// Directory the archive is written to
    #[arg(long)]
    root: PathBuf,

    /// API key (overrides the config file)
    #[arg(long, env = "FLICKR_API_KEY")]
    api_key: Option<String>,

    /// API secret; enables request signing
    #[arg(long, env = "FLICKR_API_SECRET")]
    api_secret: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// First path segment for archived items (defaults to each item's owner)
    #[arg(long)]
    username: Option<String>,

    /// Search parameter as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Archive everything this user has uploaded, day by day
    #[arg(long, conflicts_with = "ids")]
    user: Option<String>,

    /// Keep going after item failures and report them all at the end
    #[arg(long)]
    collect_all: bool,

    /// API requests per second (0 = unlimited)
    #[arg(long)]
    requests_per_second: Option<u32>,

    /// Items archived concurrently
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Item ids to archive
    ids: Vec<ItemId>,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flickr_archive={default_level},warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = build_config(&cli)?;
    let archivist = Archivist::flickr(config, Arc::new(FsStore::new(&cli.root)))
        .context("Failed to create archivist")?;

    tokio::spawn(cancel_on_signal(archivist.clone()));

    let report = if !cli.ids.is_empty() {
        archivist.archive_all(cli.ids.clone()).await?
    } else if let Some(user) = &cli.user {
        archivist.archive_user(user).await?
    } else if !cli.params.is_empty() {
        let query: Query = cli.params.iter().cloned().collect();
        archivist.archive_search(&query).await?
    } else {
        bail!("nothing to archive: pass item ids, --user or --param");
    };

    summarize(&report);
    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(key) = &cli.api_key {
        config.api.api_key = key.clone();
    }
    if let Some(secret) = &cli.api_secret {
        config.api.api_secret = Some(secret.clone());
        config.api.sign_requests = true;
    }
    if let Some(username) = &cli.username {
        config.username = Some(username.clone());
    }
    if cli.collect_all {
        config.failure_policy = FailurePolicy::CollectAll;
    }
    if let Some(rate) = cli.requests_per_second {
        config.throttle.requests_per_second = rate;
    }
    if let Some(max) = cli.max_in_flight {
        config.throttle.max_in_flight = max;
    }

    if config.api.api_key.is_empty() {
        bail!("an API key is required (--api-key, FLICKR_API_KEY or the config file)");
    }
    Ok(config)
}

fn summarize(report: &BatchReport) {
    for failure in &report.failures {
        tracing::error!(item_id = %failure.item(), code = failure.code(), error = %failure, "Failed");
    }
    tracing::info!(
        archived = report.archived.len(),
        reused = report.archived.iter().filter(|a| a.reused).count(),
        failed = report.failures.len(),
        skipped = report.skipped.len(),
        "Archive finished"
    );
}
