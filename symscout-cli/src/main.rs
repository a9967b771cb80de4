//! symscout CLI — bulk symbol collection from the Yahoo Finance lookup API.
//!
//! Commands:
//! - `download` — probe every alphabet combination up to a length, validate
//!   the hits, and save the result as a parquet dataset, csv tree, or sqlite
//!   database.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use symscout_core::{parse_types, save, OutputFormat, SymbolLookup, SymbolTable, SymbolValidator};
use symscout_requests::{
    AgentPool, BatchProgress, ClientConfig, NoProgress, ProxyPool, RequestClient,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::FileConfig;

#[derive(Parser)]
#[command(name = "symscout", about = "Bulk symbol collection from Yahoo Finance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe all query combinations, validate hits, and save the symbols.
    Download(DownloadOpts),
}

#[derive(clap::Args)]
struct DownloadOpts {
    /// Longest query combination to probe (the universe grows as 38^n, so
    /// lengths beyond 4 are rejected).
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=4))]
    max_combination_length: u8,

    /// Comma-separated asset types: equity, mutualfund, etf, index, future,
    /// currency, cryptocurrency.
    #[arg(long, default_value = "equity")]
    types: String,

    /// Global cap on in-flight requests. Defaults to 25 (or the config file).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Cap on simultaneous connections per host. Defaults to 50 (or the config file).
    #[arg(long)]
    limits_per_host: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Draw a random proxy per request (requires --proxies-file).
    #[arg(long, default_value_t = false)]
    random_proxy: bool,

    /// File with one proxy URI per line.
    #[arg(long)]
    proxies_file: Option<PathBuf>,

    /// File with one user-agent string per line. Defaults to a built-in list.
    #[arg(long)]
    agents_file: Option<PathBuf>,

    /// Also retry 4xx responses (5xx and timeouts are always retried).
    #[arg(long, default_value_t = false)]
    retry_client_errors: bool,

    /// Skip the final symbol validation pass.
    #[arg(long, default_value_t = false)]
    no_validation: bool,

    /// Keep search hits whose name is empty.
    #[arg(long, default_value_t = false)]
    keep_empty_names: bool,

    /// Disable the progress bar.
    #[arg(long, default_value_t = false)]
    no_progress: bool,

    /// Optional TOML config file for engine defaults and pool locations.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory.
    #[arg(long, default_value = "db")]
    output: PathBuf,

    /// Output format: parquet, csv, or sqlite.
    #[arg(long, default_value = "parquet")]
    output_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Download(opts) => run_download(opts).await,
    }
}

async fn run_download(opts: DownloadOpts) -> Result<()> {
    let file = match &opts.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let types = parse_types(&opts.types)?;
    let format: OutputFormat = opts.output_format.parse()?;
    let client = build_client(&opts, &file)?;

    let progress: Box<dyn BatchProgress> = if opts.no_progress {
        Box::new(NoProgress)
    } else {
        Box::new(CliProgress::default())
    };

    let lookup = SymbolLookup::new(client.clone());
    let rows = lookup
        .lookup(opts.max_combination_length as usize, &types, progress.as_ref())
        .await?;
    info!(hits = rows.len(), "lookup complete");

    let mut table = SymbolTable::new();
    table.extend(rows);
    if !opts.keep_empty_names {
        table.drop_empty_names();
    }
    info!(symbols = table.len(), "table assembled");

    if !opts.no_validation && !table.is_empty() {
        let validator = SymbolValidator::new(client).with_breaker(lookup.breaker());
        let flags = validator
            .validate(&table.symbols(), progress.as_ref())
            .await?;
        table.apply_validation(&flags);
        let valid = table
            .rows()
            .iter()
            .filter(|r| r.valid == Some(true))
            .count();
        info!(valid, total = table.len(), "validation complete");
    }

    save(&table, &opts.output, format)?;
    info!(path = %opts.output.display(), "done");
    Ok(())
}

fn build_client(opts: &DownloadOpts, file: &FileConfig) -> Result<RequestClient> {
    let mut config = ClientConfig {
        concurrency: 25,
        limits_per_host: 50,
        ..ClientConfig::default()
    };
    if let Some(n) = file.client.concurrency {
        config.concurrency = n;
    }
    if let Some(n) = file.client.limits_per_host {
        config.limits_per_host = n;
    }
    if let Some(secs) = file.client.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(n) = file.retry.max_attempts {
        config.retry.max_attempts = n;
    }
    if let Some(secs) = file.retry.max_elapsed_secs {
        config.retry.max_elapsed = Duration::from_secs(secs);
    }
    if let Some(flag) = file.retry.retry_client_errors {
        config.retry.retry_client_errors = flag;
    }

    if let Some(n) = opts.concurrency {
        config.concurrency = n;
    }
    if let Some(n) = opts.limits_per_host {
        config.limits_per_host = n;
    }
    if let Some(secs) = opts.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if opts.retry_client_errors {
        config.retry.retry_client_errors = true;
    }
    config.use_random_proxy = opts.random_proxy;

    let agents_file = opts.agents_file.as_ref().or(file.pools.agents_file.as_ref());
    let agents = match agents_file {
        Some(path) => AgentPool::from_file(path)
            .with_context(|| format!("loading agents from {}", path.display()))?,
        None => AgentPool::builtin(),
    };

    let proxies_file = opts
        .proxies_file
        .as_ref()
        .or(file.pools.proxies_file.as_ref());
    let proxies = match proxies_file {
        Some(path) => Some(
            ProxyPool::from_file(path)
                .with_context(|| format!("loading proxies from {}", path.display()))?,
        ),
        None => None,
    };

    RequestClient::new(config, agents, proxies.as_ref()).context("building request client")
}

/// Progress bar bridging the engine's batch callbacks to indicatif.
#[derive(Default)]
struct CliProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BatchProgress for CliProgress {
    fn on_start(&self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")
        {
            bar.set_style(style);
        }
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_item(&self, completed: usize, _total: usize) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.set_position(completed as u64);
        }
    }

    fn on_finished(&self, _succeeded: usize, failed: usize, total: usize) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        if failed > 0 {
            warn!(failed, total, "some requests failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combination_length_is_bounded() {
        assert!(Cli::try_parse_from(["symscout", "download", "--max-combination-length", "3"])
            .is_ok());
        assert!(Cli::try_parse_from(["symscout", "download", "--max-combination-length", "0"])
            .is_err());
        assert!(Cli::try_parse_from(["symscout", "download", "--max-combination-length", "9"])
            .is_err());
    }
}
