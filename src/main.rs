mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Command, CrawlArgs, ExportArgs, LogLevel};
use geoleak::github::{ApiClient, ApiConfig, GithubDiscovery, RotationConfig, Rotator};
use geoleak::model::{EntityKind, canonicalize};
use geoleak::report;
use geoleak::repository::{Database, SchemaError};
use geoleak::scanner::{CheckoutConfig, DEFAULT_CHECKOUT_TIMEOUT, DEFAULT_EXTRACT_TIMEOUT, ScanConfig};
use geoleak::worker::{Coordinator, CrawlConfig, IndicatifProgress, NoopProgress, ProgressReporter};

const EXIT_FAILURE: u8 = 1;
const EXIT_SCHEMA_MISMATCH: u8 = 2;

/// Pause between egress address checks after a rotation
const ROTATION_SETTLE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let result = match cli.command {
        Command::Crawl(args) => crawl(args).await,
        Command::Export(args) => export(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<SchemaError>().is_some() => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_SCHEMA_MISMATCH)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}

fn default_db_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .context("Could not determine cache directory")?
        .join("geoleak");
    Ok(cache_dir.join("frontier.db"))
}

async fn open_database(path: Option<&Path>) -> Result<Database> {
    let db_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_db_path()?,
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Could not create '{}'", parent.display()))?;
    }

    log::info!("Using frontier: {}", db_path.display());
    let db_path_str = db_path.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path_str).await?;
    if db.init_schema().await? {
        log::info!("Created new frontier");
    }
    Ok(db)
}

async fn crawl(args: CrawlArgs) -> Result<()> {
    // Reject bad seeds before touching the store
    let seeds = args
        .seeds
        .iter()
        .map(|s| canonicalize(EntityKind::Repository, s).with_context(|| format!("invalid seed '{s}'")))
        .collect::<Result<Vec<_>>>()?;

    let db = Arc::new(open_database(args.db.as_deref()).await?);
    let added = db.push_many(EntityKind::Repository, &seeds).await?;
    if !seeds.is_empty() {
        log::info!("Queued {added} of {} seed(s)", seeds.len());
    }

    log_stats(&db).await?;

    let rotation = args.rotate_cmd.as_deref().map(|cmd| RotationConfig {
        command: cmd.split_whitespace().map(str::to_string).collect(),
        ip_check_url: args.ip_check_url.clone(),
        settle: ROTATION_SETTLE,
    });
    let retry_delay = Duration::from_millis(args.retry_delay_ms);
    let rotator = Rotator::from_config(rotation, retry_delay)?;

    let api = ApiClient::new(
        ApiConfig {
            base_url: args.api_url,
            token: args.github_token,
            per_page: args.per_page,
            retry_delay,
        },
        rotator,
    )?;
    let discovery = Arc::new(GithubDiscovery::new(api, args.max_listing_id));

    let config = CrawlConfig {
        workers: usize::from(args.workers),
        target: args.count,
        checkout: CheckoutConfig {
            command: args.checkout_cmd,
            work_dir: args.work_dir.unwrap_or_else(std::env::temp_dir),
            timeout: DEFAULT_CHECKOUT_TIMEOUT,
        },
        scan: ScanConfig {
            command: args.exif_cmd,
            timeout: DEFAULT_EXTRACT_TIMEOUT,
        },
    };
    let coordinator = Coordinator::new(Arc::clone(&db), discovery, config);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, requeueing in-flight repositories");
                cancel.cancel();
            }
        }
    });

    let progress: Box<dyn ProgressReporter> = if args.quiet {
        Box::new(NoopProgress)
    } else {
        Box::new(IndicatifProgress)
    };
    let summary = coordinator.run(cancel, progress.as_ref()).await?;

    println!(
        "Examined {} repositories ({} checkout failures): {} files scanned, {} skipped, {} new hits, {} requeued",
        summary.cycles,
        summary.checkout_failures,
        summary.files_scanned,
        summary.files_skipped,
        summary.hits,
        summary.requeued
    );
    log_stats(&db).await
}

async fn log_stats(db: &Database) -> Result<()> {
    let stats = db.stats().await?;
    log::info!(
        "Frontier: {} repositories seen ({} queued), {} users seen ({} queued), {} hits",
        stats.repositories,
        stats.queued_repositories,
        stats.users,
        stats.queued_users,
        stats.hits
    );
    Ok(())
}

async fn export(args: ExportArgs) -> Result<()> {
    let db = open_database(args.db.as_deref()).await?;
    let written = report::export(&db, &args.out).await?;
    println!("Wrote {written} hits to {}", args.out.display());
    Ok(())
}
