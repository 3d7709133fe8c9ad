use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use geoleak::github::{DEFAULT_API_URL, DEFAULT_MAX_LISTING_ID, DEFAULT_PER_PAGE};
use geoleak::scanner::{DEFAULT_CHECKOUT_COMMAND, DEFAULT_EXTRACT_COMMAND};
use geoleak::util::CommandTemplate;

#[derive(Parser, Debug)]
#[command(name = "geoleak", version, about = "Crawl GitHub for files with committed GPS metadata")]
pub struct Cli {
    /// Log verbosity (RUST_LOG overrides)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl repositories and record GPS hits
    Crawl(CrawlArgs),
    /// Write recorded hits as CSV
    Export(ExportArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Frontier database (default: <cache dir>/geoleak/frontier.db)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Repositories to examine before stopping (default: until interrupted)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,

    /// Concurrent workers
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Repository URL or owner/name to queue before crawling (repeatable)
    #[arg(long = "seed")]
    pub seeds: Vec<String>,

    /// GitHub API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// GitHub token for authenticated requests
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Page size for contributor and user-repository listings
    #[arg(long, default_value_t = DEFAULT_PER_PAGE, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub per_page: u32,

    /// Upper bound of the random offset into the global repository listing
    #[arg(long, default_value_t = DEFAULT_MAX_LISTING_ID)]
    pub max_listing_id: u64,

    /// Checkout command; {repo} and {dest} are substituted
    #[arg(long, default_value = DEFAULT_CHECKOUT_COMMAND)]
    pub checkout_cmd: CommandTemplate,

    /// Metadata extraction command; {file} is substituted
    #[arg(long, default_value = DEFAULT_EXTRACT_COMMAND)]
    pub exif_cmd: CommandTemplate,

    /// Parent directory of worker checkouts (default: system temp dir)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Command that moves the crawler to a new egress address when rate limited
    #[arg(long)]
    pub rotate_cmd: Option<String>,

    /// URL answering with the caller's public address, checked after rotation
    #[arg(long, requires = "rotate_cmd")]
    pub ip_check_url: Option<String>,

    /// Delay before retrying when rate limited without a rotation command
    #[arg(long, default_value_t = 60_000)]
    pub retry_delay_ms: u64,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Frontier database (default: <cache dir>/geoleak/frontier.db)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Output CSV file
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
