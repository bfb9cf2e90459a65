use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::info;

use marketlens_common::observability::{init_logging, LogConfig, LogFormat};
use marketlens_config::{LogSettings, MarketLensConfig, MarketLensConfigLoader};

mod run;

/// Read when `--config` is not given; skipped silently if absent.
const DEFAULT_CONFIG_FILE: &str = "marketlens.yaml";

/// Command-line interface for one search run.
///
/// Flags override the config file and `MARKETLENS_*` environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "marketlens",
    about = "Fetch and normalize Amazon search listings via SerpAPI"
)]
pub struct Cli {
    /// Path to the YAML config file; the default is only read if it exists
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Search term (overrides `search.term` from the config)
    #[arg(long)]
    pub term: Option<String>,

    /// Amazon storefront domain, e.g. amazon.com or amazon.de
    #[arg(long)]
    pub marketplace: Option<String>,

    /// Result pages to fetch (capped at 5)
    #[arg(long)]
    pub pages: Option<u32>,

    /// SerpAPI key; prefer the environment variable over the flag
    #[arg(long, env = "SERPAPI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Drop sponsored listings
    #[arg(long)]
    pub no_sponsored: bool,

    /// Drop organic listings (sponsored-only analysis)
    #[arg(long)]
    pub no_organic: bool,

    /// Keep only records rated at least this high
    #[arg(long, value_name = "STARS")]
    pub min_rating: Option<f32>,

    /// Keep only records with at least this many reviews
    #[arg(long, value_name = "N")]
    pub min_reviews: Option<u32>,

    /// Keep only records priced at least this much
    #[arg(long, value_name = "PRICE")]
    pub min_price: Option<f64>,

    /// Keep only records priced at most this much
    #[arg(long, value_name = "PRICE")]
    pub max_price: Option<f64>,

    /// Write the record set to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Merge config: file first, then MARKETLENS_* env, then CLI flags.
    let mut loader = MarketLensConfigLoader::new();
    match &cli.config {
        Some(path) => loader = loader.with_file(path),
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                loader = loader.with_file(DEFAULT_CONFIG_FILE);
            }
        }
    }
    let config: MarketLensConfig = loader.load()?;

    let log_path = init_logging(log_config(&config.log)?)?;
    info!(
        log_file = %log_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "marketlens.start"
    );

    run::run(cli, config).await
}

fn log_config(settings: &LogSettings) -> Result<LogConfig> {
    let mut config = LogConfig {
        app_name: "marketlens",
        emit_stderr: settings.stderr,
        ..LogConfig::default()
    };
    if let Some(dir) = &settings.dir {
        config.log_dir = Some(PathBuf::from(dir));
    }
    if let Some(format) = &settings.format {
        config.format = format.parse::<LogFormat>()?;
    }
    if let Some(filter) = &settings.filter {
        config.default_filter = filter.clone();
    }
    Ok(config)
}
