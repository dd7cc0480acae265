mod aggregator;
mod config;
mod model;
mod parser;
mod scraper;
mod storage;
mod utils;

use aggregator::{Aggregator, RunSummary};
use config::{load_config, AppConfig, DEFAULT_CONFIG_PATH};
use model::StorageError;
use crate::scraper::{build_fetcher, PageFetcher};
use storage::JsonStorage;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path =
        std::env::var("SNIPER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration from file
    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ Config load error ({}): {}", config_path, e);
            std::process::exit(1);
        }
    };

    let fetcher = match build_fetcher(&config.parser) {
        Ok(f) => f,
        Err(e) => {
            error!("❌ Failed to initialize fetcher: {}", e);
            std::process::exit(1);
        }
    };

    info!("🚀 Starting price parser ({:?} backend)...", config.parser.backend);
    if config.products.is_empty() {
        warn!("Catalog in {} is empty, the snapshot will have no products", config_path);
    }
    info!("Categories to process: {}", config.products.len());
    match run(&config, fetcher.as_ref()).await {
        Ok(summary) => {
            info!("🎉 Parsing finished: {}/{} sources priced", summary.priced, summary.total);
        }
        Err(e) => {
            error!("❌ Critical error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Scrapes the whole catalog and writes the snapshot once at the end.
///
/// Nothing is written if the run does not get that far.
async fn run(config: &AppConfig, fetcher: &dyn PageFetcher) -> Result<RunSummary, StorageError> {
    let storage = JsonStorage::new(&config.output_path);
    if let Ok(previous) = storage.load() {
        let summary = RunSummary::of(&previous);
        info!(
            "Previous snapshot in {}: {}/{} priced | Updated: {}",
            storage.path().display(),
            summary.priced,
            summary.total,
            previous.last_updated
        );
    }

    let snapshot = Aggregator::new(fetcher).run(&config.products).await;
    storage.save(&snapshot)?;
    Ok(RunSummary::of(&snapshot))
}
