// Scraper module: page fetcher capability and its browser back-ends.

pub mod browser;
pub mod http;
pub mod traits;

pub use browser::ChromiumFetcher;
pub use http::HttpFetcher;
pub use traits::PageFetcher;

use crate::config::{FetchBackend, ParserConfig};
use crate::model::FetchError;

/// Builds the fetcher selected by `config.backend`.
pub fn build_fetcher(config: &ParserConfig) -> Result<Box<dyn PageFetcher>, FetchError> {
    let fetcher: Box<dyn PageFetcher> = match config.backend {
        FetchBackend::Chromium => Box::new(ChromiumFetcher::new(config.clone())),
        FetchBackend::Http => Box::new(HttpFetcher::new(config)?),
    };
    Ok(fetcher)
}
