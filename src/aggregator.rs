// Aggregator: walks the catalog source by source and assembles the snapshot.
use crate::model::{Catalog, FetchError, FetchOutcome, OrderedMap, ResultEntry, Snapshot};
use crate::parser::extract_price;
use crate::scraper::PageFetcher;
use crate::utils::{hostname, source_key};
use chrono::Utc;
use tracing::{info, warn};

/// Priced vs. total sources of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub priced: usize,
}

impl RunSummary {
    pub fn of(snapshot: &Snapshot) -> Self {
        let mut summary = RunSummary { total: 0, priced: 0 };
        for entry in snapshot.entries() {
            summary.total += 1;
            if entry.success {
                summary.priced += 1;
            }
        }
        summary
    }
}

/// Folds a fetch result and the extractor into one outcome.
pub fn classify(result: Result<Option<String>, FetchError>) -> FetchOutcome {
    match result {
        Ok(Some(raw_text)) => match extract_price(Some(&raw_text)) {
            Some(price) => FetchOutcome::Priced { price, raw_text },
            None => FetchOutcome::Unparsable { raw_text },
        },
        Ok(None) => FetchOutcome::NotFound,
        Err(e) => FetchOutcome::Failed { message: e.to_string() },
    }
}

pub struct Aggregator<'a> {
    fetcher: &'a dyn PageFetcher,
}

impl<'a> Aggregator<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Scrapes every source in catalog order, one at a time.
    ///
    /// Every source yields exactly one entry; fetch errors end up as
    /// unsuccessful entries and never abort the run.
    pub async fn run(&self, catalog: &Catalog) -> Snapshot {
        let mut snapshot = Snapshot::new(Utc::now());

        for (category, products) in catalog.iter() {
            let mut category_entries = OrderedMap::new();

            for (product, sources) in products.iter() {
                info!("📦 Category: {} -> {}", category, product);
                let mut product_entries = OrderedMap::new();

                for (index, source) in sources.iter().enumerate() {
                    let host = hostname(&source.url).unwrap_or_else(|e| {
                        warn!("Cannot read hostname of {}: {}", source.url, e);
                        source.url.clone()
                    });

                    info!("🔄 Scraping: {}", source.url);
                    let outcome = classify(self.fetcher.fetch(&source.url, &source.selector).await);
                    log_outcome(&source.url, &outcome);

                    let entry = ResultEntry::new(source, &outcome, Utc::now());
                    product_entries.insert(source_key(&host, index), entry);
                }

                category_entries.insert(product, product_entries);
            }

            snapshot.products.insert(category, category_entries);
        }

        snapshot
    }
}

fn log_outcome(url: &str, outcome: &FetchOutcome) {
    match outcome {
        FetchOutcome::Priced { price, raw_text } => {
            info!("📄 Found text: {:?}", raw_text);
            info!("✅ Price found: {}", price);
        }
        FetchOutcome::Unparsable { raw_text } => {
            info!("📄 Found text: {:?}", raw_text);
            warn!("❌ Could not extract a price from {}", url);
        }
        FetchOutcome::NotFound => warn!("❌ Element not found on {}", url),
        FetchOutcome::Failed { message } => warn!("❌ Error while scraping {}: {}", url, message),
    }
}
