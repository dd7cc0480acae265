use crate::model::FetchError;

/// Loads a page and reads the text of the first element matching `selector`.
///
/// `Ok(None)` means the page loaded but nothing matched.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, selector: &str) -> Result<Option<String>, FetchError>;
}
