use crate::config::ParserConfig;
use crate::model::FetchError;
use crate::scraper::PageFetcher;

use reqwest::Client;
use ::scraper::{Html, Selector};
use tracing::debug;

/// Static-HTML fetcher for shops that render prices server-side.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ParserConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, selector: &str) -> Result<Option<String>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        debug!("Fetched {} bytes from {}", html.len(), url);
        select_text(&html, selector)
    }
}

/// Text content of the first element matching `selector`.
pub fn select_text(html: &str, selector: &str) -> Result<Option<String>, FetchError> {
    let selector = Selector::parse(selector).map_err(|e| FetchError::Selector(e.to_string()))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>()))
}
