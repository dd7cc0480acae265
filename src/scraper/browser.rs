//! Headless Chromium fetcher using chromiumoxide.
//!
//! Every call launches its own browser on a throwaway profile directory and
//! closes it before returning, so no cookies, cache or storage carry over from
//! one source to the next or from one run to the next.

use crate::config::ParserConfig;
use crate::model::FetchError;
use crate::scraper::PageFetcher;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, NavigateParams};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::path::Path;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Chrome lifecycle event fired after 500 ms without network connections.
const NETWORK_IDLE: &str = "networkIdle";

pub struct ChromiumFetcher {
    config: ParserConfig,
}

impl ChromiumFetcher {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Extra Chromium flags on top of `--no-sandbox`: no web security, no
    /// origin isolation, fixed user agent.
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "--disable-web-security".to_string(),
            "--disable-features=IsolateOrigins,site-per-process".to_string(),
            format!("--user-agent={}", self.config.user_agent),
        ]
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, FetchError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .no_sandbox()
            .args(self.launch_args())
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            })
            .request_timeout(self.config.timeout());

        if let Some(path) = &self.config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(FetchError::Launch)
    }

    async fn visit(&self, browser: &Browser, url: &str, selector: &str) -> Result<Option<String>, FetchError> {
        let page = browser.new_page("about:blank").await?;

        info!("🌐 Opening page: {}", url);
        match timeout(self.config.timeout(), navigate_until_idle(&page, url)).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout(self.config.timeout_ms)),
        }

        // Client-side rendering has no completion signal; a fixed pause is a heuristic.
        info!("⏳ Waiting {} ms for the page to settle...", self.config.wait_ms);
        sleep(self.config.settle_delay()).await;

        info!("🔍 Looking for selector: {}", selector);
        read_first_text(&page, selector).await
    }
}

/// Navigates and waits until the new document reports network idle.
async fn navigate_until_idle(page: &Page, url: &str) -> Result<(), FetchError> {
    let lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

    let navigation = page.execute(NavigateParams::new(url)).await?.result;
    if let Some(error) = navigation.error_text {
        return Err(FetchError::Navigation(error));
    }
    // Same-document navigations have no loader and no lifecycle of their own.
    let Some(loader_id) = navigation.loader_id else {
        return Ok(());
    };

    let events = lifecycle.map(|event| (event.loader_id.inner().clone(), event.name.clone()));
    if until_network_idle(events, loader_id.inner()).await {
        Ok(())
    } else {
        Err(FetchError::Navigation("page closed before network idle".to_string()))
    }
}

/// Consumes `(loader_id, event_name)` pairs until `loader_id` reports network
/// idle. Events of earlier documents (the initial `about:blank`) are skipped.
async fn until_network_idle<S>(mut events: S, loader_id: &str) -> bool
where
    S: Stream<Item = (String, String)> + Unpin,
{
    while let Some((loader, name)) = events.next().await {
        if loader == loader_id && name == NETWORK_IDLE {
            return true;
        }
    }
    false
}

async fn read_first_text(page: &Page, selector: &str) -> Result<Option<String>, FetchError> {
    let Some(element) = page.find_elements(selector).await?.into_iter().next() else {
        return Ok(None);
    };

    let returns = element
        .call_js_fn("function() { return this.textContent; }", false)
        .await?;

    Ok(returns
        .result
        .value
        .and_then(|value| value.as_str().map(str::to_owned)))
}

#[async_trait::async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(&self, url: &str, selector: &str) -> Result<Option<String>, FetchError> {
        let profile_dir = TempDir::new().map_err(|e| FetchError::Launch(e.to_string()))?;
        let config = self.browser_config(profile_dir.path())?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let result = self.visit(&browser, url, selector).await;

        // Teardown runs whatever the outcome of the visit.
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Browser process wait failed: {}", e);
        }
        handler_task.abort();
        drop(profile_dir);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_carry_user_agent_and_isolation_flags() {
        let fetcher = ChromiumFetcher::new(ParserConfig {
            user_agent: "TestAgent/1.0".to_string(),
            ..ParserConfig::default()
        });
        let args = fetcher.launch_args();

        assert!(args.contains(&"--disable-web-security".to_string()));
        assert!(args.contains(&"--disable-features=IsolateOrigins,site-per-process".to_string()));
        assert!(args.contains(&"--user-agent=TestAgent/1.0".to_string()));
    }

    fn fetcher_without_browser() -> ChromiumFetcher {
        ChromiumFetcher::new(ParserConfig {
            chrome_executable: Some("/nonexistent/chromium".into()),
            timeout_ms: 1_000,
            wait_ms: 0,
            ..ParserConfig::default()
        })
    }

    fn lifecycle(events: &[(&str, &str)]) -> impl Stream<Item = (String, String)> + Unpin {
        futures::stream::iter(
            events
                .iter()
                .map(|(loader, name)| (loader.to_string(), name.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn every_launch_gets_its_own_profile_dir() {
        let fetcher = fetcher_without_browser();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let a = fetcher.browser_config(first.path()).unwrap();
        let b = fetcher.browser_config(second.path()).unwrap();

        assert_eq!(a.user_data_dir.as_deref(), Some(first.path()));
        assert_eq!(b.user_data_dir.as_deref(), Some(second.path()));
        assert_ne!(a.user_data_dir, b.user_data_dir);
    }

    #[tokio::test]
    async fn idle_of_blank_page_does_not_count() {
        let events = lifecycle(&[
            ("blank", "init"),
            ("blank", "networkIdle"),
            ("nav", "init"),
            ("nav", "load"),
            ("nav", "networkAlmostIdle"),
        ]);
        assert!(!until_network_idle(events, "nav").await);
    }

    #[tokio::test]
    async fn idle_of_navigated_document_completes() {
        let events = lifecycle(&[
            ("blank", "networkIdle"),
            ("nav", "init"),
            ("nav", "load"),
            ("nav", "networkIdle"),
        ]);
        assert!(until_network_idle(events, "nav").await);
    }

    #[tokio::test]
    async fn endless_polling_hits_the_timeout() {
        let events = futures::stream::pending::<(String, String)>();
        let waited = timeout(
            std::time::Duration::from_millis(50),
            until_network_idle(events, "nav"),
        )
        .await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn missing_executable_fails_without_panicking() {
        let fetcher = fetcher_without_browser();

        let result = fetcher.fetch("https://example.com/", "span").await;
        assert!(matches!(result, Err(FetchError::Launch(_))));
    }
}
