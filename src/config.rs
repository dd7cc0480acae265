use crate::model::{Catalog, ConfigError};
use crate::utils::hostname;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_OUTPUT_PATH: &str = "results/prices.json";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Which page fetcher drives the scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchBackend {
    /// Headless Chromium, renders client-side JavaScript.
    #[default]
    Chromium,
    /// Plain HTTP GET + static HTML parsing.
    Http,
}

impl std::str::FromStr for FetchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chromium" => Ok(FetchBackend::Chromium),
            "http" => Ok(FetchBackend::Http),
            other => Err(format!("unknown backend '{}', expected 'chromium' or 'http'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub timeout_ms: u64,
    pub wait_ms: u64,
    pub user_agent: String,
    pub backend: FetchBackend,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            wait_ms: 5_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            backend: FetchBackend::default(),
            chrome_executable: None,
        }
    }
}

impl ParserConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Fixed pause after load so client-side rendering can settle.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    pub products: Catalog,
}

impl AppConfig {
    /// Every source url must be absolute and carry a hostname, since the
    /// hostname becomes part of the snapshot key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for products in self.products.values() {
            for sources in products.values() {
                for source in sources {
                    hostname(&source.url).map_err(|reason| ConfigError::InvalidSourceUrl {
                        url: source.url.clone(),
                        reason,
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Applies per-run overrides from environment-style variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_ms = |var: &str| -> Result<Option<u64>, ConfigError> {
            lookup(var)
                .map(|raw| {
                    raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
                        var: var.to_string(),
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        if let Some(ms) = parse_ms("SNIPER_TIMEOUT_MS")? {
            self.parser.timeout_ms = ms;
        }
        if let Some(ms) = parse_ms("SNIPER_WAIT_MS")? {
            self.parser.wait_ms = ms;
        }
        if let Some(ua) = lookup("SNIPER_USER_AGENT") {
            self.parser.user_agent = ua;
        }
        if let Some(raw) = lookup("SNIPER_BACKEND") {
            self.parser.backend = raw.parse().map_err(|reason| ConfigError::InvalidEnvVar {
                var: "SNIPER_BACKEND".to_string(),
                reason,
            })?;
        }
        if let Some(path) = lookup("SNIPER_OUTPUT") {
            self.output_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CHROME_EXECUTABLE_PATH") {
            self.parser.chrome_executable = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.apply_overrides(|var| std::env::var(var).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"{
        "products": {
            "арматура": {
                "арматура 8мм": [
                    { "url": "https://tyumen.spk.ru/product/a/", "selector": "span" },
                    { "url": "https://72parad.ru/b", "selector": "li > h2" }
                ]
            }
        }
    }"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.parser.timeout_ms, 30_000);
        assert_eq!(config.parser.wait_ms, 5_000);
        assert_eq!(config.parser.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.parser.backend, FetchBackend::Chromium);
        assert_eq!(config.output_path, PathBuf::from("results/prices.json"));

        let sources = config.products.get("арматура").unwrap().get("арматура 8мм").unwrap();
        assert_eq!(sources[1].selector, "li > h2");
    }

    #[test]
    fn parser_section_is_read() {
        let config = parse_config(
            r#"{
                "parser": { "timeout_ms": 1000, "backend": "http" },
                "output_path": "out/p.json",
                "products": {}
            }"#,
        )
        .unwrap();
        assert_eq!(config.parser.timeout(), Duration::from_secs(1));
        assert_eq!(config.parser.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.parser.backend, FetchBackend::Http);
        assert_eq!(config.output_path, PathBuf::from("out/p.json"));
    }

    #[test]
    fn relative_source_url_is_fatal() {
        let err = parse_config(
            r#"{ "products": { "c": { "p": [ { "url": "/no/host", "selector": "b" } ] } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSourceUrl { ref url, .. } if url == "/no/host"));
    }

    #[test]
    fn structurally_invalid_catalog_is_fatal() {
        let err = parse_config(r#"{ "products": { "c": { "p": "not a list" } } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(matches!(parse_config("{}").unwrap_err(), ConfigError::Json(_)));
    }

    #[test]
    fn overrides_replace_knobs() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SNIPER_TIMEOUT_MS", "1500"),
            ("SNIPER_WAIT_MS", "0"),
            ("SNIPER_USER_AGENT", "TestAgent/1.0"),
            ("SNIPER_BACKEND", "HTTP"),
            ("SNIPER_OUTPUT", "/tmp/x.json"),
            ("CHROME_EXECUTABLE_PATH", "/usr/bin/chromium-browser"),
        ]);
        let mut config = parse_config(MINIMAL).unwrap();
        config
            .apply_overrides(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.parser.timeout_ms, 1500);
        assert_eq!(config.parser.wait_ms, 0);
        assert_eq!(config.parser.user_agent, "TestAgent/1.0");
        assert_eq!(config.parser.backend, FetchBackend::Http);
        assert_eq!(config.output_path, PathBuf::from("/tmp/x.json"));
        assert_eq!(
            config.parser.chrome_executable,
            Some(PathBuf::from("/usr/bin/chromium-browser"))
        );
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = parse_config(MINIMAL).unwrap();
        let err = config
            .apply_overrides(|var| (var == "SNIPER_WAIT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "SNIPER_WAIT_MS"));

        let err = config
            .apply_overrides(|var| (var == "SNIPER_BACKEND").then(|| "firefox".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn shipped_config_is_valid() {
        let config = parse_config(include_str!("../config.json")).unwrap();
        assert_eq!(config.products.len(), 2);
        let total: usize = config
            .products
            .values()
            .flat_map(|p| p.values())
            .map(Vec::len)
            .sum();
        assert_eq!(total, 6);
    }
}
