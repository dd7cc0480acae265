// Core structs: Source, Catalog, ResultEntry, Snapshot
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// String-keyed map that keeps keys in insertion order.
///
/// Config-file order is scrape order and snapshot order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// One retailer page and the CSS selector of its price element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub selector: String,
}

/// category -> product -> ordered sources
pub type Catalog = OrderedMap<OrderedMap<Vec<Source>>>;

/// What happened when a single source was scraped.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Priced { price: f64, raw_text: String },
    /// Element found, but its text holds no number.
    Unparsable { raw_text: String },
    NotFound,
    Failed { message: String },
}

impl FetchOutcome {
    pub fn price(&self) -> Option<f64> {
        match self {
            FetchOutcome::Priced { price, .. } => Some(*price),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(serialize_with = "crate::utils::serialize_price")]
    pub price: Option<f64>,
    pub url: String,
    pub selector: String,
    pub success: bool,
    #[serde(with = "crate::utils::iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl ResultEntry {
    pub fn new(source: &Source, outcome: &FetchOutcome, timestamp: DateTime<Utc>) -> Self {
        let price = outcome.price();
        Self {
            price,
            url: source.url.clone(),
            selector: source.selector.clone(),
            success: price.is_some(),
            timestamp,
        }
    }
}

/// category -> product -> source key -> entry
pub type PriceTable = OrderedMap<OrderedMap<OrderedMap<ResultEntry>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "crate::utils::iso_millis")]
    pub last_updated: DateTime<Utc>,
    pub products: PriceTable,
}

impl Snapshot {
    pub fn new(last_updated: DateTime<Utc>) -> Self {
        Self {
            last_updated,
            products: OrderedMap::new(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ResultEntry> {
        self.products
            .values()
            .flat_map(|products| products.values())
            .flat_map(|sources| sources.values())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid source url {url:?}: {reason}")]
    InvalidSourceUrl { url: String, reason: String },
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("navigation timed out after {0} ms")]
    Timeout(u64),
    #[error("invalid selector: {0}")]
    Selector(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
