// Utility functions
use chrono::{DateTime, Utc};
use url::Url;

/// Converts an RFC 3339 string into `DateTime<Utc>`, if possible.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Hostname of an absolute URL, without port.
pub fn hostname(url: &str) -> Result<String, String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    parsed
        .host_str()
        .map(str::to_owned)
        .ok_or_else(|| "url has no host".to_string())
}

/// Key of a source inside its product: `<hostname>_<index>`.
pub fn source_key(host: &str, index: usize) -> String {
    format!("{}_{}", host, index)
}

/// Writes whole prices as JSON integers (`999`, not `999.0`).
pub fn serialize_price<S: serde::Serializer>(price: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    // Integers above 2^53 are not exact in f64 anyway.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    match price {
        Some(p) if p.fract() == 0.0 && p.abs() < MAX_EXACT => serializer.serialize_i64(*p as i64),
        Some(p) => serializer.serialize_f64(*p),
        None => serializer.serialize_none(),
    }
}

/// ISO-8601 UTC timestamps with millisecond precision (`2026-10-18T09:30:00.123Z`).
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_datetime(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}
