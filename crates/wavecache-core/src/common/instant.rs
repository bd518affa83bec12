//! Serde helpers for instant fields.
//!
//! The waveform service reports instants either as epoch seconds or as
//! ISO-8601 strings. Both forms deserialize into `f64` epoch seconds, which is
//! the only time representation used inside the data plane. Serialization
//! always emits epoch seconds.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Secs(f64),
    Iso(String),
}

/// Parses an ISO-8601 / RFC-3339 instant into epoch seconds.
pub fn parse_iso_seconds(raw: &str) -> Option<f64> {
    let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(parsed.timestamp() as f64 + f64::from(parsed.timestamp_subsec_nanos()) / 1e9)
}

pub fn serialize<S>(secs: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(*secs)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawInstant::deserialize(deserializer)? {
        RawInstant::Secs(secs) => Ok(secs),
        RawInstant::Iso(raw) => parse_iso_seconds(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 instant: {raw}"))),
    }
}
