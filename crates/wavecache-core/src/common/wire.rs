//! Records as returned by the remote waveform service.
//!
//! Only the fields the data plane reads are modelled. Events and signal
//! detections are carried through untouched.

use super::instant;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef {
    pub name: String,
}

/// Identity of a channel segment: channel, creation time and start time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSegmentId {
    pub channel: ChannelRef,
    #[serde(with = "instant")]
    pub creation_time: f64,
    #[serde(with = "instant")]
    pub start_time: f64,
}

impl ChannelSegmentId {
    /// Stable string form used as the leading part of claim checks.
    pub fn to_key(&self) -> String {
        format!(
            "{}.{}.{}",
            self.channel.name, self.creation_time, self.start_time
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeseriesType {
    #[default]
    Waveform,
    FkSpectra,
}

impl TimeseriesType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Waveform => "WAVEFORM",
            Self::FkSpectra => "FK_SPECTRA",
        }
    }
}

/// One contiguous span of regularly sampled data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waveform {
    #[serde(rename = "type", default)]
    pub kind: TimeseriesType,
    #[serde(with = "instant")]
    pub start_time: f64,
    #[serde(with = "instant")]
    pub end_time: f64,
    pub sample_rate: f64,
    pub sample_count: usize,
    #[serde(default)]
    pub samples: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSegment {
    pub id: ChannelSegmentId,
    #[serde(default)]
    pub timeseries_type: TimeseriesType,
    #[serde(default)]
    pub timeseries: Vec<Waveform>,
}

impl ChannelSegment {
    /// Earliest start and latest end across all spans.
    pub fn span(&self) -> Option<(f64, f64)> {
        self.timeseries.iter().fold(None, |acc, series| match acc {
            None => Some((series.start_time, series.end_time)),
            Some((start, end)) => Some((start.min(series.start_time), end.max(series.end_time))),
        })
    }
}

/// Composite response of an events-by-time query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsWithDetectionsAndSegments {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
    #[serde(default)]
    pub signal_detections: Vec<serde_json::Value>,
    #[serde(default)]
    pub channel_segments: Vec<ChannelSegment>,
}
