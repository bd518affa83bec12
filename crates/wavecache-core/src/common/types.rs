//! Shared data model for stored buffers and amplitude bounds.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Interleaved `[x, value, x, value, ...]` samples stored under a claim check.
///
/// `x` is the sample time mapped onto the normalised `[GL_MIN, GL_MAX]` display
/// range. Buffers are shared, never mutated after creation.
pub type PositionBuffer = Arc<[f32]>;

/// Filter id used for boundaries computed on raw (unfiltered) data.
pub const UNFILTERED: &str = "unfiltered";

/// Lower edge of the normalised display range.
pub const GL_MIN: f64 = 0.0;
/// Upper edge of the normalised display range.
pub const GL_MAX: f64 = 100.0;

/// Unit of durable storage: a content-derived id and the value stored under it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry<T> {
    pub id: String,
    pub value: T,
}

impl<T> ResultEntry<T> {
    pub fn new(id: impl Into<String>, value: T) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// Closed time interval in epoch seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_time_secs: f64,
    pub end_time_secs: f64,
}

impl TimeRange {
    pub const fn new(start_time_secs: f64, end_time_secs: f64) -> Self {
        Self {
            start_time_secs,
            end_time_secs,
        }
    }

    /// Returns the range as a two-point scale domain.
    pub const fn as_domain(&self) -> [f64; 2] {
        [self.start_time_secs, self.end_time_secs]
    }

    /// Inclusive overlap test against an optional window. Missing window
    /// edges are unbounded.
    pub fn overlaps(&self, start: Option<f64>, end: Option<f64>) -> bool {
        let starts_before_end = end.is_none_or(|end| self.start_time_secs <= end);
        let ends_after_start = start.is_none_or(|start| self.end_time_secs >= start);
        starts_before_end && ends_after_start
    }
}

/// Signed amplitude extremes within a window, with the time each occurs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmplitudeBounds {
    pub amplitude_max: f64,
    pub amplitude_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude_max_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude_min_secs: Option<f64>,
}

/// Display scaling record for a channel segment.
///
/// `offset` is always `max(|top_max|, |bottom_max|)` and `channel_avg` is
/// always zero: waveforms render centred on zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSegmentBoundaries {
    pub top_max: f64,
    pub bottom_max: f64,
    pub channel_avg: f64,
    pub offset: f64,
    pub channel_segment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_max_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_max_secs: Option<f64>,
}

impl ChannelSegmentBoundaries {
    /// Builds a record from extremes, deriving `offset` and zeroing the
    /// average.
    pub fn from_extremes(
        channel_segment_id: impl Into<String>,
        top_max: f64,
        bottom_max: f64,
        top_max_secs: Option<f64>,
        bottom_max_secs: Option<f64>,
    ) -> Self {
        Self {
            top_max,
            bottom_max,
            channel_avg: 0.0,
            offset: top_max.abs().max(bottom_max.abs()),
            channel_segment_id: channel_segment_id.into(),
            top_max_secs,
            bottom_max_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_inclusive_and_open_ended() {
        let range = TimeRange::new(10.0, 20.0);
        assert!(range.overlaps(Some(20.0), Some(30.0)));
        assert!(range.overlaps(Some(0.0), Some(10.0)));
        assert!(range.overlaps(None, None));
        assert!(range.overlaps(None, Some(15.0)));
        assert!(!range.overlaps(Some(20.5), None));
        assert!(!range.overlaps(Some(0.0), Some(9.9)));
    }

    #[test]
    fn boundaries_derive_offset_from_larger_magnitude() {
        let bounds = ChannelSegmentBoundaries::from_extremes("cs", 3.0, -7.5, None, None);
        assert_eq!(bounds.offset, 7.5);
        assert_eq!(bounds.channel_avg, 0.0);
    }

    #[test]
    fn boundaries_serialize_camel_case_and_skip_missing_times() {
        let bounds = ChannelSegmentBoundaries::from_extremes("cs", 1.0, -1.0, Some(2.0), None);
        let json = serde_json::to_value(&bounds).unwrap();
        assert_eq!(json["topMax"], 1.0);
        assert_eq!(json["channelSegmentId"], "cs");
        assert_eq!(json["topMaxSecs"], 2.0);
        assert!(json.get("bottomMaxSecs").is_none());
    }
}
