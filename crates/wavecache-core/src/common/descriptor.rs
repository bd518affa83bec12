//! Lightweight descriptors handed to the renderer in place of raw samples.

use super::types::{ChannelSegmentBoundaries, TimeRange};
use super::wire::ChannelSegmentId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Colour given to converted waveform spans.
pub const DEFAULT_WAVEFORM_COLOR: &str = "#4580E6";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayType {
    Line,
    Scatter,
}

/// Reference to a stored position buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataClaimCheck {
    pub id: String,
    pub start_time_secs: f64,
    pub end_time_secs: f64,
    pub sample_rate: f64,
    pub domain_time_range: TimeRange,
}

impl DataClaimCheck {
    pub const fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_time_secs, self.end_time_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBySampleRate {
    pub start_time_secs: f64,
    pub end_time_secs: f64,
    pub sample_rate: f64,
    pub values: Vec<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeValuePair {
    pub time_secs: f64,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataByTime {
    pub values: Vec<TimeValuePair>,
}

/// Payload of a data segment. Only [`DataSegmentData::ClaimCheck`] refers to
/// stored buffers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DataSegmentData {
    ClaimCheck(DataClaimCheck),
    BySampleRate(DataBySampleRate),
    ByTime(DataByTime),
}

impl DataSegmentData {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClaimCheck(_) => "claimCheck",
            Self::BySampleRate(_) => "bySampleRate",
            Self::ByTime(_) => "byTime",
        }
    }

    /// Returns the claim check, failing for inline data.
    pub fn as_claim_check(&self) -> Result<&DataClaimCheck> {
        match self {
            Self::ClaimCheck(claim_check) => Ok(claim_check),
            other => Err(Error::MalformedChannelSegment {
                reason: format!("expected claim check data, found {}", other.kind()),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<Vec<DisplayType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_size: Option<f64>,
    pub data: DataSegmentData,
}

impl DataSegment {
    /// A line-rendered segment pointing at a stored buffer.
    pub fn claim_check(data: DataClaimCheck) -> Self {
        Self {
            color: Some(DEFAULT_WAVEFORM_COLOR.to_owned()),
            display_type: Some(vec![DisplayType::Line]),
            point_size: None,
            data: DataSegmentData::ClaimCheck(data),
        }
    }
}

/// Display-side channel segment bundling data segment descriptors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeavessChannelSegment {
    pub channel_name: String,
    pub wf_filter_id: String,
    pub is_selected: bool,
    pub data_segments: Vec<DataSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_segment_boundaries: Option<ChannelSegmentBoundaries>,
}

/// Pass-through identity of the channel segment a descriptor was built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSegmentDescriptor {
    pub id: ChannelSegmentId,
    pub end_time: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiChannelSegment {
    pub channel_segment_descriptor: ChannelSegmentDescriptor,
    pub channel_segment: WeavessChannelSegment,
}

/// Events query result with channel segments reduced to descriptors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiEventsWithSegments {
    pub events: Vec<serde_json::Value>,
    pub signal_detections: Vec<serde_json::Value>,
    pub ui_channel_segments: Vec<UiChannelSegment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim_check() -> DataClaimCheck {
        DataClaimCheck {
            id: "cc".into(),
            start_time_secs: 1.0,
            end_time_secs: 2.0,
            sample_rate: 40.0,
            domain_time_range: TimeRange::new(0.0, 10.0),
        }
    }

    #[test]
    fn claim_check_segments_are_tagged() {
        let json = serde_json::to_value(DataSegment::claim_check(claim_check())).unwrap();
        assert_eq!(json["data"]["kind"], "claimCheck");
        assert_eq!(json["data"]["domainTimeRange"]["endTimeSecs"], 10.0);
        assert_eq!(json["displayType"][0], "LINE");
        assert!(json.get("pointSize").is_none());
    }

    #[test]
    fn inline_data_is_not_a_claim_check() {
        let data = DataSegmentData::ByTime(DataByTime { values: vec![] });
        let err = data.as_claim_check().unwrap_err();
        assert!(matches!(err, Error::MalformedChannelSegment { .. }));
        assert!(
            DataSegmentData::ClaimCheck(claim_check())
                .as_claim_check()
                .is_ok()
        );
    }
}
