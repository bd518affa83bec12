//! Cross-thread protocol between the foreground and the background worker.
//!
//! Each [`Request`] names one operation and carries a single parameter
//! object. The worker answers with a [`Response`], where failures travel as
//! [`Response::Rejected`] holding the error's display string.

use super::descriptor::{UiChannelSegment, UiEventsWithSegments, WeavessChannelSegment};
use super::types::{ChannelSegmentBoundaries, PositionBuffer, TimeRange};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
}

/// Outbound request description supplied by the foreground.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, rename = "baseURL", alias = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RequestConfig {
    /// Returns the base URL, rejecting a missing or blank one.
    pub fn base_url(&self) -> Result<&str> {
        match self.base_url.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => Ok(base),
            _ => Err(Error::MissingBaseUrl),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchChannelSegmentsParams {
    pub request_config: RequestConfig,
    /// Display domain the position buffers are normalised against.
    pub domain: TimeRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchEventsParams {
    pub request_config: RequestConfig,
    pub domain: TimeRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetWaveformParams {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub domain: TimeRange,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBoundariesParams {
    pub channel_segment: WeavessChannelSegment,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
}

/// The fixed set of operations exposed by the background worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "params", rename_all = "camelCase")]
pub enum Request {
    FetchChannelSegmentsByChannel(FetchChannelSegmentsParams),
    FetchEventsAndDetectionsWithSegments(FetchEventsParams),
    GetWaveform(GetWaveformParams),
    GetBoundaries(GetBoundariesParams),
    ClearWaveforms,
    CancelAllRequests,
}

impl Request {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FetchChannelSegmentsByChannel(_) => "fetchChannelSegmentsByChannel",
            Self::FetchEventsAndDetectionsWithSegments(_) => {
                "fetchEventsAndDetectionsWithSegments"
            }
            Self::GetWaveform(_) => "getWaveform",
            Self::GetBoundaries(_) => "getBoundaries",
            Self::ClearWaveforms => "clearWaveforms",
            Self::CancelAllRequests => "cancelAllRequests",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Response {
    ChannelSegments(Vec<UiChannelSegment>),
    EventsWithSegments(UiEventsWithSegments),
    Waveform(PositionBuffer),
    Boundaries(Option<ChannelSegmentBoundaries>),
    Cleared,
    CancelledRequests { count: usize },
    Rejected { reason: String, cancelled: bool },
}

impl Response {
    /// Folds an operation outcome into a response, turning errors into
    /// [`Response::Rejected`].
    pub fn from_result(result: Result<Self>) -> Self {
        match result {
            Ok(response) => response,
            Err(err) => Self::Rejected {
                cancelled: err.is_cancellation(),
                reason: err.to_string(),
            },
        }
    }

    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_use_op_and_params() {
        let raw = r#"{
            "op": "getWaveform",
            "params": {
                "id": "cc",
                "startTime": 1.0,
                "endTime": 2.0,
                "domain": { "startTimeSecs": 0.0, "endTimeSecs": 10.0 }
            }
        }"#;
        let request: Request = serde_json::from_str(raw).unwrap();
        assert_eq!(request.name(), "getWaveform");

        let clear: Request = serde_json::from_str(r#"{"op": "clearWaveforms"}"#).unwrap();
        assert_eq!(clear, Request::ClearWaveforms);
    }

    #[test]
    fn blank_base_url_is_missing() {
        let mut config = RequestConfig {
            url: "/waveform".into(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), Err(Error::MissingBaseUrl));
        config.base_url = Some("   ".into());
        assert_eq!(config.base_url(), Err(Error::MissingBaseUrl));
        config.base_url = Some("http://svc".into());
        assert_eq!(config.base_url(), Ok("http://svc"));
    }

    #[test]
    fn errors_become_rejections() {
        let cancelled = Response::from_result(Err(Error::Cancelled));
        assert_eq!(
            cancelled,
            Response::Rejected {
                reason: "Request cancelled".into(),
                cancelled: true,
            }
        );
        let missing = Response::from_result(Err(Error::NotFound { id: "x".into() }));
        assert!(matches!(
            missing,
            Response::Rejected { cancelled: false, ref reason } if reason == "no result found for id x"
        ));
    }
}
