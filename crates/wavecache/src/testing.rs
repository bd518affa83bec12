//! Test doubles shared by the dispatcher, fetch and worker tests.

use crate::{
    ChannelRef, ChannelSegment, ChannelSegmentId, Error, EventsWithDetectionsAndSegments,
    RequestConfig, Result, TimeseriesType, Waveform, cancellation::until_cancelled,
    service::WaveformService,
};
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
pub struct FakeService {
    segments: Vec<ChannelSegment>,
    events: EventsWithDetectionsAndSegments,
    failure: Option<Error>,
    hang: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeService {
    pub fn with_segments(segments: Vec<ChannelSegment>) -> Self {
        Self {
            segments,
            ..Default::default()
        }
    }

    pub fn with_events(events: EventsWithDetectionsAndSegments) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    /// Never answers; only cancellation ends the call.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn failing(err: Error) -> Self {
        Self {
            failure: Some(err),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T: Clone>(&self, value: &T, token: &CancellationToken) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            return until_cancelled(token, futures::future::pending()).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(value.clone()),
        }
    }
}

impl WaveformService for FakeService {
    async fn fetch_channel_segments(
        &self,
        _config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<Vec<ChannelSegment>> {
        self.answer(&self.segments, token).await
    }

    async fn fetch_events_with_segments(
        &self,
        _config: &RequestConfig,
        token: &CancellationToken,
    ) -> Result<EventsWithDetectionsAndSegments> {
        self.answer(&self.events, token).await
    }
}

pub fn request_config(base_url: Option<&str>) -> RequestConfig {
    RequestConfig {
        url: "/waveform/channel-segment/query".into(),
        base_url: base_url.map(str::to_owned),
        ..Default::default()
    }
}

/// A single-span 1 Hz waveform channel segment.
pub fn waveform_segment(name: &str, start: f64, samples: Vec<f64>) -> ChannelSegment {
    ChannelSegment {
        id: ChannelSegmentId {
            channel: ChannelRef { name: name.into() },
            creation_time: start,
            start_time: start,
        },
        timeseries_type: TimeseriesType::Waveform,
        timeseries: vec![Waveform {
            kind: TimeseriesType::Waveform,
            start_time: start,
            end_time: start + samples.len().saturating_sub(1) as f64,
            sample_rate: 1.0,
            sample_count: samples.len(),
            samples,
        }],
    }
}
