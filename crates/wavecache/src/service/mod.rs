//! Network boundary to the remote waveform service.

mod http;

pub use http::HttpWaveformService;

use crate::{ChannelSegment, EventsWithDetectionsAndSegments, RequestConfig, Result};
use tokio_util::sync::CancellationToken;

/// Source of channel segments and events.
///
/// Implementations must stop work and fail with
/// [`Error::Cancelled`](crate::Error::Cancelled) once `token` is cancelled.
pub trait WaveformService: Send + Sync + 'static {
    fn fetch_channel_segments(
        &self,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<ChannelSegment>>> + Send;

    fn fetch_events_with_segments(
        &self,
        config: &RequestConfig,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<EventsWithDetectionsAndSegments>> + Send;
}
