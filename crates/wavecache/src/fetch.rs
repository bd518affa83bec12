//! Fetch operations: network call, then conversion into stored buffers.
//!
//! The base URL is checked before anything is registered. Every fetch holds a
//! registration in the [`CancellationRegistry`] only while the network call is
//! outstanding. A cancellation that lands after the response arrived does not
//! stop conversion; the buffers it stores are keyed by content, so they are
//! simply reused later.

use crate::{
    FetchChannelSegmentsParams, FetchEventsParams, Result, UiChannelSegment, UiEventsWithSegments,
    cancellation::{CancellationRegistry, Registration},
    claim_check::convert_channel_segments,
    metrics::{
        decrement_fetches_inflight, increment_fetch_errors, increment_fetches_inflight,
        record_fetch_duration,
    },
    service::WaveformService,
    sleep::SleepProvider,
    worker_store::WaveformStore,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A registered network call. Deregisters and records its duration on drop.
struct InflightFetch {
    registration: Registration,
    started: Instant,
}

impl InflightFetch {
    fn begin(registry: &CancellationRegistry) -> Self {
        increment_fetches_inflight();
        Self {
            registration: registry.register(),
            started: Instant::now(),
        }
    }

    fn token(&self) -> &CancellationToken {
        self.registration.token()
    }
}

impl Drop for InflightFetch {
    fn drop(&mut self) {
        decrement_fetches_inflight();
        record_fetch_duration(self.started.elapsed().as_secs_f64() * 1_000.0);
    }
}

/// Fetches channel segments and converts them into claim check descriptors.
///
/// # Errors
///
/// - [`Error::MissingBaseUrl`](crate::Error::MissingBaseUrl) before any
///   network attempt.
/// - [`Error::Cancelled`](crate::Error::Cancelled) if cancelled while the
///   request was outstanding.
/// - Network, decoding and storage failures unchanged.
pub async fn fetch_channel_segments_by_channel<Svc, S>(
    service: &Svc,
    registry: &CancellationRegistry,
    store: &WaveformStore<S>,
    params: FetchChannelSegmentsParams,
) -> Result<Vec<UiChannelSegment>>
where
    Svc: WaveformService,
    S: SleepProvider,
{
    params.request_config.base_url()?;

    let fetch = InflightFetch::begin(registry);
    let outcome = service
        .fetch_channel_segments(&params.request_config, fetch.token())
        .await;
    drop(fetch);

    let segments = outcome.inspect_err(|_| increment_fetch_errors())?;
    convert_channel_segments(store, segments, params.domain).await
}

/// Fetches events, signal detections and channel segments for a time range,
/// converting the channel segments into claim check descriptors.
pub async fn fetch_events_and_detections_with_segments<Svc, S>(
    service: &Svc,
    registry: &CancellationRegistry,
    store: &WaveformStore<S>,
    params: FetchEventsParams,
) -> Result<UiEventsWithSegments>
where
    Svc: WaveformService,
    S: SleepProvider,
{
    params.request_config.base_url()?;

    let fetch = InflightFetch::begin(registry);
    let outcome = service
        .fetch_events_with_segments(&params.request_config, fetch.token())
        .await;
    drop(fetch);

    let composite = outcome.inspect_err(|_| increment_fetch_errors())?;
    let ui_channel_segments =
        convert_channel_segments(store, composite.channel_segments, params.domain).await?;

    Ok(UiEventsWithSegments {
        events: composite.events,
        signal_detections: composite.signal_detections,
        ui_channel_segments,
    })
}
