//! Named-operation surface of the background worker.

use crate::{
    Request, Response, Result,
    boundary::calculate_windowed_bounds,
    cancellation::CancellationRegistry,
    fetch::{fetch_channel_segments_by_channel, fetch_events_and_detections_with_segments},
    metrics::increment_requests,
    service::WaveformService,
    sleep::{SleepProvider, TokioSleep},
    windowed::get_waveform,
    worker_store::WaveformStore,
};
use std::sync::Arc;

/// Routes each [`Request`] to its operation.
///
/// Failures are logged here, once, and returned unchanged. Cancellations are
/// returned the same way but never logged as failures.
pub struct Dispatcher<Svc, S = TokioSleep> {
    service: Arc<Svc>,
    store: WaveformStore<S>,
    registry: CancellationRegistry,
}

impl<Svc, S> Clone for Dispatcher<Svc, S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            store: self.store.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<Svc, S> Dispatcher<Svc, S>
where
    Svc: WaveformService,
    S: SleepProvider,
{
    pub fn new(service: Svc, store: WaveformStore<S>) -> Self {
        Self {
            service: Arc::new(service),
            store,
            registry: CancellationRegistry::new(),
        }
    }

    pub fn store(&self) -> &WaveformStore<S> {
        &self.store
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: Request) -> Result<Response> {
        increment_requests();
        let _op = request.name();

        #[cfg(feature = "tracing")]
        tracing::trace!("Dispatching {_op}");

        let outcome = match request {
            Request::FetchChannelSegmentsByChannel(params) => fetch_channel_segments_by_channel(
                self.service.as_ref(),
                &self.registry,
                &self.store,
                params,
            )
            .await
            .map(Response::ChannelSegments),
            Request::FetchEventsAndDetectionsWithSegments(params) => {
                fetch_events_and_detections_with_segments(
                    self.service.as_ref(),
                    &self.registry,
                    &self.store,
                    params,
                )
                .await
                .map(Response::EventsWithSegments)
            }
            Request::GetWaveform(params) => get_waveform(
                &self.store,
                &params.id,
                params.start_time,
                params.end_time,
                params.domain,
            )
            .await
            .map(Response::Waveform),
            Request::GetBoundaries(params) => calculate_windowed_bounds(
                &self.store,
                &params.channel_segment,
                params.start_time,
                params.end_time,
            )
            .await
            .map(Response::Boundaries),
            Request::ClearWaveforms => self.store.cleanup().await.map(|()| Response::Cleared),
            Request::CancelAllRequests => Ok(Response::CancelledRequests {
                count: self.registry.cancel_all(),
            }),
        };

        match &outcome {
            Err(_err) if _err.is_cancellation() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("{_op} cancelled");
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("{_op} failed: {_err}");
            }
            Ok(_) => {}
        }

        outcome
    }
}
