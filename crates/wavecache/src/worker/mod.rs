//! Background worker host.
//!
//! [`WaveformWorker::spawn`] starts one OS thread running a current-thread
//! Tokio runtime: the single execution context that owns the worker store and
//! cancellation registry. Requests arrive over a bounded channel in order;
//! each is handled on its own task so fetches interleave and can be cancelled
//! independently.

mod request;

pub use request::WorkRequest;

use crate::{
    Error, Request, Response, Result, WorkerConfig,
    dispatcher::Dispatcher,
    probe::{ByteBudget, Unbounded},
    result_table::ResultBackend,
    service::WaveformService,
    sleep::SleepProvider,
    worker_store::WaveformStore,
};
use core::time::Duration;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// Processes [`WorkRequest`]s until shutdown or until every handle is gone.
pub async fn worker_loop<Svc, S>(mut rx: mpsc::Receiver<WorkRequest>, dispatcher: Dispatcher<Svc, S>)
where
    Svc: WaveformService,
    S: SleepProvider,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Waveform worker started");

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Dispatch { request, response } => {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let outcome = dispatcher.dispatch(request).await;
                    if response.send(outcome).is_err() {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Caller went away before the reply");
                    }
                });
            }
            WorkRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Waveform worker received shutdown signal");

                dispatcher.registry().cancel_all();
                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Waveform worker failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Waveform worker stopped");
}

pub struct WaveformWorker;

impl WaveformWorker {
    /// Starts the worker thread and returns a handle to it.
    pub fn spawn<Svc>(
        config: &WorkerConfig,
        service: Svc,
        backend: Arc<dyn ResultBackend>,
    ) -> Result<WorkerHandle>
    where
        Svc: WaveformService,
    {
        let store: WaveformStore = match config.memory_budget_bytes {
            Some(budget) => WaveformStore::with_probe(
                backend,
                ByteBudget::new(budget),
                config.capacity_threshold_bytes,
            ),
            None => WaveformStore::with_probe(backend, Unbounded, config.capacity_threshold_bytes),
        };
        let dispatcher = Dispatcher::new(service, store);
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));

        std::thread::Builder::new()
            .name("wavecache-worker".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build();
                match runtime {
                    Ok(runtime) => runtime.block_on(worker_loop(rx, dispatcher)),
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::error!("Failed to build worker runtime: {_e}");
                    }
                }
            })
            .map_err(|e| Error::ChannelError {
                context: format!("failed to spawn worker thread: {e}"),
            })?;

        Ok(WorkerHandle {
            tx,
            shutdown_token: CancellationToken::new(),
            shutdown_timeout: config.shutdown_timeout,
        })
    }
}

/// Cloneable handle used by the foreground to talk to the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkRequest>,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl WorkerHandle {
    /// Sends one request and waits for its outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once shutdown has begun or the worker
    ///   dropped the request.
    /// - [`Error::ChannelError`] if the worker thread is gone.
    /// - Any error produced by the operation itself.
    pub async fn call(&self, request: Request) -> Result<Response> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let (response, rx) = oneshot::channel();
        self.tx
            .send(WorkRequest::Dispatch { request, response })
            .await
            .map_err(|_| Error::ChannelError {
                context: "worker channel closed".into(),
            })?;

        rx.await.map_err(|_| Error::ServiceShutdown)?
    }

    /// Cancels in-flight fetches, stops the worker and waits (bounded by the
    /// configured timeout) for its acknowledgement.
    pub async fn shutdown(&self) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();

        let (response, rx) = oneshot::channel();
        if let Err(_e) = self.tx.send(WorkRequest::Shutdown { response }).await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to send shutdown to worker: {_e}");
            return Err(Error::ChannelError {
                context: "worker channel closed".into(),
            });
        }

        match timeout(self.shutdown_timeout, rx).await {
            Ok(Ok(())) => {
                #[cfg(feature = "tracing")]
                tracing::info!("Waveform worker shutdown complete");
                Ok(())
            }
            Ok(Err(_)) => Err(Error::ChannelError {
                context: "worker dropped shutdown acknowledgement".into(),
            }),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Waveform worker shutdown timed out");
                Err(Error::ChannelError {
                    context: "worker shutdown timed out".into(),
                })
            }
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}
