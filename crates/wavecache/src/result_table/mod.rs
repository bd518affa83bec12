//! Durable id-keyed result storage with batched lookups.
//!
//! [`ResultTable::get`] never reads storage directly. Each call queues its id
//! with a reply channel and, if no batch is scheduled, spawns one that fires
//! after [`BATCH_WINDOW`]. The batch snapshots and clears the queue before the
//! bulk read so ids queued during the read land in the next batch, then
//! answers each queued lookup positionally.

mod backend;
mod memory;
mod sqlite;

pub use backend::ResultBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::{
    Error, Persist, ResultEntry, Result,
    config::BATCH_WINDOW,
    sleep::{SleepProvider, TokioSleep},
};
use core::marker::PhantomData;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

struct PendingLookup<V> {
    id: String,
    reply: oneshot::Sender<Result<V>>,
}

struct BatchState<V> {
    queue: Vec<PendingLookup<V>>,
    scheduled: bool,
}

pub struct ResultTable<V, S = TokioSleep> {
    backend: Arc<dyn ResultBackend>,
    batch: Arc<Mutex<BatchState<V>>>,
    _sleep: PhantomData<fn() -> S>,
}

impl<V, S> Clone for ResultTable<V, S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            batch: Arc::clone(&self.batch),
            _sleep: PhantomData,
        }
    }
}

/// Runs a blocking backend call off the async context.
async fn blocking<T, F>(backend: &Arc<dyn ResultBackend>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn ResultBackend) -> Result<T> + Send + 'static,
{
    let backend = Arc::clone(backend);
    tokio::task::spawn_blocking(move || f(backend.as_ref()))
        .await
        .map_err(|e| Error::Storage {
            context: format!("storage task failed: {e}"),
        })?
}

impl<V, S> ResultTable<V, S>
where
    V: Persist,
    S: SleepProvider,
{
    pub fn new(backend: Arc<dyn ResultBackend>) -> Self {
        Self {
            backend,
            batch: Arc::new(Mutex::new(BatchState {
                queue: Vec::new(),
                scheduled: false,
            })),
            _sleep: PhantomData,
        }
    }

    pub async fn has(&self, id: &str) -> Result<bool> {
        let id = id.to_owned();
        blocking(&self.backend, move |backend| backend.contains(&id)).await
    }

    /// Resolves the value stored under `id` through the next batch.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if nothing is stored under `id`.
    /// - [`Error::Storage`] / [`Error::Serialization`] if the bulk read or
    ///   decoding failed.
    pub async fn get(&self, id: &str) -> Result<V> {
        let (reply, rx) = oneshot::channel();
        let schedule = {
            let mut state = self.batch.lock();
            state.queue.push(PendingLookup {
                id: id.to_owned(),
                reply,
            });
            !core::mem::replace(&mut state.scheduled, true)
        };

        if schedule {
            tokio::spawn(Self::run_batch(
                Arc::clone(&self.backend),
                Arc::clone(&self.batch),
            ));
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ChannelError {
                context: format!("batched lookup for {id} was dropped"),
            }),
        }
    }

    async fn run_batch(backend: Arc<dyn ResultBackend>, batch: Arc<Mutex<BatchState<V>>>) {
        S::sleep_for(BATCH_WINDOW).await;

        let pending = {
            let mut state = batch.lock();
            state.scheduled = false;
            core::mem::take(&mut state.queue)
        };
        if pending.is_empty() {
            return;
        }

        let ids: Vec<String> = pending.iter().map(|lookup| lookup.id.clone()).collect();
        let expected = ids.len();

        #[cfg(feature = "tracing")]
        tracing::trace!("Resolving {expected} batched lookups");

        let outcome = blocking(&backend, move |backend| backend.bulk_get(&ids))
            .await
            .and_then(|values| {
                if values.len() == expected {
                    Ok(values)
                } else {
                    Err(Error::InvariantViolation {
                        context: format!(
                            "bulk lookup returned {} values for {expected} ids",
                            values.len()
                        ),
                    })
                }
            });

        match outcome {
            Ok(values) => {
                for (lookup, raw) in pending.into_iter().zip(values) {
                    let result = match raw {
                        Some(bytes) => V::decode(&bytes),
                        None => Err(Error::NotFound { id: lookup.id }),
                    };
                    let _ = lookup.reply.send(result);
                }
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Batched lookup failed: {err}");

                for lookup in pending {
                    let _ = lookup.reply.send(Err(err.clone()));
                }
            }
        }
    }

    pub async fn put(&self, entries: Vec<ResultEntry<V>>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let encoded: Vec<(String, Vec<u8>)> = entries
            .into_iter()
            .map(|entry| {
                let bytes = entry.value.encode();
                (entry.id, bytes)
            })
            .collect();
        blocking(&self.backend, move |backend| backend.bulk_put(encoded)).await
    }

    pub async fn delete(&self, ids: Vec<String>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        blocking(&self.backend, move |backend| backend.bulk_delete(&ids)).await
    }

    pub async fn clear(&self) -> Result<()> {
        blocking(&self.backend, |backend| backend.clear()).await
    }
}
