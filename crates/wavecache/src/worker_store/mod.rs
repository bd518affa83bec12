//! In-memory plus durable deduplicating cache over a [`ResultTable`].
//!
//! Reads go memory, then result table, then any pending computation for the
//! id. A pending computation is a shared future: every retriever of an id
//! that is still being computed awaits the same future, so the computation
//! runs once. When nothing is pending the value may be produced by another
//! context sharing the durable store, so retrieval backs off
//! (`depth² × RETRIEVE_BACKOFF_UNIT`) for a bounded number of attempts before
//! resolving to `None`.
//!
//! Before every direct store the capacity probe is consulted. When headroom
//! drops below the configured threshold the whole memory layer is flushed;
//! the durable copy is untouched.


use crate::{
    Error, PositionBuffer, ResultEntry, Result,
    config::{DEFAULT_CAPACITY_THRESHOLD_BYTES, MAX_RETRIEVE_ATTEMPTS, RETRIEVE_BACKOFF_UNIT},
    metrics::{increment_buffers_stored, increment_memory_flushes},
    persist::Persist,
    probe::{CapacityProbe, Unbounded},
    result_table::{ResultBackend, ResultTable},
    sleep::{SleepProvider, TokioSleep},
};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::task::AbortHandle;

/// A computation whose result will be stored once it resolves.
pub type Deferred<V> = Shared<BoxFuture<'static, Result<V>>>;

/// Either a ready value or an in-flight computation of one.
pub enum Storable<V> {
    Ready(V),
    Deferred(Deferred<V>),
}

impl<V> Storable<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = Result<V>> + Send + 'static,
    {
        Self::Deferred(fut.boxed().shared())
    }
}

impl<V> From<V> for Storable<V> {
    fn from(value: V) -> Self {
        Self::Ready(value)
    }
}

struct StoreState<V> {
    memory: HashMap<String, V>,
    resident_bytes: u64,
    pending: HashMap<String, Deferred<V>>,
    timers: HashMap<String, AbortHandle>,
}

impl<V: Persist> StoreState<V> {
    fn insert_memory(&mut self, id: &str, value: V) {
        let added = value.byte_len() as u64;
        if let Some(previous) = self.memory.insert(id.to_owned(), value) {
            self.resident_bytes = self
                .resident_bytes
                .saturating_sub(previous.byte_len() as u64);
        }
        self.resident_bytes += added;
    }

    fn remove_memory(&mut self, id: &str) {
        if let Some(previous) = self.memory.remove(id) {
            self.resident_bytes = self
                .resident_bytes
                .saturating_sub(previous.byte_len() as u64);
        }
    }

    fn cancel_pending(&mut self, id: &str) {
        if let Some(timer) = self.timers.remove(id) {
            timer.abort();
        }
        self.pending.remove(id);
    }
}

struct Inner<V, S> {
    state: Mutex<StoreState<V>>,
    table: ResultTable<V, S>,
    probe: Box<dyn CapacityProbe>,
    capacity_threshold_bytes: u64,
}

pub struct WorkerStore<V, S = TokioSleep> {
    inner: Arc<Inner<V, S>>,
}

/// The store holding converted waveform buffers.
pub type WaveformStore<S = TokioSleep> = WorkerStore<PositionBuffer, S>;

impl<V, S> Clone for WorkerStore<V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, S> WorkerStore<V, S>
where
    V: Persist,
    S: SleepProvider,
{
    /// A store with no capacity signal: the memory layer is never flushed for
    /// pressure.
    pub fn new(backend: Arc<dyn ResultBackend>) -> Self {
        Self::with_probe(backend, Unbounded, DEFAULT_CAPACITY_THRESHOLD_BYTES)
    }

    pub fn with_probe(
        backend: Arc<dyn ResultBackend>,
        probe: impl CapacityProbe,
        capacity_threshold_bytes: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(StoreState {
                    memory: HashMap::new(),
                    resident_bytes: 0,
                    pending: HashMap::new(),
                    timers: HashMap::new(),
                }),
                table: ResultTable::new(backend),
                probe: Box::new(probe),
                capacity_threshold_bytes,
            }),
        }
    }

    /// Stores a value or schedules a deferred one.
    ///
    /// A ready value goes straight to memory and the result table, replacing
    /// anything pending for `id`. A deferred value is tracked as pending and
    /// resolved on the next scheduler tick without blocking the caller.
    /// Re-storing an id overwrites it.
    pub async fn store(&self, id: &str, value: impl Into<Storable<V>>) -> Result<()> {
        match value.into() {
            Storable::Ready(value) => {
                self.inner.state.lock().cancel_pending(id);
                self.commit(id, value).await
            }
            Storable::Deferred(deferred) => {
                self.schedule(id, deferred);
                Ok(())
            }
        }
    }

    fn schedule(&self, id: &str, deferred: Deferred<V>) {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.timers.remove(id) {
            timer.abort();
        }
        state.pending.insert(id.to_owned(), deferred.clone());

        let store = self.clone();
        let key = id.to_owned();
        let timer = tokio::spawn(async move {
            tokio::task::yield_now().await;
            if let Err(_e) = store.settle(&key, deferred).await {
                #[cfg(feature = "tracing")]
                if !_e.is_cancellation() {
                    tracing::warn!("Deferred value for {key} failed: {_e}");
                }
            }
        });
        state.timers.insert(id.to_owned(), timer.abort_handle());
    }

    /// Awaits a pending computation and commits its value if it is still the
    /// current one for `id`.
    async fn settle(&self, id: &str, deferred: Deferred<V>) -> Result<V> {
        let outcome = deferred.clone().await;
        let current = {
            let mut state = self.inner.state.lock();
            let current = state
                .pending
                .get(id)
                .is_some_and(|pending| pending.ptr_eq(&deferred));
            if current {
                state.pending.remove(id);
                state.timers.remove(id);
            }
            current
        };

        let value = outcome?;
        if current {
            self.commit(id, value.clone()).await?;
        }
        Ok(value)
    }

    async fn commit(&self, id: &str, value: V) -> Result<()> {
        self.check_capacity();
        self.inner.state.lock().insert_memory(id, value.clone());
        increment_buffers_stored();
        self.inner
            .table
            .put(vec![ResultEntry::new(id, value)])
            .await
    }

    fn check_capacity(&self) {
        let resident = self.inner.state.lock().resident_bytes;
        let Some(headroom) = self.inner.probe.headroom(resident) else {
            return;
        };
        if headroom < self.inner.capacity_threshold_bytes {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "Capacity headroom {headroom} below {} bytes, flushing memory layer",
                self.inner.capacity_threshold_bytes
            );
            self.flush_memory();
        }
    }

    /// Checks memory, then pending computations, then the result table.
    pub async fn has(&self, id: &str) -> Result<bool> {
        {
            let state = self.inner.state.lock();
            if state.memory.contains_key(id) || state.pending.contains_key(id) {
                return Ok(true);
            }
        }
        self.inner.table.has(id).await
    }

    /// Resolves the value for `id`, or `None` once the retry budget is spent.
    pub async fn retrieve(&self, id: &str) -> Result<Option<V>> {
        let mut depth: u32 = 0;
        loop {
            if let Some(value) = self.inner.state.lock().memory.get(id).cloned() {
                return Ok(Some(value));
            }

            match self.inner.table.get(id).await {
                Ok(value) => {
                    self.inner.state.lock().insert_memory(id, value.clone());
                    return Ok(Some(value));
                }
                Err(Error::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }

            let pending = self.inner.state.lock().pending.get(id).cloned();
            if let Some(deferred) = pending {
                return self.settle(id, deferred).await.map(Some);
            }

            if depth >= MAX_RETRIEVE_ATTEMPTS {
                #[cfg(feature = "tracing")]
                tracing::warn!("No value for {id} after {depth} retrieval attempts");
                return Ok(None);
            }
            S::sleep_for(RETRIEVE_BACKOFF_UNIT * depth * depth).await;
            depth += 1;
        }
    }

    /// Removes `id` from every layer, cancelling any pending computation.
    pub async fn delete(&self, id: &str) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            state.cancel_pending(id);
            state.remove_memory(id);
        }
        self.inner.table.delete(vec![id.to_owned()]).await
    }

    /// Clears all state, durable copies included.
    pub async fn cleanup(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            for (_, timer) in state.timers.drain() {
                timer.abort();
            }
            state.pending.clear();
            state.memory.clear();
            state.resident_bytes = 0;
        }
        self.inner.table.clear().await
    }

    /// Drops the in-memory layer only.
    pub fn flush_memory(&self) {
        let mut state = self.inner.state.lock();
        state.memory.clear();
        state.resident_bytes = 0;
        increment_memory_flushes();
    }

    pub fn memory_len(&self) -> usize {
        self.inner.state.lock().memory.len()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    pub fn resident_bytes(&self) -> u64 {
        self.inner.state.lock().resident_bytes
    }
}
