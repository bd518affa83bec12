//! Capacity probes consulted by the worker store before each direct store.

/// Reports how much room is left for the in-memory layer.
pub trait CapacityProbe: Send + Sync + 'static {
    /// Remaining headroom in bytes given the bytes currently resident, or
    /// `None` when no capacity signal is available.
    fn headroom(&self, resident_bytes: u64) -> Option<u64>;
}

/// Probe for platforms without a capacity signal: always has headroom.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl CapacityProbe for Unbounded {
    fn headroom(&self, _resident_bytes: u64) -> Option<u64> {
        None
    }
}

/// Probe backed by a fixed byte budget for the memory layer.
#[derive(Clone, Copy, Debug)]
pub struct ByteBudget {
    pub budget_bytes: u64,
}

impl ByteBudget {
    pub const fn new(budget_bytes: u64) -> Self {
        Self { budget_bytes }
    }
}

impl CapacityProbe for ByteBudget {
    fn headroom(&self, resident_bytes: u64) -> Option<u64> {
        Some(self.budget_bytes.saturating_sub(resident_bytes))
    }
}
