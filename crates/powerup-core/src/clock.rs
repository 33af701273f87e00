//! Tick sources
//!
//! The engine never advances time itself. The surrounding environment supplies
//! a monotonic tick (block height) through [`TickSource`]; tests drive it with
//! [`ManualTicks`].

use crate::types::Tick;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Supplies the current tick of the host environment
pub trait TickSource: Send + Sync {
    /// Current tick. Hosts must never return a value lower than one already
    /// returned; the engine rejects regressions with `InvalidTick`.
    fn current_tick(&self) -> Tick;
}

impl<T: TickSource + ?Sized> TickSource for Arc<T> {
    fn current_tick(&self) -> Tick {
        (**self).current_tick()
    }
}

/// Manually driven tick counter
///
/// `set` does not enforce monotonicity so tests can simulate a faulty host.
#[derive(Debug, Default)]
pub struct ManualTicks {
    tick: AtomicU64,
}

impl ManualTicks {
    /// Create a counter starting at `start`
    pub fn new(start: Tick) -> Self {
        Self {
            tick: AtomicU64::new(start),
        }
    }

    /// Jump to an arbitrary tick
    pub fn set(&self, tick: Tick) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    /// Advance by `ticks` and return the new tick
    pub fn advance(&self, ticks: u64) -> Tick {
        self.tick.fetch_add(ticks, Ordering::SeqCst) + ticks
    }
}

impl TickSource for ManualTicks {
    fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }
}
