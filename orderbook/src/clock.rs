//! Injectable time source.
//!
//! The book never reads a global clock; it asks the clock it was built
//! with. Tests substitute [`ManualClock`] to make time-priority tie-breaks
//! deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonically non-decreasing timestamps in nanoseconds.
pub trait Clock: Send {
    fn now_ns(&self) -> u64;
}

impl<C: Clock + Sync + ?Sized> Clock for Arc<C> {
    fn now_ns(&self) -> u64 {
        self.as_ref().now_ns()
    }
}

/// Monotonic clock anchored to an [`Instant`] taken at construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Settable clock for deterministic tests. Share it through an `Arc` to
/// advance time while the book holds the other handle.
pub struct ManualClock {
    ns: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            ns: AtomicU64::new(start_ns),
        }
    }

    pub fn set(&self, ns: u64) {
        self.ns.store(ns, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ns: u64) {
        self.ns.fetch_add(delta_ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.ns.load(Ordering::SeqCst)
    }
}
