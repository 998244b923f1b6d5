//! Deterministic test doubles shared across the workspace's crates.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::clock::Clock;

/// A [`Clock`] that advances by one nanosecond per call, starting from a
/// caller-chosen value. Used by dispatcher/store tests that need events to
/// sort in a known order without sleeping.
#[derive(Debug)]
pub struct FakeClock(AtomicI64);

impl FakeClock {
    pub fn new(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for FakeClock {
    fn now_nanos(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}
