//! Nanosecond timestamps for `created_at`

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of creation timestamps.
pub trait Clock: Send + Sync {
    /// Nanoseconds since the Unix epoch. Strictly increasing across calls.
    fn now_nanos(&self) -> u64;
}

/// Wall clock, forced strictly increasing.
///
/// If the wall clock stalls or steps backwards the previous value plus one
/// is returned instead.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_nanos(&self) -> u64 {
        let wall = Utc::now().timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

/// Deterministic clock: returns `start`, `start + 1`, ...
#[derive(Debug)]
pub struct ManualClock {
    next: AtomicU64,
}

impl ManualClock {
    pub fn starting_at(start: u64) -> Self {
        ManualClock {
            next: AtomicU64::new(start),
        }
    }

    /// Value the next call will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
