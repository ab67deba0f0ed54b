//! Cache-defeat values for GET requests.
//!
//! Option lists can change between two renders of the same field, so every GET
//! carries a query value that differs from the previous one. Values are
//! millisecond timestamps, bumped past the last issued value when the clock has
//! not advanced.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Issues strictly increasing cache-defeat values.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last_issued: AtomicI64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value: the current time in milliseconds, or one past the previous value.
    pub fn next_value(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last_issued.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self
                .last_issued
                .compare_exchange_weak(previous, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(current) => previous = current,
            }
        }
    }
}
