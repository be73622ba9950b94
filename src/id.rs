// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Monotonic 64-bit id generation.
//!
//! Seeded once from wall-clock nanoseconds, then a plain atomic counter.
//! The original source reseeded from the clock on every call, which made IDs
//! non-monotone whenever the clock ticked backward or two calls landed in
//! the same nanosecond; a single counter seeded once removes that bug.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generates unique, monotonically increasing 64-bit ids.
pub struct IdSource {
    counter: AtomicI64,
}

impl IdSource {
    /// Seeds the counter from the current wall clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos() as i64;
        Self {
            counter: AtomicI64::new(seed & i64::MAX),
        }
    }

    /// Returns the next id. Always positive, always greater than the last.
    pub fn next(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_strictly_increase() {
        let src = IdSource::new();
        let mut last = src.next();
        for _ in 0..1000 {
            let next = src.next();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn ids_are_positive() {
        let src = IdSource::new();
        for _ in 0..100 {
            assert!(src.next() > 0);
        }
    }
}
