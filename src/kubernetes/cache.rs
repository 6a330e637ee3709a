// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! TTL-bounded cache entries for expensive cluster scans.
//!
//! Entries are idempotently recomputable, so last-write-wins overwrites
//! between concurrent callers are safe; staleness is bounded by the TTL
//! each cache applies at lookup time.

use std::time::{Duration, Instant};

/// A cached value with the instant it was fetched
#[derive(Debug, Clone)]
pub(crate) struct CachedEntry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T: Clone> CachedEntry<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    /// Return the value if the entry is still within its TTL
    pub(crate) fn fresh(&self, ttl: Duration) -> Option<T> {
        if self.fetched_at.elapsed() < ttl {
            Some(self.value.clone())
        } else {
            None
        }
    }
}
