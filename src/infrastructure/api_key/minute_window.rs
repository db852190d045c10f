//! Per-minute request counters
//!
//! Process-local and deliberately approximate: buckets live in memory, keyed
//! by `(key id, minute index)`, and are discarded a few minutes after their
//! window closes. Under multi-instance deployment each instance counts its
//! own traffic only, so the minute limit is per-instance.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::domain::api_key::ApiKeyId;

/// Minute buckets older than this many windows are dropped on cleanup.
const RETAINED_WINDOWS: i64 = 5;

/// How many hits between cleanup sweeps.
const CLEANUP_EVERY: u64 = 256;

/// In-memory per-minute hit counter
#[derive(Debug, Default)]
pub struct MinuteWindow {
    state: Mutex<WindowState>,
}

#[derive(Debug, Default)]
struct WindowState {
    buckets: HashMap<(String, i64), u32>,
    hits_since_cleanup: u64,
}

impl MinuteWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket index containing `now`.
    fn bucket_index(now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(60)
    }

    /// Start of the minute window following the one containing `now`.
    pub fn next_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        let seconds_into_minute = now.timestamp().rem_euclid(60);
        let base = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()));
        base + Duration::seconds(60 - seconds_into_minute)
    }

    /// Record a hit for `key_id` in the bucket containing `now` and return
    /// the bucket's new count.
    pub fn hit(&self, key_id: &ApiKeyId, now: DateTime<Utc>) -> u32 {
        let bucket = Self::bucket_index(now);
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            // A poisoned window only loses approximate counts; start over.
            Err(poisoned) => poisoned.into_inner(),
        };

        state.hits_since_cleanup += 1;
        if state.hits_since_cleanup >= CLEANUP_EVERY {
            state.hits_since_cleanup = 0;
            state
                .buckets
                .retain(|(_, b), _| *b > bucket - RETAINED_WINDOWS);
        }

        let count = state
            .buckets
            .entry((key_id.as_str().to_string(), bucket))
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Current count for `key_id` in the bucket containing `now`.
    pub fn count(&self, key_id: &ApiKeyId, now: DateTime<Utc>) -> u32 {
        let bucket = Self::bucket_index(now);
        let state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        state
            .buckets
            .get(&(key_id.as_str().to_string(), bucket))
            .copied()
            .unwrap_or(0)
    }
}
