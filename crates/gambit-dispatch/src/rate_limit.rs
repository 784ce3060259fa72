//! Per-actor token buckets throttling karma changes.

use gambit_core::{current_unix_timestamp, elapsed_seconds, name_key};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

pub const BUCKET_CAPACITY: u32 = 5;
pub const REFILL_INTERVAL_SECS: u64 = 30;

/// Source of wall-clock seconds for refill computations.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        current_unix_timestamp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TokenBucket {
    last_refill_unix: u64,
    tokens: u32,
}

impl TokenBucket {
    /// Adds one token per whole interval since the last call, then restarts
    /// the interval at `now_unix`.
    fn refill(&mut self, now_unix: u64) {
        let earned = elapsed_seconds(self.last_refill_unix, now_unix) / REFILL_INTERVAL_SECS;
        let refilled = u64::from(self.tokens)
            .saturating_add(earned)
            .min(u64::from(BUCKET_CAPACITY));
        self.tokens = refilled as u32;
        self.last_refill_unix = self.last_refill_unix.max(now_unix);
    }
}

/// Token-bucket limiter keyed by case-folded actor name.
///
/// Refill is computed lazily at call time; no background timer runs.
#[derive(Default)]
pub struct RateLimiter {
    buckets: HashMap<String, TokenBucket>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("tracked_actors", &self.buckets.len())
            .finish()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one token for `actor` at `now_unix`; false means throttled.
    pub fn try_consume_at(&mut self, actor: &str, now_unix: u64) -> bool {
        let bucket = match self.buckets.entry(name_key(actor)) {
            Entry::Vacant(vacant) => {
                vacant.insert(TokenBucket {
                    last_refill_unix: now_unix,
                    tokens: BUCKET_CAPACITY - 1,
                });
                return true;
            }
            Entry::Occupied(occupied) => occupied.into_mut(),
        };
        bucket.refill(now_unix);
        if bucket.tokens == 0 {
            return false;
        }
        bucket.tokens -= 1;
        true
    }
}
