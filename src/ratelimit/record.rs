//! Fixed-window rate limit record.

use std::time::Duration;

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Capacity of the limiter that made the decision
    pub limit: u64,
    /// Requests still admissible in the current window
    pub remaining: u64,
    /// When the current window ends, in epoch milliseconds
    pub reset_at: u64,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now_millis: u64) -> u64 {
        self.reset_at.saturating_sub(now_millis).div_ceil(1000)
    }
}

/// Request count for one identifier within one window.
///
/// Records are owned by a single limiter and only ever touched while the
/// limiter holds the shard lock for their key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    count: u64,
    window_reset_at: u64,
}

impl RateLimitRecord {
    /// Open a new window at `now_millis` holding the request that opened it.
    pub fn open(now_millis: u64, window: Duration) -> Self {
        Self {
            count: 1,
            window_reset_at: now_millis.saturating_add(window.as_millis() as u64),
        }
    }

    /// Requests counted in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// End of the current window in epoch milliseconds.
    pub fn window_reset_at(&self) -> u64 {
        self.window_reset_at
    }

    /// Whether the window has elapsed at `now_millis`.
    pub fn is_expired(&self, now_millis: u64) -> bool {
        now_millis >= self.window_reset_at
    }

    /// Count one request against this record.
    ///
    /// An elapsed window is replaced by a fresh one. A full window is left
    /// untouched and the request is denied.
    pub fn admit(&mut self, now_millis: u64, capacity: u64, window: Duration) -> RateLimitDecision {
        if self.is_expired(now_millis) {
            *self = Self::open(now_millis, window);
            return self.decision(true, capacity);
        }

        if self.count >= capacity {
            return RateLimitDecision {
                allowed: false,
                limit: capacity,
                remaining: 0,
                reset_at: self.window_reset_at,
            };
        }

        self.count += 1;
        self.decision(true, capacity)
    }

    /// Decision describing the record's current state.
    pub fn decision(&self, allowed: bool, capacity: u64) -> RateLimitDecision {
        RateLimitDecision {
            allowed,
            limit: capacity,
            remaining: capacity.saturating_sub(self.count),
            reset_at: self.window_reset_at,
        }
    }
}
