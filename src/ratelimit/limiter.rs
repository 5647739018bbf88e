//! Core rate limiter implementation.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::record::{RateLimitDecision, RateLimitRecord};
use crate::clock::{Clock, SystemClock};
use crate::sweep::Sweep;

/// Configuration for a rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum requests admitted per window
    pub capacity: u64,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl LimitConfig {
    /// Create a limit of `capacity` requests per `window`.
    pub fn new(capacity: u64, window: Duration) -> Self {
        Self {
            capacity,
            window_ms: window.as_millis() as u64,
        }
    }

    /// Window length as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// A fixed-window rate limiter keyed by client identifier.
///
/// Each key's check-then-increment runs under the map's shard lock for that
/// key, so concurrent callers can never admit more than `capacity` requests
/// in one window.
///
/// Fixed windows allow a client to spend a full window's capacity just
/// before the reset and another full capacity just after it.
#[derive(Debug)]
pub struct RateLimiter {
    /// Instance name, used in logs
    name: String,
    /// Capacity and window
    config: LimitConfig,
    /// Records indexed by identifier
    records: DashMap<String, RateLimitRecord>,
    /// Time source for windows
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter backed by the system clock.
    pub fn new(name: impl Into<String>, config: LimitConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a new rate limiter with an explicit time source.
    pub fn with_clock(name: impl Into<String>, config: LimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            config,
            records: DashMap::new(),
            clock,
        }
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity and window of this instance.
    pub fn config(&self) -> LimitConfig {
        self.config
    }

    /// Count a request for `identifier` and decide whether to admit it.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let capacity = self.config.capacity;
        let window = self.config.window();

        let decision = match self.records.entry(identifier.to_owned()) {
            Entry::Occupied(mut occupied) => occupied.get_mut().admit(now, capacity, window),
            Entry::Vacant(vacant) => {
                debug!(
                    limiter = %self.name,
                    identifier = %identifier,
                    capacity = capacity,
                    window_ms = self.config.window_ms,
                    "Creating new rate limit record"
                );
                vacant.insert(RateLimitRecord::open(now, window)).decision(true, capacity)
            }
        };

        trace!(
            limiter = %self.name,
            identifier = %identifier,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Checked rate limit"
        );

        if !decision.allowed {
            debug!(
                limiter = %self.name,
                identifier = %identifier,
                reset_at = decision.reset_at,
                "Rate limit exceeded"
            );
        }

        decision
    }

    /// Current count for an identifier, if it has a live record.
    pub fn current_count(&self, identifier: &str) -> Option<u64> {
        let now = self.clock.now_millis();
        self.records
            .get(identifier)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.count())
    }

    /// Remove every record whose window has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Clear all records.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Get the number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl Sweep for RateLimiter {
    fn sweep(&self) -> usize {
        self.purge_expired()
    }
}
