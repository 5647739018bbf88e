//! Named limiter instances for each route class.
//!
//! Every class owns its own `RateLimiter`, so records are never shared
//! between classes even when the same client hits several of them.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::limiter::{LimitConfig, RateLimiter};
use crate::clock::Clock;
use crate::config::RateLimitingConfig;
use crate::sweep::Sweep;

/// Route classes with independently configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimiterClass {
    /// Coarse gate in front of all traffic
    General,
    /// API endpoints
    Api,
    /// Authentication endpoints
    Auth,
}

impl LimiterClass {
    /// All classes, in layering order.
    pub const ALL: [LimiterClass; 3] = [LimiterClass::General, LimiterClass::Api, LimiterClass::Auth];

    /// Name used in logs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterClass::General => "general",
            LimiterClass::Api => "api",
            LimiterClass::Auth => "auth",
        }
    }

    /// Human readable message sent with a 429 from this class.
    pub fn denial_message(&self) -> &'static str {
        match self {
            LimiterClass::General => "Rate limit exceeded. Please try again later.",
            LimiterClass::Api => "API rate limit exceeded. Please try again later.",
            LimiterClass::Auth => "Too many login attempts. Please try again later.",
        }
    }
}

impl fmt::Display for LimiterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of limiter instances used by the request gate.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    general: Arc<RateLimiter>,
    api: Arc<RateLimiter>,
    auth: Arc<RateLimiter>,
}

impl RateLimiterRegistry {
    /// Build one limiter per class from configuration.
    pub fn from_config(config: &RateLimitingConfig, clock: Arc<dyn Clock>) -> Self {
        let build = |class: LimiterClass, limit: LimitConfig| {
            info!(
                limiter = %class,
                capacity = limit.capacity,
                window_ms = limit.window_ms,
                "Configured rate limiter"
            );
            Arc::new(RateLimiter::with_clock(class.as_str(), limit, clock.clone()))
        };

        Self {
            general: build(LimiterClass::General, config.general),
            api: build(LimiterClass::Api, config.api),
            auth: build(LimiterClass::Auth, config.auth),
        }
    }

    /// The limiter for a route class.
    pub fn get(&self, class: LimiterClass) -> &Arc<RateLimiter> {
        match class {
            LimiterClass::General => &self.general,
            LimiterClass::Api => &self.api,
            LimiterClass::Auth => &self.auth,
        }
    }

    /// Iterate over every class and its limiter.
    pub fn iter(&self) -> impl Iterator<Item = (LimiterClass, &Arc<RateLimiter>)> {
        LimiterClass::ALL.into_iter().map(move |class| (class, self.get(class)))
    }
}

impl Sweep for RateLimiterRegistry {
    fn sweep(&self) -> usize {
        self.iter().map(|(_, limiter)| limiter.purge_expired()).sum()
    }
}
