//! Rate limiting logic and state management.

pub mod identifier;
mod limiter;
mod record;
mod registry;

pub use limiter::{LimitConfig, RateLimiter};
pub use record::{RateLimitDecision, RateLimitRecord};
pub use registry::{LimiterClass, RateLimiterRegistry};
