//! Turnstile - Request Gate with Rate Limiting and Sessions
//!
//! This crate gates inbound HTTP traffic with independently configured
//! fixed-window rate limiters keyed by client address, and authenticates it
//! with an in-memory, TTL-bound session store. Both services are
//! process-local: a restart discards all counters and sessions, and replicas
//! behind a load balancer each enforce their own limits.

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod headers;
pub mod ratelimit;
pub mod report;
pub mod session;
pub mod sweep;
