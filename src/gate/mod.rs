//! HTTP request gate.
//!
//! Every request except the health check passes the general limiter.
//! Authentication routes are additionally gated by their own class, so a
//! denial from either gate rejects the request. Session cookies are read and
//! written only by the auth handlers.

mod handlers;
mod middleware;
mod response;
mod server;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

pub use handlers::LoginRequest;
pub use middleware::{enforce, LimitGate};
pub use response::{
    error_response, set_rate_limit_headers, too_many_requests, X_RATELIMIT_LIMIT,
    X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
pub use server::GateServer;

use crate::clock::{Clock, SystemClock};
use crate::ratelimit::{LimiterClass, RateLimiterRegistry};
use crate::report::{NoopReporter, Reporter};
use crate::session::{SessionStore, UserDirectory};

/// Services injected into every handler.
#[derive(Clone)]
pub struct GateState {
    /// Limiter instance per route class
    pub limiters: Arc<RateLimiterRegistry>,
    /// Live sessions
    pub sessions: Arc<SessionStore>,
    /// Credential lookup for login
    pub users: Arc<dyn UserDirectory>,
    /// Alert sink
    pub reporter: Arc<dyn Reporter>,
    /// Time source for `Retry-After`
    pub clock: Arc<dyn Clock>,
    /// Whether session cookies carry `Secure`
    pub secure_cookie: bool,
}

impl GateState {
    /// Create gate state with a no-op reporter and the system clock.
    pub fn new(
        limiters: Arc<RateLimiterRegistry>,
        sessions: Arc<SessionStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            limiters,
            sessions,
            users,
            reporter: Arc::new(NoopReporter),
            clock: Arc::new(SystemClock),
            secure_cookie: false,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}

/// Build the gate's router.
pub fn router(state: GateState) -> Router {
    let general = LimitGate::new(&state, LimiterClass::General);
    let api = LimitGate::new(&state, LimiterClass::Api);
    let auth = LimitGate::new(&state, LimiterClass::Auth);

    let gated = Router::new()
        .route(
            "/api/auth/login",
            post(handlers::login).route_layer(from_fn_with_state(auth, enforce)),
        )
        .route(
            "/api/auth/logout",
            post(handlers::logout).route_layer(from_fn_with_state(api.clone(), enforce)),
        )
        .route(
            "/api/auth/me",
            get(handlers::me).route_layer(from_fn_with_state(api, enforce)),
        )
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(general, enforce));

    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(gated)
        .with_state(state)
}
