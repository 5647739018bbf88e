//! Rate limit enforcement as an axum middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::response::{set_rate_limit_headers, too_many_requests};
use super::GateState;
use crate::clock::Clock;
use crate::ratelimit::{identifier, LimiterClass, RateLimiter};
use crate::report::{Alert, AlertLevel, Reporter};

/// Everything one rate limit layer needs.
#[derive(Clone)]
pub struct LimitGate {
    class: LimiterClass,
    limiter: Arc<RateLimiter>,
    reporter: Arc<dyn Reporter>,
    clock: Arc<dyn Clock>,
}

impl LimitGate {
    /// The gate for `class`, sharing the state's limiter instance.
    pub fn new(state: &GateState, class: LimiterClass) -> Self {
        Self {
            class,
            limiter: state.limiters.get(class).clone(),
            reporter: state.reporter.clone(),
            clock: state.clock.clone(),
        }
    }
}

/// Check the request against the gate's limiter.
///
/// Denied requests get a 429 and never reach the inner service. Admitted
/// responses carry the `X-RateLimit-*` headers unless an inner gate
/// already set them.
pub async fn enforce(State(gate): State<LimitGate>, request: Request, next: Next) -> Response {
    let identifier = identifier::resolve(request.headers());
    let decision = gate.limiter.check(&identifier);

    if !decision.allowed {
        let path = request.uri().path().to_owned();
        warn!(
            limiter = %gate.class,
            identifier = %identifier,
            path = %path,
            reset_at = decision.reset_at,
            "Request rate limited"
        );
        gate.reporter.report(
            &Alert::new(AlertLevel::Warning, "Rate limit exceeded")
                .tag("limiter", gate.class.as_str())
                .tag("path", path)
                .tag("ip", identifier),
        );
        return too_many_requests(&decision, gate.clock.now_millis(), gate.class.denial_message());
    }

    let mut response = next.run(request).await;
    set_rate_limit_headers(response.headers_mut(), &decision, false);
    response
}
