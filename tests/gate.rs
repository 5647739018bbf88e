use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{COOKIE, RETRY_AFTER, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use turnstile::clock::ManualClock;
use turnstile::config::RateLimitingConfig;
use turnstile::error::{Result, TurnstileError};
use turnstile::gate::{router, GateState, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use turnstile::ratelimit::{LimitConfig, RateLimiterRegistry};
use turnstile::report::{Alert, Reporter};
use turnstile::session::{default_accounts, SessionStore, StaticUserDirectory, TokenGenerator};

const START: u64 = 1_700_000_000_000;
const TTL: Duration = Duration::from_secs(3600);

#[derive(Default)]
struct RecordingReporter {
    alerts: Mutex<Vec<Alert>>,
}

impl Reporter for RecordingReporter {
    fn report(&self, alert: &Alert) {
        self.alerts.lock().push(alert.clone());
    }
}

struct FailingTokens;

impl TokenGenerator for FailingTokens {
    fn generate(&self) -> Result<String> {
        Err(TurnstileError::TokenGeneration("entropy source unavailable".to_string()))
    }
}

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
    sessions: Arc<SessionStore>,
    reporter: Arc<RecordingReporter>,
}

fn harness_with(limits: RateLimitingConfig, sessions: SessionStore, clock: Arc<ManualClock>) -> Harness {
    let limiters = Arc::new(RateLimiterRegistry::from_config(&limits, clock.clone()));
    let sessions = Arc::new(sessions);
    let users = Arc::new(StaticUserDirectory::new(default_accounts()));
    let reporter = Arc::new(RecordingReporter::default());

    let state = GateState::new(limiters, sessions.clone(), users)
        .with_clock(clock.clone())
        .with_reporter(reporter.clone());

    Harness {
        app: router(state),
        clock,
        sessions,
        reporter,
    }
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(START));
    let sessions = SessionStore::with_clock(TTL, clock.clone());
    harness_with(RateLimitingConfig::default(), sessions, clock)
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self, ip: &str, email: &str, password: &str) -> Response {
        let body = json!({ "email": email, "password": password }).to_string();
        self.send(
            Request::post("/api/auth/login")
                .header("content-type", "application/json")
                .header("x-forwarded-for", ip)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn me(&self, ip: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::get("/api/auth/me").header("x-forwarded-for", ip);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_pair(response: &Response) -> String {
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let h = harness();

    let response = h.login("10.0.0.1", "user@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("auth_session="));
    assert!(set_cookie.ends_with("; HttpOnly; SameSite=Lax; Max-Age=3600; Path=/"));
    assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "5");
    assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "4");

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], "2");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(h.sessions.len(), 1);
}

#[tokio::test]
async fn me_returns_user_for_live_session() {
    let h = harness();
    let login = h.login("10.0.0.1", "admin@example.com", "password123").await;
    let cookie = format!("theme=dark; {}", session_pair(&login));

    let response = h.me("10.0.0.1", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["cache-control"],
        "private, s-maxage=30, stale-while-revalidate=60"
    );

    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "admin@example.com");
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn me_rejects_expired_session() {
    let h = harness();
    let login = h.login("10.0.0.1", "user@example.com", "password123").await;
    let cookie = session_pair(&login);

    h.clock.advance(TTL);

    let response = h.me("10.0.0.1", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Not authenticated");
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn me_degrades_on_bad_cookies() {
    let h = harness();

    for cookie in [None, Some("auth_session=%FF"), Some("garbage"), Some("auth_session=forged")] {
        let response = h.me("10.0.0.1", cookie).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "cookie {:?}", cookie);
    }
}

#[tokio::test]
async fn logout_revokes_and_clears_cookie() {
    let h = harness();
    let login = h.login("10.0.0.1", "user@example.com", "password123").await;
    let cookie = session_pair(&login);

    let response = h
        .send(
            Request::post("/api/auth/logout")
                .header(COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[SET_COOKIE],
        "auth_session=; HttpOnly; SameSite=Lax; Max-Age=0; Path=/"
    );
    assert_eq!(response.headers()["cache-control"], "no-store, no-cache, must-revalidate");
    assert_eq!(json_body(response).await["success"], true);

    let response = h.me("10.0.0.1", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_is_ok() {
    let h = harness();

    let response = h
        .send(Request::post("/api/auth/logout").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_validation() {
    let h = harness();

    let response = h.login("10.0.0.1", "user@example.com", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Email and password are required");

    let response = h.login("10.0.0.2", "user@example.com", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Invalid credentials");

    let response = h
        .send(
            Request::post("/api/auth/login")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn sixth_login_attempt_is_rate_limited() {
    let h = harness();

    let reset = (START + 60_000).to_string();
    for remaining in (0..5).rev() {
        let response = h.login("198.51.100.7", "user@example.com", "wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], remaining.to_string().as_str());
        assert_eq!(response.headers()[X_RATELIMIT_RESET], reset.as_str());
    }

    h.clock.advance(Duration::from_millis(500));
    let response = h.login("198.51.100.7", "user@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[RETRY_AFTER], "60");
    assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "0");
    assert_eq!(response.headers()[X_RATELIMIT_RESET], reset.as_str());

    let body = json_body(response).await;
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["message"], "Too many login attempts. Please try again later.");
    assert_eq!(body["retryAfter"], 60);
    assert!(h.sessions.is_empty());

    // Another client is unaffected
    let response = h.login("198.51.100.8", "user@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);

    // The denial was reported
    let alerts = h.reporter.alerts.lock();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].tags["limiter"], "auth");
    assert_eq!(alerts[0].tags["ip"], "198.51.100.7");
    assert_eq!(alerts[0].tags["path"], "/api/auth/login");
}

#[tokio::test]
async fn auth_limit_resets_after_window() {
    let h = harness();

    for _ in 0..6 {
        h.login("10.9.9.9", "user@example.com", "wrong").await;
    }
    h.clock.advance(Duration::from_secs(60));

    let response = h.login("10.9.9.9", "user@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "4");
}

#[tokio::test]
async fn general_gate_denies_before_route_gate() {
    let clock = Arc::new(ManualClock::new(START));
    let limits = RateLimitingConfig {
        general: LimitConfig::new(2, Duration::from_secs(60)),
        ..RateLimitingConfig::default()
    };
    let h = harness_with(limits, SessionStore::with_clock(TTL, clock.clone()), clock);

    assert_eq!(h.me("10.0.0.1", None).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.me("10.0.0.1", None).await.status(), StatusCode::UNAUTHORIZED);

    let response = h.me("10.0.0.1", None).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "2");
    assert_eq!(
        json_body(response).await["message"],
        "Rate limit exceeded. Please try again later."
    );

    // Health checks bypass the general gate
    let response = h
        .send(Request::get("/api/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn clients_without_address_share_a_bucket() {
    let clock = Arc::new(ManualClock::new(START));
    let limits = RateLimitingConfig {
        auth: LimitConfig::new(1, Duration::from_secs(60)),
        ..RateLimitingConfig::default()
    };
    let h = harness_with(limits, SessionStore::with_clock(TTL, clock.clone()), clock);

    let anonymous = || {
        Request::post("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"a@b.c","password":"x"}"#))
            .unwrap()
    };

    assert_eq!(h.send(anonymous()).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.send(anonymous()).await.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn token_failure_is_internal_error() {
    let clock = Arc::new(ManualClock::new(START));
    let sessions = SessionStore::with_clock(TTL, clock.clone()).with_token_generator(FailingTokens);
    let h = harness_with(RateLimitingConfig::default(), sessions, clock);

    let response = h.login("10.0.0.1", "user@example.com", "password123").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert_eq!(json_body(response).await["error"], "Internal server error");
}

#[tokio::test]
async fn secure_cookie_flag() {
    let clock = Arc::new(ManualClock::new(START));
    let limiters = Arc::new(RateLimiterRegistry::from_config(
        &RateLimitingConfig::default(),
        clock.clone(),
    ));
    let sessions = Arc::new(SessionStore::with_clock(TTL, clock.clone()));
    let users = Arc::new(StaticUserDirectory::new(default_accounts()));
    let app = router(
        GateState::new(limiters, sessions, users)
            .with_clock(clock)
            .with_secure_cookie(true),
    );

    let body = json!({ "email": "user@example.com", "password": "password123" }).to_string();
    let response = app
        .oneshot(
            Request::post("/api/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.ends_with("; Path=/; Secure"));
}
