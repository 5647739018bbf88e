//! Route handlers for the authentication and health endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::response::error_response;
use super::GateState;
use crate::error::TurnstileError;
use crate::session::cookie::{clear_session_cookie, session_cookie, session_token};
use crate::session::User;

const NO_STORE: &str = "no-store, no-cache, must-revalidate";

/// Body of `POST /api/auth/login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
    user: User,
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct MeResponse {
    user: User,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

/// Authenticate and open a session.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<GateState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, TurnstileError> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected login body");
            return Ok(error_response(StatusCode::BAD_REQUEST, "Invalid request body"));
        }
    };

    let email = body.email.filter(|e| !e.is_empty());
    let password = body.password.filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "Email and password are required",
        ));
    };

    let Some(user) = state.users.authenticate(&email, &password).await else {
        warn!(email = %email, "Login failed");
        return Ok(error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    };

    let grant = state.sessions.create(user.clone())?;
    let cookie = session_cookie(
        &grant.session_id,
        state.sessions.ttl().as_secs(),
        state.secure_cookie,
    );

    info!(user_id = %user.id, role = %user.role, "Login succeeded");
    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            user,
        }),
    )
        .into_response())
}

/// Revoke the caller's session, if any, and clear the cookie.
#[instrument(skip_all)]
pub async fn logout(State(state): State<GateState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token);
    }

    (
        [
            (SET_COOKIE, clear_session_cookie()),
            (CACHE_CONTROL, NO_STORE.to_string()),
        ],
        Json(LogoutResponse { success: true }),
    )
        .into_response()
}

/// The user behind the caller's session.
#[instrument(skip_all)]
pub async fn me(State(state): State<GateState>, headers: HeaderMap) -> Response {
    let user = session_token(&headers).and_then(|token| state.sessions.lookup(&token));

    match user {
        Some(user) => (
            [(CACHE_CONTROL, "private, s-maxage=30, stale-while-revalidate=60")],
            Json(MeResponse { user }),
        )
            .into_response(),
        None => error_response(StatusCode::UNAUTHORIZED, "Not authenticated"),
    }
}

pub async fn health() -> Response {
    (
        [(CACHE_CONTROL, "public, s-maxage=10, stale-while-revalidate=30")],
        Json(HealthResponse {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}
