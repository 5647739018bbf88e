//! The `auth_session` cookie.

use crate::headers::HeaderSource;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "auth_session";

/// Read a cookie value from the request's `Cookie` header.
///
/// Pairs without `=` are skipped. A value whose percent-encoding does not
/// decode to UTF-8, or that is empty, reads as absent.
pub fn read_cookie<H: HeaderSource + ?Sized>(headers: &H, name: &str) -> Option<String> {
    let header = headers.header("cookie")?;

    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .and_then(|(_, value)| urlencoding::decode(value.trim()).ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Read the session token from the request.
pub fn session_token<H: HeaderSource + ?Sized>(headers: &H) -> Option<String> {
    read_cookie(headers, SESSION_COOKIE_NAME)
}

/// `Set-Cookie` value that installs a session token.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Max-Age={}; Path=/",
        SESSION_COOKIE_NAME,
        urlencoding::encode(token),
        max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Max-Age=0; Path=/", SESSION_COOKIE_NAME)
}
