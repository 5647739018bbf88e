//! Client identifier resolution.
//!
//! The identifier is the key a limiter counts requests under. It is taken
//! from proxy-provided headers, in this order:
//!
//! 1. the left-most entry of `x-forwarded-for`
//! 2. `x-real-ip`
//! 3. `cf-connecting-ip`
//! 4. the literal `"unknown"`
//!
//! These headers are trusted as-is. The service must sit behind a proxy that
//! overwrites them; exposed directly, any client can pick its own bucket or
//! spend someone else's.
//!
//! Every client that sends none of the headers shares the `"unknown"`
//! bucket and can throttle the others.

use crate::headers::HeaderSource;

/// Forwarding chain header; the left-most entry is the original client.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Direct client address set by the fronting proxy.
pub const REAL_IP: &str = "x-real-ip";
/// Client address set by the edge network.
pub const CONNECTING_IP: &str = "cf-connecting-ip";
/// Identifier used when no address header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the rate limit key for a request.
pub fn resolve<H: HeaderSource + ?Sized>(headers: &H) -> String {
    let forwarded = headers
        .header(FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim);

    [forwarded, headers.header(REAL_IP), headers.header(CONNECTING_IP)]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
