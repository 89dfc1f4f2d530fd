//! Shared-secret API key authorization.
//!
//! Write submissions and admin operations present the secret in the
//! `X-API-Key` header. When no secret is configured every request is
//! authorized; that development fallback is logged as a warning so it is
//! never silent in production.

use subtle::ConstantTimeEq;

/// Header carrying the caller's credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Compare two strings in constant time.
///
/// Different lengths return false immediately; length is not secret.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Check a presented key against the configured secret.
///
/// `None` configured secret authorizes everything (development mode).
pub fn authorize(presented: Option<&str>, configured: Option<&str>) -> bool {
    let Some(secret) = configured else {
        tracing::warn!("API_KEY not configured - skipping authentication");
        return true;
    };
    match presented {
        Some(key) => constant_time_eq(key, secret),
        None => false,
    }
}

// -- Tests --------------------------------------------------------------------
