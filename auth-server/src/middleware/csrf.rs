//! # Double-Submit CSRF Check
//!
//! State-changing form posts (password change, session revocation, consent
//! approval) require a CSRF token that round-trips through both a signed
//! cookie and a request header/body field — an attacker's cross-site form
//! submission carries the victim's cookie automatically but can't read it to
//! copy the value into the header, so the two values only ever agree for a
//! same-origin submission.

use actix_web::{HttpMessage, HttpRequest};
use shared::cookies::CookieOptions;
use shared::crypto;
use shared::errors::ApiError;

use crate::context::AuthContext;

pub const CSRF_COOKIE_NAME: &str = "csrf_token";
pub const CSRF_HEADER_NAME: &str = "X-CSRF-Token";

/// Mints a fresh token and the signed cookie that carries it. Called once
/// per session (or per form render, for deployments that want single-use
/// tokens); the returned token is what the caller embeds in the form/header.
pub fn issue(auth: &AuthContext) -> (String, shared::cookies::SetCookie) {
    let token = crypto::random_alnum(32);
    let cookie = auth.cookies.signed_cookie(
        CSRF_COOKIE_NAME,
        &token,
        CookieOptions { same_site: shared::cookies::SameSite::Strict, signed: true, ..Default::default() },
    );
    (token, cookie)
}

/// Verifies the submitted token against the signed cookie. Both sides must
/// be present and, after the cookie's signature is checked, byte-equal.
pub fn verify(auth: &AuthContext, request: &HttpRequest, submitted_token: &str) -> Result<(), ApiError> {
    let cookie_name = auth.cookies.qualified_name(CSRF_COOKIE_NAME);
    let raw_cookie = request
        .cookie(&cookie_name)
        .ok_or(ApiError::CsrfTokenRequired)?;
    let cookie_token = auth.cookies.verify_signed(raw_cookie.value()).ok_or(ApiError::CsrfTokenRequired)?;

    if cookie_token.is_empty() || submitted_token.is_empty() {
        return Err(ApiError::CsrfTokenRequired);
    }
    if !constant_time_eq(cookie_token.as_bytes(), submitted_token.as_bytes()) {
        return Err(ApiError::CsrfTokenRequired);
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.len() == b.len() && a.ct_eq(b).into()
}

/// Pulls the submitted token from the header this crate's own clients use;
/// a form-post-based deployment instead reads it from the parsed body and
/// calls [`verify`] directly.
pub fn token_from_header(request: &HttpRequest) -> Option<String> {
    request.headers().get(CSRF_HEADER_NAME).and_then(|h| h.to_str().ok()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_rejects_mismatched_lengths() {
        assert!(!constant_time_eq(b"short", b"longer-value"));
    }

    #[test]
    fn constant_time_eq_accepts_identical_bytes() {
        assert!(constant_time_eq(b"same-token", b"same-token"));
    }
}
