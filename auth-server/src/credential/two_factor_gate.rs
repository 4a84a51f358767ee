//! # Sign-In 2FA Gate
//!
//! Component 4.G's "2FA gate": a primary sign-in for a user with
//! `twoFactorEnabled` never sets the real session cookie. Instead it mints a
//! short-lived signed `two_factor` cookie carrying the user id, and the
//! caller responds `{twoFactorRedirect: true}`. `crate::api::handlers`'s
//! `two_factor_verify_totp`/`two_factor_verify_backup_code`/`two_factor_verify_otp`
//! read this cookie, check the submitted code, and only then call into
//! [`crate::session::SessionService`] to mint the real session.

use uuid::Uuid;

use shared::cookies::{CookieOptions, SetCookie};
use shared::errors::ApiError;

use crate::context::AuthContext;
use crate::AuthResult;

pub const TWO_FACTOR_COOKIE: &str = "two_factor";

/// Mints the pending-2FA cookie for `user_id`, valid for `auth.options.two_factor_cookie_ttl`.
pub fn issue(auth: &AuthContext, user_id: Uuid) -> SetCookie {
    auth.cookies.signed_cookie(
        TWO_FACTOR_COOKIE,
        &user_id.to_string(),
        CookieOptions { max_age_seconds: Some(auth.options.two_factor_cookie_ttl.num_seconds()), ..Default::default() },
    )
}

/// Verifies the pending-2FA cookie's signature and returns the carried user id.
pub fn verify(auth: &AuthContext, cookie_value: &str) -> AuthResult<Uuid> {
    let raw = auth.cookies.verify_signed(cookie_value).ok_or(ApiError::InvalidToken)?;
    Uuid::parse_str(&raw).map_err(|_| ApiError::InvalidToken)
}

/// A cookie that immediately clears the pending-2FA cookie once it's consumed.
pub fn clear(auth: &AuthContext) -> SetCookie {
    SetCookie::clear(auth.cookies.qualified_name(TWO_FACTOR_COOKIE), "/".to_string(), None)
}

#[cfg(test)]
mod tests {
    use shared::cookies::CookieFactory;

    /// Mirrors [`issue`]/[`verify`] directly against [`CookieFactory`] so this
    /// module's tests don't need a full [`crate::context::AuthContext`].
    fn factory() -> CookieFactory {
        CookieFactory::new("better-auth".into(), true, b"process-secret".to_vec())
    }

    #[test]
    fn issued_cookie_round_trips_the_user_id() {
        let cookies = factory();
        let user_id = uuid::Uuid::new_v4();
        let cookie = cookies.signed_cookie(super::TWO_FACTOR_COOKIE, &user_id.to_string(), Default::default());
        let recovered = cookies.verify_signed(&cookie.value).unwrap();
        assert_eq!(uuid::Uuid::parse_str(&recovered).unwrap(), user_id);
    }

    #[test]
    fn tampered_cookie_fails_verification() {
        let cookies = factory();
        let user_id = uuid::Uuid::new_v4();
        let mut cookie = cookies.signed_cookie(super::TWO_FACTOR_COOKIE, &user_id.to_string(), Default::default());
        cookie.value.push('x');
        assert!(cookies.verify_signed(&cookie.value).is_none());
    }
}
