//! # Trusted Device ("remember this device")
//!
//! Component 4.G's MFA-skip mechanism. Two strategies, both described in
//! SPEC_FULL.md §4.G and left selectable rather than picking one for every
//! deployment:
//!
//! - **Stateless (in-cookie)**: `hmac(secret, userId + "!" + sessionToken)`
//!   signed into the cookie value alongside the session token itself. No
//!   storage, no revocation list — trust is exactly as durable as the
//!   session it's tied to.
//! - **Durable (in-db)**: a [`crate::domain::entities::TrustedDevice`] row
//!   keyed by a random `device_id`, refreshed on every successful MFA skip
//!   (sliding 30-day window), and individually revocable.

use chrono::Utc;
use uuid::Uuid;

use shared::cookies::{CookieOptions, SetCookie};
use shared::crypto;

use crate::context::AuthContext;
use crate::AuthResult;

pub const TRUSTED_DEVICE_COOKIE: &str = "trusted_device";

pub struct TrustedDevice;

impl TrustedDevice {
    /// Stateless variant: mints `hmac(secret, userId!sessionToken)` and signs
    /// it into a long-lived cookie value alongside the session token.
    pub fn stateless_cookie(auth: &AuthContext, user_id: Uuid, session_token: &str) -> SetCookie {
        let message = format!("{user_id}!{session_token}");
        let mac = crypto::hmac_sign(auth.secrets.current().as_bytes(), message.as_bytes());
        let value = format!("{mac}!{session_token}");
        auth.cookies.signed_cookie(
            TRUSTED_DEVICE_COOKIE,
            &value,
            CookieOptions { max_age_seconds: Some(auth.options.trusted_device_ttl.num_seconds()), ..Default::default() },
        )
    }

    /// Verifies a stateless cookie value against the current user/session
    /// pair. Returns `true` only if the embedded session token matches
    /// `session_token` exactly — a trusted-device cookie minted for one
    /// session never vouches for another.
    pub fn verify_stateless(auth: &AuthContext, cookie_value: &str, user_id: Uuid, session_token: &str) -> bool {
        let Some((mac, token)) = cookie_value.split_once('!') else {
            return false;
        };
        if token != session_token {
            return false;
        }
        let message = format!("{user_id}!{session_token}");
        crypto::hmac_verify(auth.secrets.current().as_bytes(), message.as_bytes(), mac)
    }

    /// Durable variant: creates a `TrustedDevice` row and returns a cookie
    /// carrying just its `device_id`.
    pub async fn remember_in_db(auth: &AuthContext, user_id: Uuid, user_agent: Option<&str>) -> AuthResult<SetCookie> {
        let device = auth.adapter.create_trusted_device(user_id, user_agent, auth.options.trusted_device_ttl).await?;
        Ok(auth.cookies.signed_cookie(
            TRUSTED_DEVICE_COOKIE,
            &device.device_id.to_string(),
            CookieOptions { max_age_seconds: Some(auth.options.trusted_device_ttl.num_seconds()), ..Default::default() },
        ))
    }

    /// Looks up a `device_id` cookie value against the durable table. On a
    /// hit, slides the device's expiry forward another full TTL and returns
    /// a refreshed cookie alongside `true`; a miss or expired row returns
    /// `false` with no cookie to set.
    pub async fn verify_in_db(auth: &AuthContext, cookie_value: &str, user_id: Uuid) -> AuthResult<Option<SetCookie>> {
        let Ok(device_id) = Uuid::parse_str(cookie_value) else {
            return Ok(None);
        };
        if auth.adapter.find_trusted_device(device_id, user_id).await?.is_none() {
            return Ok(None);
        }

        auth.adapter
            .raw()
            .update(
                crate::storage::adapter::Model::TrustedDevice,
                &[crate::storage::adapter::WhereClause::eq("deviceId", device_id.to_string())],
                serde_json::json!({ "expiresAt": (Utc::now() + auth.options.trusted_device_ttl).to_rfc3339() }),
            )
            .await?;

        Ok(Some(auth.cookies.signed_cookie(
            TRUSTED_DEVICE_COOKIE,
            cookie_value,
            CookieOptions { max_age_seconds: Some(auth.options.trusted_device_ttl.num_seconds()), ..Default::default() },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stateless_cookie_verification_rejects_a_session_token_swap() {
        let secret = b"process-secret".to_vec();
        let user_id = Uuid::new_v4();
        let session_a = "token-a";
        let session_b = "token-b";

        let mac = crypto::hmac_sign(&secret, format!("{user_id}!{session_a}").as_bytes());
        let forged_for_b = format!("{mac}!{session_b}");

        let message_b = format!("{user_id}!{session_b}");
        let (forged_mac, forged_token) = forged_for_b.split_once('!').unwrap();
        assert_eq!(forged_token, session_b);
        assert!(!crypto::hmac_verify(&secret, message_b.as_bytes(), forged_mac));
    }
}
