//! # RFC 8628 Device Authorization Grant
//!
//! `/device/code` mints a (device_code, user_code) pair; the user visits
//! `verification_uri` on a second screen and approves or denies; the device
//! polls `/oauth2/token` with `grant_type=urn:ietf:params:oauth:grant-type:device_code`
//! until it gets a terminal answer. [`poll`] resolves that terminal answer;
//! [`super::super::token`] does the actual access/refresh token minting so
//! every grant type mints tokens through the one call site.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::domain::entities::{DeviceCode, GrantStatus, OAuthClient};
use crate::oauth::{OAuthError, OAuthErrorCode};
use crate::AuthResult;

/// Ambiguity-free charset (no `0`/`O`, `1`/`I`) a human can read off a phone
/// screen and type without error. Picked via `Rng::gen_range`, which is
/// already unbiased — never reduce a wider random value by `% len`, which
/// would skew toward the low end of the charset whenever `len` doesn't
/// evenly divide the RNG's output range.
const USER_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const USER_CODE_GROUP_LEN: usize = 4;
const USER_CODE_GROUPS: usize = 2;
/// RFC 8628 §3.5: each `slow_down` widens the required polling interval by
/// this many seconds, on top of whatever it already was.
const SLOW_DOWN_INCREMENT_SECONDS: i32 = 5;

fn generate_user_code() -> String {
    let mut rng = rand::thread_rng();
    let mut groups = Vec::with_capacity(USER_CODE_GROUPS);
    for _ in 0..USER_CODE_GROUPS {
        let group: String = (0..USER_CODE_GROUP_LEN)
            .map(|_| USER_CODE_CHARSET[rng.gen_range(0..USER_CODE_CHARSET.len())] as char)
            .collect();
        groups.push(group);
    }
    groups.join("-")
}

#[derive(Debug, Serialize)]
pub struct DeviceAuthorizationResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    pub expires_in: i64,
    pub interval: i64,
}

/// `/device/code`: mints a fresh device/user code pair scoped to `client`.
pub async fn start(auth: &AuthContext, client: &OAuthClient, scopes: &[String]) -> AuthResult<DeviceAuthorizationResponse> {
    let user_code = generate_user_code();
    let interval = auth.options.polling_interval_seconds;
    let (_row, device_code) = auth
        .adapter
        .create_device_code(&client.client_id, &user_code, scopes, auth.options.device_code_ttl, interval as i32)
        .await?;

    let verification_uri = format!("{}{}/device", auth.options.base_url, auth.options.base_path);
    let verification_uri_complete = format!("{verification_uri}?user_code={user_code}");

    Ok(DeviceAuthorizationResponse {
        device_code,
        user_code,
        verification_uri,
        verification_uri_complete,
        expires_in: auth.options.device_code_ttl.num_seconds(),
        interval,
    })
}

/// The user-facing approval step: `/device` (GET, shows the code) and its
/// POST handler call this once the user is authenticated and has decided.
pub async fn resolve(auth: &AuthContext, user_code: &str, user_id: Uuid, approve: bool) -> AuthResult<DeviceCode> {
    use shared::errors::ApiError;

    let record = auth
        .adapter
        .find_device_code_by_user_code(user_code)
        .await?
        .ok_or(ApiError::NotFound { resource: "device code".into() })?;

    if record.expires_at <= Utc::now() {
        return Err(ApiError::BadRequest { message: "device code expired".into() });
    }
    if record.status != GrantStatus::Pending {
        return Err(ApiError::BadRequest { message: "device code already resolved".into() });
    }

    let status = if approve { GrantStatus::Approved } else { GrantStatus::Denied };
    auth.adapter.resolve_device_code(record.id, user_id, status).await
}

/// The device's poll: looks up by `device_code`, enforces the minimum
/// polling interval, and maps non-terminal/terminal states onto the RFC
/// 8628 §3.5 codes. Returns `Ok(record)` only once status is `Approved`.
pub async fn poll(auth: &AuthContext, device_code: &str) -> Result<DeviceCode, OAuthError> {
    let record = auth
        .adapter
        .find_device_code_by_device_code(device_code)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;

    if record.expires_at <= Utc::now() {
        return Err(OAuthError::new(OAuthErrorCode::ExpiredToken));
    }

    if let Some(last_polled) = record.last_polled_at {
        let min_gap = chrono::Duration::seconds(record.polling_interval_seconds as i64);
        if Utc::now() - last_polled < min_gap {
            let _ = auth.adapter.mark_device_code_slow_down(record.id, record.polling_interval_seconds + SLOW_DOWN_INCREMENT_SECONDS).await;
            return Err(OAuthError::new(OAuthErrorCode::SlowDown));
        }
    }
    let _ = auth.adapter.mark_device_code_polled(record.id).await;

    match record.status {
        GrantStatus::Pending => Err(OAuthError::new(OAuthErrorCode::AuthorizationPending)),
        GrantStatus::Denied => Err(OAuthError::new(OAuthErrorCode::AccessDenied)),
        GrantStatus::Approved => Ok(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_code_uses_only_ambiguity_free_characters() {
        let code = generate_user_code();
        assert!(code.chars().all(|c| c == '-' || USER_CODE_CHARSET.contains(&(c as u8))));
        assert!(!code.contains('0') && !code.contains('O') && !code.contains('1') && !code.contains('I'));
    }

    #[test]
    fn user_code_has_two_four_character_groups() {
        let code = generate_user_code();
        let groups: Vec<&str> = code.split('-').collect();
        assert_eq!(groups.len(), USER_CODE_GROUPS);
        assert!(groups.iter().all(|g| g.len() == USER_CODE_GROUP_LEN));
    }
}
