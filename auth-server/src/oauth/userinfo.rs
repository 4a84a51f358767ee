//! # OIDC UserInfo Endpoint
//!
//! `/oauth2/userinfo`: given a bearer access token (opaque or JWT, same
//! dual-acceptance as [`super::grants::token_exchange`]), returns the
//! standard claims the token's scopes entitle the caller to. `openid` alone
//! yields only `sub`; `profile` and `email` each unlock their own claim
//! subset per the OIDC core spec.

use serde::Serialize;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::domain::entities::User;
use crate::oauth::{OAuthError, OAuthErrorCode};

#[derive(Debug, Clone, Serialize, Default)]
pub struct UserInfoClaims {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

fn claims_for(user: &User, scopes: &[String]) -> UserInfoClaims {
    let mut claims = UserInfoClaims { sub: user.id.to_string(), ..Default::default() };

    if scopes.iter().any(|s| s == "profile") {
        claims.name = Some(user.display_name.clone());
        claims.picture = user.image_url.clone();
        claims.preferred_username = user.username.clone();
    }
    if scopes.iter().any(|s| s == "email") {
        claims.email = Some(user.email.clone());
        claims.email_verified = Some(user.email_verified);
    }

    claims
}

/// Resolves the bearer token to `(user_id, scopes)` the same way
/// [`super::grants::token_exchange::resolve_token_subject`] does, then loads
/// the user and projects the claims its scopes allow.
pub async fn handle(auth: &AuthContext, access_token: &str) -> Result<UserInfoClaims, OAuthError> {
    let (user_id, scopes) = resolve_access_token(auth, access_token).await?;

    if !scopes.iter().any(|s| s == "openid") {
        return Err(OAuthError::with_description(OAuthErrorCode::InvalidRequest, "token was not issued for the openid scope"));
    }

    let user = auth
        .adapter
        .find_user_by_id(user_id)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;

    Ok(claims_for(&user, &scopes))
}

#[derive(Debug, Clone, serde::Deserialize)]
struct JwtUserInfoClaims {
    sub: Uuid,
    scope: String,
    exp: i64,
}

async fn resolve_access_token(auth: &AuthContext, token: &str) -> Result<(Uuid, Vec<String>), OAuthError> {
    if let Ok(record) = auth.adapter.find_access_token(token).await {
        if let Some(record) = record {
            if record.expires_at <= chrono::Utc::now() {
                return Err(OAuthError::new(OAuthErrorCode::ExpiredToken));
            }
            let user_id = record.user_id.ok_or_else(|| {
                OAuthError::with_description(OAuthErrorCode::InvalidGrant, "token has no associated user")
            })?;
            return Ok((user_id, record.scopes));
        }
    }

    let claims = auth
        .jwt
        .verify::<JwtUserInfoClaims>(token)
        .map_err(|_| OAuthError::new(OAuthErrorCode::InvalidGrant))?;
    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(OAuthError::new(OAuthErrorCode::ExpiredToken));
    }
    let scopes = crate::oauth::parse_scope_param(Some(&claims.scope));
    Ok((claims.sub, scopes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "jane@example.com".into(),
            display_name: "Jane Doe".into(),
            image_url: Some("https://example.com/avatar.png".into()),
            email_verified: true,
            role: "user".into(),
            banned: false,
            ban_expires: None,
            phone_number: None,
            username: Some("jane".into()),
            two_factor_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn openid_only_scope_yields_just_sub() {
        let user = sample_user();
        let claims = claims_for(&user, &["openid".to_string()]);
        assert!(claims.name.is_none());
        assert!(claims.email.is_none());
    }

    #[test]
    fn profile_and_email_scopes_add_their_own_claims() {
        let user = sample_user();
        let claims = claims_for(&user, &["openid".to_string(), "profile".to_string(), "email".to_string()]);
        assert_eq!(claims.name.as_deref(), Some("Jane Doe"));
        assert_eq!(claims.email.as_deref(), Some("jane@example.com"));
        assert_eq!(claims.email_verified, Some(true));
    }
}
