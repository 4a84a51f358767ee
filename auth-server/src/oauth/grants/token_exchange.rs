//! # RFC 8693 Token Exchange
//!
//! `grant_type=urn:ietf:params:oauth:grant-type:token-exchange`: a client
//! (typically a middle-tier service) trades a `subject_token` — optionally
//! alongside an `actor_token` acting on the subject's behalf — for a new
//! token scoped to a different `audience`. Unlike every other grant in this
//! crate, the issued token can't be the usual opaque DB-backed access
//! token: RFC 8693 §4.1's delegation chain (the `act` claim, nested one
//! level per delegation) needs a self-describing token, so exchange always
//! issues a signed JWT via [`crate::context::JwtService`] regardless of
//! whether the rest of the server hands out opaque or JWT access tokens.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::domain::entities::OAuthClient;
use crate::oauth::{OAuthError, OAuthErrorCode};
use crate::AuthResult;

pub const SUBJECT_TOKEN_TYPE_ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";
pub const ISSUED_TOKEN_TYPE_ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeClaims {
    pub sub: Uuid,
    pub client_id: String,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub iat: i64,
    pub exp: i64,
    /// The delegation chain: `act.sub` is whoever is acting, `act.act` (if
    /// present) is the actor's own actor, nested exactly as deep as the
    /// incoming `actor_token`'s own `act` claim was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub act: Option<Value>,
}

pub struct ExchangeResult {
    pub access_token: String,
    pub issued_token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
}

/// Resolves `subject_token`/`actor_token` (both must be access tokens this
/// server itself issued — opaque or JWT, either is accepted as input even
/// though output is always a JWT) and mints the delegated token.
pub async fn exchange(
    auth: &AuthContext,
    client: &OAuthClient,
    subject_token: &str,
    subject_token_type: &str,
    actor_token: Option<&str>,
    actor_token_type: Option<&str>,
    requested_scopes: &[String],
    audience: Option<String>,
) -> Result<ExchangeResult, OAuthError> {
    if subject_token_type != SUBJECT_TOKEN_TYPE_ACCESS_TOKEN {
        return Err(OAuthError::with_description(
            OAuthErrorCode::InvalidRequest,
            format!("unsupported subject_token_type: {subject_token_type}"),
        ));
    }

    let subject_user_id = resolve_token_subject(auth, subject_token).await?;

    let act = match (actor_token, actor_token_type) {
        (Some(token), Some(token_type)) => {
            if token_type != SUBJECT_TOKEN_TYPE_ACCESS_TOKEN {
                return Err(OAuthError::with_description(
                    OAuthErrorCode::InvalidRequest,
                    format!("unsupported actor_token_type: {token_type}"),
                ));
            }
            let actor_user_id = resolve_token_subject(auth, token).await?;
            let inherited_act = auth.jwt.verify::<ExchangeClaims>(token).ok().and_then(|c| c.act);
            Some(serde_json::json!({ "sub": actor_user_id, "act": inherited_act }))
        }
        (None, None) => None,
        _ => {
            return Err(OAuthError::with_description(
                OAuthErrorCode::InvalidRequest,
                "actor_token and actor_token_type must be supplied together",
            ))
        }
    };

    let scope = if requested_scopes.is_empty() { auth.options.scopes.clone() } else { requested_scopes.to_vec() };
    let now = Utc::now();
    let claims = ExchangeClaims {
        sub: subject_user_id,
        client_id: client.client_id.clone(),
        scope: scope.join(" "),
        aud: audience,
        iat: now.timestamp(),
        exp: (now + auth.options.access_token_ttl).timestamp(),
        act,
    };

    let access_token = auth.jwt.sign(&claims).map_err(|e| OAuthError::from_api_error(&e))?;

    Ok(ExchangeResult {
        access_token,
        issued_token_type: ISSUED_TOKEN_TYPE_ACCESS_TOKEN,
        expires_in: auth.options.access_token_ttl.num_seconds(),
        scope: claims.scope,
    })
}

/// A `subject_token`/`actor_token` may be either an opaque token this server
/// minted (looked up via the access-token table) or a JWT it signed
/// (verified directly) — token exchange accepts whichever shape the rest of
/// the deployment's token issuance policy produces.
async fn resolve_token_subject(auth: &AuthContext, token: &str) -> Result<Uuid, OAuthError> {
    if let Ok(claims) = auth.jwt.verify::<ExchangeClaims>(token) {
        return Ok(claims.sub);
    }
    let record = auth
        .adapter
        .find_access_token(token)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;
    if record.expires_at <= Utc::now() {
        return Err(OAuthError::new(OAuthErrorCode::InvalidGrant));
    }
    record.user_id.ok_or_else(|| {
        OAuthError::with_description(OAuthErrorCode::InvalidGrant, "subject_token has no associated user")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_claims_nest_act_as_json_value() {
        let claims = ExchangeClaims {
            sub: Uuid::nil(),
            client_id: "c1".into(),
            scope: "openid".into(),
            aud: Some("https://api.example".into()),
            iat: 0,
            exp: 3600,
            act: Some(serde_json::json!({ "sub": Uuid::nil(), "act": null })),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["act"]["sub"], Uuid::nil().to_string());
    }
}
