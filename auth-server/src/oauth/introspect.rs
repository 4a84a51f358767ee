//! # RFC 7662 Token Introspection
//!
//! `/oauth2/introspect`: given a token, tells the (already client-authenticated)
//! caller whether it's still active and, if so, what it's good for. Unlike
//! every other OAuth endpoint in this crate, an introspection failure is
//! never an error response — an expired, revoked, or unrecognized token
//! just introspects as `{"active": false}`, per RFC 7662 §2.2.

use chrono::Utc;
use serde::Serialize;

use crate::context::AuthContext;
use crate::domain::entities::OAuthClient;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IntrospectionResponse {
    Active(ActiveToken),
    Inactive { active: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveToken {
    pub active: bool,
    pub scope: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub token_type: &'static str,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

fn inactive() -> IntrospectionResponse {
    IntrospectionResponse::Inactive { active: false }
}

/// `token_type_hint` (when given) is tried first, then the other kind, since
/// RFC 7662 §2.1 only requires it be used as an optimization hint.
pub async fn introspect(auth: &AuthContext, token: &str, token_type_hint: Option<&str>) -> IntrospectionResponse {
    let try_access_first = token_type_hint != Some("refresh_token");

    if try_access_first {
        if let Some(response) = introspect_access_token(auth, token).await {
            return response;
        }
        if let Some(response) = introspect_refresh_token(auth, token).await {
            return response;
        }
    } else {
        if let Some(response) = introspect_refresh_token(auth, token).await {
            return response;
        }
        if let Some(response) = introspect_access_token(auth, token).await {
            return response;
        }
    }

    inactive()
}

async fn introspect_access_token(auth: &AuthContext, token: &str) -> Option<IntrospectionResponse> {
    if let Ok(Some(record)) = auth.adapter.find_access_token(token).await {
        if record.expires_at > Utc::now() {
            return Some(IntrospectionResponse::Active(ActiveToken {
                active: true,
                scope: crate::oauth::format_scope_param(&record.scopes),
                client_id: record.client_id,
                sub: record.user_id.map(|id| id.to_string()),
                token_type: "access_token",
                exp: record.expires_at.timestamp(),
                iat: Some(record.created_at.timestamp()),
            }));
        }
        return Some(inactive());
    }

    if let Ok(claims) = auth.jwt.verify::<JwtIntrospectionClaims>(token) {
        if claims.exp > Utc::now().timestamp() {
            return Some(IntrospectionResponse::Active(ActiveToken {
                active: true,
                scope: claims.scope,
                client_id: claims.client_id,
                sub: claims.sub,
                token_type: "access_token",
                exp: claims.exp,
                iat: Some(claims.iat),
            }));
        }
        return Some(inactive());
    }

    None
}

async fn introspect_refresh_token(auth: &AuthContext, token: &str) -> Option<IntrospectionResponse> {
    let record = auth.adapter.find_refresh_token(token).await.ok()??;
    if record.revoked_at.is_some() || record.expires_at <= Utc::now() {
        return Some(inactive());
    }
    Some(IntrospectionResponse::Active(ActiveToken {
        active: true,
        scope: crate::oauth::format_scope_param(&record.scopes),
        client_id: record.client_id,
        sub: Some(record.user_id.to_string()),
        token_type: "refresh_token",
        exp: record.expires_at.timestamp(),
        iat: Some(record.created_at.timestamp()),
    }))
}

/// Mirrors [`super::grants::token_exchange::ExchangeClaims`] and
/// [`super::token::AccessTokenClaims`] just enough to read back
/// `sub`/`scope`/`client_id`/`exp`/`iat` from a JWT access token without
/// pulling in the `act` nesting introspection has no use for. `sub` is
/// optional: a `client_credentials`-minted JWT carries no user at all.
#[derive(Debug, Clone, serde::Deserialize)]
struct JwtIntrospectionClaims {
    sub: Option<String>,
    client_id: String,
    scope: String,
    iat: i64,
    exp: i64,
}

/// Only a client that was party to the token may introspect it — RFC 7662
/// doesn't mandate this but leaving introspection open lets any registered
/// client fingerprint another client's tokens.
pub fn authorize_introspection(caller: &OAuthClient, token_client_id: &str) -> bool {
    caller.client_id == token_client_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_serializes_without_extra_fields() {
        let json = serde_json::to_value(inactive()).unwrap();
        assert_eq!(json, serde_json::json!({ "active": false }));
    }

    #[test]
    fn authorize_introspection_requires_matching_client() {
        let now = chrono::Utc::now();
        let caller = OAuthClient {
            client_id: "a".into(),
            client_secret_hash: None,
            redirect_uris: vec![],
            scopes: vec![],
            public: true,
            skip_consent: true,
            token_endpoint_auth_method: "none".into(),
            grant_types: vec![],
            response_types: vec![],
            disabled: false,
            metadata: serde_json::json!({}),
            reference_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(authorize_introspection(&caller, "a"));
        assert!(!authorize_introspection(&caller, "b"));
    }
}
