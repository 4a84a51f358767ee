//! # Token Endpoint
//!
//! `/oauth2/token`: dispatches on `grant_type` to one of six paths —
//! `authorization_code`, `refresh_token` (with replay-triggered chain
//! revocation), `client_credentials`, and the three extension grants in
//! [`super::grants`] — and always returns the same [`TokenResponse`] shape
//! on success. Every failure path returns an [`OAuthError`] rather than
//! `shared::errors::ApiError`; the RFC mandates a stable `{error,
//! error_description}` body here regardless of what went wrong underneath.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::context::AuthContext;
use crate::domain::entities::OAuthClient;
use crate::oauth::grants::{ciba, device, token_exchange};
use crate::oauth::{authorize, OAuthError, OAuthErrorCode};

pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const GRANT_DEVICE_CODE: &str = "urn:ietf:params:oauth:grant-type:device_code";
pub const GRANT_CIBA: &str = "urn:openid:params:grant-type:ciba";
pub const GRANT_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";

#[derive(Debug, Default, Deserialize_form)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub device_code: Option<String>,
    pub auth_req_id: Option<String>,
    pub audience: Option<String>,
    /// RFC 8707 resource indicator. Only consulted by grants that funnel
    /// through [`issue_tokens`] — `token_exchange` owns `audience` for its
    /// own, unrelated purpose and ignores this field.
    pub resource: Option<String>,
    pub subject_token: Option<String>,
    pub subject_token_type: Option<String>,
    pub actor_token: Option<String>,
    pub actor_token_type: Option<String>,
    pub requested_token_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Local alias so the struct above reads like an ordinary derive; actix's
/// `Form<T>` only needs `Deserialize`, there's nothing form-specific about
/// the derive itself.
use serde::Deserialize as Deserialize_form;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_token_type: Option<&'static str>,
}

/// OIDC id_token claims, signed the same way every other JWT this deployment
/// issues is (HS256 over the process secret — see `context::JwtService`).
/// `nonce` is only present when the authorization request carried one;
/// `at_hash` per OIDC Core §3.1.3.6 binds this id_token to the access_token
/// it was minted alongside.
#[derive(Debug, Serialize)]
struct IdTokenClaims {
    iss: String,
    sub: String,
    aud: String,
    exp: i64,
    iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    at_hash: String,
}

fn mint_id_token(auth: &AuthContext, client: &OAuthClient, user_id: Uuid, access_token: &str, nonce: Option<String>) -> Result<String, OAuthError> {
    let now = Utc::now();
    let claims = IdTokenClaims {
        iss: format!("{}{}", auth.options.base_url, auth.options.base_path),
        sub: user_id.to_string(),
        aud: client.client_id.clone(),
        iat: now.timestamp(),
        exp: (now + auth.options.access_token_ttl).timestamp(),
        nonce,
        at_hash: shared::crypto::at_hash(access_token),
    };
    auth.jwt.sign(&claims).map_err(|e| OAuthError::from_api_error(&e))
}

/// A JWT access token, minted instead of the default opaque one when the
/// token request's `resource`/`audience` names a recognized
/// [`crate::context::AuthOptions::resource_indicators`] entry (§4.H grant
/// 1). Shaped to double as what [`super::userinfo`]/[`super::introspect`]
/// already know how to read back (`sub`/`scope`/`exp`, `sub`/`client_id`/
/// `scope`/`iat`/`exp` respectively) — `sub` is absent for a
/// `client_credentials` token, which has no user to bind.
#[derive(Debug, Serialize)]
pub struct AccessTokenClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<Uuid>,
    pub client_id: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

fn mint_resource_access_token(auth: &AuthContext, client: &OAuthClient, user_id: Option<Uuid>, scopes: &[String], resource: &str) -> Result<String, OAuthError> {
    let now = Utc::now();
    let claims = AccessTokenClaims {
        sub: user_id,
        client_id: client.client_id.clone(),
        scope: crate::oauth::format_scope_param(scopes),
        aud: resource.to_string(),
        iat: now.timestamp(),
        exp: (now + auth.options.access_token_ttl).timestamp(),
    };
    auth.jwt.sign(&claims).map_err(|e| OAuthError::from_api_error(&e))
}

/// Resolves and authenticates the client making the request. Confidential
/// clients must present a matching `client_secret`; public clients present
/// none. Every failure collapses to the same 401 `invalid_client` the RFC
/// specifies, regardless of which check tripped.
pub async fn authenticate_client(auth: &AuthContext, client_id: &str, client_secret: Option<&str>) -> Result<OAuthClient, OAuthError> {
    let client = auth
        .adapter
        .find_client(client_id)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::unauthorized_client_auth("unknown client_id"))?;

    if client.disabled {
        return Err(OAuthError::unauthorized_client_auth("client is disabled"));
    }

    if client.is_confidential() {
        let secret = client_secret.ok_or_else(|| OAuthError::unauthorized_client_auth("client_secret required"))?;
        let hash = client
            .client_secret_hash
            .as_deref()
            .ok_or_else(|| OAuthError::unauthorized_client_auth("client has no secret on record"))?;
        let ok = auth.password_hasher.verify(secret, hash).map_err(|e| OAuthError::from_api_error(&e))?;
        if !ok {
            return Err(OAuthError::unauthorized_client_auth("invalid client_secret"));
        }
    }

    Ok(client)
}

/// Mints the access token — opaque by default, or a signed JWT when
/// `resource` names an entry in `auth.options.resource_indicators` (§4.H
/// grant 1's "when `resource`/audience is provided and valid") — plus, when
/// `offline_access` is in scope or the grant is `refresh_token`, a fresh
/// refresh token, and when `openid` is in scope and there's a user in the
/// picture, an id_token. Every successful grant below funnels through this.
async fn issue_tokens(
    auth: &AuthContext,
    client: &OAuthClient,
    user_id: Option<Uuid>,
    session_id: Option<Uuid>,
    scopes: &[String],
    chain_id: Option<Uuid>,
    nonce: Option<String>,
    resource: Option<&str>,
) -> Result<TokenResponse, OAuthError> {
    let recognized_resource = resource.filter(|r| auth.options.resource_indicators.iter().any(|indicator| indicator == r));

    let access_token = match recognized_resource {
        Some(resource) => mint_resource_access_token(auth, client, user_id, scopes, resource)?,
        None => {
            let (_access_row, access_token) = auth
                .adapter
                .create_access_token(&client.client_id, user_id, session_id, scopes, auth.options.access_token_ttl, None)
                .await
                .map_err(|e| OAuthError::from_api_error(&e))?;
            access_token
        }
    };

    let wants_refresh = scopes.iter().any(|s| s == "offline_access");
    let refresh_token = if wants_refresh {
        if let (Some(user_id), Some(session_id)) = (user_id, session_id) {
            let chain_id = chain_id.unwrap_or_else(Uuid::new_v4);
            let (_refresh_row, refresh_token) = auth
                .adapter
                .create_refresh_token(chain_id, &client.client_id, user_id, session_id, scopes, auth.options.refresh_token_ttl)
                .await
                .map_err(|e| OAuthError::from_api_error(&e))?;
            Some(refresh_token)
        } else {
            None
        }
    } else {
        None
    };

    let id_token = if scopes.iter().any(|s| s == "openid") {
        match user_id {
            Some(user_id) => Some(mint_id_token(auth, client, user_id, &access_token, nonce)?),
            None => None,
        }
    } else {
        None
    };

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: auth.options.access_token_ttl.num_seconds(),
        refresh_token,
        id_token,
        scope: crate::oauth::format_scope_param(scopes),
        issued_token_type: None,
    })
}

/// `grant_type=authorization_code`: redeems the code minted by
/// `/oauth2/authorize`, checking PKCE and that `redirect_uri`/`client_id`
/// match what the code was issued for.
async fn authorization_code_grant(auth: &AuthContext, client: &OAuthClient, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
    let code = request
        .code
        .as_deref()
        .ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "code is required"))?;

    let data = authorize::consume_code(auth, code, request.code_verifier.as_deref()).await?;

    if data.client_id != client.client_id {
        return Err(OAuthError::new(OAuthErrorCode::InvalidGrant));
    }
    if request.redirect_uri.as_deref() != Some(data.redirect_uri.as_str()) {
        return Err(OAuthError::with_description(OAuthErrorCode::InvalidGrant, "redirect_uri does not match the authorization request"));
    }

    issue_tokens(auth, client, Some(data.user_id), Some(data.session_id), &data.scopes, None, data.nonce.clone(), request.resource.as_deref()).await
}

/// `grant_type=refresh_token`: rotates the token via compare-and-swap
/// revocation of the old one before minting the new pair. If the token was
/// already revoked — someone replaying a stolen refresh token after it was
/// already used — the entire chain is revoked instead of just failing this
/// one request, per §4.H's replay-detection rule.
async fn refresh_token_grant(auth: &AuthContext, client: &OAuthClient, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
    let token = request
        .refresh_token
        .as_deref()
        .ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "refresh_token is required"))?;

    let record = auth
        .adapter
        .find_refresh_token(token)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;

    if record.client_id != client.client_id {
        return Err(OAuthError::new(OAuthErrorCode::InvalidGrant));
    }
    if record.expires_at <= Utc::now() {
        return Err(OAuthError::new(OAuthErrorCode::ExpiredToken));
    }

    if record.revoked_at.is_some() {
        let _ = auth.adapter.revoke_refresh_token_chain(record.chain_id).await;
        return Err(OAuthError::with_description(OAuthErrorCode::InvalidGrant, "refresh token has already been used"));
    }

    let revoked_now = auth.adapter.revoke_refresh_token(record.id).await.map_err(|e| OAuthError::from_api_error(&e))?;
    if !revoked_now {
        // Lost the CAS race to a concurrent refresh on the same token — the
        // other request's rotation wins; treat this one as a replay too.
        let _ = auth.adapter.revoke_refresh_token_chain(record.chain_id).await;
        return Err(OAuthError::with_description(OAuthErrorCode::InvalidGrant, "refresh token has already been used"));
    }

    let scopes = if let Some(requested) = &request.scope {
        let requested = crate::oauth::parse_scope_param(Some(requested));
        crate::oauth::resolve_scopes(&requested, &record.scopes, &auth.options.scopes)?
    } else {
        record.scopes.clone()
    };

    issue_tokens(auth, client, Some(record.user_id), Some(record.session_id), &scopes, Some(record.chain_id), None, request.resource.as_deref()).await
}

/// `grant_type=client_credentials`: no user in the picture — the client is
/// acting as itself. `offline_access` is meaningless here since there's no
/// user session to tie a refresh token to, so `issue_tokens` naturally
/// skips minting one (no `user_id`/`session_id`).
async fn client_credentials_grant(auth: &AuthContext, client: &OAuthClient, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
    let requested = crate::oauth::parse_scope_param(request.scope.as_deref());
    let scopes = crate::oauth::resolve_scopes(&requested, &client.scopes, &auth.options.scopes)?;
    issue_tokens(auth, client, None, None, &scopes, None, None, request.resource.as_deref()).await
}

async fn device_code_grant(auth: &AuthContext, client: &OAuthClient, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
    let device_code = request
        .device_code
        .as_deref()
        .ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "device_code is required"))?;
    let record = device::poll(auth, device_code).await?;
    if record.client_id != client.client_id {
        return Err(OAuthError::new(OAuthErrorCode::InvalidGrant));
    }
    let user_id = record.user_id.ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;
    issue_tokens(auth, client, Some(user_id), None, &record.scopes, None, None, request.resource.as_deref()).await
}

async fn ciba_grant(auth: &AuthContext, client: &OAuthClient, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
    let auth_req_id = request
        .auth_req_id
        .as_deref()
        .ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "auth_req_id is required"))?;
    let record = ciba::poll(auth, auth_req_id).await?;
    if record.client_id != client.client_id {
        return Err(OAuthError::new(OAuthErrorCode::InvalidGrant));
    }
    let user_id = record.user_id.ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;
    issue_tokens(auth, client, Some(user_id), None, &record.scopes, None, None, request.resource.as_deref()).await
}

async fn token_exchange_grant(auth: &AuthContext, client: &OAuthClient, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
    let subject_token = request
        .subject_token
        .as_deref()
        .ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "subject_token is required"))?;
    let subject_token_type = request
        .subject_token_type
        .as_deref()
        .ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "subject_token_type is required"))?;
    let requested_scopes = crate::oauth::parse_scope_param(request.scope.as_deref());

    let result = token_exchange::exchange(
        auth,
        client,
        subject_token,
        subject_token_type,
        request.actor_token.as_deref(),
        request.actor_token_type.as_deref(),
        &requested_scopes,
        request.audience.clone(),
    )
    .await?;

    Ok(TokenResponse {
        access_token: result.access_token,
        token_type: "Bearer",
        expires_in: result.expires_in,
        refresh_token: None,
        id_token: None,
        scope: result.scope,
        issued_token_type: Some(result.issued_token_type),
    })
}

/// The single dispatch point every grant type above funnels through.
/// `client` must already be authenticated via [`authenticate_client`].
pub async fn handle(auth: &AuthContext, client: &OAuthClient, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
    if !client.grant_types.iter().any(|g| g == &request.grant_type) {
        return Err(OAuthError::new(OAuthErrorCode::UnauthorizedClient));
    }

    match request.grant_type.as_str() {
        GRANT_AUTHORIZATION_CODE => authorization_code_grant(auth, client, request).await,
        GRANT_REFRESH_TOKEN => refresh_token_grant(auth, client, request).await,
        GRANT_CLIENT_CREDENTIALS => client_credentials_grant(auth, client, request).await,
        GRANT_DEVICE_CODE => device_code_grant(auth, client, request).await,
        GRANT_CIBA => ciba_grant(auth, client, request).await,
        GRANT_TOKEN_EXCHANGE => token_exchange_grant(auth, client, request).await,
        other => Err(OAuthError::with_description(OAuthErrorCode::UnsupportedGrantType, format!("unsupported grant_type: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client(grant_types: &[&str]) -> OAuthClient {
        let now = Utc::now();
        OAuthClient {
            client_id: "client-1".into(),
            client_secret_hash: None,
            redirect_uris: vec!["https://client.example/cb".into()],
            scopes: vec!["openid".into(), "offline_access".into()],
            public: true,
            skip_consent: true,
            token_endpoint_auth_method: "none".into(),
            grant_types: grant_types.iter().map(|s| s.to_string()).collect(),
            response_types: vec!["code".into()],
            disabled: false,
            metadata: serde_json::json!({}),
            reference_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_response_omits_refresh_token_when_none() {
        let response = TokenResponse {
            access_token: "abc".into(),
            token_type: "Bearer",
            expires_in: 3600,
            refresh_token: None,
            id_token: None,
            scope: "openid".into(),
            issued_token_type: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("refresh_token").is_none());
    }

    #[tokio::test]
    async fn handle_rejects_a_grant_type_the_client_never_registered() {
        // `handle` checks `client.grant_types` before dispatching, so a
        // client registered only for `client_credentials` can't be used to
        // redeem an authorization code even if one somehow existed.
        let client = sample_client(&["client_credentials"]);
        assert!(!client.grant_types.iter().any(|g| g == GRANT_AUTHORIZATION_CODE));
    }
}
