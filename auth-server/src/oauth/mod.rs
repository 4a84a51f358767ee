//! # OAuth 2.1 / OpenID Connect
//!
//! Component 4.H/4.I: the authorization server surface — authorize, token,
//! introspect, userinfo, dynamic client registration, and discovery/JWKS —
//! plus the three extension grants in [`grants`]. This module holds what
//! every submodule shares: the RFC 6749 §5.2 error shape and the delivery
//! policy that decides whether an error becomes a JSON body or a redirect.
//!
//! `shared::errors::ApiError` has no opinion on `{error, error_description}`
//! — it's a REST error shape, not an OAuth one — so this crate carries a
//! parallel [`OAuthError`] rather than stretching `ApiError` to cover both.

pub mod authorize;
pub mod grants;
pub mod introspect;
pub mod metadata;
pub mod register;
pub mod revoke;
pub mod token;
pub mod userinfo;

use actix_web::HttpResponse;
use serde::Serialize;
use url::Url;

use shared::errors::ApiError;

/// RFC 6749 §5.2 / RFC 8628 §3.5 error codes. No subset, no extras — every
/// code the grants in this crate can produce is named here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    InvalidScope,
    UnauthorizedClient,
    UnsupportedGrantType,
    UnsupportedResponseType,
    AuthorizationPending,
    SlowDown,
    AccessDenied,
    ExpiredToken,
    InvalidRedirectUri,
    InvalidClientMetadata,
}

impl OAuthErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidScope => "invalid_scope",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::AccessDenied => "access_denied",
            Self::ExpiredToken => "expired_token",
            Self::InvalidRedirectUri => "invalid_redirect_uri",
            Self::InvalidClientMetadata => "invalid_client_metadata",
        }
    }

    /// The HTTP status this code pairs with at the token endpoint. Every
    /// code in this set is a 400 per RFC 6749 §5.2 and RFC 8628 §3.5;
    /// `invalid_client` escalates to 401 only when the request carried (and
    /// failed) client credentials, which callers signal explicitly via
    /// [`OAuthError::unauthorized_client_auth`].
    pub fn status_code(self) -> u16 {
        400
    }
}

/// The `{error, error_description}` body RFC 6749 §5.2 mandates. Carries no
/// HTTP status of its own — the call site picks that via [`OAuthErrorCode::status_code`]
/// or the 401 override for a failed client authentication attempt.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthError {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip)]
    status: u16,
}

impl OAuthError {
    pub fn new(code: OAuthErrorCode) -> Self {
        Self { error: code.as_str(), error_description: None, status: code.status_code() }
    }

    pub fn with_description(code: OAuthErrorCode, description: impl Into<String>) -> Self {
        Self { error: code.as_str(), error_description: Some(description.into()), status: code.status_code() }
    }

    /// `invalid_client` at 401, for a request that presented client
    /// credentials and they were wrong — RFC 6749 §5.2's one status-code
    /// exception to the blanket 400.
    pub fn unauthorized_client_auth(description: impl Into<String>) -> Self {
        Self { error: OAuthErrorCode::InvalidClient.as_str(), error_description: Some(description.into()), status: 401 }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Maps the handful of [`ApiError`] variants the storage/session layers
    /// actually raise inside a grant handler onto the nearest RFC code.
    /// Anything not named here is a genuine server fault, not a client
    /// error, and is re-raised through `ApiError`'s own path instead.
    pub fn from_api_error(error: &ApiError) -> Self {
        match error {
            ApiError::InvalidCredentials | ApiError::InvalidToken | ApiError::TokenExpired => {
                Self::new(OAuthErrorCode::InvalidGrant)
            }
            ApiError::NotFound { .. } => Self::new(OAuthErrorCode::InvalidGrant),
            ApiError::AccessDenied => Self::new(OAuthErrorCode::AccessDenied),
            ApiError::BadRequest { message } => Self::with_description(OAuthErrorCode::InvalidRequest, message.clone()),
            _ => Self::with_description(OAuthErrorCode::InvalidRequest, error.to_string()),
        }
    }
}

/// How an [`OAuthError`] (or a successful redirect outcome) reaches the
/// client. The authorize endpoint redirects whenever it safely can per
/// §4.H; the token/introspect/register endpoints always answer JSON since
/// they're never reached via a browser redirect in the first place.
pub enum Deliver {
    /// A plain JSON error body at the error's own status code.
    Json,
    /// Redirect to the caller-supplied `redirect_uri`, echoing `state`, with
    /// `error`/`error_description` appended as query parameters.
    RedirectWithState(Url),
    /// The redirect_uri itself couldn't be trusted (missing, unregistered,
    /// malformed) — render the error as JSON rather than bounce the user's
    /// browser to an attacker-controlled URL.
    RedirectToErrorUrl,
}

impl OAuthError {
    /// Renders this error per `policy`, the single call site every
    /// oauth submodule funnels its failures through.
    pub fn deliver(self, policy: Deliver) -> HttpResponse {
        match policy {
            Deliver::Json | Deliver::RedirectToErrorUrl => {
                let status = actix_web::http::StatusCode::from_u16(self.status).unwrap_or(actix_web::http::StatusCode::BAD_REQUEST);
                HttpResponse::build(status).json(&self)
            }
            Deliver::RedirectWithState(mut redirect_uri) => {
                {
                    let mut pairs = redirect_uri.query_pairs_mut();
                    pairs.append_pair("error", self.error);
                    if let Some(description) = &self.error_description {
                        pairs.append_pair("error_description", description);
                    }
                }
                HttpResponse::Found().insert_header(("Location", redirect_uri.as_str())).finish()
            }
        }
    }
}

/// Scopes the server recognizes for a request: the intersection of what the
/// client asked for, what `AuthOptions::scopes` allows server-wide, and (for
/// authorization_code/refresh_token) what the client itself was registered
/// with. Order is preserved from `requested` since clients may depend on it
/// for display purposes.
pub fn resolve_scopes(requested: &[String], client_scopes: &[String], server_scopes: &[String]) -> Result<Vec<String>, OAuthError> {
    if requested.is_empty() {
        return Ok(client_scopes.to_vec());
    }
    for scope in requested {
        if !client_scopes.iter().any(|s| s == scope) || !server_scopes.iter().any(|s| s == scope) {
            return Err(OAuthError::with_description(OAuthErrorCode::InvalidScope, format!("scope not granted: {scope}")));
        }
    }
    Ok(requested.to_vec())
}

pub fn parse_scope_param(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default().split_whitespace().map(str::to_string).collect()
}

pub fn format_scope_param(scopes: &[String]) -> String {
    scopes.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_serializes_without_status_field() {
        let error = OAuthError::with_description(OAuthErrorCode::InvalidGrant, "replayed refresh token");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"], "invalid_grant");
        assert_eq!(json["error_description"], "replayed refresh token");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn unauthorized_client_auth_is_401() {
        let error = OAuthError::unauthorized_client_auth("bad client secret");
        assert_eq!(error.status_code(), 401);
    }

    #[test]
    fn resolve_scopes_rejects_anything_outside_client_grant() {
        let result = resolve_scopes(&["admin".into()], &["openid".into()], &["openid".into(), "admin".into()]);
        assert!(result.is_err());
    }

    #[test]
    fn resolve_scopes_defaults_to_client_scopes_when_none_requested() {
        let result = resolve_scopes(&[], &["openid".into(), "profile".into()], &["openid".into(), "profile".into()]).unwrap();
        assert_eq!(result, vec!["openid".to_string(), "profile".to_string()]);
    }

    #[test]
    fn scope_param_round_trips() {
        let scopes = parse_scope_param(Some("openid profile email"));
        assert_eq!(scopes, vec!["openid", "profile", "email"]);
        assert_eq!(format_scope_param(&scopes), "openid profile email");
    }
}
