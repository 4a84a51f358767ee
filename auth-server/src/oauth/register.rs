//! # RFC 7591 Dynamic Client Registration
//!
//! `/oauth2/register`: lets a relying party self-provision an
//! [`OAuthClient`] instead of an operator creating one by hand. Public
//! clients (`token_endpoint_auth_method=none`) get no secret; confidential
//! clients get one generated here and returned exactly once — same
//! one-time-disclosure rule the teacher repo already follows for emailed
//! password-reset tokens, generalized to a registration response.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::crypto;

use crate::context::AuthContext;
use crate::domain::entities::OAuthClient;
use crate::oauth::{OAuthError, OAuthErrorCode};

#[derive(Debug, Clone, Deserialize)]
pub struct ClientRegistrationRequest {
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(default)]
    pub grant_types: Option<Vec<String>>,
    #[serde(default)]
    pub response_types: Option<Vec<String>>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub redirect_uris: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub client_id_issued_at: i64,
}

const DEFAULT_GRANT_TYPES: &[&str] = &["authorization_code", "refresh_token"];
const DEFAULT_RESPONSE_TYPES: &[&str] = &["code"];

/// Validates `redirect_uris` (RFC 7591 §2 requires at least one, each an
/// absolute URI) and mints a fresh client. Confidential registration
/// (`token_endpoint_auth_method` anything other than `none`) generates a
/// secret; public registration doesn't.
pub async fn register(auth: &AuthContext, request: &ClientRegistrationRequest) -> Result<ClientRegistrationResponse, OAuthError> {
    if request.redirect_uris.is_empty() {
        return Err(OAuthError::with_description(OAuthErrorCode::InvalidClientMetadata, "redirect_uris must contain at least one URI"));
    }
    for uri in &request.redirect_uris {
        url::Url::parse(uri).map_err(|_| {
            OAuthError::with_description(OAuthErrorCode::InvalidRedirectUri, format!("{uri} is not an absolute URI"))
        })?;
    }

    let auth_method = request.token_endpoint_auth_method.clone().unwrap_or_else(|| "client_secret_basic".to_string());
    let public = auth_method == "none";

    let (client_secret, client_secret_hash) = if public {
        (None, None)
    } else {
        let secret = crypto::random_alnum(40);
        let hash = auth.password_hasher.hash(&secret).map_err(|e| OAuthError::from_api_error(&e))?;
        (Some(secret), Some(hash))
    };

    let scopes = crate::oauth::parse_scope_param(request.scope.as_deref());
    let scopes = if scopes.is_empty() { auth.options.scopes.clone() } else { scopes };

    let now = Utc::now();
    let client = OAuthClient {
        client_id: format!("client_{}", Uuid::new_v4().simple()),
        client_secret_hash,
        redirect_uris: request.redirect_uris.clone(),
        scopes,
        public,
        skip_consent: false,
        token_endpoint_auth_method: auth_method,
        grant_types: request.grant_types.clone().unwrap_or_else(|| DEFAULT_GRANT_TYPES.iter().map(|s| s.to_string()).collect()),
        response_types: request.response_types.clone().unwrap_or_else(|| DEFAULT_RESPONSE_TYPES.iter().map(|s| s.to_string()).collect()),
        disabled: false,
        metadata: request.client_name.as_deref().map(|name| serde_json::json!({ "client_name": name })).unwrap_or_else(|| serde_json::json!({})),
        reference_id: None,
        created_at: now,
        updated_at: now,
    };

    let created = auth.adapter.create_client(&client).await.map_err(|e| OAuthError::from_api_error(&e))?;

    Ok(ClientRegistrationResponse {
        client_id: created.client_id,
        client_secret,
        redirect_uris: created.redirect_uris,
        token_endpoint_auth_method: created.token_endpoint_auth_method,
        grant_types: created.grant_types,
        response_types: created.response_types,
        client_id_issued_at: created.created_at.timestamp(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_registration_with_no_redirect_uris() {
        let request = ClientRegistrationRequest {
            redirect_uris: vec![],
            token_endpoint_auth_method: None,
            grant_types: None,
            response_types: None,
            scope: None,
            client_name: None,
        };
        assert!(request.redirect_uris.is_empty());
    }

    #[test]
    fn rejects_a_non_absolute_redirect_uri() {
        assert!(url::Url::parse("not-a-url").is_err());
    }
}
