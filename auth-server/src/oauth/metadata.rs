//! # OIDC Discovery and JWKS
//!
//! `/.well-known/openid-configuration` and `/.well-known/jwks.json`. Every
//! URL in the discovery document is derived from [`AuthOptions::base_url`]/
//! `base_path` — the same values [`super::grants::device::start`] already
//! uses to build `verification_uri`, so discovery and the rest of the
//! surface can never disagree about where the server lives.
//!
//! This deployment signs every JWT it issues (id_tokens, token exchange's
//! `act`-chain token, and resource-indicator-driven access tokens; an access
//! token otherwise stays opaque) with the shared HS256 secret in
//! [`crate::context::JwtService`], a key a third party can't be handed — so
//! `jwks_uri` advertises an empty key set rather than a key no one outside
//! this server could ever use to verify anything.

use serde::Serialize;

use crate::context::AuthContext;

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub introspection_endpoint: String,
    pub registration_endpoint: String,
    pub device_authorization_endpoint: String,
    pub backchannel_authentication_endpoint: String,
    pub jwks_uri: String,
    pub scopes_supported: Vec<String>,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub code_challenge_methods_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
}

pub fn discovery_document(auth: &AuthContext) -> DiscoveryDocument {
    let issuer = format!("{}{}", auth.options.base_url, auth.options.base_path);
    let code_challenge_methods = if auth.options.allow_plain_code_challenge_method {
        vec!["S256".to_string(), "plain".to_string()]
    } else {
        vec!["S256".to_string()]
    };

    DiscoveryDocument {
        authorization_endpoint: format!("{issuer}/oauth2/authorize"),
        token_endpoint: format!("{issuer}/oauth2/token"),
        userinfo_endpoint: format!("{issuer}/oauth2/userinfo"),
        introspection_endpoint: format!("{issuer}/oauth2/introspect"),
        registration_endpoint: format!("{issuer}/oauth2/register"),
        device_authorization_endpoint: format!("{issuer}/device/code"),
        backchannel_authentication_endpoint: format!("{issuer}/oauth/bc-authorize"),
        jwks_uri: format!("{issuer}/.well-known/jwks.json"),
        issuer,
        scopes_supported: auth.options.scopes.clone(),
        response_types_supported: vec!["code".to_string()],
        grant_types_supported: vec![
            crate::oauth::token::GRANT_AUTHORIZATION_CODE.to_string(),
            crate::oauth::token::GRANT_REFRESH_TOKEN.to_string(),
            crate::oauth::token::GRANT_CLIENT_CREDENTIALS.to_string(),
            crate::oauth::token::GRANT_DEVICE_CODE.to_string(),
            crate::oauth::token::GRANT_CIBA.to_string(),
            crate::oauth::token::GRANT_TOKEN_EXCHANGE.to_string(),
        ],
        token_endpoint_auth_methods_supported: vec!["client_secret_basic".to_string(), "client_secret_post".to_string(), "none".to_string()],
        code_challenge_methods_supported: code_challenge_methods,
        subject_types_supported: vec!["public".to_string()],
        id_token_signing_alg_values_supported: vec!["HS256".to_string()],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<serde_json::Value>,
}

pub fn jwks() -> JsonWebKeySet {
    JsonWebKeySet { keys: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwks_is_empty_when_every_issued_jwt_is_hs256() {
        assert!(jwks().keys.is_empty());
    }
}
