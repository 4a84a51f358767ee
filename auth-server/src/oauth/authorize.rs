//! # Authorization Endpoint
//!
//! `/oauth2/authorize`: the OAuth 2.1 + OIDC front door. Structured as a
//! pure decision ([`decide`]) over already-validated inputs, wrapped by an
//! I/O shell ([`handle`]) that does the client/redirect_uri lookup, PKCE
//! and scope checks, session lookup, and consent lookup before handing
//! `decide` just enough to pick an outcome. Keeping `decide` pure is what
//! makes the four-way branch (login vs. consent vs. code vs. error) testable
//! without a database — the same split the source repo's own
//! `AuthorizationService.authorize` never had a reason to make, since it
//! only ever had a single backing store to query inline.
//!
//! A missing/invalid `client_id` or an unregistered `redirect_uri` is caught
//! *before* `decide` ever runs: at that point there is no `redirect_uri` the
//! server can trust enough to bounce the user's browser to, so the error
//! goes out as a JSON body (`Deliver::RedirectToErrorUrl`'s policy), never a
//! redirect. Every other error, by contrast, flows as
//! `AuthorizeOutcome::RedirectError` per OAuth 2.1 §4.1.2.1 — the
//! client-visible, browser-following shape, since `redirect_uri` is known
//! good by the time `decide` runs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use shared::crypto::{self, CodeChallengeMethod};
use shared::errors::ApiError;

use crate::context::AuthContext;
use crate::domain::entities::OAuthClient;
use crate::oauth::{resolve_scopes, OAuthError, OAuthErrorCode};
use crate::AuthResult;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeParams {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub code_challenge: Option<String>,
    #[serde(default)]
    pub code_challenge_method: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// What an issued authorization code resolves to at the token endpoint.
/// Stored as the `value` of a [`crate::domain::entities::Verification`] row
/// identified by `authz-code-{sha256(code)}` — the code itself is never
/// persisted raw, matching every other opaque value in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCodeData {
    pub client_id: String,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub nonce: Option<String>,
}

fn code_identifier(code: &str) -> String {
    format!("authz-code-{}", crypto::sha256_hex(code))
}

/// The four terminal shapes `/oauth2/authorize` can resolve to. A request
/// the server can't safely redirect for at all (bad `client_id`, bad
/// `redirect_uri`) never reaches this type — see module docs.
pub enum AuthorizeOutcome {
    RedirectToLogin(Url),
    RedirectToConsent(Url),
    RedirectWithCode(Url),
    RedirectError(Url),
}

/// The pure decision: given an authenticated user (or not), whether consent
/// is already satisfied, and an already-minted code (or not, if the caller
/// hasn't issued one because a login/consent redirect intervened first),
/// picks which of the four outcomes applies. No I/O, no clock reads beyond
/// what the caller already resolved — every branch here is a straight
/// match over values the shell computed.
pub fn decide(
    redirect_uri: &Url,
    login_url: &Url,
    consent_url: &Url,
    user_id: Option<Uuid>,
    consent_satisfied: bool,
    issued_code: Option<&str>,
    state: Option<&str>,
    error: Option<OAuthErrorCode>,
) -> AuthorizeOutcome {
    if let Some(code) = error {
        let mut url = redirect_uri.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", code.as_str());
            if let Some(state) = state {
                pairs.append_pair("state", state);
            }
        }
        return AuthorizeOutcome::RedirectError(url);
    }

    if user_id.is_none() {
        return AuthorizeOutcome::RedirectToLogin(login_url.clone());
    }

    if !consent_satisfied {
        return AuthorizeOutcome::RedirectToConsent(consent_url.clone());
    }

    match issued_code {
        Some(code) => {
            let mut url = redirect_uri.clone();
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("code", code);
                if let Some(state) = state {
                    pairs.append_pair("state", state);
                }
            }
            AuthorizeOutcome::RedirectWithCode(url)
        }
        None => {
            // Authenticated and consented but no code yet minted is a shell
            // bug, not a client error — treat it as a generic server fault
            // redirect rather than silently succeed with an empty code.
            let mut url = redirect_uri.clone();
            url.query_pairs_mut().append_pair("error", OAuthErrorCode::InvalidRequest.as_str());
            AuthorizeOutcome::RedirectError(url)
        }
    }
}

/// Validates `client_id`/`redirect_uri` before anything else is trusted —
/// the one check whose failure cannot become a redirect.
pub async fn validate_client_and_redirect(auth: &AuthContext, client_id: &str, redirect_uri: &str) -> Result<(OAuthClient, Url), OAuthError> {
    let client = auth
        .adapter
        .find_client(client_id)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidClient, "unknown client_id"))?;

    if client.disabled {
        return Err(OAuthError::with_description(OAuthErrorCode::UnauthorizedClient, "client is disabled"));
    }

    let parsed = Url::parse(redirect_uri)
        .map_err(|_| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "malformed redirect_uri"))?;
    if !client.redirect_uris.iter().any(|registered| registered == redirect_uri) {
        return Err(OAuthError::with_description(OAuthErrorCode::InvalidRequest, "redirect_uri not registered for this client"));
    }

    Ok((client, parsed))
}

/// The full I/O shell: validates the request, resolves (or denies) PKCE and
/// scope, looks up the caller's session and consent record, mints a code
/// when everything lines up, and defers to [`decide`] for the final
/// branch. `user_id` is `None` when the caller has no valid session cookie.
pub async fn handle(
    auth: &AuthContext,
    params: &AuthorizeParams,
    session: Option<(Uuid, Uuid)>,
    login_url: Url,
    consent_url: Url,
    existing_consent_scopes: Option<&[String]>,
) -> AuthResult<AuthorizeOutcome> {
    let user_id = session.map(|(user_id, _)| user_id);
    let (client, redirect_uri) = match validate_client_and_redirect(auth, &params.client_id, &params.redirect_uri).await {
        Ok(pair) => pair,
        Err(oauth_error) => {
            return Err(ApiError::BadRequest { message: oauth_error.error_description.unwrap_or_else(|| oauth_error.error.to_string()) });
        }
    };

    if params.response_type != "code" {
        return Ok(decide(
            &redirect_uri,
            &login_url,
            &consent_url,
            user_id,
            true,
            None,
            params.state.as_deref(),
            Some(OAuthErrorCode::UnsupportedResponseType),
        ));
    }

    let requested_scopes = crate::oauth::parse_scope_param(params.scope.as_deref());
    let scopes = match resolve_scopes(&requested_scopes, &client.scopes, &auth.options.scopes) {
        Ok(scopes) => scopes,
        Err(_) => {
            return Ok(decide(
                &redirect_uri,
                &login_url,
                &consent_url,
                user_id,
                true,
                None,
                params.state.as_deref(),
                Some(OAuthErrorCode::InvalidScope),
            ))
        }
    };

    let pkce_required = auth.options.require_pkce || !client.is_confidential() || scopes.iter().any(|s| s == "offline_access");
    if pkce_required && params.code_challenge.is_none() {
        return Ok(decide(
            &redirect_uri,
            &login_url,
            &consent_url,
            user_id,
            true,
            None,
            params.state.as_deref(),
            Some(OAuthErrorCode::InvalidRequest),
        ));
    }
    if let Some(method) = &params.code_challenge_method {
        let recognized = method == "S256" || (method == "plain" && auth.options.allow_plain_code_challenge_method);
        if !recognized {
            return Ok(decide(
                &redirect_uri,
                &login_url,
                &consent_url,
                user_id,
                true,
                None,
                params.state.as_deref(),
                Some(OAuthErrorCode::InvalidRequest),
            ));
        }
    }

    let Some((user_id, session_id)) = session else {
        return Ok(decide(&redirect_uri, &login_url, &consent_url, None, true, None, params.state.as_deref(), None));
    };

    let consent_satisfied = client.skip_consent
        || existing_consent_scopes.map(|granted| scopes.iter().all(|s| granted.contains(s))).unwrap_or(false);
    if !consent_satisfied {
        return Ok(decide(&redirect_uri, &login_url, &consent_url, Some(user_id), false, None, params.state.as_deref(), None));
    }

    let code = crypto::random_alnum(32);
    let data = AuthorizationCodeData {
        client_id: client.client_id.clone(),
        user_id,
        session_id,
        redirect_uri: params.redirect_uri.clone(),
        scopes,
        code_challenge: params.code_challenge.clone(),
        code_challenge_method: params.code_challenge_method.clone(),
        nonce: params.nonce.clone(),
    };
    let value = serde_json::to_string(&data)
        .map_err(|e| ApiError::InternalError { message: format!("failed to serialize authorization code: {e}") })?;
    auth.adapter.create_verification_value(&code_identifier(&code), &value, auth.options.auth_code_ttl).await?;

    Ok(decide(&redirect_uri, &login_url, &consent_url, Some(user_id), true, Some(&code), params.state.as_deref(), None))
}

/// Looked up by `oauth2/token`'s `authorization_code` grant: consumes
/// (single-use) the code and returns the data it was minted with, verifying
/// the PKCE `code_verifier` against the stored challenge in the same step
/// so a caller can never redeem a code without the verifier matching.
pub async fn consume_code(auth: &AuthContext, code: &str, code_verifier: Option<&str>) -> Result<AuthorizationCodeData, OAuthError> {
    let identifier = code_identifier(code);
    let verification = auth
        .adapter
        .find_verification_value(&identifier)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;
    let _ = auth.adapter.delete_verification_value(&identifier).await;

    let data: AuthorizationCodeData = serde_json::from_str(&verification.value)
        .map_err(|_| OAuthError::new(OAuthErrorCode::InvalidGrant))?;

    if verification.expires_at <= Utc::now() {
        return Err(OAuthError::new(OAuthErrorCode::ExpiredToken));
    }

    if let Some(challenge) = &data.code_challenge {
        let verifier = code_verifier.ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidGrant, "code_verifier required"))?;
        let method = match data.code_challenge_method.as_deref() {
            Some("plain") => CodeChallengeMethod::Plain,
            _ => CodeChallengeMethod::S256,
        };
        if !crypto::pkce_verify(verifier, challenge, method) {
            return Err(OAuthError::with_description(OAuthErrorCode::InvalidGrant, "code_verifier does not match code_challenge"));
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn decide_redirects_to_login_when_unauthenticated() {
        let outcome = decide(&url("https://client.example/cb"), &url("https://auth.example/login"), &url("https://auth.example/consent"), None, false, None, None, None);
        assert!(matches!(outcome, AuthorizeOutcome::RedirectToLogin(_)));
    }

    #[test]
    fn decide_redirects_to_consent_when_authenticated_but_not_consented() {
        let outcome = decide(
            &url("https://client.example/cb"),
            &url("https://auth.example/login"),
            &url("https://auth.example/consent"),
            Some(Uuid::new_v4()),
            false,
            None,
            None,
            None,
        );
        assert!(matches!(outcome, AuthorizeOutcome::RedirectToConsent(_)));
    }

    #[test]
    fn decide_redirects_with_code_once_authenticated_and_consented() {
        let outcome = decide(
            &url("https://client.example/cb"),
            &url("https://auth.example/login"),
            &url("https://auth.example/consent"),
            Some(Uuid::new_v4()),
            true,
            Some("abc123"),
            Some("xyz"),
            None,
        );
        match outcome {
            AuthorizeOutcome::RedirectWithCode(redirect) => {
                assert!(redirect.query().unwrap().contains("code=abc123"));
                assert!(redirect.query().unwrap().contains("state=xyz"));
            }
            _ => panic!("expected RedirectWithCode"),
        }
    }

    #[test]
    fn decide_prioritizes_explicit_errors_over_login_state() {
        let outcome = decide(
            &url("https://client.example/cb"),
            &url("https://auth.example/login"),
            &url("https://auth.example/consent"),
            None,
            false,
            None,
            None,
            Some(OAuthErrorCode::InvalidScope),
        );
        match outcome {
            AuthorizeOutcome::RedirectError(redirect) => assert!(redirect.query().unwrap().contains("error=invalid_scope")),
            _ => panic!("expected RedirectError"),
        }
    }
}
