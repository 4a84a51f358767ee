//! # Core Domain Entities
//!
//! The persistent models from §3 of the contract. Each struct maps directly
//! to a table reachable through the [`crate::storage::Adapter`] — nothing in
//! this module talks to a database directly, it's just shapes.
//!
//! All opaque tokens/codes (`Session.token`, `OAuthAccessToken.token`,
//! `OAuthRefreshToken.token`, device codes, CIBA `auth_req_id`s, and
//! authorization codes held in [`Verification::identifier`]) are stored as
//! their SHA-256 hash, never raw — see DESIGN.md for why this generalizes
//! what the source repo already did for its own refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// User
// =============================================================================

/// A registered principal. `role`/`banned`/`ban_expires`/`phone_number`/
/// `username`/`two_factor_enabled` are the extension fields the contract
/// calls out as plugin-contributed, kept inline here rather than in a
/// separate extension map since they're universal enough to be core in this
/// implementation (see DESIGN.md).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub image_url: Option<String>,
    pub email_verified: bool,
    pub role: String,
    pub banned: bool,
    pub ban_expires: Option<DateTime<Utc>>,
    pub phone_number: Option<String>,
    pub username: Option<String>,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new [`User`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub image_url: Option<String>,
}

// =============================================================================
// Account
// =============================================================================

/// Links a [`User`] to a credential source. `(user_id, provider_id,
/// account_id)` is unique; for the built-in `credential` provider,
/// `account_id` is the user's email and `password_hash` holds the argon2id
/// PHC string. Social/OIDC providers instead populate the token fields.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: String,
    pub account_id: String,
    pub password_hash: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const CREDENTIAL_PROVIDER: &str = "credential";

// =============================================================================
// Session
// =============================================================================

/// A user's authenticated session. `token` is the opaque 32-char value
/// handed to the client inside the signed session cookie; it's stored here
/// as its SHA-256 hash (`token_hash`) so a DB leak alone can't be replayed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub impersonated_by: Option<Uuid>,
    pub active_organization_id: Option<String>,
}

/// Ambient per-request metadata used when minting or rolling a session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

// =============================================================================
// Verification
// =============================================================================

/// A generic time-limited record: email-verification OTPs, password reset
/// tokens, OAuth `state`, authorization codes, PKCE challenges, and 2FA OTPs
/// all live here under a namespaced `identifier` (see module docs on each
/// call site for the exact namespacing convention used).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub id: Uuid,
    pub identifier: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// TwoFactor
// =============================================================================

/// One row per user with 2FA enabled. `secret` and `backup_codes` are AEAD
/// ciphertext (never argon2-hashed — the TOTP secret must be recoverable to
/// compute codes). `backup_codes` is a JSON array of SHA-256 hashes of the
/// individual codes so a DB leak doesn't hand out usable ones.
#[derive(Debug, Clone, FromRow)]
pub struct TwoFactor {
    pub user_id: Uuid,
    pub secret_encrypted: String,
    pub backup_codes_encrypted: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// TrustedDevice
// =============================================================================

/// Rolled forward on every successful MFA-skip when using the *in-db*
/// trusted-device strategy (§4.G). `device_id` is what the cookie carries;
/// everything else is metadata for audit/revocation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedDevice {
    pub device_id: Uuid,
    pub user_id: Uuid,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// OAuthClient
// =============================================================================

/// A registered OAuth/OIDC relying party. `client_id` is immutable once
/// created. `client_secret` is present only for confidential clients and,
/// per the `storeClientSecret` policy resolved in DESIGN.md, stored hashed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthClient {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret_hash: Option<String>,
    pub redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub public: bool,
    pub skip_consent: bool,
    pub token_endpoint_auth_method: String,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub disabled: bool,
    pub metadata: serde_json::Value,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthClient {
    pub fn is_confidential(&self) -> bool {
        !self.public
    }
}

// =============================================================================
// OAuthAccessToken
// =============================================================================

/// Backing row for an *opaque* access token. JWT access tokens are
/// stateless and never create one of these.
#[derive(Debug, Clone, FromRow)]
pub struct OAuthAccessToken {
    pub id: Uuid,
    pub token_hash: String,
    pub client_id: String,
    pub user_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub refresh_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// OAuthRefreshToken
// =============================================================================

/// One link in a rotation chain. `revoked_at` is set the instant a token is
/// exchanged for a new one; `chain_id` ties every descendant together so a
/// replay of a revoked token can revoke the whole chain in one update.
#[derive(Debug, Clone, FromRow)]
pub struct OAuthRefreshToken {
    pub id: Uuid,
    pub token_hash: String,
    pub chain_id: Uuid,
    pub client_id: String,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// OAuthConsent
// =============================================================================

/// Upserted once a user accepts the consent prompt for a client. A
/// subsequent authorize request whose scopes are a subset of `scopes` here
/// skips the consent page.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConsent {
    pub id: Uuid,
    pub client_id: String,
    pub user_id: Uuid,
    pub scopes: Vec<String>,
    pub reference_id: Option<String>,
    pub consent_given: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Grant status (device authorization + CIBA)
// =============================================================================

/// Unifies the device-code "denied" and CIBA "rejected" spellings named in
/// §9's open questions into one type — both still surface the RFC-mandated
/// `access_denied` error code at the token endpoint (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Pending,
    Approved,
    Denied,
}

// =============================================================================
// DeviceCode
// =============================================================================

/// RFC 8628 device authorization grant state. `user_code` is the
/// human-typed code (ambiguity-free charset); `device_code_hash` is the
/// SHA-256 hash of the code the polling device holds.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceCode {
    pub id: Uuid,
    pub device_code_hash: String,
    pub user_code: String,
    pub client_id: String,
    pub user_id: Option<Uuid>,
    pub scopes: Vec<String>,
    pub status: GrantStatus,
    pub expires_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub polling_interval_seconds: i32,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// CibaRequest
// =============================================================================

/// OpenID CIBA backchannel authentication request state, structurally
/// parallel to [`DeviceCode`] but keyed by `auth_req_id` instead of a
/// user-typed code, since approval happens out of band (push/app) rather
/// than by visiting a verification URI.
#[derive(Debug, Clone, FromRow)]
pub struct CibaRequest {
    pub id: Uuid,
    pub auth_req_id_hash: String,
    pub client_id: String,
    pub user_id: Option<Uuid>,
    pub scopes: Vec<String>,
    pub status: GrantStatus,
    pub expires_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub polling_interval_seconds: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_status_round_trips_through_serde_lowercase() {
        let json = serde_json::to_string(&GrantStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let back: GrantStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GrantStatus::Approved);
    }

    #[test]
    fn confidential_client_is_the_non_public_case() {
        let client = OAuthClient {
            client_id: "c1".into(),
            client_secret_hash: Some("hash".into()),
            redirect_uris: vec![],
            scopes: vec![],
            public: false,
            skip_consent: false,
            token_endpoint_auth_method: "client_secret_basic".into(),
            grant_types: vec!["authorization_code".into()],
            response_types: vec!["code".into()],
            disabled: false,
            metadata: serde_json::json!({}),
            reference_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(client.is_confidential());
    }
}
