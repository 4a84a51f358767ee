//! # Internal Adapter
//!
//! Wraps the raw [`Adapter`] trait object with the named domain operations
//! the rest of the crate actually calls — `create_user`, `find_session`,
//! `rotate_refresh_token`, and so on — translating between
//! `serde_json::Value` and the typed structs in [`crate::domain::entities`].
//! Opaque values (session tokens, access/refresh tokens, device codes, CIBA
//! `auth_req_id`s) are hashed with SHA-256 before ever reaching the adapter,
//! generalizing the `hash_token` helper the source repo's `AuthService` used
//! only for refresh tokens.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared::crypto;
use shared::errors::ApiError;

use crate::domain::entities::{
    Account, CibaRequest, DeviceCode, GrantStatus, OAuthAccessToken, OAuthClient, OAuthConsent, OAuthRefreshToken,
    Session, SessionContext, TrustedDevice, TwoFactor, User, Verification,
};
use crate::AuthResult;

use super::adapter::{Adapter, FindManyQuery, Model, WhereClause};

fn parse<T: serde::de::DeserializeOwned>(value: Value) -> AuthResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::InternalError {
        message: format!("failed to deserialize storage row: {e}"),
    })
}

/// Named, typed domain operations layered over a raw [`Adapter`].
#[derive(Clone)]
pub struct InternalAdapter {
    raw: Arc<dyn Adapter>,
}

impl InternalAdapter {
    pub fn new(raw: Arc<dyn Adapter>) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> Arc<dyn Adapter> {
        self.raw.clone()
    }

    // =========================================================================
    // User / Account
    // =========================================================================

    pub async fn create_user(&self, email: &str, display_name: &str, image_url: Option<&str>) -> AuthResult<User> {
        let now = Utc::now();
        let data = json!({
            "id": Uuid::new_v4().to_string(),
            "email": email,
            "displayName": display_name,
            "imageUrl": image_url,
            "emailVerified": false,
            "role": "user",
            "banned": false,
            "twoFactorEnabled": false,
            "createdAt": now.to_rfc3339(),
            "updatedAt": now.to_rfc3339(),
        });
        let row = self.raw.create(Model::User, data, None).await?;
        parse(row)
    }

    pub async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = self
            .raw
            .find_one(Model::User, &[WhereClause::eq("email", email)], None)
            .await?;
        row.map(parse).transpose()
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>> {
        let row = self
            .raw
            .find_one(Model::User, &[WhereClause::eq("id", user_id.to_string())], None)
            .await?;
        row.map(parse).transpose()
    }

    pub async fn update_user(&self, user_id: Uuid, update: Value) -> AuthResult<User> {
        let mut fields = update.as_object().cloned().unwrap_or_default();
        fields.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));
        let row = self
            .raw
            .update(Model::User, &[WhereClause::eq("id", user_id.to_string())], Value::Object(fields))
            .await?;
        parse(row)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> AuthResult<()> {
        self.raw.delete(Model::User, &[WhereClause::eq("id", user_id.to_string())]).await
    }

    pub async fn link_account(&self, account: &Account) -> AuthResult<Account> {
        let row = self
            .raw
            .create(
                Model::Account,
                json!({
                    "id": account.id.to_string(),
                    "userId": account.user_id.to_string(),
                    "providerId": account.provider_id,
                    "accountId": account.account_id,
                    "passwordHash": account.password_hash,
                    "accessToken": account.access_token,
                    "refreshToken": account.refresh_token,
                    "accessTokenExpiresAt": account.access_token_expires_at.map(|t| t.to_rfc3339()),
                    "createdAt": account.created_at.to_rfc3339(),
                    "updatedAt": account.updated_at.to_rfc3339(),
                }),
                None,
            )
            .await?;
        parse(row)
    }

    pub async fn find_account(&self, provider_id: &str, account_id: &str) -> AuthResult<Option<Account>> {
        let row = self
            .raw
            .find_one(
                Model::Account,
                &[WhereClause::eq("providerId", provider_id), WhereClause::eq("accountId", account_id)],
                None,
            )
            .await?;
        row.map(parse).transpose()
    }

    pub async fn find_accounts_for_user(&self, user_id: Uuid) -> AuthResult<Vec<Account>> {
        let rows = self
            .raw
            .find_many(Model::Account, FindManyQuery::new(vec![WhereClause::eq("userId", user_id.to_string())]))
            .await?;
        rows.into_iter().map(parse).collect()
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Mints a fresh session token, hashes it for storage, and returns both
    /// the [`Session`] row and the raw token the caller signs into a cookie.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        ctx: &SessionContext,
        expires_in: Duration,
        impersonated_by: Option<Uuid>,
    ) -> AuthResult<(Session, String)> {
        let token = crypto::random_alnum(32);
        let now = Utc::now();
        let data = json!({
            "id": Uuid::new_v4().to_string(),
            "tokenHash": crypto::sha256_hex(&token),
            "userId": user_id.to_string(),
            "expiresAt": (now + expires_in).to_rfc3339(),
            "createdAt": now.to_rfc3339(),
            "updatedAt": now.to_rfc3339(),
            "userAgent": ctx.user_agent,
            "ipAddress": ctx.ip_address,
            "impersonatedBy": impersonated_by.map(|u| u.to_string()),
        });
        let row = self.raw.create(Model::Session, data, None).await?;
        Ok((parse(row)?, token))
    }

    pub async fn find_session(&self, token: &str) -> AuthResult<Option<Session>> {
        let hash = crypto::sha256_hex(token);
        let row = self.raw.find_one(Model::Session, &[WhereClause::eq("tokenHash", hash)], None).await?;
        row.map(parse).transpose()
    }

    pub async fn find_session_by_id(&self, session_id: Uuid) -> AuthResult<Option<Session>> {
        let row = self
            .raw
            .find_one(Model::Session, &[WhereClause::eq("id", session_id.to_string())], None)
            .await?;
        row.map(parse).transpose()
    }

    /// Rolls a session's `expiresAt` forward. Per the resolved Open Question
    /// in §9, `update_age == Duration::zero()` is taken literally: the
    /// caller always rolls, it never means "disable rolling".
    pub async fn roll_session(&self, session_id: Uuid, new_expiry: DateTime<Utc>) -> AuthResult<Session> {
        let row = self
            .raw
            .update(
                Model::Session,
                &[WhereClause::eq("id", session_id.to_string())],
                json!({ "expiresAt": new_expiry.to_rfc3339(), "updatedAt": Utc::now().to_rfc3339() }),
            )
            .await?;
        parse(row)
    }

    pub async fn delete_session(&self, session_id: Uuid) -> AuthResult<()> {
        self.raw.delete(Model::Session, &[WhereClause::eq("id", session_id.to_string())]).await
    }

    pub async fn delete_sessions_for_user(&self, user_id: Uuid) -> AuthResult<u64> {
        self.raw
            .delete_many(Model::Session, &[WhereClause::eq("userId", user_id.to_string())])
            .await
    }

    // =========================================================================
    // Verification (OTPs, reset tokens, OAuth state, auth codes, PKCE)
    // =========================================================================

    pub async fn create_verification_value(
        &self,
        identifier: &str,
        value: &str,
        ttl: Duration,
    ) -> AuthResult<Verification> {
        let now = Utc::now();
        let row = self
            .raw
            .create(
                Model::Verification,
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "identifier": identifier,
                    "value": value,
                    "expiresAt": (now + ttl).to_rfc3339(),
                    "createdAt": now.to_rfc3339(),
                }),
                None,
            )
            .await?;
        parse(row)
    }

    pub async fn find_verification_value(&self, identifier: &str) -> AuthResult<Option<Verification>> {
        let row = self
            .raw
            .find_one(Model::Verification, &[WhereClause::eq("identifier", identifier)], None)
            .await?;
        let verification: Option<Verification> = row.map(parse).transpose()?;
        Ok(verification.filter(|v| v.expires_at > Utc::now()))
    }

    pub async fn delete_verification_value(&self, identifier: &str) -> AuthResult<()> {
        self.raw
            .delete(Model::Verification, &[WhereClause::eq("identifier", identifier)])
            .await
    }

    // =========================================================================
    // Two-factor / trusted device
    // =========================================================================

    pub async fn upsert_two_factor(&self, user_id: Uuid, secret_ciphertext: &str, backup_codes_ciphertext: &str) -> AuthResult<TwoFactor> {
        let existing = self
            .raw
            .find_one(Model::TwoFactor, &[WhereClause::eq("userId", user_id.to_string())], None)
            .await?;
        let row = if existing.is_some() {
            self.raw
                .update(
                    Model::TwoFactor,
                    &[WhereClause::eq("userId", user_id.to_string())],
                    json!({ "secretEncrypted": secret_ciphertext, "backupCodesEncrypted": backup_codes_ciphertext }),
                )
                .await?
        } else {
            self.raw
                .create(
                    Model::TwoFactor,
                    json!({
                        "userId": user_id.to_string(),
                        "secretEncrypted": secret_ciphertext,
                        "backupCodesEncrypted": backup_codes_ciphertext,
                        "createdAt": Utc::now().to_rfc3339(),
                    }),
                    None,
                )
                .await?
        };
        parse(row)
    }

    pub async fn find_two_factor(&self, user_id: Uuid) -> AuthResult<Option<TwoFactor>> {
        let row = self
            .raw
            .find_one(Model::TwoFactor, &[WhereClause::eq("userId", user_id.to_string())], None)
            .await?;
        row.map(parse).transpose()
    }

    pub async fn delete_two_factor(&self, user_id: Uuid) -> AuthResult<()> {
        self.raw
            .delete(Model::TwoFactor, &[WhereClause::eq("userId", user_id.to_string())])
            .await
    }

    pub async fn create_trusted_device(&self, user_id: Uuid, user_agent: Option<&str>, ttl: Duration) -> AuthResult<TrustedDevice> {
        let now = Utc::now();
        let row = self
            .raw
            .create(
                Model::TrustedDevice,
                json!({
                    "deviceId": Uuid::new_v4().to_string(),
                    "userId": user_id.to_string(),
                    "userAgent": user_agent,
                    "expiresAt": (now + ttl).to_rfc3339(),
                    "createdAt": now.to_rfc3339(),
                }),
                None,
            )
            .await?;
        parse(row)
    }

    pub async fn find_trusted_device(&self, device_id: Uuid, user_id: Uuid) -> AuthResult<Option<TrustedDevice>> {
        let row = self
            .raw
            .find_one(
                Model::TrustedDevice,
                &[WhereClause::eq("deviceId", device_id.to_string()), WhereClause::eq("userId", user_id.to_string())],
                None,
            )
            .await?;
        let device: Option<TrustedDevice> = row.map(parse).transpose()?;
        Ok(device.filter(|d| d.expires_at > Utc::now()))
    }

    // =========================================================================
    // OAuth clients
    // =========================================================================

    pub async fn find_client(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        let row = self
            .raw
            .find_one(Model::OAuthClient, &[WhereClause::eq("clientId", client_id)], None)
            .await?;
        row.map(parse).transpose()
    }

    pub async fn create_client(&self, client: &OAuthClient) -> AuthResult<OAuthClient> {
        let row = self
            .raw
            .create(
                Model::OAuthClient,
                json!({
                    "clientId": client.client_id,
                    "clientSecretHash": client.client_secret_hash,
                    "redirectUris": client.redirect_uris,
                    "scopes": client.scopes,
                    "public": client.public,
                    "skipConsent": client.skip_consent,
                    "tokenEndpointAuthMethod": client.token_endpoint_auth_method,
                    "grantTypes": client.grant_types,
                    "responseTypes": client.response_types,
                    "disabled": client.disabled,
                    "metadata": client.metadata,
                    "referenceId": client.reference_id,
                    "createdAt": client.created_at.to_rfc3339(),
                    "updatedAt": client.updated_at.to_rfc3339(),
                }),
                None,
            )
            .await?;
        parse(row)
    }

    // =========================================================================
    // OAuth tokens
    // =========================================================================

    pub async fn create_access_token(
        &self,
        client_id: &str,
        user_id: Option<Uuid>,
        session_id: Option<Uuid>,
        scopes: &[String],
        ttl: Duration,
        refresh_id: Option<Uuid>,
    ) -> AuthResult<(OAuthAccessToken, String)> {
        let token = crypto::random_alnum(48);
        let now = Utc::now();
        let row = self
            .raw
            .create(
                Model::OAuthAccessToken,
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "tokenHash": crypto::sha256_hex(&token),
                    "clientId": client_id,
                    "userId": user_id.map(|u| u.to_string()),
                    "sessionId": session_id.map(|s| s.to_string()),
                    "scopes": scopes,
                    "expiresAt": (now + ttl).to_rfc3339(),
                    "refreshId": refresh_id.map(|r| r.to_string()),
                    "createdAt": now.to_rfc3339(),
                }),
                None,
            )
            .await?;
        Ok((parse(row)?, token))
    }

    pub async fn find_access_token(&self, token: &str) -> AuthResult<Option<OAuthAccessToken>> {
        let hash = crypto::sha256_hex(token);
        let row = self
            .raw
            .find_one(Model::OAuthAccessToken, &[WhereClause::eq("tokenHash", hash)], None)
            .await?;
        row.map(parse).transpose()
    }

    /// `/oauth2/revoke` (RFC 7009) on an opaque access token: delete it
    /// outright — unlike a refresh token, there's no chain to cascade.
    pub async fn delete_access_token(&self, token: &str) -> AuthResult<()> {
        let hash = crypto::sha256_hex(token);
        self.raw.delete(Model::OAuthAccessToken, &[WhereClause::eq("tokenHash", hash)]).await
    }

    pub async fn create_refresh_token(
        &self,
        chain_id: Uuid,
        client_id: &str,
        user_id: Uuid,
        session_id: Uuid,
        scopes: &[String],
        ttl: Duration,
    ) -> AuthResult<(OAuthRefreshToken, String)> {
        let token = crypto::random_alnum(48);
        let now = Utc::now();
        let row = self
            .raw
            .create(
                Model::OAuthRefreshToken,
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "tokenHash": crypto::sha256_hex(&token),
                    "chainId": chain_id.to_string(),
                    "clientId": client_id,
                    "userId": user_id.to_string(),
                    "sessionId": session_id.to_string(),
                    "scopes": scopes,
                    "expiresAt": (now + ttl).to_rfc3339(),
                    "createdAt": now.to_rfc3339(),
                }),
                None,
            )
            .await?;
        Ok((parse(row)?, token))
    }

    pub async fn find_refresh_token(&self, token: &str) -> AuthResult<Option<OAuthRefreshToken>> {
        let hash = crypto::sha256_hex(token);
        let row = self
            .raw
            .find_one(Model::OAuthRefreshToken, &[WhereClause::eq("tokenHash", hash)], None)
            .await?;
        row.map(parse).transpose()
    }

    /// Revokes one refresh token via CAS (`revokedAt IS NULL`), returning
    /// whether this call was the one that revoked it. Used both for normal
    /// rotation and for replay-triggered chain revocation.
    pub async fn revoke_refresh_token(&self, id: Uuid) -> AuthResult<bool> {
        let affected = self
            .raw
            .update_many(
                Model::OAuthRefreshToken,
                &[WhereClause::eq("id", id.to_string()), WhereClause::eq("revokedAt", Value::Null)],
                json!({ "revokedAt": Utc::now().to_rfc3339() }),
            )
            .await?;
        Ok(affected > 0)
    }

    /// Revokes every token in a chain — the response to detecting a replayed
    /// (already-revoked) refresh token being reused.
    pub async fn revoke_refresh_token_chain(&self, chain_id: Uuid) -> AuthResult<u64> {
        self.raw
            .update_many(
                Model::OAuthRefreshToken,
                &[WhereClause::eq("chainId", chain_id.to_string())],
                json!({ "revokedAt": Utc::now().to_rfc3339() }),
            )
            .await
    }

    // =========================================================================
    // Consent
    // =========================================================================

    pub async fn find_consent(&self, client_id: &str, user_id: Uuid) -> AuthResult<Option<OAuthConsent>> {
        let row = self
            .raw
            .find_one(
                Model::OAuthConsent,
                &[WhereClause::eq("clientId", client_id), WhereClause::eq("userId", user_id.to_string())],
                None,
            )
            .await?;
        row.map(parse).transpose()
    }

    pub async fn upsert_consent(&self, client_id: &str, user_id: Uuid, scopes: &[String]) -> AuthResult<OAuthConsent> {
        let now = Utc::now();
        let existing = self.find_consent(client_id, user_id).await?;
        let row = if let Some(existing) = existing {
            self.raw
                .update(
                    Model::OAuthConsent,
                    &[WhereClause::eq("id", existing.id.to_string())],
                    json!({ "scopes": scopes, "consentGiven": true, "updatedAt": now.to_rfc3339() }),
                )
                .await?
        } else {
            self.raw
                .create(
                    Model::OAuthConsent,
                    json!({
                        "id": Uuid::new_v4().to_string(),
                        "clientId": client_id,
                        "userId": user_id.to_string(),
                        "scopes": scopes,
                        "consentGiven": true,
                        "createdAt": now.to_rfc3339(),
                        "updatedAt": now.to_rfc3339(),
                    }),
                    None,
                )
                .await?
        };
        parse(row)
    }

    // =========================================================================
    // Device authorization (RFC 8628) / CIBA
    // =========================================================================

    /// Takes `user_code` pre-formatted by the caller — `oauth::grants::device`
    /// generates it from RFC 8628's ambiguity-free charset via rejection
    /// sampling; this layer only ever stores what it's handed.
    pub async fn create_device_code(
        &self,
        client_id: &str,
        user_code: &str,
        scopes: &[String],
        ttl: Duration,
        polling_interval: i32,
    ) -> AuthResult<(DeviceCode, String)> {
        let device_code = crypto::random_alnum(40);
        let now = Utc::now();
        let row = self
            .raw
            .create(
                Model::DeviceCode,
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "deviceCodeHash": crypto::sha256_hex(&device_code),
                    "userCode": user_code,
                    "clientId": client_id,
                    "scopes": scopes,
                    "status": GrantStatus::Pending,
                    "expiresAt": (now + ttl).to_rfc3339(),
                    "pollingIntervalSeconds": polling_interval,
                    "createdAt": now.to_rfc3339(),
                }),
                None,
            )
            .await?;
        Ok((parse(row)?, device_code))
    }

    pub async fn find_device_code_by_user_code(&self, user_code: &str) -> AuthResult<Option<DeviceCode>> {
        let row = self
            .raw
            .find_one(Model::DeviceCode, &[WhereClause::eq("userCode", user_code)], None)
            .await?;
        row.map(parse).transpose()
    }

    pub async fn find_device_code_by_device_code(&self, device_code: &str) -> AuthResult<Option<DeviceCode>> {
        let hash = crypto::sha256_hex(device_code);
        let row = self
            .raw
            .find_one(Model::DeviceCode, &[WhereClause::eq("deviceCodeHash", hash)], None)
            .await?;
        row.map(parse).transpose()
    }

    pub async fn resolve_device_code(&self, id: Uuid, user_id: Uuid, status: GrantStatus) -> AuthResult<DeviceCode> {
        let row = self
            .raw
            .update(
                Model::DeviceCode,
                &[WhereClause::eq("id", id.to_string())],
                json!({ "userId": user_id.to_string(), "status": status }),
            )
            .await?;
        parse(row)
    }

    pub async fn mark_device_code_polled(&self, id: Uuid) -> AuthResult<()> {
        self.raw
            .update_many(
                Model::DeviceCode,
                &[WhereClause::eq("id", id.to_string())],
                json!({ "lastPolledAt": Utc::now().to_rfc3339() }),
            )
            .await?;
        Ok(())
    }

    /// A poll that arrived before `lastPolledAt + pollingIntervalSeconds`:
    /// stamps the poll and widens the interval to `next_interval_seconds`
    /// (the caller's current interval plus the RFC 8628 §3.5 `slow_down`
    /// backoff of 5s) so repeated hammering keeps getting slower.
    pub async fn mark_device_code_slow_down(&self, id: Uuid, next_interval_seconds: i32) -> AuthResult<()> {
        self.raw
            .update_many(
                Model::DeviceCode,
                &[WhereClause::eq("id", id.to_string())],
                json!({ "lastPolledAt": Utc::now().to_rfc3339(), "pollingIntervalSeconds": next_interval_seconds }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_device_code(&self, id: Uuid) -> AuthResult<()> {
        self.raw.delete(Model::DeviceCode, &[WhereClause::eq("id", id.to_string())]).await
    }

    pub async fn create_ciba_request(
        &self,
        client_id: &str,
        user_id: Uuid,
        scopes: &[String],
        ttl: Duration,
        polling_interval: i32,
    ) -> AuthResult<(CibaRequest, String)> {
        let auth_req_id = crypto::random_alnum(40);
        let now = Utc::now();
        let row = self
            .raw
            .create(
                Model::CibaRequest,
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "authReqIdHash": crypto::sha256_hex(&auth_req_id),
                    "clientId": client_id,
                    "userId": user_id.to_string(),
                    "scopes": scopes,
                    "status": GrantStatus::Pending,
                    "expiresAt": (now + ttl).to_rfc3339(),
                    "pollingIntervalSeconds": polling_interval,
                    "createdAt": now.to_rfc3339(),
                }),
                None,
            )
            .await?;
        Ok((parse(row)?, auth_req_id))
    }

    pub async fn find_ciba_request(&self, auth_req_id: &str) -> AuthResult<Option<CibaRequest>> {
        let hash = crypto::sha256_hex(auth_req_id);
        let row = self
            .raw
            .find_one(Model::CibaRequest, &[WhereClause::eq("authReqIdHash", hash)], None)
            .await?;
        row.map(parse).transpose()
    }

    pub async fn resolve_ciba_request(&self, id: Uuid, status: GrantStatus) -> AuthResult<CibaRequest> {
        let row = self
            .raw
            .update(Model::CibaRequest, &[WhereClause::eq("id", id.to_string())], json!({ "status": status }))
            .await?;
        parse(row)
    }

    pub async fn mark_ciba_request_polled(&self, id: Uuid) -> AuthResult<()> {
        self.raw
            .update_many(
                Model::CibaRequest,
                &[WhereClause::eq("id", id.to_string())],
                json!({ "lastPolledAt": Utc::now().to_rfc3339() }),
            )
            .await?;
        Ok(())
    }

    /// Same `slow_down` backoff as [`Self::mark_device_code_slow_down`],
    /// applied to a CIBA request instead of a device code.
    pub async fn mark_ciba_request_slow_down(&self, id: Uuid, next_interval_seconds: i32) -> AuthResult<()> {
        self.raw
            .update_many(
                Model::CibaRequest,
                &[WhereClause::eq("id", id.to_string())],
                json!({ "lastPolledAt": Utc::now().to_rfc3339(), "pollingIntervalSeconds": next_interval_seconds }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_ciba_request(&self, id: Uuid) -> AuthResult<()> {
        self.raw.delete(Model::CibaRequest, &[WhereClause::eq("id", id.to_string())]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_without_panicking() {
        // `InternalAdapter::new` takes an `Arc<dyn Adapter>`; exercised
        // end-to-end in `credential`/`oauth` module tests instead of here,
        // since every other operation needs a live adapter to do anything.
        let _ = std::mem::size_of::<InternalAdapter>();
    }
}
