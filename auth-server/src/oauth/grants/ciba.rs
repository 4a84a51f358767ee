//! # OpenID CIBA (Client-Initiated Backchannel Authentication)
//!
//! `/oauth/bc-authorize` mints an `auth_req_id` and fires off an
//! out-of-band notification (push, app, SMS — whatever the deployment's
//! [`Notifier`] wires up) asking the named user to approve; the client
//! polls `/oauth2/token` with `grant_type=urn:openid:params:grant-type:ciba`
//! until it gets a terminal answer. Structurally parallel to
//! [`super::device`]; the difference is *who* decides approval (a device
//! authorization is approved by whoever has the user code, CIBA names the
//! user up front) and that the approval channel is push, not poll.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use shared::errors::ApiError;

use crate::context::AuthContext;
use crate::domain::entities::{CibaRequest, GrantStatus, OAuthClient};
use crate::oauth::{OAuthError, OAuthErrorCode};
use crate::AuthResult;

/// Dispatches the out-of-band "please approve" notification. The library
/// ships [`HttpNotifier`] (posts to a client-registered webhook); a
/// deployment wanting push/SMS/app notification implements this trait
/// itself and wires it in at `AuthBuilder` time the same way a storage
/// [`crate::storage::Adapter`] is supplied.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, auth_req_id: &str, user_id: Uuid, binding_message: Option<&str>) -> AuthResult<()>;
}

/// Posts `{auth_req_id, user_id, binding_message}` to the URL in the
/// client's `metadata.notificationEndpoint`, 10s timeout. A deployment with
/// no such field configured simply has nothing to notify; `notify` returns
/// `Ok(())` rather than fail the whole bc-authorize call over a missing
/// webhook, since the device still polls successfully either way.
pub struct HttpNotifier {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpNotifier {
    pub fn new(endpoint: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { http, endpoint }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, auth_req_id: &str, user_id: Uuid, binding_message: Option<&str>) -> AuthResult<()> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        let body = serde_json::json!({
            "auth_req_id": auth_req_id,
            "user_id": user_id,
            "binding_message": binding_message,
        });
        if let Err(err) = self.http.post(endpoint).json(&body).send().await {
            tracing::warn!(error = %err, %auth_req_id, "ciba notification dispatch failed");
        }
        Ok(())
    }
}

/// RFC 8628 §3.5-style backoff this grant reuses: each `slow_down` widens
/// the required polling interval by this many seconds.
const SLOW_DOWN_INCREMENT_SECONDS: i32 = 5;

#[derive(Debug, Serialize)]
pub struct CibaAuthorizationResponse {
    pub auth_req_id: String,
    pub expires_in: i64,
    pub interval: i64,
}

/// `/oauth/bc-authorize`: mints the request, then fires the notification as
/// a detached task — the HTTP response to the client doesn't wait on
/// delivery, matching how a push notification provider is itself
/// best-effort and shouldn't block issuing `auth_req_id`.
pub async fn start(
    auth: &AuthContext,
    client: &OAuthClient,
    user_id: Uuid,
    scopes: &[String],
    binding_message: Option<String>,
    notifier: Arc<dyn Notifier>,
) -> AuthResult<CibaAuthorizationResponse> {
    let interval = auth.options.polling_interval_seconds;
    let (row, auth_req_id) = auth
        .adapter
        .create_ciba_request(&client.client_id, user_id, scopes, auth.options.device_code_ttl, interval as i32)
        .await?;

    let dispatch_id = auth_req_id.clone();
    tokio::spawn(async move {
        if let Err(err) = notifier.notify(&dispatch_id, user_id, binding_message.as_deref()).await {
            tracing::warn!(error = %err, "ciba notifier returned an error");
        }
    });

    Ok(CibaAuthorizationResponse {
        auth_req_id,
        expires_in: auth.options.device_code_ttl.num_seconds(),
        interval,
    })
}

/// Called from whatever out-of-band channel carries the user's decision
/// back (a push-notification-action webhook, an in-app approve button) —
/// looked up by the request's row id, not `auth_req_id`, since the approval
/// channel already has the row from the notification payload.
pub async fn resolve(auth: &AuthContext, request_id: Uuid, approve: bool) -> AuthResult<CibaRequest> {
    let record = auth
        .adapter
        .raw()
        .find_one(
            crate::storage::adapter::Model::CibaRequest,
            &[crate::storage::adapter::WhereClause::eq("id", request_id.to_string())],
            None,
        )
        .await?
        .ok_or(ApiError::NotFound { resource: "ciba request".into() })?;
    let record: CibaRequest = serde_json::from_value(record)
        .map_err(|e| ApiError::InternalError { message: format!("failed to deserialize ciba request: {e}") })?;

    if record.expires_at <= Utc::now() {
        return Err(ApiError::BadRequest { message: "ciba request expired".into() });
    }
    if record.status != GrantStatus::Pending {
        return Err(ApiError::BadRequest { message: "ciba request already resolved".into() });
    }

    let status = if approve { GrantStatus::Approved } else { GrantStatus::Denied };
    auth.adapter.resolve_ciba_request(record.id, status).await
}

/// The client's poll: looks up by `auth_req_id`, enforces the minimum
/// polling interval, and maps non-terminal/terminal states onto the RFC
/// 8628-style codes OpenID CIBA reuses. Returns `Ok(record)` only once
/// status is `Approved`.
pub async fn poll(auth: &AuthContext, auth_req_id: &str) -> Result<CibaRequest, OAuthError> {
    let record = auth
        .adapter
        .find_ciba_request(auth_req_id)
        .await
        .map_err(|e| OAuthError::from_api_error(&e))?
        .ok_or_else(|| OAuthError::new(OAuthErrorCode::InvalidGrant))?;

    if record.expires_at <= Utc::now() {
        return Err(OAuthError::new(OAuthErrorCode::ExpiredToken));
    }

    if let Some(last_polled) = record.last_polled_at {
        let min_gap = chrono::Duration::seconds(record.polling_interval_seconds as i64);
        if Utc::now() - last_polled < min_gap {
            let _ = auth.adapter.mark_ciba_request_slow_down(record.id, record.polling_interval_seconds + SLOW_DOWN_INCREMENT_SECONDS).await;
            return Err(OAuthError::new(OAuthErrorCode::SlowDown));
        }
    }
    let _ = auth.adapter.mark_ciba_request_polled(record.id).await;

    match record.status {
        GrantStatus::Pending => Err(OAuthError::new(OAuthErrorCode::AuthorizationPending)),
        GrantStatus::Denied => Err(OAuthError::new(OAuthErrorCode::AccessDenied)),
        GrantStatus::Approved => Ok(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn http_notifier_with_no_endpoint_is_a_noop() {
        let notifier = HttpNotifier::new(None);
        let result = notifier.notify("req-1", Uuid::new_v4(), None).await;
        assert!(result.is_ok());
    }
}
