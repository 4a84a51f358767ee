//! # Route Handlers
//!
//! One function per endpoint, each a thin `actix-web` shell around the
//! `credential`/`session`/`oauth` modules that do the actual work — mirrors
//! how the source repo's own handlers stayed a few lines of request
//! unwrapping plus one `AuthService` call. Every handler here returns
//! `Result<HttpResponse, ApiError>` for the core surface (actix renders
//! `ApiError` via its `ResponseError` impl) or builds an `HttpResponse`
//! directly via `OAuthError::deliver` for the OAuth surface.

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use uuid::Uuid;

use shared::errors::ApiError;

use crate::credential::email_otp::EmailOtp;
use crate::credential::password::PasswordCredential;
use crate::credential::totp::TotpCredential;
use crate::credential::two_factor_gate;
use crate::domain::entities::{GrantStatus, Session, SessionContext, User};
use crate::domain::events::AuthEvent;
use crate::middleware::{csrf, origin};
use crate::oauth::grants::{ciba, device};
use crate::oauth::{self, introspect, metadata, register, revoke, token as oauth_token, userinfo, OAuthError, OAuthErrorCode};
use crate::session::SESSION_COOKIE;
use crate::AuthResult;

use super::dto::*;
use super::AppState;

fn session_context(request: &HttpRequest) -> SessionContext {
    SessionContext {
        user_agent: request.headers().get("User-Agent").and_then(|h| h.to_str().ok()).map(str::to_string),
        ip_address: request.peer_addr().map(|addr| addr.ip().to_string()),
    }
}

fn client_key(request: &HttpRequest, route: &str) -> String {
    let ip = request.peer_addr().map(|a| a.ip().to_string()).unwrap_or_else(|| "unknown".to_string());
    format!("{ip}:{route}")
}

async fn current_session(state: &AppState, request: &HttpRequest) -> AuthResult<(Session, User)> {
    let cookie_name = state.auth.cookies.qualified_name(SESSION_COOKIE);
    let raw = request.cookie(&cookie_name).ok_or(ApiError::MissingAuth)?;
    let token = state.auth.cookies.verify_signed(raw.value()).ok_or(ApiError::InvalidToken)?;
    state.sessions.find_session(&token).await?.ok_or(ApiError::InvalidToken)
}

// =============================================================================
// Sign-up / sign-in / sign-out / session
// =============================================================================

pub async fn sign_up_email(state: web::Data<AppState>, request: HttpRequest, body: web::Json<SignUpEmailRequest>) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(&client_key(&request, "sign-up"), state.auth.rate_limit.max_requests, state.auth.rate_limit.window_seconds)?;
    origin::check(&state.auth, &request)?;

    let user = PasswordCredential::sign_up(&state.auth, &body.email, &body.password, &body.name).await?;
    AuthEvent::UserCreated { user_id: user.id, email: user.email.clone() }.emit();

    let (session, cookie) = state.sessions.create_session(&state.auth, &user, session_context(&request), None).await?;
    AuthEvent::SessionCreated { session_id: session.id, user_id: user.id }.emit();
    let (csrf_token, csrf_cookie) = csrf::issue(&state.auth);

    let body = AuthenticatedResponse { user: UserResponse::from(&user), session: SessionResponse::from(&session), csrf_token };
    Ok(HttpResponse::Ok().cookie(to_actix_cookie(&cookie)).cookie(to_actix_cookie(&csrf_cookie)).json(body))
}

pub async fn sign_in_email(state: web::Data<AppState>, request: HttpRequest, body: web::Json<SignInEmailRequest>) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(&client_key(&request, "sign-in"), state.auth.rate_limit.max_requests, state.auth.rate_limit.window_seconds)?;
    origin::check(&state.auth, &request)?;

    let user = PasswordCredential::sign_in(&state.auth, &body.email, &body.password).await?;

    // §4.G's 2FA gate: a primary sign-in for a two-factor user never sets the
    // real session cookie. The pending `two_factor` cookie carries just the
    // user id; `two_factor_verify` reads it back once the second factor
    // checks out and only then calls `create_session`.
    if user.two_factor_enabled {
        let pending_cookie = two_factor_gate::issue(&state.auth, user.id);
        return Ok(HttpResponse::Ok().cookie(to_actix_cookie(&pending_cookie)).json(serde_json::json!({ "twoFactorRedirect": true })));
    }

    let (session, cookie) = state.sessions.create_session(&state.auth, &user, session_context(&request), None).await?;
    AuthEvent::SessionCreated { session_id: session.id, user_id: user.id }.emit();
    let (csrf_token, csrf_cookie) = csrf::issue(&state.auth);

    let body = AuthenticatedResponse { user: UserResponse::from(&user), session: SessionResponse::from(&session), csrf_token };
    Ok(HttpResponse::Ok().cookie(to_actix_cookie(&cookie)).cookie(to_actix_cookie(&csrf_cookie)).json(body))
}

/// Reads the pending `two_factor` cookie and, once the caller has confirmed
/// `code` is good, mints the real session and clears it. Shared tail end of
/// [`two_factor_verify_totp`] and [`two_factor_verify_backup_code`] — only
/// which check runs first differs between them.
async fn complete_two_factor_sign_in(state: &AppState, request: &HttpRequest) -> AuthResult<uuid::Uuid> {
    let cookie_name = state.auth.cookies.qualified_name(two_factor_gate::TWO_FACTOR_COOKIE);
    let raw = request.cookie(&cookie_name).ok_or(ApiError::MissingAuth)?;
    two_factor_gate::verify(&state.auth, raw.value())
}

async fn finish_two_factor_sign_in(state: &AppState, request: &HttpRequest, user_id: Uuid) -> Result<HttpResponse, ApiError> {
    let user = state.auth.adapter.find_user_by_id(user_id).await?.ok_or(ApiError::InvalidCredentials)?;
    let (session, cookie) = state.sessions.create_session(&state.auth, &user, session_context(request), None).await?;
    AuthEvent::SessionCreated { session_id: session.id, user_id: user.id }.emit();
    let (csrf_token, csrf_cookie) = csrf::issue(&state.auth);
    let clear_pending = two_factor_gate::clear(&state.auth);

    let body = AuthenticatedResponse { user: UserResponse::from(&user), session: SessionResponse::from(&session), csrf_token };
    Ok(HttpResponse::Ok()
        .cookie(to_actix_cookie(&cookie))
        .cookie(to_actix_cookie(&csrf_cookie))
        .cookie(to_actix_cookie(&clear_pending))
        .json(body))
}

/// Completes the 2FA gate begun by [`sign_in_email`] with an authenticator
/// code. `/two-factor/verify-totp`.
pub async fn two_factor_verify_totp(state: web::Data<AppState>, request: HttpRequest, body: web::Json<TwoFactorVerifyRequest>) -> Result<HttpResponse, ApiError> {
    let user_id = complete_two_factor_sign_in(&state, &request).await?;
    if !TotpCredential::verify_code(&state.auth, user_id, &body.code).await? {
        return Err(ApiError::BadRequest { message: "invalid verification code".into() });
    }
    finish_two_factor_sign_in(&state, &request, user_id).await
}

/// Completes the 2FA gate begun by [`sign_in_email`] with a single-use
/// backup code. `/two-factor/verify-backup-code`.
pub async fn two_factor_verify_backup_code(
    state: web::Data<AppState>,
    request: HttpRequest,
    body: web::Json<TwoFactorVerifyBackupCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    let user_id = complete_two_factor_sign_in(&state, &request).await?;
    if !TotpCredential::verify_and_consume_backup_code(&state.auth, user_id, &body.code).await? {
        return Err(ApiError::BadRequest { message: "invalid verification code".into() });
    }
    finish_two_factor_sign_in(&state, &request, user_id).await
}

pub async fn sign_out(state: web::Data<AppState>, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;

    let cookie_name = state.auth.cookies.qualified_name(SESSION_COOKIE);
    if let Some(raw) = request.cookie(&cookie_name) {
        if let Some(token) = state.auth.cookies.verify_signed(raw.value()) {
            if let Some(session) = state.auth.adapter.find_session(&token).await? {
                AuthEvent::SessionRevoked { session_id: session.id }.emit();
            }
            state.sessions.revoke(&token).await?;
        }
    }
    let clear = shared::cookies::SetCookie::clear(cookie_name, "/".to_string(), None);
    Ok(HttpResponse::Ok().cookie(to_actix_cookie(&clear)).json(serde_json::json!({ "ok": true })))
}

pub async fn get_session(state: web::Data<AppState>, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let (session, user) = current_session(&state, &request).await?;

    let (csrf_token, csrf_cookie) = csrf::issue(&state.auth);

    if let Some(rolled) = state.sessions.roll_if_needed(&state.auth, &session).await? {
        let cookie_name = state.auth.cookies.qualified_name(SESSION_COOKIE);
        let raw = request.cookie(&cookie_name).ok_or(ApiError::InvalidToken)?;
        let token = state.auth.cookies.verify_signed(raw.value()).ok_or(ApiError::InvalidToken)?;
        let cookie = state.sessions.cookie_for(&state.auth, &token, rolled.expires_at);
        let body = AuthenticatedResponse { user: UserResponse::from(&user), session: SessionResponse::from(&rolled), csrf_token };
        return Ok(HttpResponse::Ok().cookie(to_actix_cookie(&cookie)).cookie(to_actix_cookie(&csrf_cookie)).json(body));
    }

    let body = AuthenticatedResponse { user: UserResponse::from(&user), session: SessionResponse::from(&session), csrf_token };
    Ok(HttpResponse::Ok().cookie(to_actix_cookie(&csrf_cookie)).json(body))
}

/// An admin starts impersonating `user_id`, swapping the session cookie for
/// a child session scoped to the target user. `/admin/impersonate-user`.
pub async fn impersonate_user(state: web::Data<AppState>, request: HttpRequest, body: web::Json<ImpersonateRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (admin_session, admin) = current_session(&state, &request).await?;
    if admin.role != "admin" {
        return Err(ApiError::InsufficientPermissions);
    }
    let target = state.auth.adapter.find_user_by_id(body.user_id).await?.ok_or(ApiError::NotFound { resource: "user".into() })?;

    let (child, session_cookie, admin_cookie) = state.sessions.impersonate(&state.auth, &admin_session, &target).await?;
    AuthEvent::SessionCreated { session_id: child.id, user_id: target.id }.emit();

    let body = AuthenticatedResponse { user: UserResponse::from(&target), session: SessionResponse::from(&child), csrf_token: String::new() };
    Ok(HttpResponse::Ok().cookie(to_actix_cookie(&session_cookie)).cookie(to_actix_cookie(&admin_cookie)).json(body))
}

/// Ends an impersonation session begun by [`impersonate_user`], revoking the
/// child session and reporting the admin session it was spawned from so the
/// caller can sign back in as the admin. `/admin/stop-impersonating`.
pub async fn stop_impersonating(state: web::Data<AppState>, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;

    let cookie_name = state.auth.cookies.qualified_name(SESSION_COOKIE);
    let raw = request.cookie(&cookie_name).ok_or(ApiError::MissingAuth)?;
    let token = state.auth.cookies.verify_signed(raw.value()).ok_or(ApiError::InvalidToken)?;
    let admin_cookie_name = state.auth.cookies.qualified_name(crate::session::ADMIN_SESSION_COOKIE);
    let admin_raw = request.cookie(&admin_cookie_name).ok_or(ApiError::InvalidToken)?;

    let (admin_session, clear_cookie) = state.sessions.stop_impersonating(&state.auth, &token, admin_raw.value()).await?;
    AuthEvent::SessionRevoked { session_id: admin_session.id }.emit();

    Ok(HttpResponse::Ok().cookie(to_actix_cookie(&clear_cookie)).json(serde_json::json!({ "admin_user_id": admin_session.user_id })))
}

pub async fn change_password(state: web::Data<AppState>, request: HttpRequest, body: web::Json<ChangePasswordRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, user) = current_session(&state, &request).await?;
    let revoke_others = PasswordCredential::change_password(&state.auth, user.id, &user.email, &body.current_password, &body.new_password).await?;
    AuthEvent::PasswordChanged { user_id: user.id, other_sessions_revoked: revoke_others }.emit();
    if revoke_others {
        state.sessions.revoke_all_for_user(user.id).await?;
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

pub async fn update_user(state: web::Data<AppState>, request: HttpRequest, body: web::Json<UpdateUserRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, user) = current_session(&state, &request).await?;

    let mut update = serde_json::Map::new();
    if let Some(name) = &body.name {
        update.insert("displayName".into(), serde_json::json!(name));
    }
    if let Some(image) = &body.image {
        update.insert("imageUrl".into(), serde_json::json!(image));
    }
    let updated = state.auth.adapter.update_user(user.id, serde_json::Value::Object(update)).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&updated)))
}

/// Begins a verified email change: sends an OTP to the *new* address under
/// the `change-email` purpose, namespaced by the new address so a stale OTP
/// for a different target can't be replayed — mirrors [`email_otp_send`]
/// rather than duplicating its plumbing.
pub async fn change_email(state: web::Data<AppState>, request: HttpRequest, body: web::Json<ChangeEmailRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, _user) = current_session(&state, &request).await?;
    if state.auth.adapter.find_user_by_email(&body.new_email).await?.is_some() {
        return Err(ApiError::Conflict { resource: "email already registered".into() });
    }
    let code = EmailOtp::send(&state.auth, "change-email", &body.new_email).await?;
    tracing::info!(email = %body.new_email, "change-email otp issued");
    let _ = code;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "sent": true })))
}

/// Completes a pending email change: verifies the OTP sent to the new
/// address, then writes it onto the current user's row.
pub async fn change_email_verify(state: web::Data<AppState>, request: HttpRequest, body: web::Json<ChangeEmailVerifyRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, user) = current_session(&state, &request).await?;
    EmailOtp::verify(&state.auth, "change-email", &body.new_email, &body.code).await?;
    let updated = state
        .auth
        .adapter
        .update_user(user.id, serde_json::json!({ "email": body.new_email, "emailVerified": true }))
        .await?;
    AuthEvent::EmailChanged { user_id: updated.id, new_email: updated.email.clone() }.emit();
    Ok(HttpResponse::Ok().json(UserResponse::from(&updated)))
}

/// `GET /csrf`: mints a fresh double-submit token/cookie pair for a client
/// that hasn't signed in yet (or wants to rotate its token without a
/// sign-in) — the same mechanism [`sign_up_email`]/[`sign_in_email`] issue
/// inline on every auth response.
pub async fn csrf_token(state: web::Data<AppState>) -> HttpResponse {
    let (csrf_token, cookie) = csrf::issue(&state.auth);
    HttpResponse::Ok().cookie(to_actix_cookie(&cookie)).json(CsrfTokenResponse { csrf_token })
}

// =============================================================================
// Email OTP
// =============================================================================

pub async fn email_otp_send(state: web::Data<AppState>, request: HttpRequest, body: web::Json<EmailOtpSendRequest>) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(&client_key(&request, "email-otp"), state.auth.rate_limit.max_requests, state.auth.rate_limit.window_seconds)?;
    let code = EmailOtp::send(&state.auth, &body.purpose, &body.email).await?;
    // Dispatching the code (email/SMS) is outside this crate's scope; the
    // deployment's notification layer reads it from here before this
    // handler returns anything to the client.
    tracing::info!(purpose = %body.purpose, email = %body.email, "email otp issued");
    let _ = code;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "sent": true })))
}

pub async fn email_otp_verify(state: web::Data<AppState>, body: web::Json<EmailOtpVerifyRequest>) -> Result<HttpResponse, ApiError> {
    EmailOtp::verify(&state.auth, &body.purpose, &body.email, &body.code).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "verified": true })))
}

/// `/two-factor/send-otp`: the email-OTP fallback factor for accounts
/// without an authenticator app. Requires the pending `two_factor` cookie so
/// a caller can't use it to spam OTPs at an arbitrary address.
pub async fn two_factor_send_otp(state: web::Data<AppState>, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let user_id = complete_two_factor_sign_in(&state, &request).await?;
    let user = state.auth.adapter.find_user_by_id(user_id).await?.ok_or(ApiError::InvalidCredentials)?;
    let code = EmailOtp::send(&state.auth, "2fa", &user.email).await?;
    tracing::info!(user_id = %user_id, "two-factor email otp issued");
    let _ = code;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "sent": true })))
}

/// `/two-factor/verify-otp`: completes the 2FA gate with the email OTP
/// [`two_factor_send_otp`] issued.
pub async fn two_factor_verify_otp(state: web::Data<AppState>, request: HttpRequest, body: web::Json<TwoFactorVerifyRequest>) -> Result<HttpResponse, ApiError> {
    let user_id = complete_two_factor_sign_in(&state, &request).await?;
    let user = state.auth.adapter.find_user_by_id(user_id).await?.ok_or(ApiError::InvalidCredentials)?;
    EmailOtp::verify(&state.auth, "2fa", &user.email, &body.code).await?;
    finish_two_factor_sign_in(&state, &request, user_id).await
}

// =============================================================================
// Two-factor (TOTP)
// =============================================================================

pub async fn two_factor_enroll(state: web::Data<AppState>, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let (_session, user) = current_session(&state, &request).await?;
    let enrollment = TotpCredential::enroll(&state.auth, user.id, &user.email, "auth-server").await?;
    Ok(HttpResponse::Ok().json(TwoFactorEnrollResponse {
        secret_base32: enrollment.secret_base32,
        otpauth_uri: enrollment.otpauth_uri,
        backup_codes: enrollment.backup_codes,
    }))
}

pub async fn two_factor_confirm(state: web::Data<AppState>, request: HttpRequest, body: web::Json<TwoFactorVerifyRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, user) = current_session(&state, &request).await?;
    TotpCredential::confirm(&state.auth, user.id, &body.code).await?;
    AuthEvent::TwoFactorEnabled { user_id: user.id }.emit();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "enabled": true })))
}

pub async fn two_factor_disable(state: web::Data<AppState>, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, user) = current_session(&state, &request).await?;
    TotpCredential::disable(&state.auth, user.id).await?;
    AuthEvent::TwoFactorDisabled { user_id: user.id }.emit();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "enabled": false })))
}

// =============================================================================
// Consent
// =============================================================================

pub async fn consent(state: web::Data<AppState>, request: HttpRequest, body: web::Json<ConsentRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, user) = current_session(&state, &request).await?;
    if !body.approve {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "granted": false })));
    }
    state.auth.adapter.upsert_consent(&body.client_id, user.id, &body.scopes).await?;
    AuthEvent::ConsentGranted { client_id: body.client_id.clone(), user_id: user.id }.emit();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "granted": true })))
}

// =============================================================================
// OAuth: authorize / token / introspect / userinfo / register / metadata
// =============================================================================

pub async fn oauth_authorize(state: web::Data<AppState>, request: HttpRequest, query: web::Query<oauth::authorize::AuthorizeParams>) -> Result<HttpResponse, ApiError> {
    let session = current_session(&state, &request).await.ok().map(|(session, _)| (session.user_id, session.id));

    let existing_consent = if let Some((user_id, _)) = session {
        state.auth.adapter.find_consent(&query.client_id, user_id).await?
    } else {
        None
    };
    let existing_scopes = existing_consent.as_ref().map(|c| c.scopes.as_slice());

    let issuer = format!("{}{}", state.auth.options.base_url, state.auth.options.base_path);
    let login_url = url::Url::parse(&format!("{issuer}/login")).map_err(|e| ApiError::InternalError { message: e.to_string() })?;
    let consent_url = url::Url::parse(&format!("{issuer}/consent")).map_err(|e| ApiError::InternalError { message: e.to_string() })?;

    let outcome = oauth::authorize::handle(&state.auth, &query, session, login_url, consent_url, existing_scopes).await?;

    let location = match outcome {
        oauth::authorize::AuthorizeOutcome::RedirectToLogin(url) => url,
        oauth::authorize::AuthorizeOutcome::RedirectToConsent(url) => url,
        oauth::authorize::AuthorizeOutcome::RedirectWithCode(url) => url,
        oauth::authorize::AuthorizeOutcome::RedirectError(url) => url,
    };
    Ok(HttpResponse::Found().insert_header(("Location", location.as_str())).finish())
}

pub async fn oauth_token(state: web::Data<AppState>, request: HttpRequest, form: web::Form<oauth_token::TokenRequest>) -> HttpResponse {
    let (client_id, client_secret) = match extract_client_credentials(&request, &form) {
        Ok(pair) => pair,
        Err(err) => return err.deliver(oauth::Deliver::Json),
    };

    let client = match oauth_token::authenticate_client(&state.auth, &client_id, client_secret.as_deref()).await {
        Ok(client) => client,
        Err(err) => return err.deliver(oauth::Deliver::Json),
    };

    match oauth_token::handle(&state.auth, &client, &form).await {
        Ok(response) => {
            AuthEvent::OAuthTokenIssued { client_id: client.client_id, user_id: None, grant_type: form.grant_type.clone() }.emit();
            HttpResponse::Ok().json(response)
        }
        Err(err) => err.deliver(oauth::Deliver::Json),
    }
}

fn extract_client_credentials(request: &HttpRequest, form: &oauth_token::TokenRequest) -> Result<(String, Option<String>), OAuthError> {
    if let Some(basic) = basic_auth_credentials(request) {
        return Ok(basic);
    }
    let client_id = form.client_id.clone().ok_or_else(|| OAuthError::with_description(OAuthErrorCode::InvalidRequest, "client_id is required"))?;
    Ok((client_id, form.client_secret.clone()))
}

fn basic_auth_credentials(request: &HttpRequest) -> Option<(String, Option<String>)> {
    let header = request.headers().get("Authorization")?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((urlencoding::decode(id).ok()?.into_owned(), Some(urlencoding::decode(secret).ok()?.into_owned())))
}

pub async fn oauth_introspect(state: web::Data<AppState>, request: HttpRequest, form: web::Form<IntrospectForm>) -> Result<HttpResponse, ApiError> {
    let (client_id, client_secret) = extract_client_credentials(&request, &oauth_token::TokenRequest { client_id: form.client_id.clone(), client_secret: form.client_secret.clone(), ..Default::default() })
        .map_err(|_| ApiError::MissingAuth)?;
    let caller = oauth_token::authenticate_client(&state.auth, &client_id, client_secret.as_deref()).await.map_err(|_| ApiError::MissingAuth)?;

    let response = introspect::introspect(&state.auth, &form.token, form.token_type_hint.as_deref()).await;
    let response = match response {
        introspect::IntrospectionResponse::Active(active) if introspect::authorize_introspection(&caller, &active.client_id) => {
            introspect::IntrospectionResponse::Active(active)
        }
        _ => introspect::IntrospectionResponse::Inactive { active: false },
    };
    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, serde::Deserialize, Default)]
pub struct IntrospectForm {
    pub token: String,
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RevokeForm {
    pub token: String,
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// `/oauth2/revoke` (RFC 7009). Always 200 with an empty body, even when the
/// token doesn't exist or belongs to another client — see [`revoke::revoke`].
pub async fn oauth_revoke(state: web::Data<AppState>, request: HttpRequest, form: web::Form<RevokeForm>) -> HttpResponse {
    let (client_id, client_secret) = match extract_client_credentials(
        &request,
        &oauth_token::TokenRequest { client_id: form.client_id.clone(), client_secret: form.client_secret.clone(), ..Default::default() },
    ) {
        Ok(pair) => pair,
        Err(err) => return err.deliver(oauth::Deliver::Json),
    };
    let caller = match oauth_token::authenticate_client(&state.auth, &client_id, client_secret.as_deref()).await {
        Ok(client) => client,
        Err(err) => return err.deliver(oauth::Deliver::Json),
    };

    revoke::revoke(&state.auth, &caller, &form.token, form.token_type_hint.as_deref()).await;
    HttpResponse::Ok().finish()
}

pub async fn oauth_userinfo(state: web::Data<AppState>, request: HttpRequest) -> HttpResponse {
    let Some(token) = bearer_token(&request) else {
        return OAuthError::new(OAuthErrorCode::InvalidRequest).deliver(oauth::Deliver::Json);
    };
    match userinfo::handle(&state.auth, &token).await {
        Ok(claims) => HttpResponse::Ok().json(claims),
        Err(err) => err.deliver(oauth::Deliver::Json),
    }
}

fn bearer_token(request: &HttpRequest) -> Option<String> {
    request.headers().get("Authorization")?.to_str().ok()?.strip_prefix("Bearer ").map(str::to_string)
}

pub async fn oauth_register(state: web::Data<AppState>, body: web::Json<register::ClientRegistrationRequest>) -> HttpResponse {
    match register::register(&state.auth, &body).await {
        Ok(response) => HttpResponse::Created().json(response),
        Err(err) => err.deliver(oauth::Deliver::Json),
    }
}

pub async fn well_known_openid_configuration(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(metadata::discovery_document(&state.auth))
}

pub async fn well_known_jwks(_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(metadata::jwks())
}

// =============================================================================
// Device authorization grant
// =============================================================================

#[derive(Debug, serde::Deserialize)]
pub struct DeviceAuthorizeRequest {
    pub client_id: String,
    pub scope: Option<String>,
}

pub async fn device_authorize(state: web::Data<AppState>, body: web::Form<DeviceAuthorizeRequest>) -> Result<HttpResponse, ApiError> {
    let client = state.auth.adapter.find_client(&body.client_id).await?.ok_or(ApiError::NotFound { resource: "client".into() })?;
    let requested = oauth::parse_scope_param(body.scope.as_deref());
    let scopes = oauth::resolve_scopes(&requested, &client.scopes, &state.auth.options.scopes).map_err(|_| ApiError::BadRequest { message: "invalid scope".into() })?;
    let response = device::start(&state.auth, &client, &scopes).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn device_verify(state: web::Data<AppState>, request: HttpRequest, body: web::Json<DeviceVerifyRequest>) -> Result<HttpResponse, ApiError> {
    csrf::verify(&state.auth, &request, &csrf::token_from_header(&request).unwrap_or_default())?;
    let (_session, user) = current_session(&state, &request).await?;
    let record = device::resolve(&state.auth, &body.user_code, user.id, body.approve).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": matches!(record.status, GrantStatus::Approved) })))
}

// =============================================================================
// CIBA
// =============================================================================

#[derive(Debug, serde::Deserialize)]
pub struct CibaStartRequest {
    pub client_id: String,
    pub login_hint: Uuid,
    pub scope: Option<String>,
    pub binding_message: Option<String>,
}

pub async fn ciba_authorize(state: web::Data<AppState>, body: web::Json<CibaStartRequest>) -> Result<HttpResponse, ApiError> {
    let client = state.auth.adapter.find_client(&body.client_id).await?.ok_or(ApiError::NotFound { resource: "client".into() })?;
    let requested = oauth::parse_scope_param(body.scope.as_deref());
    let scopes = oauth::resolve_scopes(&requested, &client.scopes, &state.auth.options.scopes).map_err(|_| ApiError::BadRequest { message: "invalid scope".into() })?;
    let response = ciba::start(&state.auth, &client, body.login_hint, &scopes, body.binding_message.clone(), state.ciba_notifier.clone()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn ciba_resolve(state: web::Data<AppState>, body: web::Json<CibaResolveRequest>) -> Result<HttpResponse, ApiError> {
    let record = ciba::resolve(&state.auth, body.request_id, body.approve).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": matches!(record.status, GrantStatus::Approved) })))
}

/// Converts a [`shared::cookies::SetCookie`] into an `actix_web::cookie::Cookie`
/// ready for `HttpResponseBuilder::cookie`. Kept as the one seam where this
/// crate's framework-agnostic cookie factory meets `actix-web`'s own type.
fn to_actix_cookie(cookie: &shared::cookies::SetCookie) -> actix_web::cookie::Cookie<'static> {
    let mut builder = actix_web::cookie::Cookie::build(cookie.name.clone(), cookie.value.clone()).path(cookie.options.path.clone());
    if let Some(domain) = &cookie.options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(max_age) = cookie.options.max_age_seconds {
        builder = builder.max_age(actix_web::cookie::time::Duration::seconds(max_age));
    }
    builder = builder.secure(cookie.options.secure).http_only(cookie.options.http_only);
    builder.finish()
}
