//! # Core Surface Request/Response Shapes
//!
//! DTOs for the non-OAuth endpoints (sign-up/in/out, session, 2FA, email
//! OTP, device approval). The OAuth surface's own request/response types
//! live alongside their handlers in [`crate::oauth`] since each is
//! RFC-specified rather than an internal API choice.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{Session, User};

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpEmailRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInEmailRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub image: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self { id: user.id, email: user.email.clone(), name: user.display_name.clone(), email_verified: user.email_verified, image: user.image_url.clone() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self { id: session.id, user_id: session.user_id, expires_at: session.expires_at }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedResponse {
    pub user: UserResponse,
    pub session: SessionResponse,
    pub csrf_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailOtpSendRequest {
    pub purpose: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailOtpVerifyRequest {
    pub purpose: String,
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TwoFactorEnrollResponse {
    pub secret_base32: String,
    pub otpauth_uri: String,
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorVerifyRequest {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceVerifyRequest {
    pub user_code: String,
    pub approve: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CibaResolveRequest {
    pub request_id: Uuid,
    pub approve: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsentRequest {
    pub client_id: String,
    pub scopes: Vec<String>,
    pub approve: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEmailRequest {
    pub new_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEmailVerifyRequest {
    pub new_email: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorVerifyBackupCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImpersonateRequest {
    pub user_id: Uuid,
}
