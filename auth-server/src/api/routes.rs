//! # Route Wiring
//!
//! Maps every handler in [`super::handlers`] onto an HTTP method and path.
//! Kept as one flat `configure` function rather than per-resource modules —
//! the surface is small enough that the source repo's own routers never
//! split theirs either.

use actix_web::web;

use super::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Core surface
        .route("/sign-up/email", web::post().to(handlers::sign_up_email))
        .route("/sign-in/email", web::post().to(handlers::sign_in_email))
        .route("/sign-out", web::post().to(handlers::sign_out))
        .route("/get-session", web::get().to(handlers::get_session))
        .route("/update-user", web::post().to(handlers::update_user))
        .route("/change-email", web::post().to(handlers::change_email))
        .route("/change-email/verify", web::post().to(handlers::change_email_verify))
        .route("/change-password", web::post().to(handlers::change_password))
        .route("/csrf", web::get().to(handlers::csrf_token))
        .route("/email-otp/send", web::post().to(handlers::email_otp_send))
        .route("/email-otp/verify", web::post().to(handlers::email_otp_verify))
        .route("/two-factor/enroll", web::post().to(handlers::two_factor_enroll))
        .route("/two-factor/confirm", web::post().to(handlers::two_factor_confirm))
        .route("/two-factor/disable", web::post().to(handlers::two_factor_disable))
        .route("/two-factor/verify-totp", web::post().to(handlers::two_factor_verify_totp))
        .route("/two-factor/verify-backup-code", web::post().to(handlers::two_factor_verify_backup_code))
        .route("/two-factor/send-otp", web::post().to(handlers::two_factor_send_otp))
        .route("/two-factor/verify-otp", web::post().to(handlers::two_factor_verify_otp))
        .route("/consent", web::post().to(handlers::consent))
        // Admin impersonation
        .route("/admin/impersonate-user", web::post().to(handlers::impersonate_user))
        .route("/admin/stop-impersonating", web::post().to(handlers::stop_impersonating))
        // OAuth 2.1 / OIDC
        .route("/oauth2/authorize", web::get().to(handlers::oauth_authorize))
        .route("/oauth2/token", web::post().to(handlers::oauth_token))
        .route("/oauth2/introspect", web::post().to(handlers::oauth_introspect))
        .route("/oauth2/revoke", web::post().to(handlers::oauth_revoke))
        .route("/oauth2/userinfo", web::get().to(handlers::oauth_userinfo))
        .route("/oauth2/register", web::post().to(handlers::oauth_register))
        .route("/.well-known/openid-configuration", web::get().to(handlers::well_known_openid_configuration))
        .route("/.well-known/jwks.json", web::get().to(handlers::well_known_jwks))
        .route("/jwks", web::get().to(handlers::well_known_jwks))
        // Device authorization grant (RFC 8628)
        .route("/device/code", web::post().to(handlers::device_authorize))
        .route("/device/verify", web::post().to(handlers::device_verify))
        // CIBA
        .route("/oauth/bc-authorize", web::post().to(handlers::ciba_authorize))
        .route("/oauth/bc-resolve", web::post().to(handlers::ciba_resolve));
}
