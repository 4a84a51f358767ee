//! # Application Configuration
//!
//! Centralized configuration management using environment variables, layered
//! the same way the source repo's config always has been:
//!
//! 1. **Default values** - sensible defaults for development
//! 2. **`.env` file** - local overrides (git-ignored)
//! 3. **Environment variables** - `APP_`-prefixed nested vars, plus bare
//!    Docker-style overrides for secrets and well-known spec env vars
//!    (`BETTER_AUTH_SECRET`, `BETTER_AUTH_URL`, `BETTER_AUTH_SECRETS`).
//!
//! `AuthConfig` is new relative to the source repo: it carries the
//! session/OAuth/MFA knobs component 4.D's `AuthContext` needs at init.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::crypto;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub service_name: String,
    pub environment: AppEnvironment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,
}

/// Session, OAuth/OIDC, and MFA knobs, assembled into `AuthContext` (4.D) at
/// startup. Field names mirror the spec's `options.*` paths so the mapping
/// from §6's env vars to this struct stays obvious.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Raw `BETTER_AUTH_SECRET` (or the highest-versioned entry of
    /// `BETTER_AUTH_SECRETS`). Used to derive HMAC/AEAD keys and as the
    /// argon2 pepper.
    #[serde(skip_deserializing, default)]
    pub secret: String,

    /// Versioned secrets parsed from `BETTER_AUTH_SECRETS` as `v:value,v:value`,
    /// newest first, supporting rotation without invalidating older signed
    /// cookies mid-rollout.
    #[serde(skip_deserializing, default)]
    pub secrets: SecretList,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default = "default_cookie_prefix")]
    pub cookie_prefix: String,

    #[serde(default = "default_true")]
    pub use_secure_cookies: bool,

    /// `Session.expiresIn`, seconds. Default 7 days.
    #[serde(default = "default_session_expires_in")]
    pub session_expires_in_seconds: i64,

    /// `Session.updateAge`: how close to expiry a session must be before a
    /// rolling refresh persists a new `expiresAt`. §9's open question about
    /// `updateAge == 0` is resolved in DESIGN.md: 0 is taken literally (always
    /// rolls), not as "disable rolling".
    #[serde(default = "default_session_update_age")]
    pub session_update_age_seconds: i64,

    /// Authorization-code / PKCE verification TTL. Default 10 minutes.
    #[serde(default = "default_auth_code_ttl")]
    pub auth_code_ttl_seconds: i64,

    /// Opaque/JWT access token TTL. Default 1 hour.
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64,

    /// Refresh token TTL. Default 30 days.
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_seconds: i64,

    /// Device code TTL, RFC 8628 default 30 minutes.
    #[serde(default = "default_device_code_ttl")]
    pub device_code_ttl_seconds: i64,

    /// Device/CIBA poll minimum interval, seconds.
    #[serde(default = "default_polling_interval")]
    pub polling_interval_seconds: i64,

    #[serde(default)]
    pub require_pkce: bool,

    #[serde(default)]
    pub allow_plain_code_challenge_method: bool,

    /// Scopes recognized by the server in addition to whatever a client
    /// registers for itself.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub trusted_origins: Vec<String>,

    /// RFC 8707 resource indicators this deployment recognizes as JWT
    /// access-token audiences. A `resource`/`audience` parameter at the
    /// token endpoint that matches an entry here gets a signed JWT access
    /// token instead of the default opaque one; anything else falls back to
    /// opaque, per §4.H grant 1's "when `resource`/audience is provided and
    /// valid" clause.
    #[serde(default)]
    pub resource_indicators: Vec<String>,

    /// Email-OTP / 2FA-gate TTL, default 5 minutes.
    #[serde(default = "default_otp_ttl")]
    pub otp_ttl_seconds: i64,

    /// `two_factor` short-lived cookie TTL while awaiting MFA verification.
    #[serde(default = "default_two_factor_cookie_ttl")]
    pub two_factor_cookie_ttl_seconds: i64,

    /// Trusted-device cookie validity, default 30 days.
    #[serde(default = "default_trusted_device_ttl")]
    pub trusted_device_ttl_seconds: i64,

    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max_requests: u32,

    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_seconds: u64,
}

/// A secret list ordered newest-first. `BETTER_AUTH_SECRETS=1:abc,2:def`
/// means version 2 is current (used for new signatures); both are accepted
/// when verifying, which is what makes secret rotation possible without a
/// flag day.
#[derive(Debug, Clone, Default)]
pub struct SecretList {
    /// `(version, value)` pairs, newest (highest version) first.
    entries: Vec<(u32, String)>,
}

impl SecretList {
    pub fn single(secret: String) -> Self {
        Self { entries: vec![(0, secret)] }
    }

    /// Parses the `v:value,v:value` format from §6.
    pub fn parse(raw: &str) -> Self {
        let mut entries: Vec<(u32, String)> = raw
            .split(',')
            .filter_map(|pair| {
                let (v, value) = pair.split_once(':')?;
                let version: u32 = v.trim().parse().ok()?;
                Some((version, value.trim().to_string()))
            })
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Self { entries }
    }

    /// The current (highest-version) secret, used to sign new values.
    pub fn current(&self) -> &str {
        self.entries.first().map(|(_, v)| v.as_str()).unwrap_or("")
    }

    /// All secrets, newest first — used when verifying, since an
    /// older-but-still-valid signature must still be accepted.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Application runtime environment.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Staging,
    Production,
}

impl Default for AppEnvironment {
    fn default() -> Self {
        Self::Development
    }
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// `BETTER_AUTH_SECRET`/`BETTER_AUTH_SECRETS`/`BETTER_AUTH_URL` are read
    /// directly (bare, no `APP_` prefix) per §6, mirroring how `DATABASE_URL`
    /// and `REDIS_URL` already bypass the `APP_` namespace for Docker/k8s
    /// compatibility.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", 0)?
            .set_default("environment", "development")?
            .set_default("service_name", "auth-server")?
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("service_name", std::env::var("SERVICE_NAME").ok())?
            .set_override_option("auth.base_url", std::env::var("BETTER_AUTH_URL").ok())?
            .build()?;

        let mut app: Self = config.try_deserialize()?;

        let secrets_raw = std::env::var("BETTER_AUTH_SECRETS").ok();
        let secret_raw = std::env::var("BETTER_AUTH_SECRET").ok();
        app.auth.secrets = match (&secrets_raw, &secret_raw) {
            (Some(multi), _) => SecretList::parse(multi),
            (None, Some(single)) => SecretList::single(single.clone()),
            (None, None) => SecretList::default(),
        };
        app.auth.secret = app.auth.secrets.current().to_string();

        Ok(app)
    }

    #[inline]
    pub fn is_development(&self) -> bool {
        self.environment == AppEnvironment::Development
    }

    #[inline]
    pub fn is_production(&self) -> bool {
        self.environment == AppEnvironment::Production
    }
}

impl AuthConfig {
    /// Derives the 32-byte AEAD key used to encrypt TOTP secrets/backup
    /// codes and trusted-device values, from the current secret via SHA-256
    /// (a cheap, adapter-free KDF sufficient for a single symmetric key).
    pub fn aead_key(&self) -> [u8; 32] {
        let digest = crypto::sha256_hex(self.secret.as_str());
        let mut key = [0u8; 32];
        let bytes = hex::decode(&digest).unwrap_or_default();
        let len = bytes.len().min(32);
        key[..len].copy_from_slice(&bytes[..len]);
        key
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 30 }
fn default_max_lifetime() -> u64 { 1800 }
fn default_redis_pool_size() -> u32 { 10 }
fn default_true() -> bool { true }
fn default_base_url() -> String { "http://localhost:8080".to_string() }
fn default_base_path() -> String { "/api/auth".to_string() }
fn default_cookie_prefix() -> String { "better-auth".to_string() }
fn default_session_expires_in() -> i64 { 7 * 24 * 3600 }
fn default_session_update_age() -> i64 { 24 * 3600 }
fn default_auth_code_ttl() -> i64 { 600 }
fn default_access_token_ttl() -> i64 { 3600 }
fn default_refresh_token_ttl() -> i64 { 30 * 24 * 3600 }
fn default_device_code_ttl() -> i64 { 1800 }
fn default_polling_interval() -> i64 { 5 }
fn default_scopes() -> Vec<String> {
    vec!["openid".into(), "profile".into(), "email".into(), "offline_access".into()]
}
fn default_otp_ttl() -> i64 { 300 }
fn default_two_factor_cookie_ttl() -> i64 { 300 }
fn default_trusted_device_ttl() -> i64 { 30 * 24 * 3600 }
fn default_rate_limit_max() -> u32 { 100 }
fn default_rate_limit_window() -> u64 { 60 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_development() {
        assert_eq!(AppEnvironment::default(), AppEnvironment::Development);
    }

    #[test]
    fn secret_list_parses_versioned_entries_newest_first() {
        let list = SecretList::parse("1:old-secret,2:new-secret");
        assert_eq!(list.current(), "new-secret");
        let all: Vec<&str> = list.all().collect();
        assert_eq!(all, vec!["new-secret", "old-secret"]);
    }

    #[test]
    fn secret_list_single_has_one_entry() {
        let list = SecretList::single("only-secret".to_string());
        assert_eq!(list.current(), "only-secret");
        assert_eq!(list.all().count(), 1);
    }

    #[test]
    fn empty_secret_list_reports_empty() {
        assert!(SecretList::default().is_empty());
    }

    #[test]
    fn aead_key_is_stable_for_same_secret() {
        let auth = AuthConfig {
            secret: "fixed-secret".to_string(),
            secrets: SecretList::single("fixed-secret".to_string()),
            base_url: default_base_url(),
            base_path: default_base_path(),
            cookie_prefix: default_cookie_prefix(),
            use_secure_cookies: true,
            session_expires_in_seconds: default_session_expires_in(),
            session_update_age_seconds: default_session_update_age(),
            auth_code_ttl_seconds: default_auth_code_ttl(),
            access_token_ttl_seconds: default_access_token_ttl(),
            refresh_token_ttl_seconds: default_refresh_token_ttl(),
            device_code_ttl_seconds: default_device_code_ttl(),
            polling_interval_seconds: default_polling_interval(),
            require_pkce: false,
            allow_plain_code_challenge_method: false,
            scopes: default_scopes(),
            trusted_origins: vec![],
            resource_indicators: vec![],
            otp_ttl_seconds: default_otp_ttl(),
            two_factor_cookie_ttl_seconds: default_two_factor_cookie_ttl(),
            trusted_device_ttl_seconds: default_trusted_device_ttl(),
            rate_limit_max_requests: default_rate_limit_max(),
            rate_limit_window_seconds: default_rate_limit_window(),
        };
        assert_eq!(auth.aead_key(), auth.aead_key());
        assert_eq!(auth.aead_key().len(), 32);
    }
}
