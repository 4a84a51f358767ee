//! # Context & Plugin Registry
//!
//! Component 4.D: the process-scoped [`AuthContext`] assembled once at
//! startup by [`AuthBuilder`], generalizing the source repo's `AppState`
//! (`AuthService + Arc<JwtService>`, a fixed two-field struct built once in
//! `main()`) to a registry that plugins can extend. `AuthOptions` is the
//! mergeable runtime configuration; [`shared::config::AuthConfig`] is just
//! what's read from the environment to produce the initial one.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use url::Url;

use shared::config::{AuthConfig, SecretList};
use shared::cookies::CookieFactory;
use shared::crypto;
use shared::errors::ApiError;

use crate::pipeline::{Endpoint, Hooks};
use crate::storage::adapter::{Adapter, Model};
use crate::storage::internal::InternalAdapter;
use crate::AuthResult;

// =============================================================================
// AuthOptions
// =============================================================================

/// The mergeable runtime configuration §4.D describes: seeded from
/// [`AuthConfig`], then deep-merged with every installed plugin's
/// [`OptionsDelta`] before being frozen into [`AuthContext`].
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub base_url: String,
    pub base_path: String,
    pub cookie_prefix: String,
    pub use_secure_cookies: bool,
    pub session_expires_in: Duration,
    pub session_update_age: Duration,
    pub auth_code_ttl: Duration,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub device_code_ttl: Duration,
    pub polling_interval_seconds: i64,
    pub require_pkce: bool,
    pub allow_plain_code_challenge_method: bool,
    pub scopes: Vec<String>,
    pub trusted_origins: Vec<String>,
    pub resource_indicators: Vec<String>,
    pub otp_ttl: Duration,
    pub two_factor_cookie_ttl: Duration,
    pub trusted_device_ttl: Duration,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
}

impl AuthOptions {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            base_path: config.base_path.clone(),
            cookie_prefix: config.cookie_prefix.clone(),
            use_secure_cookies: config.use_secure_cookies,
            session_expires_in: Duration::seconds(config.session_expires_in_seconds),
            session_update_age: Duration::seconds(config.session_update_age_seconds),
            auth_code_ttl: Duration::seconds(config.auth_code_ttl_seconds),
            access_token_ttl: Duration::seconds(config.access_token_ttl_seconds),
            refresh_token_ttl: Duration::seconds(config.refresh_token_ttl_seconds),
            device_code_ttl: Duration::seconds(config.device_code_ttl_seconds),
            polling_interval_seconds: config.polling_interval_seconds,
            require_pkce: config.require_pkce,
            allow_plain_code_challenge_method: config.allow_plain_code_challenge_method,
            scopes: config.scopes.clone(),
            trusted_origins: config.trusted_origins.clone(),
            resource_indicators: config.resource_indicators.clone(),
            otp_ttl: Duration::seconds(config.otp_ttl_seconds),
            two_factor_cookie_ttl: Duration::seconds(config.two_factor_cookie_ttl_seconds),
            trusted_device_ttl: Duration::seconds(config.trusted_device_ttl_seconds),
            rate_limit_max_requests: config.rate_limit_max_requests,
            rate_limit_window_seconds: config.rate_limit_window_seconds,
        }
    }

    /// Deep-merges a plugin's `OptionsDelta`: scalars overwrite when present,
    /// `Vec` fields (`trusted_origins`, `scopes`) are appended to rather than
    /// replaced — the "deep-merge" §4.D calls for, made explicit since Rust
    /// has no dynamic object merge to fall back on.
    pub fn merge(&mut self, delta: OptionsDelta) {
        if let Some(v) = delta.require_pkce {
            self.require_pkce = v;
        }
        if let Some(v) = delta.allow_plain_code_challenge_method {
            self.allow_plain_code_challenge_method = v;
        }
        self.scopes.extend(delta.extra_scopes);
        self.trusted_origins.extend(delta.extra_trusted_origins);
        self.resource_indicators.extend(delta.extra_resource_indicators);
    }
}

/// What a [`Plugin::init`] may return to adjust [`AuthOptions`]. Only the
/// fields a plugin would plausibly need to touch are exposed; core session/
/// token TTLs are intentionally not pluggable, matching how the source
/// repo's own `AppState` never let a route handler rewrite its own config.
#[derive(Debug, Clone, Default)]
pub struct OptionsDelta {
    pub require_pkce: Option<bool>,
    pub allow_plain_code_challenge_method: Option<bool>,
    pub extra_scopes: Vec<String>,
    pub extra_trusted_origins: Vec<String>,
    pub extra_resource_indicators: Vec<String>,
}

/// An extra field a plugin wants to attach to a core model, per §9's
/// "dynamic schema extensions" design note. Consumed by a migration tool,
/// not by this library at runtime — `auth-server` itself never reads this
/// list, it only carries it so a schema-generation plugin can.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub model: Model,
    pub field_name: String,
    pub field_type: &'static str,
}

// =============================================================================
// Plugin
// =============================================================================

/// A unit of extension, the idiomatic-Rust reading of the source's dynamic
/// context augmentation (§9): a value implementing this trait instead of a
/// function that mutates a shared object. `init` may hand back an
/// `OptionsDelta` to merge; `endpoints`/`hooks`/`schema_fragment` default to
/// empty so a plugin that only needs `init` doesn't have to implement them.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;

    async fn init(&self, partial: &AuthOptions) -> AuthResult<Option<OptionsDelta>>;

    fn endpoints(&self) -> Vec<Endpoint> {
        Vec::new()
    }

    fn hooks(&self) -> Hooks {
        Hooks::default()
    }

    fn schema_fragment(&self) -> Vec<FieldSpec> {
        Vec::new()
    }
}

// =============================================================================
// JWT signing
// =============================================================================

/// HS256-by-default JWT signer/verifier (4.A). An RS256/EdDSA keypair can be
/// installed by a JWKS plugin (`oauth::metadata`); absent one, every id_token
/// and JWT access token is signed with the process secret, exactly as the
/// source repo's `JwtService` already defaults.
#[derive(Clone)]
pub struct JwtService {
    secret: Vec<u8>,
}

impl JwtService {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    pub fn sign<T: serde::Serialize>(&self, claims: &T) -> AuthResult<String> {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            claims,
            &jsonwebtoken::EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| ApiError::InternalError { message: format!("JWT signing failed: {e}") })
    }

    pub fn verify<T: serde::de::DeserializeOwned>(&self, token: &str) -> AuthResult<T> {
        let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        jsonwebtoken::decode::<T>(token, &jsonwebtoken::DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::InvalidToken)
    }
}

// =============================================================================
// Password hasher
// =============================================================================

/// Thin wrapper binding `shared::crypto`'s argon2id functions to the
/// process's pepper (the configured secret), so call sites never have to
/// thread the pepper through by hand.
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: Vec<u8>,
}

impl PasswordHasher {
    pub fn new(pepper: Vec<u8>) -> Self {
        Self { pepper }
    }

    pub fn hash(&self, password: &str) -> AuthResult<String> {
        crypto::hash_password(password, &self.pepper)
    }

    pub fn verify(&self, password: &str, hash: &str) -> AuthResult<bool> {
        crypto::verify_password(password, &self.pepper, hash)
    }
}

// =============================================================================
// Rate limiting config
// =============================================================================

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

// =============================================================================
// AuthContext
// =============================================================================

/// The assembled, immutable (after `build()`) process state every other
/// component reads from: resolved options, the cookie factory, the
/// [`InternalAdapter`], crypto helpers, and whatever plugins contributed.
pub struct AuthContext {
    pub options: AuthOptions,
    pub base_url: Url,
    pub cookies: CookieFactory,
    pub adapter: InternalAdapter,
    pub secrets: SecretList,
    pub password_hasher: PasswordHasher,
    pub jwt: JwtService,
    pub rate_limit: RateLimitConfig,
    pub aead_key: [u8; 32],
    plugins: Vec<Box<dyn Plugin>>,
    endpoints: crate::pipeline::EndpointRegistry,
}

impl AuthContext {
    pub fn plugin(&self, id: &str) -> Option<&dyn Plugin> {
        self.plugins.iter().map(|p| p.as_ref()).find(|p| p.id() == id)
    }

    pub fn endpoints(&self) -> &crate::pipeline::EndpointRegistry {
        &self.endpoints
    }
}

// =============================================================================
// AuthBuilder
// =============================================================================

/// Assembles an [`AuthContext`] from an [`AuthConfig`] and a storage
/// [`Adapter`], running every plugin's `init` and deep-merging its
/// `OptionsDelta` before freezing the result. This is the idiomatic-Rust
/// take on "assembled at init" (§4.D) — the piece the source repo's fixed
/// two-field `AppState` never needed, because it shipped one hardcoded
/// service with no plugin surface.
pub struct AuthBuilder {
    config: AuthConfig,
    adapter: Arc<dyn Adapter>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl AuthBuilder {
    pub fn new(config: AuthConfig, adapter: Arc<dyn Adapter>) -> Self {
        Self { config, adapter, plugins: Vec::new() }
    }

    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub async fn build(self) -> AuthResult<AuthContext> {
        let mut options = AuthOptions::from_config(&self.config);

        let mut endpoints = crate::pipeline::EndpointRegistry::new();
        for plugin in &self.plugins {
            if let Some(delta) = plugin.init(&options).await? {
                options.merge(delta);
            }
            for endpoint in plugin.endpoints() {
                endpoints.register(endpoint);
            }
            endpoints.add_hooks(plugin.hooks());
        }

        let base_url = Url::parse(&options.base_url)
            .map_err(|_| ApiError::BadRequest { message: "invalid base_url".into() })?;

        let secret_bytes = self.config.secret.as_bytes().to_vec();
        let cookies = CookieFactory::new(options.cookie_prefix.clone(), options.use_secure_cookies, secret_bytes.clone())
            .with_cross_subdomain(None);

        Ok(AuthContext {
            options,
            base_url,
            cookies,
            adapter: InternalAdapter::new(self.adapter),
            secrets: self.config.secrets.clone(),
            password_hasher: PasswordHasher::new(secret_bytes.clone()),
            jwt: JwtService::new(secret_bytes),
            rate_limit: RateLimitConfig {
                max_requests: self.config.rate_limit_max_requests,
                window_seconds: self.config.rate_limit_window_seconds,
            },
            aead_key: self.config.aead_key(),
            plugins: self.plugins,
            endpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> AuthConfig {
        AuthConfig {
            secret: "test-secret".into(),
            secrets: SecretList::single("test-secret".into()),
            base_url: "http://localhost:8080".into(),
            base_path: "/api/auth".into(),
            cookie_prefix: "better-auth".into(),
            use_secure_cookies: true,
            session_expires_in_seconds: 604_800,
            session_update_age_seconds: 86_400,
            auth_code_ttl_seconds: 600,
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_seconds: 2_592_000,
            device_code_ttl_seconds: 1800,
            polling_interval_seconds: 5,
            require_pkce: false,
            allow_plain_code_challenge_method: false,
            scopes: vec!["openid".into()],
            trusted_origins: vec![],
            resource_indicators: vec!["https://api.example/resource".into()],
            otp_ttl_seconds: 300,
            two_factor_cookie_ttl_seconds: 300,
            trusted_device_ttl_seconds: 2_592_000,
            rate_limit_max_requests: 100,
            rate_limit_window_seconds: 60,
        }
    }

    struct ScopeAddingPlugin;

    #[async_trait]
    impl Plugin for ScopeAddingPlugin {
        fn id(&self) -> &'static str {
            "scope-adder"
        }

        async fn init(&self, _partial: &AuthOptions) -> AuthResult<Option<OptionsDelta>> {
            Ok(Some(OptionsDelta { extra_scopes: vec!["admin".into()], ..Default::default() }))
        }
    }

    struct NoopAdapter;

    #[async_trait]
    impl Adapter for NoopAdapter {
        async fn create(&self, _m: Model, data: serde_json::Value, _s: Option<&[&str]>) -> AuthResult<serde_json::Value> {
            Ok(data)
        }
        async fn find_one(
            &self,
            _m: Model,
            _w: &[crate::storage::adapter::WhereClause],
            _s: Option<&[&str]>,
        ) -> AuthResult<Option<serde_json::Value>> {
            Ok(None)
        }
        async fn find_many(
            &self,
            _m: Model,
            _q: crate::storage::adapter::FindManyQuery,
        ) -> AuthResult<Vec<serde_json::Value>> {
            Ok(vec![])
        }
        async fn update(
            &self,
            _m: Model,
            _w: &[crate::storage::adapter::WhereClause],
            update: serde_json::Value,
        ) -> AuthResult<serde_json::Value> {
            Ok(update)
        }
        async fn update_many(&self, _m: Model, _w: &[crate::storage::adapter::WhereClause], _u: serde_json::Value) -> AuthResult<u64> {
            Ok(0)
        }
        async fn delete(&self, _m: Model, _w: &[crate::storage::adapter::WhereClause]) -> AuthResult<()> {
            Ok(())
        }
        async fn delete_many(&self, _m: Model, _w: &[crate::storage::adapter::WhereClause]) -> AuthResult<u64> {
            Ok(0)
        }
        async fn count(&self, _m: Model, _w: &[crate::storage::adapter::WhereClause]) -> AuthResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn builder_merges_plugin_scope_additions() {
        let ctx = AuthBuilder::new(sample_config(), Arc::new(NoopAdapter))
            .with_plugin(Box::new(ScopeAddingPlugin))
            .build()
            .await
            .unwrap();
        assert!(ctx.options.scopes.contains(&"admin".to_string()));
        assert!(ctx.plugin("scope-adder").is_some());
    }

    #[test]
    fn options_merge_appends_rather_than_replaces_vecs() {
        let mut options = AuthOptions::from_config(&sample_config());
        options.merge(OptionsDelta { extra_trusted_origins: vec!["https://a.example".into()], ..Default::default() });
        options.merge(OptionsDelta { extra_trusted_origins: vec!["https://b.example".into()], ..Default::default() });
        assert_eq!(options.trusted_origins, vec!["https://a.example", "https://b.example"]);
    }
}
