//! # Cookie Factory & Set-Cookie Handling
//!
//! Component 4.B of the authentication contract: a framework-agnostic cookie
//! factory that applies the naming/attribute policy (`__Secure-` / `__Host-`
//! prefixing, SameSite/Secure/HttpOnly defaults) and signs cookie values with
//! HMAC, plus a `Set-Cookie` splitter for the proxy plugin.
//!
//! This lives in `shared` (rather than `auth-server`) because the OAuth
//! authorize state machine and the session engine both need to mint cookies
//! outside of any actix-web handler context — the factory has to be reachable
//! from plain functions, not just `HttpResponseBuilder`.

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::crypto;
use crate::errors::ApiError;

/// `SameSite` policy for a cookie. Mirrors `cookie::SameSite` but kept local
/// so this module has no hard dependency on which web framework renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes applied to a cookie when it's written. Fields mirror the
/// options a caller can override per cookie; everything else is filled in
/// by [`CookieFactory::defaults`].
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub max_age_seconds: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub domain: Option<String>,
    /// Sign the value with HMAC before writing (`value!signature`).
    pub signed: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age_seconds: None,
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            domain: None,
            signed: true,
        }
    }
}

/// A cookie ready to be appended as a `Set-Cookie` response header.
#[derive(Debug, Clone)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub options: CookieOptions,
}

impl SetCookie {
    /// Renders the `Set-Cookie` header value. `Max-Age: 0` (an explicit
    /// clear) is honored as-is; per §5 this is the only way a hook may
    /// replace rather than append a cookie.
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];
        parts.push(format!("Path={}", self.options.path));
        if let Some(domain) = &self.options.domain {
            parts.push(format!("Domain={domain}"));
        }
        if let Some(max_age) = self.options.max_age_seconds {
            parts.push(format!("Max-Age={max_age}"));
        }
        parts.push(format!("SameSite={}", self.options.same_site.as_str()));
        if self.options.secure {
            parts.push("Secure".to_string());
        }
        if self.options.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.join("; ")
    }

    /// A cookie that immediately expires, clearing any previously-set value.
    pub fn clear(name: String, path: String, domain: Option<String>) -> Self {
        Self {
            name,
            value: String::new(),
            options: CookieOptions {
                max_age_seconds: Some(0),
                path,
                domain,
                ..Default::default()
            },
        }
    }
}

/// Produces cookies under a configured name prefix and HTTPS policy.
///
/// Name prefixing follows the contract: the configured `cookie_prefix`
/// (default `better-auth`) is always applied as `<prefix>.<name>`, and
/// `__Secure-` is additionally prepended whenever `use_secure_cookies` is on
/// (i.e. the deployment is served over HTTPS).
#[derive(Debug, Clone)]
pub struct CookieFactory {
    pub cookie_prefix: String,
    pub use_secure_cookies: bool,
    pub cross_subdomain_domain: Option<String>,
    secret: Vec<u8>,
}

impl CookieFactory {
    pub fn new(cookie_prefix: impl Into<String>, use_secure_cookies: bool, secret: Vec<u8>) -> Self {
        Self {
            cookie_prefix: cookie_prefix.into(),
            use_secure_cookies,
            cross_subdomain_domain: None,
            secret,
        }
    }

    pub fn with_cross_subdomain(mut self, domain: Option<String>) -> Self {
        self.cross_subdomain_domain = domain;
        self
    }

    /// The fully-qualified cookie name a client would see, e.g.
    /// `__Secure-better-auth.session_token`.
    pub fn qualified_name(&self, name: &str) -> String {
        let base = format!("{}.{name}", self.cookie_prefix);
        if self.use_secure_cookies {
            format!("__Secure-{base}")
        } else {
            base
        }
    }

    /// Builds an unsigned cookie with the factory's default attributes,
    /// merged with any caller-supplied overrides.
    pub fn cookie(&self, name: &str, value: impl Into<String>, overrides: CookieOptions) -> SetCookie {
        let mut options = overrides;
        options.secure = self.use_secure_cookies;
        if self.cross_subdomain_domain.is_some() {
            options.domain = self.cross_subdomain_domain.clone();
        }
        SetCookie {
            name: self.qualified_name(name),
            value: value.into(),
            options,
        }
    }

    /// Builds a signed cookie: the stored value is `value!hmac(secret, value)`.
    /// The MAC covers the value only, per the data-model invariant in §3.
    pub fn signed_cookie(&self, name: &str, value: &str, overrides: CookieOptions) -> SetCookie {
        let signature = crypto::hmac_sign(&self.secret, value.as_bytes());
        let signed_value = format!("{value}!{signature}");
        self.cookie(name, signed_value, overrides)
    }

    /// Verifies and strips the signature from a value previously produced by
    /// [`Self::signed_cookie`]. Returns `None` on any tampering.
    pub fn verify_signed(&self, signed_value: &str) -> Option<String> {
        let (value, signature) = signed_value.rsplit_once('!')?;
        if crypto::hmac_verify(&self.secret, value.as_bytes(), signature) {
            Some(value.to_string())
        } else {
            None
        }
    }

    /// Builds an encrypted cookie using the AEAD primitive in [`crypto`].
    /// Used for values that must not be readable by the client at all (as
    /// opposed to signed cookies, whose value is visible but not forgeable).
    pub fn encrypted_cookie(
        &self,
        name: &str,
        plaintext: &str,
        key: &[u8; 32],
        overrides: CookieOptions,
    ) -> Result<SetCookie, ApiError> {
        let ciphertext = crypto::encrypt(key, plaintext.as_bytes())?;
        Ok(self.cookie(name, ciphertext, overrides))
    }

    pub fn decrypt_cookie(&self, ciphertext: &str, key: &[u8; 32]) -> Result<String, ApiError> {
        let bytes = crypto::decrypt(key, ciphertext)?;
        String::from_utf8(bytes).map_err(|_| ApiError::InvalidCiphertext)
    }
}

// =============================================================================
// Set-Cookie header splitting
// =============================================================================

/// A single upstream `Set-Cookie` header value can itself contain commas
/// (inside `Expires=`), and proxies sometimes fold multiple `Set-Cookie`
/// headers into one comma-joined string. Splitting naively on `,` breaks the
/// `Expires` date. Split only on a comma immediately followed by what looks
/// like the start of the next cookie's `name=`.
static COOKIE_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(?=\s*[A-Za-z0-9_-]+=)").expect("static regex is valid"));

/// Splits a combined `Set-Cookie` header value into individual cookie strings.
pub fn split_set_cookie_header(raw: &str) -> Vec<String> {
    COOKIE_SPLIT_RE
        .split(raw)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A minimal parsed view of one `Set-Cookie` string: name, value, and the
/// remaining attribute tokens verbatim (callers that need a specific
/// attribute, e.g. `Max-Age`, scan `attributes` themselves).
#[derive(Debug, Clone)]
pub struct ParsedCookie {
    pub name: String,
    pub value: String,
    pub attributes: Vec<String>,
}

pub fn parse_set_cookie(raw: &str) -> Option<ParsedCookie> {
    let mut parts = raw.split(';');
    let name_value = parts.next()?.trim();
    let (name, value) = name_value.split_once('=')?;
    Some(ParsedCookie {
        name: name.trim().to_string(),
        value: value.trim().to_string(),
        attributes: parts.map(|p| p.trim().to_string()).collect(),
    })
}

/// Re-encodes the base64 value produced by [`CookieFactory::signed_cookie`]'s
/// signature component, purely as a convenience for callers comparing against
/// an expected MAC without going through the full factory.
pub fn b64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> CookieFactory {
        CookieFactory::new("better-auth", true, b"test-secret".to_vec())
    }

    #[test]
    fn qualified_name_adds_prefix_and_secure_marker() {
        let f = factory();
        assert_eq!(f.qualified_name("session_token"), "__Secure-better-auth.session_token");
    }

    #[test]
    fn qualified_name_without_https_skips_secure_marker() {
        let f = CookieFactory::new("better-auth", false, b"secret".to_vec());
        assert_eq!(f.qualified_name("session_token"), "better-auth.session_token");
    }

    #[test]
    fn signed_cookie_round_trips() {
        let f = factory();
        let cookie = f.signed_cookie("session_token", "abc123", CookieOptions::default());
        let verified = f.verify_signed(&cookie.value).expect("signature should verify");
        assert_eq!(verified, "abc123");
    }

    #[test]
    fn tampered_signed_cookie_fails_verification() {
        let f = factory();
        let cookie = f.signed_cookie("session_token", "abc123", CookieOptions::default());
        let tampered = cookie.value.replace("abc123", "abc124");
        assert!(f.verify_signed(&tampered).is_none());
    }

    #[test]
    fn encrypted_cookie_round_trips() {
        let f = factory();
        let key = crypto::generate_key();
        let cookie = f
            .encrypted_cookie("trust_device", "device-42", &key, CookieOptions::default())
            .unwrap();
        let plaintext = f.decrypt_cookie(&cookie.value, &key).unwrap();
        assert_eq!(plaintext, "device-42");
    }

    #[test]
    fn clear_cookie_sets_max_age_zero() {
        let cleared = SetCookie::clear("session_token".into(), "/".into(), None);
        assert!(cleared.to_header_value().contains("Max-Age=0"));
    }

    #[test]
    fn splits_multiple_cookies_without_breaking_expires_date() {
        let raw = "a=1; Expires=Wed, 09 Jun 2021 10:18:14 GMT, b=2; Path=/";
        let parts = split_set_cookie_header(raw);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("a=1"));
        assert!(parts[1].starts_with("b=2"));
    }

    #[test]
    fn parses_name_value_and_attributes() {
        let parsed = parse_set_cookie("session=xyz; Path=/; HttpOnly").unwrap();
        assert_eq!(parsed.name, "session");
        assert_eq!(parsed.value, "xyz");
        assert_eq!(parsed.attributes, vec!["Path=/", "HttpOnly"]);
    }
}
