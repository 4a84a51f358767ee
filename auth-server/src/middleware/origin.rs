//! # Trusted Origin Check
//!
//! Rejects any state-changing request whose `Origin` (falling back to the
//! origin parsed out of `Referer`) isn't on [`AuthOptions::trusted_origins`].
//! A wildcard entry (`*`) or a `*.example.com`-style leading-wildcard entry
//! both match like the source repo's own CORS allow-list does.

use actix_web::HttpRequest;
use url::Url;

use shared::errors::ApiError;

use crate::context::AuthContext;

fn origin_matches(origin: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return origin
            .strip_prefix("https://")
            .or_else(|| origin.strip_prefix("http://"))
            .map(|host| host == suffix || host.ends_with(&format!(".{suffix}")))
            .unwrap_or(false);
    }
    origin == pattern
}

fn extract_origin(request: &HttpRequest) -> Option<String> {
    if let Some(origin) = request.headers().get("Origin").and_then(|h| h.to_str().ok()) {
        return Some(origin.to_string());
    }
    let referer = request.headers().get("Referer").and_then(|h| h.to_str().ok())?;
    let parsed = Url::parse(referer).ok()?;
    Some(format!("{}://{}", parsed.scheme(), parsed.host_str()?))
}

/// Returns `Ok(())` for safe (no `Origin`/`Referer` present at all, e.g. a
/// same-origin navigation some browsers omit both headers for) and trusted
/// requests alike; only an explicitly *untrusted* origin is rejected.
pub fn check(auth: &AuthContext, request: &HttpRequest) -> Result<(), ApiError> {
    let Some(origin) = extract_origin(request) else {
        return Ok(());
    };
    let base = auth.base_url.as_str().trim_end_matches('/');
    if origin == base || auth.options.trusted_origins.iter().any(|pattern| origin_matches(&origin, pattern)) {
        return Ok(());
    }
    Err(ApiError::UntrustedOrigin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_origin_matches() {
        assert!(origin_matches("https://app.example.com", "https://app.example.com"));
    }

    #[test]
    fn wildcard_subdomain_matches_any_host_under_it() {
        assert!(origin_matches("https://tenant-a.example.com", "*.example.com"));
        assert!(origin_matches("https://example.com", "*.example.com"));
        assert!(!origin_matches("https://evil.com", "*.example.com"));
    }

    #[test]
    fn bare_star_matches_everything() {
        assert!(origin_matches("https://anything.test", "*"));
    }
}
