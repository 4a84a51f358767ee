//! # Session Engine
//!
//! Component 4.F: session creation, rolling refresh, lookup, revocation, and
//! admin impersonation. Wraps [`InternalAdapter`] plus an optional
//! [`RedisClient`] mirror (`secondaryStorage`), generalizing the
//! `session:{user_id}` cache the source repo's `AuthService` already keeps
//! in Redis to a `{user, session}` JSON envelope keyed by the session
//! token's hash.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::cookies::{CookieOptions, SetCookie};
use shared::crypto;
use shared::errors::ApiError;
use shared::redis_client::RedisClient;

use crate::context::AuthContext;
use crate::domain::entities::{Session, SessionContext, User};
use crate::storage::internal::InternalAdapter;
use crate::AuthResult;

pub const SESSION_COOKIE: &str = "session_token";
pub const ADMIN_SESSION_COOKIE: &str = "admin_session";

/// The `{user, session}` envelope mirrored into `secondaryStorage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionEnvelope {
    user: User,
    session: Session,
}

#[derive(Clone)]
pub struct SessionService {
    adapter: InternalAdapter,
    secondary: Option<RedisClient>,
}

impl SessionService {
    pub fn new(adapter: InternalAdapter, secondary: Option<RedisClient>) -> Self {
        Self { adapter, secondary }
    }

    fn ttl_as_std(ttl: chrono::Duration) -> StdDuration {
        StdDuration::from_secs(ttl.num_seconds().max(0) as u64)
    }

    async fn mirror(&self, token: &str, user: &User, session: &Session, ttl: chrono::Duration) -> AuthResult<()> {
        if let Some(redis) = &self.secondary {
            let key = format!("session:{}", crypto::sha256_hex(token));
            redis
                .set(&key, &SessionEnvelope { user: user.clone(), session: session.clone() }, Some(Self::ttl_as_std(ttl)))
                .await?;
        }
        Ok(())
    }

    async fn unmirror(&self, token: &str) -> AuthResult<()> {
        if let Some(redis) = &self.secondary {
            redis.delete(&format!("session:{}", crypto::sha256_hex(token))).await?;
        }
        Ok(())
    }

    /// `createSession(userId, ctx, fresh, overrides)`. Returns the persisted
    /// row plus a ready-to-append signed `Set-Cookie`.
    pub async fn create_session(
        &self,
        auth: &AuthContext,
        user: &User,
        session_ctx: SessionContext,
        impersonated_by: Option<Uuid>,
    ) -> AuthResult<(Session, SetCookie)> {
        let (session, token) = self
            .adapter
            .create_session(user.id, &session_ctx, auth.options.session_expires_in, impersonated_by)
            .await?;
        self.mirror(&token, user, &session, auth.options.session_expires_in).await?;

        let cookie = auth.cookies.signed_cookie(
            SESSION_COOKIE,
            &token,
            CookieOptions { max_age_seconds: Some(auth.options.session_expires_in.num_seconds()), ..Default::default() },
        );
        Ok((session, cookie))
    }

    /// `updateSession` (rolling refresh). Per the resolved Open Question in
    /// §9, `update_age == 0` is the literal arithmetic: the threshold
    /// collapses to `expiresAt - expiresIn`, which a freshly-created session
    /// already satisfies, so it always rolls forward rather than disabling
    /// rolling. Returns `Some` (new session + cookie) only when a roll
    /// actually happened.
    /// A roll never mints a new token — only `expiresAt` moves forward — so
    /// the caller re-signs the *same* raw token's cookie via [`Self::cookie_for`]
    /// once this returns `Some`. Conflicts resolve by `max(expiresAt)` per §5;
    /// a single `UPDATE` already wins on the newest write, so no extra CAS is
    /// needed here.
    pub async fn roll_if_needed(&self, auth: &AuthContext, session: &Session) -> AuthResult<Option<Session>> {
        let threshold = session.expires_at - auth.options.session_expires_in + auth.options.session_update_age;
        if threshold > Utc::now() {
            return Ok(None);
        }
        let new_expiry = Utc::now() + auth.options.session_expires_in;
        let rolled = self.adapter.roll_session(session.id, new_expiry).await?;
        Ok(Some(rolled))
    }

    /// Looks up a session by its raw cookie token, verifying it hasn't
    /// expired and that the owning user isn't banned. A banned user's
    /// session is deleted on the spot and the lookup fails with
    /// [`ApiError::AccessDenied`].
    pub async fn find_session(&self, token: &str) -> AuthResult<Option<(Session, User)>> {
        let Some(session) = self.adapter.find_session(token).await? else {
            return Ok(None);
        };
        if session.expires_at <= Utc::now() {
            self.adapter.delete_session(session.id).await?;
            return Ok(None);
        }
        let Some(user) = self.adapter.find_user_by_id(session.user_id).await? else {
            return Ok(None);
        };
        if user.banned {
            if user.ban_expires.map(|until| until <= Utc::now()).unwrap_or(false) {
                // ban has lapsed; fall through and let the caller proceed
            } else {
                self.adapter.delete_session(session.id).await?;
                self.unmirror(token).await?;
                return Err(ApiError::AccessDenied);
            }
        }
        Ok(Some((session, user)))
    }

    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        if let Some(session) = self.adapter.find_session(token).await? {
            self.adapter.delete_session(session.id).await?;
        }
        self.unmirror(token).await
    }

    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> AuthResult<u64> {
        self.adapter.delete_sessions_for_user(user_id).await
    }

    /// An admin session spawns a child session impersonating `target_user`,
    /// stashing the admin's own session id in a signed `admin_session`
    /// cookie so [`Self::stop_impersonating`] can restore it later.
    pub async fn impersonate(
        &self,
        auth: &AuthContext,
        admin_session: &Session,
        target_user: &User,
    ) -> AuthResult<(Session, SetCookie, SetCookie)> {
        let (child, session_cookie) = self
            .create_session(auth, target_user, SessionContext::default(), Some(admin_session.user_id))
            .await?;

        let admin_cookie = auth.cookies.signed_cookie(
            ADMIN_SESSION_COOKIE,
            &admin_session.id.to_string(),
            CookieOptions { max_age_seconds: Some(auth.options.session_expires_in.num_seconds()), ..Default::default() },
        );
        Ok((child, session_cookie, admin_cookie))
    }

    /// Restores the original admin session from the `admin_session` cookie,
    /// dropping the impersonation child session.
    pub async fn stop_impersonating(
        &self,
        auth: &AuthContext,
        current_token: &str,
        admin_session_cookie_value: &str,
    ) -> AuthResult<(Session, SetCookie)> {
        let admin_session_id = auth
            .cookies
            .verify_signed(admin_session_cookie_value)
            .and_then(|id| Uuid::parse_str(&id).ok())
            .ok_or(ApiError::InvalidToken)?;

        let admin_session = self
            .adapter
            .find_session_by_id(admin_session_id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        self.revoke(current_token).await?;

        let cookie = auth.cookies.signed_cookie(
            SESSION_COOKIE,
            current_token,
            CookieOptions { max_age_seconds: Some(0), ..Default::default() },
        );
        // The caller re-derives the admin's own session token separately
        // (it was never stored in this cookie, only the session id was);
        // handlers re-authenticate the admin via `find_session_by_id` and
        // mint a fresh cookie from that session's own token on sign-in.
        Ok((admin_session, cookie))
    }

    /// Exposes `expires_at` for building a cookie's `Max-Age` after a roll,
    /// used by `api::handlers::get_session` to re-sign the cookie in place.
    pub fn cookie_for(&self, auth: &AuthContext, token: &str, expires_at: DateTime<Utc>) -> SetCookie {
        let max_age = (expires_at - Utc::now()).num_seconds().max(0);
        auth.cookies.signed_cookie(SESSION_COOKIE, token, CookieOptions { max_age_seconds: Some(max_age), ..Default::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_age_zero_collapses_threshold_to_expiry_minus_expires_in() {
        let expires_in = chrono::Duration::days(7);
        let update_age = chrono::Duration::zero();
        let expires_at = Utc::now() + expires_in;
        let threshold = expires_at - expires_in + update_age;
        assert!(threshold <= Utc::now() + chrono::Duration::seconds(1));
    }
}
