//! # Domain Events
//!
//! Coarse-grained facts about what happened, emitted alongside the writes
//! that caused them. Nothing subscribes to these yet — they exist so a
//! plugin (audit log, webhook notifier) has a stable vocabulary to hook into
//! without every call site growing bespoke `tracing::info!` fields, mirroring
//! the unwired domain-events pattern already present in the source repo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    UserCreated { user_id: Uuid, email: String },
    EmailChanged { user_id: Uuid, new_email: String },
    SessionCreated { session_id: Uuid, user_id: Uuid },
    SessionRevoked { session_id: Uuid },
    PasswordChanged { user_id: Uuid, other_sessions_revoked: bool },
    TwoFactorEnabled { user_id: Uuid },
    TwoFactorDisabled { user_id: Uuid },
    OAuthTokenIssued { client_id: String, user_id: Option<Uuid>, grant_type: String },
    OAuthRefreshTokenRotated { chain_id: Uuid },
    OAuthRefreshTokenReplayDetected { chain_id: Uuid },
    ConsentGranted { client_id: String, user_id: Uuid },
}

impl AuthEvent {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Logs the event at `info` level with structured fields, the same
    /// "log the domain event as it happens" convention the source repo
    /// uses at its own service-layer call sites.
    pub fn emit(&self) {
        tracing::info!(event = ?self, "domain event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_a_type_tag() {
        let event = AuthEvent::SessionRevoked { session_id: Uuid::nil() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session_revoked");
    }
}
