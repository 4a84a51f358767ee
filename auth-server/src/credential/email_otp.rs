//! # Email OTP Second Factor / Verification
//!
//! Component 4.G's fallback factor for accounts without an authenticator
//! app, and the same mechanism email-verification and password-reset use.
//! Generalizes the source repo's single-purpose `VerificationService` (one
//! `identifier` shape per use case) into namespaced identifiers over the
//! shared [`crate::domain::entities::Verification`] table.

use shared::errors::ApiError;

use crate::context::AuthContext;
use crate::AuthResult;

/// A digits-only OTP, distinct from the alnum opaque tokens elsewhere —
/// users type this one by hand, so it stays short and numeric.
const OTP_DIGITS: usize = 6;

pub struct EmailOtp;

fn identifier(purpose: &str, email: &str) -> String {
    format!("{purpose}-otp-{email}")
}

impl EmailOtp {
    /// Generates and stores a fresh OTP under `{purpose}-otp-{email}`,
    /// replacing any still-live one for the same purpose/email pair.
    /// Returns the plaintext code for the caller to send; nothing here ever
    /// re-reads it; only [`Self::verify`] compares against the stored value.
    pub async fn send(auth: &AuthContext, purpose: &str, email: &str) -> AuthResult<String> {
        let id = identifier(purpose, email);
        let _ = auth.adapter.delete_verification_value(&id).await;

        let code = random_digits(OTP_DIGITS);
        auth.adapter.create_verification_value(&id, &code, auth.options.otp_ttl).await?;
        Ok(code)
    }

    /// Verifies `code` against the stored OTP and consumes it on success —
    /// a matched code can never be replayed, a mismatched one doesn't
    /// consume the real code still pending.
    pub async fn verify(auth: &AuthContext, purpose: &str, email: &str, code: &str) -> AuthResult<()> {
        let id = identifier(purpose, email);
        let Some(verification) = auth.adapter.find_verification_value(&id).await? else {
            return Err(ApiError::BadRequest { message: "code expired or not found".into() });
        };
        if verification.value != code {
            return Err(ApiError::BadRequest { message: "invalid verification code".into() });
        }
        auth.adapter.delete_verification_value(&id).await
    }
}

fn random_digits(count: usize) -> String {
    use rand::RngCore;
    let mut rng = rand::thread_rng();
    (0..count).map(|_| (rng.next_u32() % 10).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_namespaces_by_purpose_and_email() {
        assert_eq!(identifier("sign-in", "a@example.com"), "sign-in-otp-a@example.com");
        assert_ne!(identifier("reset", "a@example.com"), identifier("sign-in", "a@example.com"));
    }

    #[test]
    fn random_digits_are_the_requested_length_and_numeric() {
        let code = random_digits(OTP_DIGITS);
        assert_eq!(code.len(), OTP_DIGITS);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
