//! # TOTP / HOTP Second Factor
//!
//! Component 4.G's authenticator-app factor: `totp-lite`'s SHA-1 6-digit
//! code, generalizing the source repo's fixed `verify_otp(user, code)` into
//! an `AuthContext`-scoped service that also handles enrollment, the
//! otpauth:// URI, and hashed backup codes.

use chrono::Utc;
use rand::RngCore;
use totp_lite::{totp_custom, Sha1};
use uuid::Uuid;

use shared::crypto;
use shared::errors::ApiError;

use crate::context::AuthContext;
use crate::AuthResult;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;
/// Accept the previous and next 30s step alongside the current one, per
/// §4.G's "±1 step window" tolerance for clock drift.
const STEP_WINDOW: i64 = 1;
const BACKUP_CODE_COUNT: usize = 10;

pub struct TotpCredential;

/// What [`TotpCredential::enroll`] hands back for the user to scan/save.
/// `secret_base32` and `backup_codes` are shown exactly once — only their
/// ciphertext/hashes are persisted.
pub struct Enrollment {
    pub secret_base32: String,
    pub otpauth_uri: String,
    pub backup_codes: Vec<String>,
}

impl TotpCredential {
    /// Generates a new TOTP secret and backup codes, encrypts/hashes them,
    /// and stores the row — but does not mark `User.two_factor_enabled`; the
    /// caller flips that only after [`Self::confirm`] succeeds, so a user who
    /// abandons setup mid-flow never ends up locked out of their own account.
    pub async fn enroll(auth: &AuthContext, user_id: Uuid, account_email: &str, issuer: &str) -> AuthResult<Enrollment> {
        let mut secret_bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut secret_bytes);
        let secret_base32 = base32_encode(&secret_bytes);

        let backup_codes: Vec<String> = (0..BACKUP_CODE_COUNT).map(|_| crypto::random_alnum(10)).collect();
        let backup_hashes: Vec<String> = backup_codes.iter().map(|c| crypto::sha256_hex(c)).collect();

        let secret_ciphertext = crypto::encrypt(&auth.aead_key, &secret_bytes)?;
        let backup_json = serde_json::to_vec(&backup_hashes)
            .map_err(|e| ApiError::InternalError { message: format!("failed to serialize backup codes: {e}") })?;
        let backup_ciphertext = crypto::encrypt(&auth.aead_key, &backup_json)?;

        auth.adapter.upsert_two_factor(user_id, &secret_ciphertext, &backup_ciphertext).await?;

        let otpauth_uri = format!(
            "otpauth://totp/{issuer}:{account_email}?secret={secret_base32}&issuer={issuer}&algorithm=SHA1&digits={DIGITS}&period={STEP_SECONDS}"
        );

        Ok(Enrollment { secret_base32, otpauth_uri, backup_codes })
    }

    /// Verifies the first code the user types back during setup and, only on
    /// success, flips `User.two_factor_enabled`.
    pub async fn confirm(auth: &AuthContext, user_id: Uuid, code: &str) -> AuthResult<()> {
        if !Self::verify_code(auth, user_id, code).await? {
            return Err(ApiError::BadRequest { message: "invalid verification code".into() });
        }
        auth.adapter.update_user(user_id, serde_json::json!({ "twoFactorEnabled": true })).await?;
        Ok(())
    }

    /// Verifies `code` against the user's enrolled secret, trying the
    /// current step plus `STEP_WINDOW` steps on either side.
    pub async fn verify_code(auth: &AuthContext, user_id: Uuid, code: &str) -> AuthResult<bool> {
        let Some(record) = auth.adapter.find_two_factor(user_id).await? else {
            return Err(ApiError::BadRequest { message: "two-factor is not enabled for this account".into() });
        };
        let secret = crypto::decrypt(&auth.aead_key, &record.secret_encrypted)?;
        let now = Utc::now().timestamp();

        for offset in -STEP_WINDOW..=STEP_WINDOW {
            let step_time = (now + offset * STEP_SECONDS as i64).max(0) as u64;
            let expected = totp_custom::<Sha1>(STEP_SECONDS, DIGITS, &secret, step_time);
            if constant_time_eq(&expected, code) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Consumes a backup code (single use): verifies it against the stored
    /// hash set, then removes it so it can't be replayed.
    pub async fn verify_and_consume_backup_code(auth: &AuthContext, user_id: Uuid, code: &str) -> AuthResult<bool> {
        let Some(record) = auth.adapter.find_two_factor(user_id).await? else {
            return Err(ApiError::BadRequest { message: "two-factor is not enabled for this account".into() });
        };
        let plaintext = crypto::decrypt(&auth.aead_key, &record.backup_codes_encrypted)?;
        let mut hashes: Vec<String> = serde_json::from_slice(&plaintext)
            .map_err(|e| ApiError::InternalError { message: format!("failed to parse backup codes: {e}") })?;

        let target = crypto::sha256_hex(code);
        let Some(pos) = hashes.iter().position(|h| constant_time_eq(h, &target)) else {
            return Ok(false);
        };
        hashes.remove(pos);

        let new_json = serde_json::to_vec(&hashes)
            .map_err(|e| ApiError::InternalError { message: format!("failed to serialize backup codes: {e}") })?;
        let new_ciphertext = crypto::encrypt(&auth.aead_key, &new_json)?;
        auth.adapter.upsert_two_factor(user_id, &record.secret_encrypted, &new_ciphertext).await?;
        Ok(true)
    }

    pub async fn disable(auth: &AuthContext, user_id: Uuid) -> AuthResult<()> {
        auth.adapter.delete_two_factor(user_id).await?;
        auth.adapter.update_user(user_id, serde_json::json!({ "twoFactorEnabled": false })).await?;
        Ok(())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().len() == b.as_bytes().len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// RFC 4648 base32 (no padding) — the encoding every authenticator app
/// expects in an `otpauth://` URI's `secret` parameter.
fn base32_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
    let mut output = String::new();
    let mut buffer: u32 = 0;
    let mut bits_left = 0u32;
    for &byte in bytes {
        buffer = (buffer << 8) | byte as u32;
        bits_left += 8;
        while bits_left >= 5 {
            bits_left -= 5;
            output.push(ALPHABET[((buffer >> bits_left) & 0x1F) as usize] as char);
        }
    }
    if bits_left > 0 {
        output.push(ALPHABET[((buffer << (5 - bits_left)) & 0x1F) as usize] as char);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base32_encodes_known_vector() {
        assert_eq!(base32_encode(b"foobar"), "MZXW6YTBOI");
    }

    #[test]
    fn totp_is_deterministic_for_a_fixed_step() {
        let secret = b"12345678901234567890";
        let a = totp_custom::<Sha1>(STEP_SECONDS, DIGITS, secret, 59);
        let b = totp_custom::<Sha1>(STEP_SECONDS, DIGITS, secret, 59);
        assert_eq!(a, b);
        assert_eq!(a.len(), DIGITS as usize);
    }

    #[test]
    fn constant_time_eq_rejects_different_lengths() {
        assert!(!constant_time_eq("123456", "1234567"));
    }
}
