//! # Cryptographic Primitives
//!
//! HMAC signing, AEAD symmetric encryption, argon2id password hashing, and
//! PKCE challenge verification, all in one module because every higher-level
//! component (cookies, sessions, OAuth tokens) ends up needing more than one
//! of them.
//!
//! ## Why these specific primitives
//!
//! | Need | Choice | Why |
//! |------|--------|-----|
//! | Signing opaque values (cookies, state) | HMAC-SHA256 | Fast, no IV management |
//! | Encrypting secrets at rest (TOTP secret, backup codes) | XChaCha20-Poly1305 | 24-byte nonce is safe to generate randomly per call, unlike AES-GCM's 12 bytes |
//! | Password hashing | Argon2id | Memory-hard, side-channel resistant variant recommended by OWASP |
//!
//! Constant-time comparison (via [`subtle`]) is used everywhere a computed
//! MAC or hash is compared against an attacker-controlled value, to avoid
//! timing side channels.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng as AeadOsRng};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::ApiError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 24;

/// Argon2id parameters fixed by the authentication contract this crate
/// implements: 19456 KiB memory, 2 iterations, 1 lane, 32-byte output.
/// These intentionally differ from the more conservative 64 MiB/3-iteration
/// profile used elsewhere in this workspace for non-auth password storage —
/// see DESIGN.md for why the two profiles are allowed to diverge.
fn argon2_params() -> Params {
    Params::new(19456, 2, 1, Some(32)).expect("static argon2 params are always valid")
}

fn argon2() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params())
}

// =============================================================================
// HMAC signing
// =============================================================================

/// Signs `message` with `secret`, returning a standard-base64 MAC.
pub fn hmac_sign(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Verifies a previously-produced signature in constant time.
pub fn hmac_verify(secret: &[u8], message: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    let computed = mac.finalize().into_bytes();
    computed.ct_eq(&expected).into()
}

// =============================================================================
// AEAD encryption (XChaCha20-Poly1305)
// =============================================================================

/// Encrypts `plaintext` under `key` (32 bytes), returning `nonce || ciphertext`
/// hex-encoded. A fresh random nonce is generated on every call, which is
/// safe with XChaCha20's 192-bit nonce space even under heavy reuse of `key`.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<String, ApiError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let mut nonce_bytes = [0u8; NONCE_LEN];
    // XChaCha20Poly1305::generate_nonce also works; rand is used directly so
    // this function doesn't depend on the aead crate's rng plumbing matching ours.
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| ApiError::InvalidCiphertext)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(hex::encode(out))
}

/// Inverse of [`encrypt`]. Fails with [`ApiError::InvalidCiphertext`] on any
/// tampering, truncation, or key mismatch — never distinguishes the failure
/// mode to the caller.
pub fn decrypt(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, ApiError> {
    let raw = hex::decode(encoded).map_err(|_| ApiError::InvalidCiphertext)?;
    if raw.len() < NONCE_LEN {
        return Err(ApiError::InvalidCiphertext);
    }
    let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XNonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| ApiError::InvalidCiphertext)
}

/// Generates a random 32-byte symmetric key, for key-derivation-free setups
/// (tests, or a deployment that stores the raw key in a secret manager).
pub fn generate_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    AeadOsRng.fill_bytes(&mut key);
    key
}

// =============================================================================
// Password hashing (argon2id)
// =============================================================================

/// Hashes `password` with a random salt and the fixed argon2id parameters.
/// `pepper` is mixed in ahead of the password bytes; it is normally the
/// server's configured secret, so a leaked password hash alone (without the
/// server's secret) cannot be brute-forced offline.
pub fn hash_password(password: &str, pepper: &[u8]) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let mut peppered = Vec::with_capacity(pepper.len() + password.len());
    peppered.extend_from_slice(pepper);
    peppered.extend_from_slice(password.as_bytes());

    argon2()
        .hash_password(&peppered, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::InternalError {
            message: format!("password hashing failed: {e}"),
        })
}

/// Verifies `password` (with the same pepper used at hash time) against a
/// PHC-formatted hash. Returns `Ok(false)` for a plain mismatch, `Err` only
/// for a malformed hash string.
pub fn verify_password(password: &str, pepper: &[u8], hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ApiError::InternalError {
        message: format!("invalid password hash: {e}"),
    })?;

    let mut peppered = Vec::with_capacity(pepper.len() + password.len());
    peppered.extend_from_slice(pepper);
    peppered.extend_from_slice(password.as_bytes());

    match argon2().verify_password(&peppered, &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::InternalError {
            message: format!("password verification failed: {e}"),
        }),
    }
}

// =============================================================================
// PKCE
// =============================================================================

/// PKCE code challenge method, per RFC 7636 §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CodeChallengeMethod {
    S256,
    Plain,
}

/// Computes the code challenge for `verifier` under `method`.
pub fn pkce_challenge(verifier: &str, method: CodeChallengeMethod) -> String {
    match method {
        CodeChallengeMethod::Plain => verifier.to_string(),
        CodeChallengeMethod::S256 => {
            let digest = Sha256::digest(verifier.as_bytes());
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
        }
    }
}

/// Verifies a PKCE `code_verifier` against the `code_challenge` stored at
/// authorization time. This is the one property that makes the authorization
/// code useless to an attacker who intercepts it without also knowing the
/// verifier.
pub fn pkce_verify(verifier: &str, challenge: &str, method: CodeChallengeMethod) -> bool {
    let computed = pkce_challenge(verifier, method);
    computed.as_bytes().ct_eq(challenge.as_bytes()).into()
}

// =============================================================================
// Random identifiers
// =============================================================================

const ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random alphanumeric identifier of the given length, suitable
/// for session tokens, authorization codes, and device codes (anything that
/// doesn't need the ambiguity-free charset RFC 8628 asks for — see
/// `auth_server::oauth::grants::device` for that one).
pub fn random_alnum(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALNUM[rng.next_u32() as usize % ALNUM.len()] as char)
        .collect()
}

/// SHA-256 hex digest, used to store opaque tokens (refresh tokens,
/// authorization codes, device codes) hashed rather than raw.
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// OIDC `at_hash`: base64url(left half of sha256(access_token)), per OIDC
/// Core §3.1.3.6. Binds an id_token to the access_token it was issued
/// alongside so a swapped-in token from a different grant can't be used with
/// someone else's id_token.
pub fn at_hash(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_round_trip() {
        let secret = b"test-secret";
        let sig = hmac_sign(secret, b"hello");
        assert!(hmac_verify(secret, b"hello", &sig));
        assert!(!hmac_verify(secret, b"goodbye", &sig));
    }

    #[test]
    fn hmac_verify_rejects_garbage_signature() {
        assert!(!hmac_verify(b"secret", b"hello", "not-base64!!"));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = generate_key();
        let ciphertext = encrypt(&key, b"super secret totp seed").unwrap();
        let plaintext = decrypt(&key, &ciphertext).unwrap();
        assert_eq!(plaintext, b"super secret totp seed");
    }

    #[test]
    fn encrypt_is_non_deterministic() {
        let key = generate_key();
        let a = encrypt(&key, b"same input").unwrap();
        let b = encrypt(&key, b"same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let key = generate_key();
        let mut ciphertext = encrypt(&key, b"data").unwrap();
        // flip a hex character well past the nonce prefix
        let idx = ciphertext.len() - 1;
        let flipped = if ciphertext.as_bytes()[idx] == b'0' { '1' } else { '0' };
        ciphertext.replace_range(idx..idx + 1, &flipped.to_string());
        assert!(matches!(decrypt(&key, &ciphertext), Err(ApiError::InvalidCiphertext)));
    }

    #[test]
    fn decrypt_rejects_wrong_key() {
        let key_a = generate_key();
        let key_b = generate_key();
        let ciphertext = encrypt(&key_a, b"data").unwrap();
        assert!(matches!(decrypt(&key_b, &ciphertext), Err(ApiError::InvalidCiphertext)));
    }

    #[test]
    fn password_hash_and_verify() {
        let pepper = b"server-pepper";
        let hash = hash_password("Passw0rd!", pepper).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Passw0rd!", pepper, &hash).unwrap());
        assert!(!verify_password("wrong", pepper, &hash).unwrap());
    }

    #[test]
    fn password_hash_requires_matching_pepper() {
        let hash = hash_password("Passw0rd!", b"pepper-a").unwrap();
        assert!(!verify_password("Passw0rd!", b"pepper-b", &hash).unwrap());
    }

    #[test]
    fn pkce_s256_known_vector() {
        // RFC 7636 appendix B vector.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert_eq!(pkce_challenge(verifier, CodeChallengeMethod::S256), challenge);
        assert!(pkce_verify(verifier, challenge, CodeChallengeMethod::S256));
        assert!(!pkce_verify("wrong-verifier", challenge, CodeChallengeMethod::S256));
    }

    #[test]
    fn pkce_plain_echoes_verifier() {
        assert!(pkce_verify("abc", "abc", CodeChallengeMethod::Plain));
        assert!(!pkce_verify("abc", "xyz", CodeChallengeMethod::Plain));
    }

    #[test]
    fn random_alnum_has_requested_length_and_charset() {
        let token = random_alnum(32);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn sha256_hex_is_deterministic() {
        assert_eq!(sha256_hex("abc"), sha256_hex("abc"));
        assert_ne!(sha256_hex("abc"), sha256_hex("abd"));
    }

    #[test]
    fn at_hash_is_deterministic_and_token_sensitive() {
        assert_eq!(at_hash("access-token-1"), at_hash("access-token-1"));
        assert_ne!(at_hash("access-token-1"), at_hash("access-token-2"));
        // left half of a 32-byte sha256 digest, base64url-no-pad encoded.
        assert_eq!(at_hash("access-token-1").len(), 22);
    }
}
