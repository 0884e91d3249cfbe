//! Crypto module: P-256 key handling, PBKDF2 key derivation and AES-256-GCM.
//!
//! Every function here is a single primitive call with its failure mapped into
//! [`AuthError`]. Encodings match what browsers produce through WebCrypto:
//! public keys are SPKI DER, private keys are PKCS#8 DER and signatures are the
//! 64-byte IEEE P1363 `r || s` form, so keystore files stay interchangeable.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::AuthError;

// ── Parameters ──────────────────────────────────────────────────────────────

/// PBKDF2-HMAC-SHA256 iteration count written into new keystores.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length for password-based key derivation.
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length.
pub const IV_LEN: usize = 12;

/// AES-256 key length.
pub const KEY_LEN: usize = 32;

/// Length of an ECDSA P-256 signature in IEEE P1363 form.
pub const SIGNATURE_LEN: usize = 64;

// ── Key pairs ───────────────────────────────────────────────────────────────

/// Generate a fresh P-256 signing key from the OS CSPRNG.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::random(&mut OsRng)
}

/// Encode a verifying key as SPKI DER and render it as lowercase hex.
///
/// This is the account identity and the `publicKeyHex` field of a keystore.
pub fn public_key_hex(verifying_key: &VerifyingKey) -> Result<String, AuthError> {
    let der = verifying_key
        .to_public_key_der()
        .map_err(|e| AuthError::Crypto(format!("public key export failed: {}", e)))?;
    Ok(hex::encode(der.as_bytes()))
}

/// Parse an SPKI DER hex string back into a verifying key.
pub fn verifying_key_from_hex(public_key_hex: &str) -> Result<VerifyingKey, AuthError> {
    let der = hex::decode(public_key_hex)
        .map_err(|e| AuthError::Crypto(format!("public key is not valid hex: {}", e)))?;
    VerifyingKey::from_public_key_der(&der)
        .map_err(|e| AuthError::Crypto(format!("public key import failed: {}", e)))
}

/// Export a signing key as PKCS#8 DER. The buffer is zeroed on drop.
pub fn export_private_key_pkcs8(signing_key: &SigningKey) -> Result<Zeroizing<Vec<u8>>, AuthError> {
    let document = signing_key
        .to_pkcs8_der()
        .map_err(|e| AuthError::Crypto(format!("private key export failed: {}", e)))?;
    Ok(Zeroizing::new(document.as_bytes().to_vec()))
}

/// Import PKCS#8 DER bytes as a P-256 signing key.
///
/// The returned key is only ever used for signing; nothing in the crate
/// re-exports it.
pub fn import_private_key_pkcs8(der: &[u8]) -> Result<SigningKey, AuthError> {
    SigningKey::from_pkcs8_der(der)
        .map_err(|e| AuthError::Crypto(format!("failed to import decrypted private key: {}", e)))
}

// ── Randomness ──────────────────────────────────────────────────────────────

/// Draw a fresh 16-byte salt from the OS CSPRNG.
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Draw a fresh 12-byte AES-GCM nonce from the OS CSPRNG.
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

// ── Password-based encryption ───────────────────────────────────────────────

/// Derive a 256-bit AES key from a password and salt with PBKDF2-HMAC-SHA256.
///
/// The iteration count is an argument so that unsealing can use the value
/// stored in the keystore instead of the current default.
pub fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, key.as_mut());
    key
}

/// Encrypt plaintext with AES-256-GCM. The 16-byte tag is appended.
pub fn encrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|e| AuthError::Crypto(format!("encryption failed: {}", e)))
}

/// Decrypt AES-256-GCM ciphertext (with trailing tag).
///
/// A tag mismatch cannot tell a wrong password from a tampered file, so both
/// surface as [`AuthError::InvalidPasswordOrCorrupted`].
pub fn decrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| AuthError::InvalidPasswordOrCorrupted)
}

// ── Signatures ──────────────────────────────────────────────────────────────

/// Sign a message with ECDSA P-256 / SHA-256 and return the P1363 signature as hex.
pub fn sign_message(signing_key: &SigningKey, message: &[u8]) -> Result<String, AuthError> {
    let signature: Signature = signing_key
        .try_sign(message)
        .map_err(|e| AuthError::SigningFailed(e.to_string()))?;
    Ok(hex::encode(signature.to_bytes()))
}

/// Check a hex signature produced by [`sign_message`] against an SPKI hex public key.
///
/// Malformed inputs are treated as a failed verification, never as an error.
pub fn verify_signature(public_key_hex: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(verifying_key) = verifying_key_from_hex(public_key_hex) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count keeps the unit tests fast; the default is covered in tests/.
    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn test_public_key_hex_is_spki_der() {
        let key = generate_signing_key();
        let hex_key = public_key_hex(key.verifying_key()).expect("export should succeed");
        // SPKI for an uncompressed P-256 point is 91 bytes
        assert_eq!(hex_key.len(), 182);
        assert!(hex_key.starts_with("3059301306072a8648ce3d0201"));
        assert!(hex_key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_public_key_hex_round_trip() {
        let key = generate_signing_key();
        let hex_key = public_key_hex(key.verifying_key()).expect("export should succeed");
        let parsed = verifying_key_from_hex(&hex_key).expect("import should succeed");
        assert_eq!(&parsed, key.verifying_key());
    }

    #[test]
    fn test_generated_keys_are_fresh() {
        let a = generate_signing_key();
        let b = generate_signing_key();
        assert_ne!(a.verifying_key(), b.verifying_key(), "each call must produce a new key pair");
    }

    #[test]
    fn test_pkcs8_export_import_preserves_key() {
        let key = generate_signing_key();
        let der = export_private_key_pkcs8(&key).expect("export should succeed");
        let restored = import_private_key_pkcs8(&der).expect("import should succeed");
        assert_eq!(restored.verifying_key(), key.verifying_key());
    }

    #[test]
    fn test_import_rejects_garbage() {
        let result = import_private_key_pkcs8(b"definitely not pkcs8");
        assert!(matches!(result, Err(AuthError::Crypto(_))));
    }

    #[test]
    fn test_random_salt_and_iv_lengths_and_uniqueness() {
        assert_eq!(random_salt().len(), SALT_LEN);
        assert_eq!(random_iv().len(), IV_LEN);
        assert_ne!(random_salt(), random_salt());
        assert_ne!(random_iv(), random_iv());
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [7u8; SALT_LEN];
        let k1 = derive_key("correcthorsebattery", &salt, TEST_ITERATIONS);
        let k2 = derive_key("correcthorsebattery", &salt, TEST_ITERATIONS);
        assert_eq!(*k1, *k2);
        assert_ne!(*k1, [0u8; KEY_LEN]);
    }

    #[test]
    fn test_derive_key_depends_on_every_input() {
        let salt = [7u8; SALT_LEN];
        let base = derive_key("password-one", &salt, TEST_ITERATIONS);
        assert_ne!(*base, *derive_key("password-two", &salt, TEST_ITERATIONS));
        assert_ne!(*base, *derive_key("password-one", &[8u8; SALT_LEN], TEST_ITERATIONS));
        assert_ne!(*base, *derive_key("password-one", &salt, TEST_ITERATIONS + 1));
    }

    #[test]
    fn test_derive_key_rfc7914_vector() {
        // PBKDF2-HMAC-SHA256 test vector from RFC 7914 section 11
        let key = derive_key("passwd", b"salt", 1);
        assert_eq!(
            hex::encode(&key[..]),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = [3u8; KEY_LEN];
        let iv = random_iv();
        let ciphertext = encrypt(&key, &iv, b"pkcs8 bytes").expect("encrypt should succeed");
        assert_eq!(ciphertext.len(), b"pkcs8 bytes".len() + 16, "tag must be appended");
        let plaintext = decrypt(&key, &iv, &ciphertext).expect("decrypt should succeed");
        assert_eq!(plaintext.as_slice(), b"pkcs8 bytes");
    }

    #[test]
    fn test_decrypt_with_wrong_key_is_auth_failure() {
        let iv = random_iv();
        let ciphertext = encrypt(&[3u8; KEY_LEN], &iv, b"secret").expect("encrypt should succeed");
        let result = decrypt(&[4u8; KEY_LEN], &iv, &ciphertext);
        assert!(matches!(result, Err(AuthError::InvalidPasswordOrCorrupted)));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext_is_auth_failure() {
        let key = [3u8; KEY_LEN];
        let iv = random_iv();
        let mut ciphertext = encrypt(&key, &iv, b"secret").expect("encrypt should succeed");
        ciphertext[0] ^= 0x01;
        let result = decrypt(&key, &iv, &ciphertext);
        assert!(matches!(result, Err(AuthError::InvalidPasswordOrCorrupted)));
    }

    #[test]
    fn test_sign_produces_p1363_hex_that_verifies() {
        let key = generate_signing_key();
        let pk_hex = public_key_hex(key.verifying_key()).expect("export should succeed");
        let sig = sign_message(&key, b"lesson-3-complete").expect("sign should succeed");
        assert_eq!(sig.len(), SIGNATURE_LEN * 2);
        assert!(verify_signature(&pk_hex, b"lesson-3-complete", &sig));
        assert!(!verify_signature(&pk_hex, b"lesson-4-complete", &sig));
    }

    #[test]
    fn test_verify_rejects_other_key_and_malformed_input() {
        let key = generate_signing_key();
        let other = generate_signing_key();
        let other_hex = public_key_hex(other.verifying_key()).expect("export should succeed");
        let sig = sign_message(&key, b"msg").expect("sign should succeed");
        assert!(!verify_signature(&other_hex, b"msg", &sig));
        assert!(!verify_signature("zz-not-hex", b"msg", &sig));
        assert!(!verify_signature(&other_hex, b"msg", "abcd"));
    }
}
