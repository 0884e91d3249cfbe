//! Keystore module: the portable, password-protected account file.
//!
//! A [`Keystore`] holds the SPKI public key in the clear and the PKCS#8 private
//! key encrypted under a PBKDF2-derived AES-256-GCM key. Everything needed to
//! reverse the encryption (salt, IV, iteration count) travels in the record, so
//! unsealing never depends on the current defaults.

pub mod file;
pub mod password;

use base64::Engine;
use p256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, IV_LEN, PBKDF2_ITERATIONS, SALT_LEN};
use crate::error::AuthError;

/// The one keystore generation this crate reads and writes.
pub const KEYSTORE_VERSION: &str = "2.0-ecdsa";

/// Tag for the asymmetric key algorithm.
pub const KEY_ALGORITHM: &str = "ECDSA-P256";

/// Tag for the symmetric cipher protecting the private key.
pub const ENCRYPTION_ALGORITHM: &str = "AES-GCM-256";

/// Prefix of every keystore file name.
pub const FILE_NAME_PREFIX: &str = "PythonQuest_Keystore_ECDSA_";

/// Upper bound on the iteration count accepted from a file.
pub const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// Number of public-key hex characters used in file names and fingerprints.
const FINGERPRINT_LEN: usize = 8;

/// A serialized keystore record.
///
/// Field order matches the JSON layout written by the browser client; serde
/// emits struct fields in declaration order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Keystore {
    /// SPKI DER public key, lowercase hex. The account identity.
    pub public_key_hex: String,
    /// Base64 AES-GCM ciphertext (tag appended) of the PKCS#8 private key.
    pub encrypted_private_key: String,
    /// Base64 16-byte PBKDF2 salt.
    pub salt: String,
    /// Base64 12-byte AES-GCM nonce.
    pub iv: String,
    pub version: String,
    pub key_algorithm: String,
    pub encryption_algorithm: String,
    pub pbkdf2_iterations: u32,
}

/// Binary fields of a keystore after base64 decoding and length checks.
struct DecodedFields {
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl Keystore {
    /// Encrypt `signing_key` under `password` with the default iteration count.
    pub fn seal(signing_key: &SigningKey, password: &str) -> Result<Self, AuthError> {
        Self::seal_with_iterations(signing_key, password, PBKDF2_ITERATIONS)
    }

    /// Encrypt `signing_key` under `password` with an explicit PBKDF2 iteration count.
    ///
    /// Draws a fresh salt and IV for every call.
    pub fn seal_with_iterations(
        signing_key: &SigningKey,
        password: &str,
        iterations: u32,
    ) -> Result<Self, AuthError> {
        if iterations == 0 || iterations > MAX_PBKDF2_ITERATIONS {
            return Err(AuthError::Crypto(format!(
                "PBKDF2 iteration count {} out of range",
                iterations
            )));
        }

        tracing::debug!("exporting public key (SPKI)");
        let public_key_hex = crypto::public_key_hex(signing_key.verifying_key())?;

        tracing::debug!("exporting private key (PKCS#8)");
        let private_key_der = crypto::export_private_key_pkcs8(signing_key)?;

        let salt = crypto::random_salt();
        let iv = crypto::random_iv();

        tracing::debug!(iterations, "deriving encryption key from password");
        let key = crypto::derive_key(password, &salt, iterations);

        tracing::debug!("encrypting private key");
        let ciphertext = crypto::encrypt(&key, &iv, &private_key_der)?;

        let b64 = base64::engine::general_purpose::STANDARD;
        Ok(Keystore {
            public_key_hex,
            encrypted_private_key: b64.encode(&ciphertext),
            salt: b64.encode(salt),
            iv: b64.encode(iv),
            version: KEYSTORE_VERSION.to_string(),
            key_algorithm: KEY_ALGORITHM.to_string(),
            encryption_algorithm: ENCRYPTION_ALGORITHM.to_string(),
            pbkdf2_iterations: iterations,
        })
    }

    /// Recover the signing key with `password`.
    ///
    /// The format gate runs before any decoding or key derivation, so an
    /// unsupported file is rejected the same way whatever the password.
    pub fn unseal(&self, password: &str) -> Result<SigningKey, AuthError> {
        self.check_supported()?;
        let fields = self.decode_fields()?;

        tracing::debug!(iterations = self.pbkdf2_iterations, "deriving decryption key from password");
        let key = crypto::derive_key(password, &fields.salt, self.pbkdf2_iterations);

        tracing::debug!("decrypting private key");
        let private_key_der = crypto::decrypt(&key, &fields.iv, &fields.ciphertext)?;

        tracing::debug!("importing private key for signing");
        let signing_key = crypto::import_private_key_pkcs8(&private_key_der)?;

        match crypto::public_key_hex(signing_key.verifying_key()) {
            Ok(derived) if derived != self.public_key_hex.to_ascii_lowercase() => {
                tracing::warn!(
                    file = %fingerprint(&self.public_key_hex),
                    derived = %fingerprint(&derived),
                    "keystore public key does not match its private key"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("could not re-derive public key: {}", e),
        }

        Ok(signing_key)
    }

    /// Reject any generation, key algorithm or cipher this crate does not speak.
    pub fn check_supported(&self) -> Result<(), AuthError> {
        if self.version != KEYSTORE_VERSION || self.key_algorithm != KEY_ALGORITHM {
            tracing::warn!(
                version = %self.version,
                key_algorithm = %self.key_algorithm,
                "keystore version or algorithm mismatch"
            );
            return Err(AuthError::OutdatedKeystore);
        }
        if self.encryption_algorithm != ENCRYPTION_ALGORITHM {
            tracing::warn!(
                encryption_algorithm = %self.encryption_algorithm,
                "keystore encryption algorithm mismatch"
            );
            return Err(AuthError::OutdatedKeystore);
        }
        Ok(())
    }

    fn decode_fields(&self) -> Result<DecodedFields, AuthError> {
        if self.public_key_hex.is_empty()
            || self.encrypted_private_key.is_empty()
            || self.salt.is_empty()
            || self.iv.is_empty()
        {
            return Err(AuthError::MalformedKeystore("missing required field".into()));
        }
        if self.pbkdf2_iterations == 0 || self.pbkdf2_iterations > MAX_PBKDF2_ITERATIONS {
            return Err(AuthError::MalformedKeystore(format!(
                "pbkdf2Iterations {} out of range",
                self.pbkdf2_iterations
            )));
        }

        let salt: [u8; SALT_LEN] = decode_base64("salt", &self.salt)?
            .try_into()
            .map_err(|v: Vec<u8>| {
                AuthError::MalformedKeystore(format!("salt must be {} bytes, got {}", SALT_LEN, v.len()))
            })?;
        let iv: [u8; IV_LEN] = decode_base64("iv", &self.iv)?
            .try_into()
            .map_err(|v: Vec<u8>| {
                AuthError::MalformedKeystore(format!("iv must be {} bytes, got {}", IV_LEN, v.len()))
            })?;
        let ciphertext = decode_base64("encryptedPrivateKey", &self.encrypted_private_key)?;

        Ok(DecodedFields {
            salt,
            iv,
            ciphertext,
        })
    }

    /// Parse keystore file contents.
    ///
    /// Empty input means no file was supplied and is a validation error. The
    /// version and key-algorithm tags are checked on a loose parse first, so a
    /// file from another generation is reported as outdated whatever its other
    /// fields look like. Only then is the strict record layout applied.
    pub fn from_json(contents: &str) -> Result<Self, AuthError> {
        if contents.trim().is_empty() {
            return Err(AuthError::MissingKeystore);
        }
        let value: serde_json::Value =
            serde_json::from_str(contents).map_err(|e| AuthError::MalformedKeystore(e.to_string()))?;
        if !value.is_object() {
            return Err(AuthError::MalformedKeystore("keystore must be a JSON object".into()));
        }
        check_generation_tags(&value)?;
        serde_json::from_value(value).map_err(|e| AuthError::MalformedKeystore(e.to_string()))
    }

    /// Pretty-printed JSON, two-space indented.
    pub fn to_json_pretty(&self) -> Result<String, AuthError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AuthError::Crypto(format!("keystore serialization failed: {}", e)))
    }

    /// Download file name: fixed prefix plus the first 8 public-key hex characters.
    pub fn file_name(&self) -> String {
        format!("{}{}.json", FILE_NAME_PREFIX, fingerprint(&self.public_key_hex))
    }
}

/// Short, human-distinguishable prefix of a public key hex string.
pub fn fingerprint(public_key_hex: &str) -> String {
    public_key_hex.chars().take(FINGERPRINT_LEN).collect()
}

/// Version and key-algorithm gate on an untyped keystore object.
///
/// A missing or non-string tag counts as a mismatch.
fn check_generation_tags(value: &serde_json::Value) -> Result<(), AuthError> {
    let version = value.get("version").and_then(serde_json::Value::as_str);
    let key_algorithm = value.get("keyAlgorithm").and_then(serde_json::Value::as_str);
    if version != Some(KEYSTORE_VERSION) || key_algorithm != Some(KEY_ALGORITHM) {
        tracing::warn!(?version, ?key_algorithm, "keystore version or algorithm mismatch");
        return Err(AuthError::OutdatedKeystore);
    }
    Ok(())
}

fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>, AuthError> {
    base64::engine::general_purpose::STANDARD
        .decode(value)
        .map_err(|e| AuthError::MalformedKeystore(format!("{} is not valid base64: {}", field, e)))
}
