use thiserror::Error;

/// Minimum password length accepted when creating a keystore.
pub const MIN_PASSWORD_LEN: usize = 8;

/// The three kinds of failure a caller has to tell apart.
///
/// Validation errors are caught before any cryptographic call, format errors
/// after parsing a keystore file but before decryption, and crypto errors come
/// out of the primitives themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Format,
    Crypto,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Password must be at least 8 characters long.")]
    PasswordTooShort,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Please select your keystore file.")]
    MissingKeystore,

    #[error("Please enter your password.")]
    MissingPassword,

    #[error("Invalid or outdated keystore file. Please use a keystore generated with ECDSA P-256.")]
    OutdatedKeystore,

    #[error("Invalid or corrupted keystore file format: {0}")]
    MalformedKeystore(String),

    #[error("Invalid password or corrupted keystore.")]
    InvalidPasswordOrCorrupted,

    #[error("Account creation failed: {0}")]
    AccountCreationFailed(String),

    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Not authenticated with a keystore to sign data.")]
    NotAuthenticated,
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::PasswordTooShort
            | AuthError::PasswordMismatch
            | AuthError::MissingKeystore
            | AuthError::MissingPassword => ErrorCategory::Validation,
            AuthError::OutdatedKeystore | AuthError::MalformedKeystore(_) => ErrorCategory::Format,
            AuthError::InvalidPasswordOrCorrupted
            | AuthError::AccountCreationFailed(_)
            | AuthError::Crypto(_)
            | AuthError::SigningFailed(_)
            | AuthError::NotAuthenticated => ErrorCategory::Crypto,
        }
    }
}

/// Failure of the session-scoped storage collaborator.
///
/// Never fails an auth operation: the session logs it and carries on.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to access session storage at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid session storage key: {0}")]
    InvalidKey(String),
}
