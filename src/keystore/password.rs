//! Password checks that run before any cryptographic work.

use crate::error::{AuthError, MIN_PASSWORD_LEN};

/// Validate a password chosen for a new keystore.
///
/// Length is counted in UTF-16 code units, the same measure the browser
/// client applies.
pub fn validate_new_password(password: &str) -> Result<(), AuthError> {
    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    Ok(())
}

/// Validate a new password together with its confirmation entry.
///
/// A mismatch is reported before the length check, matching the order of the
/// account creation form.
pub fn validate_confirmation(password: &str, confirmation: &str) -> Result<(), AuthError> {
    if password != confirmation {
        return Err(AuthError::PasswordMismatch);
    }
    validate_new_password(password)
}

/// Validate a password supplied to unlock an existing keystore.
pub fn validate_login_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::MissingPassword);
    }
    Ok(())
}
