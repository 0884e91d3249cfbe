pub mod create;
pub mod guest;
pub mod inspect;
pub mod login;
pub mod logout;
pub mod sign;
pub mod verify;
pub mod whoami;

use std::io::{self, IsTerminal};

use zeroize::Zeroizing;

use questkey::config::{self, Settings};
use questkey::keystore::password::validate_confirmation;
use questkey::session::{FileStorage, Session};

/// Restore the session persisted in the configured session directory.
pub(crate) fn open_session(settings: &Settings) -> Session<FileStorage> {
    let session = Session::restore(FileStorage::new(&settings.session_dir));
    match settings.kdf_iterations {
        Some(iterations) => session.with_kdf_iterations(iterations),
        None => session,
    }
}

/// Read the password for an existing keystore.
pub(crate) fn read_password() -> anyhow::Result<Zeroizing<String>> {
    if let Some(password) = config::password_from_env() {
        return Ok(Zeroizing::new(password));
    }
    ensure_terminal()?;
    let password = dialoguer::Password::new()
        .with_prompt("Keystore password")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| anyhow::anyhow!("Password prompt failed: {}", e))?;
    Ok(Zeroizing::new(password))
}

/// Read and confirm the password for a new keystore.
pub(crate) fn read_new_password() -> anyhow::Result<Zeroizing<String>> {
    if let Some(password) = config::password_from_env() {
        return Ok(Zeroizing::new(password));
    }
    ensure_terminal()?;
    let password = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("Choose a password (min 8 chars)")
            .allow_empty_password(true)
            .interact()
            .map_err(|e| anyhow::anyhow!("Password prompt failed: {}", e))?,
    );
    let confirmation = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("Confirm password")
            .allow_empty_password(true)
            .interact()
            .map_err(|e| anyhow::anyhow!("Password prompt failed: {}", e))?,
    );
    validate_confirmation(&password, &confirmation)?;
    Ok(password)
}

fn ensure_terminal() -> anyhow::Result<()> {
    if !io::stdin().is_terminal() {
        anyhow::bail!(
            "No terminal for the password prompt. Set {} for non-interactive use.",
            config::PASSWORD_ENV
        );
    }
    Ok(())
}
