//! Runtime settings resolved from flags, environment and well-known directories.

use std::path::{Path, PathBuf};

/// Overrides the session storage directory.
pub const SESSION_DIR_ENV: &str = "QUESTKEY_SESSION_DIR";

/// Supplies the keystore password without a prompt.
pub const PASSWORD_ENV: &str = "QUESTKEY_PASSWORD";

/// Overrides the PBKDF2 iteration count for new keystores.
pub const KDF_ITERATIONS_ENV: &str = "QUESTKEY_KDF_ITERATIONS";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Where `create` writes keystore files.
    pub out_dir: PathBuf,
    /// Directory backing session-scoped storage.
    pub session_dir: PathBuf,
    /// Iteration count override for new keystores, if any.
    pub kdf_iterations: Option<u32>,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn resolve(out_dir: Option<&Path>) -> anyhow::Result<Self> {
        let env_session_dir = std::env::var_os(SESSION_DIR_ENV).map(PathBuf::from);
        let kdf_iterations = match std::env::var(KDF_ITERATIONS_ENV) {
            Ok(raw) => Some(raw.trim().parse::<u32>().map_err(|e| {
                anyhow::anyhow!("{} must be a positive integer: {}", KDF_ITERATIONS_ENV, e)
            })?),
            Err(_) => None,
        };
        let out_dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        Ok(Self {
            out_dir,
            session_dir: env_session_dir.unwrap_or_else(default_session_dir),
            kdf_iterations,
        })
    }
}

/// `$XDG_RUNTIME_DIR/questkey` where available, else a per-user temp directory.
pub fn default_session_dir() -> PathBuf {
    match dirs::runtime_dir() {
        Some(dir) => dir.join("questkey"),
        None => {
            let user = std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "default".to_string());
            std::env::temp_dir().join(format!("questkey-{}", user))
        }
    }
}

/// Password from [`PASSWORD_ENV`], if set.
pub fn password_from_env() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_dir_is_namespaced() {
        let dir = default_session_dir();
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .expect("session dir must have a name");
        assert!(name.starts_with("questkey"), "got {}", name);
    }

    #[test]
    fn test_explicit_out_dir_wins() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let settings = Settings::resolve(Some(dir.path())).expect("resolve should succeed");
        assert_eq!(settings.out_dir, dir.path());
    }
}
