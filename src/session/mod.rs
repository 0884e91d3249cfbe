//! Session module: the single owner of authentication state.
//!
//! [`Session`] is the only place a live private key exists. Callers read its
//! status through accessors and change it only through `create_account`,
//! `login_with_keystore`, `switch_to_guest` and `logout`. Every failed
//! operation leaves the session unauthenticated with no key material.

pub mod storage;

use p256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, PBKDF2_ITERATIONS};
use crate::error::{AuthError, StorageError};
use crate::keystore::file::KeystoreSink;
use crate::keystore::password::{validate_login_password, validate_new_password};
use crate::keystore::{self, Keystore, MAX_PBKDF2_ITERATIONS};

pub use storage::{FileStorage, MemoryStorage, SessionStorage};

/// Storage key of the persisted session marker.
pub const SESSION_STORAGE_KEY: &str = "pythonQuestAuth";

/// The identity of a keystore-authenticated user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub public_key_hex: String,
}

/// Flat view of [`AuthState`] for display and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Unauthenticated,
    Guest,
    Keystore,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Unauthenticated => "unauthenticated",
            AuthMode::Guest => "guest",
            AuthMode::Keystore => "keystore",
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication state. Exactly one variant holds at a time.
pub enum AuthState {
    Unauthenticated,
    Guest,
    /// Signed in with a keystore. `signing_key` is `None` when the identity
    /// was restored from session storage and the keystore has not been
    /// unlocked in this process.
    Keystore {
        user: AuthUser,
        signing_key: Option<SigningKey>,
    },
}

impl AuthState {
    pub fn mode(&self) -> AuthMode {
        match self {
            AuthState::Unauthenticated => AuthMode::Unauthenticated,
            AuthState::Guest => AuthMode::Guest,
            AuthState::Keystore { .. } => AuthMode::Keystore,
        }
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => f.write_str("Unauthenticated"),
            AuthState::Guest => f.write_str("Guest"),
            AuthState::Keystore { user, signing_key } => f
                .debug_struct("Keystore")
                .field("user", user)
                .field("unlocked", &signing_key.is_some())
                .finish(),
        }
    }
}

/// What gets written to session storage. Never carries key material.
#[derive(Serialize, Deserialize, Debug)]
struct SessionMarker {
    mode: String,
    user: Option<AuthUser>,
}

/// The authentication controller for one user session.
pub struct Session<S: SessionStorage> {
    state: AuthState,
    storage: S,
    kdf_iterations: u32,
    last_error: Option<String>,
}

impl<S: SessionStorage> Session<S> {
    /// Start an unauthenticated session without reading storage.
    pub fn new(storage: S) -> Self {
        Self {
            state: AuthState::Unauthenticated,
            storage,
            kdf_iterations: PBKDF2_ITERATIONS,
            last_error: None,
        }
    }

    /// Start a session from the marker in `storage`, if any.
    ///
    /// A keystore marker restores the identity only; signing stays locked
    /// until the keystore is unlocked again. Anything unreadable falls back to
    /// unauthenticated.
    pub fn restore(storage: S) -> Self {
        let mut session = Self::new(storage);
        session.state = match session.storage.get_item(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<SessionMarker>(&raw) {
                Ok(marker) => state_from_marker(marker),
                Err(e) => {
                    tracing::warn!("ignoring unreadable session marker: {}", e);
                    AuthState::Unauthenticated
                }
            },
            Ok(None) => {
                tracing::debug!("no session state found, defaulting to unauthenticated");
                AuthState::Unauthenticated
            }
            Err(e) => {
                tracing::error!("error reading session state: {}", e);
                AuthState::Unauthenticated
            }
        };
        session
    }

    /// Override the PBKDF2 iteration count used for new keystores.
    ///
    /// Values are clamped to the range accepted when reading keystores back.
    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations.clamp(1, MAX_PBKDF2_ITERATIONS);
        self
    }

    // ── Read-only status ─────────────────────────────────────────────────

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn mode(&self) -> AuthMode {
        self.state.mode()
    }

    pub fn current_user(&self) -> Option<&AuthUser> {
        match &self.state {
            AuthState::Keystore { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.mode() == AuthMode::Keystore
    }

    pub fn is_guest(&self) -> bool {
        self.mode() == AuthMode::Guest
    }

    pub fn is_keystore_authenticated(&self) -> bool {
        self.mode() == AuthMode::Keystore
    }

    /// True when a live signing key is held.
    pub fn can_sign(&self) -> bool {
        matches!(
            self.state,
            AuthState::Keystore {
                signing_key: Some(_),
                ..
            }
        )
    }

    /// Message of the most recent failure, for display.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Create a new account protected by `password`.
    ///
    /// Generates a key pair, seals it into a keystore, hands the file to
    /// `sink`, and on success leaves the session keystore-authenticated with
    /// the live key. Returns the created record.
    pub fn create_account(
        &mut self,
        password: &str,
        sink: &mut dyn KeystoreSink,
    ) -> Result<Keystore, AuthError> {
        self.last_error = None;
        tracing::debug!("starting account creation");

        if let Err(e) = validate_new_password(password) {
            return Err(self.fail(e));
        }

        let result = self.build_account(password, sink);
        match result {
            Ok((keystore, signing_key)) => {
                self.state = AuthState::Keystore {
                    user: AuthUser {
                        public_key_hex: keystore.public_key_hex.clone(),
                    },
                    signing_key: Some(signing_key),
                };
                self.persist();
                tracing::info!(
                    fingerprint = %keystore::fingerprint(&keystore.public_key_hex),
                    "account created, session is keystore authenticated"
                );
                Ok(keystore)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn build_account(
        &self,
        password: &str,
        sink: &mut dyn KeystoreSink,
    ) -> Result<(Keystore, SigningKey), AuthError> {
        tracing::debug!("generating ECDSA P-256 key pair");
        let signing_key = crypto::generate_signing_key();

        let keystore = Keystore::seal_with_iterations(&signing_key, password, self.kdf_iterations)
            .map_err(|e| AuthError::AccountCreationFailed(e.to_string()))?;
        let contents = keystore
            .to_json_pretty()
            .map_err(|e| AuthError::AccountCreationFailed(e.to_string()))?;

        sink.deliver(&keystore.file_name(), &contents).map_err(|e| {
            AuthError::AccountCreationFailed(format!("could not save keystore file: {}", e))
        })?;

        Ok((keystore, signing_key))
    }

    /// Unlock a keystore file's contents with `password`.
    ///
    /// The session's public key is taken from the file.
    pub fn login_with_keystore(&mut self, contents: &str, password: &str) -> Result<(), AuthError> {
        self.last_error = None;
        tracing::debug!("starting login with keystore");

        match unlock(contents, password) {
            Ok((keystore, signing_key)) => {
                self.state = AuthState::Keystore {
                    user: AuthUser {
                        public_key_hex: keystore.public_key_hex,
                    },
                    signing_key: Some(signing_key),
                };
                self.persist();
                tracing::info!("login successful, session is keystore authenticated");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Sign `message` with the session's key and return the hex signature.
    ///
    /// Fails with [`AuthError::NotAuthenticated`] without touching any
    /// primitive unless a live key is held.
    pub fn try_sign_data(&self, message: &str) -> Result<String, AuthError> {
        let AuthState::Keystore {
            signing_key: Some(signing_key),
            ..
        } = &self.state
        else {
            return Err(AuthError::NotAuthenticated);
        };
        crypto::sign_message(signing_key, message.as_bytes())
    }

    /// Like [`Session::try_sign_data`], but returns `None` on failure and keeps
    /// the error in [`Session::last_error`]. Auth state is never changed.
    pub fn sign_data(&mut self, message: &str) -> Option<String> {
        match self.try_sign_data(message) {
            Ok(signature) => {
                tracing::debug!("data signed");
                Some(signature)
            }
            Err(e) => {
                match e {
                    AuthError::NotAuthenticated => tracing::warn!("{}", e),
                    _ => tracing::error!("error signing data: {}", e),
                }
                self.last_error = Some(e.to_string());
                None
            }
        }
    }

    /// Continue without an account. Any held key is dropped.
    pub fn switch_to_guest(&mut self) {
        self.state = AuthState::Guest;
        self.last_error = None;
        self.persist();
        tracing::info!("switched to guest mode");
    }

    /// Drop the key and identity and erase the session marker.
    pub fn logout(&mut self) {
        self.state = AuthState::Unauthenticated;
        self.last_error = None;
        self.persist();
        tracing::info!("logged out");
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Reset to unauthenticated after a failure and record the message.
    fn fail(&mut self, error: AuthError) -> AuthError {
        tracing::error!(category = ?error.category(), "{}", error);
        self.state = AuthState::Unauthenticated;
        self.last_error = Some(error.to_string());
        self.persist();
        error
    }

    fn persist(&mut self) {
        if let Err(e) = self.write_marker() {
            tracing::error!("error persisting session state: {}", e);
        }
    }

    fn write_marker(&mut self) -> Result<(), StorageError> {
        let marker = match &self.state {
            AuthState::Unauthenticated => return self.storage.remove_item(SESSION_STORAGE_KEY),
            AuthState::Guest => SessionMarker {
                mode: AuthMode::Guest.as_str().to_string(),
                user: None,
            },
            AuthState::Keystore { user, .. } => SessionMarker {
                mode: AuthMode::Keystore.as_str().to_string(),
                user: Some(user.clone()),
            },
        };
        match serde_json::to_string(&marker) {
            Ok(json) => self.storage.set_item(SESSION_STORAGE_KEY, &json),
            Err(e) => {
                tracing::error!("could not serialize session marker: {}", e);
                Ok(())
            }
        }
    }
}

fn unlock(contents: &str, password: &str) -> Result<(Keystore, SigningKey), AuthError> {
    if contents.trim().is_empty() {
        return Err(AuthError::MissingKeystore);
    }
    validate_login_password(password)?;
    let keystore = Keystore::from_json(contents)?;
    let signing_key = keystore.unseal(password)?;
    Ok((keystore, signing_key))
}

fn state_from_marker(marker: SessionMarker) -> AuthState {
    match (marker.mode.as_str(), marker.user) {
        ("keystore", Some(user)) if !user.public_key_hex.is_empty() => {
            tracing::debug!("keystore session restored (public key only)");
            AuthState::Keystore {
                user,
                signing_key: None,
            }
        }
        ("guest", _) => {
            tracing::debug!("guest session restored");
            AuthState::Guest
        }
        _ => AuthState::Unauthenticated,
    }
}
