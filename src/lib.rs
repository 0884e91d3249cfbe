/// questkey library crate: keystore accounts, session state and the crypto
/// underneath them.
///
/// The binary in `main.rs` is a thin command-line layer over these modules;
/// integration tests in `tests/` use them directly.
pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod session;

pub use error::{AuthError, ErrorCategory};
pub use keystore::Keystore;
pub use session::{AuthMode, AuthState, Session};
