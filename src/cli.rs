use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "questkey", version, about = "Self-custody keystore accounts for Python Quest")]
pub struct Cli {
    /// Log level filter (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new account and write its password-protected keystore file
    Create(CreateArgs),
    /// Unlock a keystore file and sign in
    Login(KeystoreArgs),
    /// Unlock a keystore file and sign a message with it
    Sign(SignArgs),
    /// Check a signature against a public key
    Verify(VerifyArgs),
    /// Show the non-secret fields of a keystore file
    Inspect(KeystoreArgs),
    /// Show the current session
    Whoami,
    /// Continue as a guest without an account
    Guest,
    /// Sign out and clear the session
    Logout,
}

#[derive(Parser)]
pub struct CreateArgs {
    /// Directory to write the keystore file into (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct KeystoreArgs {
    /// Path to the keystore file (.json)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser)]
pub struct SignArgs {
    /// Path to the keystore file (.json)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Message to sign (UTF-8)
    #[arg(value_name = "MESSAGE")]
    pub message: String,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Signer's public key (SPKI hex, as in publicKeyHex)
    #[arg(value_name = "PUBKEY_HEX")]
    pub public_key: String,

    /// The signed message
    #[arg(value_name = "MESSAGE")]
    pub message: String,

    /// Hex signature produced by `questkey sign`
    #[arg(value_name = "SIGNATURE_HEX")]
    pub signature: String,
}
