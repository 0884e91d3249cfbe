use owo_colors::{OwoColorize, Stream::Stdout};

use questkey::crypto::verify_signature;

use crate::cli::VerifyArgs;

pub fn run_verify(args: VerifyArgs) -> anyhow::Result<()> {
    let public_key = args.public_key.trim().to_ascii_lowercase();
    if verify_signature(&public_key, args.message.as_bytes(), args.signature.trim()) {
        println!("{}", "Signature valid.".if_supports_color(Stdout, |t| t.green()));
        Ok(())
    } else {
        anyhow::bail!("Signature does not match this public key and message")
    }
}
