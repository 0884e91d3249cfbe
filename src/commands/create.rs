/// Create command: generates a key pair, seals it under a new password,
/// writes the keystore file and signs the session in.
use owo_colors::{OwoColorize, Stream::Stdout};

use questkey::config::Settings;
use questkey::keystore::{self, file::DirectorySink};

use crate::cli::CreateArgs;

pub fn run_create(args: CreateArgs) -> anyhow::Result<()> {
    // ── 1. Resolve settings and session ─────────────────────────────────
    let settings = Settings::resolve(args.out_dir.as_deref())?;
    let mut session = super::open_session(&settings);

    // ── 2. Password (validated before any key generation) ───────────────
    let password = super::read_new_password()?;

    // ── 3. Create, seal, write ──────────────────────────────────────────
    let mut sink = DirectorySink::new(&settings.out_dir);
    let keystore = session.create_account(&password, &mut sink)?;

    // ── 4. Report ───────────────────────────────────────────────────────
    println!(
        "{}",
        "Account created.".if_supports_color(Stdout, |t| t.green())
    );
    println!();
    println!("Public Key:  {}", keystore.public_key_hex);
    println!("Fingerprint: {}", keystore::fingerprint(&keystore.public_key_hex));
    if let Some(path) = sink.written() {
        println!("Keystore:    {}", path.display());
    }
    println!();
    println!("Keep the keystore file and your password safe. Neither can be recovered.");

    Ok(())
}
