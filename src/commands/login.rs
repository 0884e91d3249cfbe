/// Login command: unlocks a keystore file and records the signed-in identity
/// in session storage.
use owo_colors::{OwoColorize, Stream::Stdout};

use questkey::config::Settings;
use questkey::keystore::{self, file::read_keystore_file};

use crate::cli::KeystoreArgs;

pub fn run_login(args: KeystoreArgs) -> anyhow::Result<()> {
    let settings = Settings::resolve(None)?;
    let mut session = super::open_session(&settings);

    let contents = read_keystore_file(&args.file)?;
    let password = super::read_password()?;

    session.login_with_keystore(&contents, &password)?;

    let user = session
        .current_user()
        .ok_or_else(|| anyhow::anyhow!("Login did not produce a user"))?;
    println!(
        "{} {}",
        "Signed in as".if_supports_color(Stdout, |t| t.green()),
        keystore::fingerprint(&user.public_key_hex).if_supports_color(Stdout, |t| t.cyan())
    );
    println!("Public Key:  {}", user.public_key_hex);

    Ok(())
}
