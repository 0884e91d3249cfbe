/// Sign command: the private key only lives in memory, so signing unlocks the
/// keystore in the same process first.
use questkey::config::Settings;
use questkey::keystore::file::read_keystore_file;

use crate::cli::SignArgs;

pub fn run_sign(args: SignArgs) -> anyhow::Result<()> {
    let settings = Settings::resolve(None)?;
    let mut session = super::open_session(&settings);

    let contents = read_keystore_file(&args.file)?;
    let password = super::read_password()?;
    session.login_with_keystore(&contents, &password)?;

    match session.sign_data(&args.message) {
        Some(signature) => {
            println!("{}", signature);
            Ok(())
        }
        None => anyhow::bail!(
            "{}",
            session.last_error().unwrap_or("Signing failed")
        ),
    }
}
