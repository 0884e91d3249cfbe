use questkey::config::Settings;
use questkey::keystore;
use questkey::session::AuthMode;

fn try_copy_to_clipboard(text: &str) -> bool {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => clipboard.set_text(text).is_ok(),
        Err(_) => false,
    }
}

pub fn run_whoami() -> anyhow::Result<()> {
    let settings = Settings::resolve(None)?;
    let session = super::open_session(&settings);

    println!("Mode:        {}", session.mode());
    println!("Session dir: {}", settings.session_dir.display());

    let Some(user) = session.current_user() else {
        if session.mode() == AuthMode::Unauthenticated {
            println!();
            println!("Not signed in. Run 'questkey login <FILE>' or 'questkey create'.");
        }
        return Ok(());
    };

    println!("Public Key:  {}", user.public_key_hex);
    println!("Fingerprint: {}", keystore::fingerprint(&user.public_key_hex));
    println!();

    if try_copy_to_clipboard(&user.public_key_hex) {
        println!("Public key copied to clipboard.");
    } else {
        println!("(Clipboard unavailable, copy public key manually)");
    }

    Ok(())
}
