/// Inspect command: renders the non-secret fields of a keystore file as a
/// table and reports whether this build can unlock it.
use base64::Engine;
use owo_colors::{OwoColorize, Stream::Stdout};

use questkey::keystore::{self, file::read_keystore_file, Keystore};

use crate::cli::KeystoreArgs;

pub fn run_inspect(args: KeystoreArgs) -> anyhow::Result<()> {
    use comfy_table::{Cell, Color, Table};

    let contents = read_keystore_file(&args.file)?;
    let keystore = Keystore::from_json(&contents)?;

    let ciphertext_len = base64::engine::general_purpose::STANDARD
        .decode(&keystore.encrypted_private_key)
        .map(|bytes| format!("{} bytes", bytes.len()))
        .unwrap_or_else(|_| "(invalid base64)".to_string());

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![
        Cell::new("Fingerprint"),
        Cell::new(keystore::fingerprint(&keystore.public_key_hex)),
    ]);
    table.add_row(vec![Cell::new("Version"), Cell::new(&keystore.version)]);
    table.add_row(vec![Cell::new("Key algorithm"), Cell::new(&keystore.key_algorithm)]);
    table.add_row(vec![
        Cell::new("Encryption"),
        Cell::new(&keystore.encryption_algorithm),
    ]);
    table.add_row(vec![
        Cell::new("PBKDF2 iterations"),
        Cell::new(keystore.pbkdf2_iterations),
    ]);
    table.add_row(vec![Cell::new("Encrypted key"), Cell::new(ciphertext_len)]);

    let supported = keystore.check_supported();
    table.add_row(vec![
        Cell::new("Supported"),
        match &supported {
            Ok(()) => Cell::new("yes").fg(Color::Green),
            Err(_) => Cell::new("no").fg(Color::Red),
        },
    ]);

    println!("{table}");
    println!("Public Key:  {}", keystore.public_key_hex);

    if let Err(e) = supported {
        println!("{}", e.to_string().if_supports_color(Stdout, |t| t.yellow()));
    }

    Ok(())
}
