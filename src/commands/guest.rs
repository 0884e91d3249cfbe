use questkey::config::Settings;

pub fn run_guest() -> anyhow::Result<()> {
    let settings = Settings::resolve(None)?;
    let mut session = super::open_session(&settings);
    session.switch_to_guest();
    println!("Continuing as guest. Progress is not tied to an account.");
    Ok(())
}
