use questkey::config::Settings;

pub fn run_logout() -> anyhow::Result<()> {
    let settings = Settings::resolve(None)?;
    let mut session = super::open_session(&settings);
    session.logout();
    println!("Signed out.");
    Ok(())
}
