mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    match cli.command {
        Commands::Create(args) => commands::create::run_create(args)?,
        Commands::Login(args) => commands::login::run_login(args)?,
        Commands::Sign(args) => commands::sign::run_sign(args)?,
        Commands::Verify(args) => commands::verify::run_verify(args)?,
        Commands::Inspect(args) => commands::inspect::run_inspect(args)?,
        Commands::Whoami => commands::whoami::run_whoami()?,
        Commands::Guest => commands::guest::run_guest()?,
        Commands::Logout => commands::logout::run_logout()?,
    }

    Ok(())
}
