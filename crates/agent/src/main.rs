#![forbid(unsafe_code)]

mod cli;
mod commands;
mod signals;
mod startup;

use anyhow::Result;

use cli::{Command, ReplayArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();

    match cli.command {
        Some(Command::Version) => {
            commands::cmd_version();
            Ok(())
        }

        Some(Command::CheckConfig) => {
            let config = startup::load_config(&cli)?;
            commands::cmd_check_config(&config, cli.output)
        }

        Some(Command::Replay(args)) => startup::run(&cli, args, false).await,

        Some(Command::Run(args)) => startup::run(&cli, args, true).await,

        // No subcommand = loop the baseline capture until shutdown
        None => startup::run(&cli, ReplayArgs::default(), true).await,
    }
}
