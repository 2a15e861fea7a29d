pub mod auth;
pub mod run;

use clap::Subcommand;

use crate::Cli;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in the user session used to read restricted channels
    Auth(auth::AuthArgs),
    /// Start the bot
    Run(run::RunArgs),
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Auth(args) => auth::run(&cli, args).await,
        Command::Run(args) => run::run(&cli, args).await,
    }
}
