mod burrow;
mod login;
mod provider;
mod watch;

use clap::{Parser, Subcommand};

use crate::{
    cli::{burrow::BurrowArgs, login::LoginArgs, watch::WatchArgs},
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub async fn run(self) -> Result {
        match self.command {
            Command::Login(args) => args.run().await,
            Command::Watch(args) => args.run().await,
            Command::Burrow(args) => args.run().await,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Log in to Budget Thuis and store the credentials.
    #[clap(name = "login")]
    Login(LoginArgs),

    /// Main command: keep the tariff sensors up to date.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(BurrowArgs),
}
