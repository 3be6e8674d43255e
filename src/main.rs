#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod auth;
mod cli;
mod coordinator;
mod core;
mod entry;
mod prelude;
mod sensor;
mod tables;
mod task;

use clap::{Parser, crate_version};

use crate::{cli::Args, prelude::*};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    Args::parse().run().await?;

    info!("done!");
    Ok(())
}
