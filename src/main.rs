mod charts;
mod cli;
mod error;
mod models;
mod source;
mod transform;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting cidash - CI build metrics derivation");
    cli.execute().await?;

    Ok(())
}
