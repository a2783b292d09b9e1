mod assemble;
mod cache;
mod cli;
mod config;
mod error;
mod evaluation;
mod output;
mod providers;
mod report;
mod results;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use env_logger::Env;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting cireport - Buildbot CI package report");
    cli.execute().await?;

    Ok(())
}
