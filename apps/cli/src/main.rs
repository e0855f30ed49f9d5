//! rosterbook CLI — local duty-roster ingestion tool.
//!
//! Imports crew duty booklets (extracted stream text) and station seed
//! files into a local database, and reports per-series duty statistics.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
