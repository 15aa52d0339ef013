//! medsource CLI: sourced answers about medication side effects.
//!
//! Combines a structured FAERS-style SQLite table with side-effect lists
//! extracted from publisher web pages, then asks a language model for an
//! answer that cites where each side effect came from.

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
