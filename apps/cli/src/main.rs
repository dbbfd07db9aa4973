//! rankpages CLI: turn a ranking table into chat-augmented markdown pages.
//!
//! Scrapes one HTML table, asks a chat-completions service a fixed set of
//! questions about every row and writes one static-site page per row.

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
