//! Folio CLI: serve a directory through the source → open → render pipeline.
//!
//! Wires the built-in directory sourcer, passthrough renderer, and logging
//! error handler to a small HTTP/1.1 listener.

mod commands;
mod http;

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
