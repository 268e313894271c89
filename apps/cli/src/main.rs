//! doccrawl CLI: combine GitHub and sitemap documentation into Markdown.
//!
//! Reads knowledge files naming GitHub contents API roots or a sitemap URL,
//! crawls them one request at a time, and writes one `docs.md` per set.

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
