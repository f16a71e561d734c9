//! ReleaseQA CLI: turn Python release factsheets into chat fine-tuning data.
//!
//! Reads factsheet JSON Lines, synthesizes question/answer pairs grounded in
//! the release notes, and writes chat-format training entries.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
