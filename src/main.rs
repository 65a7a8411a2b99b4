//! # pom-sync CLI
//!
//! This is the binary entry point for the `pom-sync` command-line tool.
//!
//! Its responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging.
//! - Running the sync and translating errors into a non-zero exit.
//!
//! The core logic lives in the library crate; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
