//! CLI argument parsing and dispatch

use anyhow::Result;
use clap::Parser;

use crate::commands;

/// Sync a Maven pom.xml with canonical GitHub repository metadata
#[derive(Parser, Debug)]
#[command(name = "pom-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    sync: commands::sync::SyncArgs,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.log_level),
        )
        .init();

        commands::sync::execute(self.sync)
    }
}
