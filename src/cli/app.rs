//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::config_cmd::{self, ConfigCommands};
use super::output::{Output, OutputFormat};
use super::{convert, inspect};
use crate::storage::Settings;

#[derive(Parser)]
#[command(name = "mm2nw")]
#[command(author, version, about = "Convert FreeMind mindmaps into novelWriter projects")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Settings file (defaults to the per-user config file)
    #[arg(long, short = 'c', global = true, env = "MM2NW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a mindmap into a novelWriter project next to it
    Convert {
        /// FreeMind file (.mm)
        source: PathBuf,

        /// Do not print the success message
        #[arg(long, short)]
        silent: bool,
    },

    /// Read a novelWriter project and show its outline
    Inspect {
        /// Project directory, or its nwProject.nwx
        project: PathBuf,
    },

    /// Show or create the settings file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Main entry point for the CLI
///
/// Prints one terminal line on failure, prefixed with `FAIL:`.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    match execute(cli, &output) {
        Ok(()) => {
            output.verbose("Command completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            output.failure(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli, output: &Output) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Convert { source, silent } => {
            let settings = Settings::load(config)?;
            output.verbose_ctx("convert", &format!("Converting {}", source.display()));
            convert::run(&source, silent, &settings, output)
        }

        Commands::Inspect { project } => {
            let settings = Settings::load(config)?;
            inspect::run(&project, &settings, output)
        }

        Commands::Config(cmd) => config_cmd::run(cmd, config, output),
    }
}
