//! Settings CLI commands

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use crate::storage::Settings;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective settings
    Show,

    /// Print the per-user settings file location
    Path,

    /// Write the default settings to the per-user settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(cmd: ConfigCommands, explicit: Option<&Path>, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(explicit, output),
        ConfigCommands::Path => path(output),
        ConfigCommands::Init { force } => init(explicit, force, output),
    }
}

fn show(explicit: Option<&Path>, output: &Output) -> Result<()> {
    let settings = Settings::load(explicit)?;

    if output.is_json() {
        output.data(&settings);
    } else {
        print!("{}", settings.to_toml()?);
    }
    Ok(())
}

fn path(output: &Output) -> Result<()> {
    let path = Settings::user_config_path().context("No configuration directory found")?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.is_file(),
        }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

fn init(explicit: Option<&Path>, force: bool, output: &Output) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Settings::user_config_path().context("No configuration directory found")?,
    };

    if path.exists() && !force {
        output.success(&format!("Settings already exist at {}", path.display()));
        return Ok(());
    }

    Settings::default().save(&path)?;
    output.success(&format!("Settings written to {}", path.display()));
    Ok(())
}
