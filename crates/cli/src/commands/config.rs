//! Config Commands

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::path::Path;

use testpilot_e2e::TestpilotConfig;

use crate::output::{print_success, print_value, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (file plus environment overrides)
    Show,

    /// Write the default configuration to the config path
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn execute(
    cmd: ConfigCommands,
    config: &TestpilotConfig,
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        ConfigCommands::Show => match format {
            OutputFormat::Json | OutputFormat::Yaml => print_value(config, format)?,
            OutputFormat::Table | OutputFormat::Plain => print!("{}", config.to_toml()?),
        },

        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let text = TestpilotConfig::default().to_toml()?;
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!("Wrote default configuration to {}", path.display()));
        }
    }
    Ok(())
}
