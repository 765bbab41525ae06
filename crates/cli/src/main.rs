//! Testpilot CLI - Main Entry Point

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use testpilot_cli::commands::{config, plan, run};
use testpilot_cli::output::OutputFormat;
use testpilot_e2e::TestpilotConfig;

/// Testpilot - plan and run browser end-to-end tests from plain instructions
#[derive(Parser)]
#[command(name = "testpilot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML); defaults apply when it does not exist
    #[arg(long, default_value = "testpilot.toml", global = true, env = "TESTPILOT_CONFIG")]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the plan an instruction produces, without running it
    Plan(plan::PlanArgs),

    /// Plan and run an instruction (or a scenario file) in a real browser
    Run(run::RunArgs),

    /// Inspect or initialise configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = TestpilotConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    settings.apply_env_overrides()?;

    match cli.command {
        Commands::Plan(args) => plan::execute(args, &settings, cli.format)?,
        Commands::Config(cmd) => config::execute(cmd, &settings, &cli.config, cli.format)?,
        Commands::Run(args) => {
            let passed = run::execute(args, settings, cli.format).await?;
            if !passed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_requires_instruction_or_scenarios() {
        assert!(Cli::try_parse_from(["testpilot", "run"]).is_err());
        assert!(Cli::try_parse_from(["testpilot", "run", "login"]).is_ok());
        assert!(Cli::try_parse_from(["testpilot", "run", "--scenarios", "s.yaml"]).is_ok());
        assert!(Cli::try_parse_from(["testpilot", "run", "login", "--scenarios", "s.yaml"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["testpilot", "plan", "login", "--format", "json", "-v"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
    }
}
