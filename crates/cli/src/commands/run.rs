//! Run Command
//!
//! Launches a Playwright-backed browser, runs either one planned instruction
//! or a file of scenarios against it, and prints the results.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use testpilot_e2e::playwright::PlaywrightSurface;
use testpilot_e2e::{RunSummary, Scenario, TestRunner, TestpilotConfig};

use crate::output::{print_info, print_summary, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Natural-language test instruction
    #[arg(required_unless_present = "scenarios", conflicts_with = "scenarios")]
    pub instruction: Option<String>,

    /// Run the scenarios listed in a YAML or TOML file instead
    #[arg(long, value_name = "FILE")]
    pub scenarios: Option<PathBuf>,

    /// Do not write a JSON report
    #[arg(long)]
    pub no_report: bool,
}

/// Scenario file layout: a top-level `scenario` list
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(rename = "scenario", default)]
    scenarios: Vec<Scenario>,
}

fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file: ScenarioFile = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
        Some("toml") => toml::from_str(&text)?,
        _ => bail!(
            "Unsupported scenario file {} (expected .yaml, .yml or .toml)",
            path.display()
        ),
    };

    if file.scenarios.is_empty() {
        bail!("{} defines no scenarios", path.display());
    }
    Ok(file.scenarios)
}

async fn run_on(
    runner: &TestRunner,
    scenarios: Option<&[Scenario]>,
    instruction: Option<&str>,
    surface: &mut PlaywrightSurface,
) -> Result<RunSummary> {
    match (scenarios, instruction) {
        (Some(scenarios), _) => Ok(runner.run_scenarios(scenarios, surface).await?),
        (None, Some(instruction)) => Ok(runner.run_instruction(instruction, surface).await?.summary),
        (None, None) => bail!("Nothing to run: pass an instruction or --scenarios"),
    }
}

/// Returns whether every scenario passed.
pub async fn execute(args: RunArgs, config: TestpilotConfig, format: OutputFormat) -> Result<bool> {
    let scenarios = args.scenarios.as_deref().map(load_scenarios).transpose()?;

    let mut runner = TestRunner::new(config.clone());
    if args.no_report {
        runner = runner.without_reports();
    }

    let mut surface = PlaywrightSurface::launch(config.playwright.clone())
        .await
        .context("Failed to launch browser")?;

    let outcome = run_on(&runner, scenarios.as_deref(), args.instruction.as_deref(), &mut surface).await;

    // The browser goes away whether or not the run succeeded.
    if let Err(e) = surface.close().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }
    let summary = outcome?;

    print_summary(&summary, format)?;

    if let Some(path) = runner.write_report(&summary)? {
        if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
            print_info(&format!("Report: {}", path.display()));
        }
    }

    info!(passed = summary.passed, failed = summary.failed, "Run finished");
    Ok(summary.all_passed())
}
