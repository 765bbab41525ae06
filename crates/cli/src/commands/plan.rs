//! Plan Command

use anyhow::Result;
use clap::Args;

use testpilot_e2e::{Planner, TestpilotConfig};

use crate::output::{print_info, print_list, print_value, OutputFormat};

#[derive(Args)]
pub struct PlanArgs {
    /// Natural-language test instruction
    pub instruction: String,
}

pub fn execute(args: PlanArgs, config: &TestpilotConfig, format: OutputFormat) -> Result<()> {
    let plan = Planner::rule_based(config.planner.clone()).create_plan(&args.instruction);

    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_value(&plan, format)?,
        OutputFormat::Table | OutputFormat::Plain => {
            print_info(&format!("Plan for: {}", plan.instruction));
            print_list(&plan.steps, format)?;
        }
    }
    Ok(())
}
