//! Reduction of step results into scenario results and run summaries
//!
//! Everything here is pure: no I/O, no clocks. Callers supply the start and
//! end times of a scenario.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::scenario::Scenario;
use crate::step::{Plan, StepResult};

pub const PLAN_SCENARIO_DESCRIPTION: &str =
    "Structured plan produced by the planner and executed by the actor";

/// Pass/fail status of a whole scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStatus::Passed => f.write_str("passed"),
            ScenarioStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Outcome of one plan or scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub description: String,
    pub status: ScenarioStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds between `start_time` and `end_time`
    pub duration: f64,
    pub steps: Vec<StepResult>,
    /// Message of the first failed step
    pub error_message: Option<String>,
    pub screenshots: Vec<PathBuf>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// Aggregate over one or more scenarios
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Sum of scenario durations, in seconds
    pub duration: f64,
    pub scenarios: Vec<ScenarioResult>,
}

impl RunSummary {
    /// Append more scenarios. Equivalent to summarizing the concatenation.
    pub fn extend<I>(mut self, scenarios: I) -> Self
    where
        I: IntoIterator<Item = ScenarioResult>,
    {
        for scenario in scenarios {
            self.push(scenario);
        }
        self
    }

    fn push(&mut self, scenario: ScenarioResult) {
        self.total += 1;
        match scenario.status {
            ScenarioStatus::Passed => self.passed += 1,
            ScenarioStatus::Failed => self.failed += 1,
        }
        self.duration += scenario.duration;
        self.scenarios.push(scenario);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Builds scenario results and run summaries
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter;

impl Reporter {
    /// Reduce the results of one plan.
    pub fn build_scenario_result(
        plan: &Plan,
        step_results: Vec<StepResult>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ScenarioResult {
        reduce(
            format!("Plan: {}", plan.instruction),
            PLAN_SCENARIO_DESCRIPTION.to_string(),
            step_results,
            start,
            end,
        )
    }

    /// Reduce the results of a named scenario.
    pub fn build_scenario_result_for(
        scenario: &Scenario,
        step_results: Vec<StepResult>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ScenarioResult {
        reduce(
            scenario.name.clone(),
            scenario.description.clone(),
            step_results,
            start,
            end,
        )
    }

    pub fn build_summary(scenarios: Vec<ScenarioResult>) -> RunSummary {
        RunSummary::default().extend(scenarios)
    }
}

fn reduce(
    name: String,
    description: String,
    steps: Vec<StepResult>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ScenarioResult {
    let error_message = steps
        .iter()
        .find(|s| s.is_failed())
        .map(|s| s.message.clone());
    let status = if error_message.is_some() {
        ScenarioStatus::Failed
    } else {
        ScenarioStatus::Passed
    };
    let screenshots = steps
        .iter()
        .filter_map(|s| s.screenshot.clone())
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    let duration = (end - start)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    ScenarioResult {
        name,
        description,
        status,
        start_time: start,
        end_time: end,
        duration,
        steps,
        error_message,
        screenshots,
    }
}
