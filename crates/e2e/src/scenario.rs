//! Named step sequences

use serde::{Deserialize, Serialize};

use crate::step::{Plan, Step};

/// A named, described step sequence
///
/// Scenarios are plain data. Running one goes through the same executor as a
/// plan, and its results are reduced by
/// [`Reporter::build_scenario_result_for`](crate::reporter::Reporter::build_scenario_result_for).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, description: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            steps,
        }
    }

    /// Wrap a plan, naming the scenario after its instruction.
    pub fn from_plan(plan: &Plan, description: impl Into<String>) -> Self {
        Self::new(plan.instruction.clone(), description, plan.steps.clone())
    }
}
