//! Test runner that ties planning, execution and reporting together

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::TestpilotConfig;
use crate::error::E2eResult;
use crate::executor::{Executor, ExecutorConfig};
use crate::planner::{Planner, StepProducer};
use crate::report::{JsonReportSink, ReportSink};
use crate::reporter::{Reporter, RunSummary, ScenarioResult};
use crate::resolve::VariableSource;
use crate::scenario::Scenario;
use crate::step::Plan;
use crate::surface::AutomationSurface;

/// Result of running a single plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub plan: Plan,
    pub scenario: ScenarioResult,
    pub summary: RunSummary,
}

/// Runs plans and scenarios against a caller-owned automation surface
pub struct TestRunner {
    planner: Planner,
    executor: Executor,
    sink: Option<Arc<dyn ReportSink>>,
}

impl TestRunner {
    /// Rule-based planner, environment placeholders, JSON reports
    pub fn new(config: TestpilotConfig) -> Self {
        Self::with_parts(
            Planner::rule_based(config.planner),
            Executor::new(config.executor),
            Some(Arc::new(JsonReportSink::new(config.report))),
        )
    }

    pub fn with_parts(
        planner: Planner,
        executor: Executor,
        sink: Option<Arc<dyn ReportSink>>,
    ) -> Self {
        Self {
            planner,
            executor,
            sink,
        }
    }

    /// Swap in a different plan producer, keeping everything else.
    pub fn with_producer(mut self, producer: Arc<dyn StepProducer>) -> Self {
        self.planner = Planner::new(producer);
        self
    }

    /// Swap the placeholder variable source, keeping executor settings.
    pub fn with_variables(mut self, variables: Arc<dyn VariableSource>) -> Self {
        self.executor = Executor::with_variables(self.executor.config().clone(), variables);
        self
    }

    pub fn without_reports(mut self) -> Self {
        self.sink = None;
        self
    }

    pub fn plan(&self, instruction: &str) -> Plan {
        self.planner.create_plan(instruction)
    }

    /// Plan `instruction` and run it.
    pub async fn run_instruction<S>(&self, instruction: &str, surface: &mut S) -> E2eResult<RunOutcome>
    where
        S: AutomationSurface + ?Sized,
    {
        let plan = self.plan(instruction);
        self.run_plan(&plan, surface).await
    }

    /// Execute a plan and reduce it to one scenario and one summary.
    pub async fn run_plan<S>(&self, plan: &Plan, surface: &mut S) -> E2eResult<RunOutcome>
    where
        S: AutomationSurface + ?Sized,
    {
        info!("Running plan: {}", plan.instruction);

        let start = Utc::now();
        let step_results = self.executor.execute_plan(&plan.steps, surface).await?;
        let end = Utc::now();

        let scenario = Reporter::build_scenario_result(plan, step_results, start, end);
        log_scenario(&scenario);
        let summary = Reporter::build_summary(vec![scenario.clone()]);

        Ok(RunOutcome {
            plan: plan.clone(),
            scenario,
            summary,
        })
    }

    /// Run scenarios one after another on the same surface.
    pub async fn run_scenarios<S>(&self, scenarios: &[Scenario], surface: &mut S) -> E2eResult<RunSummary>
    where
        S: AutomationSurface + ?Sized,
    {
        info!("Running {} scenario(s)...", scenarios.len());

        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let start = Utc::now();
            let step_results = self.executor.execute_plan(&scenario.steps, surface).await?;
            let end = Utc::now();

            let result = Reporter::build_scenario_result_for(scenario, step_results, start, end);
            log_scenario(&result);
            results.push(result);
        }

        let summary = Reporter::build_summary(results);
        info!(
            "Test Results: {} passed, {} failed ({:.2} s)",
            summary.passed, summary.failed, summary.duration
        );
        Ok(summary)
    }

    /// Hand the summary to the report sink, if one is configured.
    pub fn write_report(&self, summary: &RunSummary) -> E2eResult<Option<PathBuf>> {
        match &self.sink {
            Some(sink) => sink.write(summary).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::with_parts(Planner::default(), Executor::new(ExecutorConfig::default()), None)
    }
}

fn log_scenario(scenario: &ScenarioResult) {
    if scenario.passed() {
        info!("✓ {} ({:.2} s)", scenario.name, scenario.duration);
    } else {
        error!(
            "✗ {} - {}",
            scenario.name,
            scenario.error_message.as_deref().unwrap_or("unknown error")
        );
    }
}
