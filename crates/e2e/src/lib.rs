//! Testpilot E2E pipeline
//!
//! Turns a plain instruction into a structured plan, drives a browser
//! automation surface through it step by step, and reduces the outcomes into
//! scenario and run summaries.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         TestRunner                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Planner (StepProducer)                                     │
//! │    └── create_plan(instruction) -> Plan                     │
//! │  Executor                                                   │
//! │    └── execute_plan(steps, &mut dyn AutomationSurface)      │
//! │          -> Vec<StepResult>                                 │
//! │  Reporter                                                   │
//! │    ├── build_scenario_result(plan, results, start, end)     │
//! │    └── build_summary(scenarios) -> RunSummary               │
//! │  ReportSink                                                 │
//! │    └── write(&RunSummary) -> PathBuf                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AutomationSurface                                          │
//! │    ├── PlaywrightSurface (node driver over stdio)           │
//! │    └── MockSurface (in memory)                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod mock;
pub mod planner;
pub mod playwright;
pub mod report;
pub mod reporter;
pub mod resolve;
pub mod runner;
pub mod scenario;
pub mod step;
pub mod surface;

pub use config::TestpilotConfig;
pub use error::{E2eError, E2eResult, SurfaceError, SurfaceResult};
pub use executor::{Executor, ExecutorConfig, FailurePolicy};
pub use planner::{Planner, PlannerConfig, RuleBasedPlanner, StepProducer};
pub use reporter::{Reporter, RunSummary, ScenarioResult, ScenarioStatus};
pub use runner::{RunOutcome, TestRunner};
pub use scenario::Scenario;
pub use step::{ActionKind, Plan, Step, StepResult, StepStatus};
pub use surface::AutomationSurface;
