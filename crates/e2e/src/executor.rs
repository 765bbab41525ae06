//! Step execution engine
//!
//! Runs every step of a plan against an [`AutomationSurface`], in order, one
//! at a time. A failing step is recorded and execution moves on; only plan
//! bookkeeping problems (bad ids, unusable screenshot directory) abort the
//! run, and then no results are returned at all. The screenshot directory
//! is only created when the plan or the configuration can take a screenshot.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{E2eResult, SurfaceError};
use crate::resolve::{resolve_placeholder, EnvVariables, VariableSource};
use crate::step::{validate_steps, ActionKind, Step, StepResult, StepStatus};
use crate::surface::AutomationSurface;

/// Extra time granted on top of a bounded action before the executor gives
/// up on the surface itself.
const SURFACE_GRACE: Duration = Duration::from_secs(2);

/// What to do with the remaining steps once one has failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep executing every remaining step
    #[default]
    Continue,
    /// Record every step after the first failure as skipped
    StopOnFirstFailure,
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Bound for click, fill, wait_for_text and wait_for_selector
    pub wait_timeout_ms: u64,

    /// Capture a diagnostic screenshot when a step fails
    pub screenshot_on_failure: bool,

    /// Capture a screenshot after every passed step
    pub screenshot_on_success: bool,

    /// Additional attempts for a failed bounded action (click, fill, upload
    /// and the two waits)
    pub retry_count: u32,

    pub failure_policy: FailurePolicy,

    /// Directory for all screenshots
    pub screenshot_dir: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 5000,
            screenshot_on_failure: true,
            screenshot_on_success: false,
            retry_count: 0,
            failure_policy: FailurePolicy::Continue,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
        }
    }
}

impl ExecutorConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

/// Why a single step failed. Never leaves the executor; it becomes the
/// step result's message.
#[derive(Debug, Error)]
enum StepError {
    #[error("Timeout: {action} -> {target}")]
    Timeout { action: String, target: String },

    #[error("Upload file not found: {0}")]
    FileNotFound(String),

    #[error("Error: {0}")]
    Surface(SurfaceError),
}

impl StepError {
    fn from_surface(err: SurfaceError, step: &Step) -> Self {
        if err.is_timeout() {
            StepError::Timeout {
                action: step.action.to_string(),
                target: step.target.clone(),
            }
        } else {
            StepError::Surface(err)
        }
    }

    fn is_retryable(&self) -> bool {
        !matches!(self, StepError::FileNotFound(_))
    }
}

/// Outcome of dispatching a step before diagnostics are attached
enum Dispatched {
    Done {
        message: String,
        screenshot: Option<PathBuf>,
    },
    Skipped(String),
}

/// Executes plans against a borrowed automation surface
#[derive(Clone)]
pub struct Executor {
    config: ExecutorConfig,
    variables: Arc<dyn VariableSource>,
}

impl Executor {
    /// Executor resolving placeholders from the process environment
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_variables(config, Arc::new(EnvVariables))
    }

    pub fn with_variables(config: ExecutorConfig, variables: Arc<dyn VariableSource>) -> Self {
        Self { config, variables }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `steps` in order and return one result per step.
    pub async fn execute_plan<S>(&self, steps: &[Step], surface: &mut S) -> E2eResult<Vec<StepResult>>
    where
        S: AutomationSurface + ?Sized,
    {
        validate_steps(steps)?;
        if self.may_capture(steps) {
            std::fs::create_dir_all(&self.config.screenshot_dir)?;
        }

        info!("Executing {} step(s)", steps.len());

        let mut results = Vec::with_capacity(steps.len());
        let mut first_failure: Option<u32> = None;

        for step in steps {
            if let (Some(failed_id), FailurePolicy::StopOnFirstFailure) =
                (first_failure, self.config.failure_policy)
            {
                results.push(StepResult::for_step(
                    step,
                    StepStatus::Skipped,
                    format!("Skipped: step {} failed", failed_id),
                    None,
                    0.0,
                ));
                continue;
            }

            let result = self.execute_step(step, surface).await;
            match result.status {
                StepStatus::Passed => debug!(step_id = step.id, action = %step.action, "Step passed"),
                StepStatus::Skipped => debug!(step_id = step.id, action = %step.action, "Step skipped"),
                StepStatus::Failed => {
                    warn!(step_id = step.id, action = %step.action, "Step failed: {}", result.message);
                    first_failure.get_or_insert(step.id);
                }
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Execute a single step. Never fails; the outcome is in the result.
    pub async fn execute_step<S>(&self, step: &Step, surface: &mut S) -> StepResult
    where
        S: AutomationSurface + ?Sized,
    {
        let started = Instant::now();
        debug!(step_id = step.id, action = %step.action, target = %step.target, "Executing step");

        let outcome = self.dispatch_with_retry(step, surface).await;
        let duration = started.elapsed().as_secs_f64();

        match outcome {
            Ok(Dispatched::Done { message, mut screenshot }) => {
                if self.config.screenshot_on_success && screenshot.is_none() {
                    screenshot = self.capture_diagnostic(surface, &format!("step_{}", step.id)).await;
                }
                StepResult::for_step(step, StepStatus::Passed, message, screenshot, duration)
            }
            Ok(Dispatched::Skipped(message)) => {
                StepResult::for_step(step, StepStatus::Skipped, message, None, duration)
            }
            Err(err) => {
                // A failing screenshot step never produced its file, so the
                // diagnostic capture still applies.
                let screenshot = if self.config.screenshot_on_failure {
                    self.capture_diagnostic(surface, &format!("error_step_{}", step.id)).await
                } else {
                    None
                };
                StepResult::for_step(step, StepStatus::Failed, err.to_string(), screenshot, duration)
            }
        }
    }

    async fn dispatch_with_retry<S>(&self, step: &Step, surface: &mut S) -> Result<Dispatched, StepError>
    where
        S: AutomationSurface + ?Sized,
    {
        let mut attempt = 0;
        loop {
            match self.dispatch(step, surface).await {
                Err(err)
                    if step.action.is_bounded()
                        && err.is_retryable()
                        && attempt < self.config.retry_count =>
                {
                    attempt += 1;
                    debug!(step_id = step.id, attempt, "Retrying step after: {}", err);
                }
                other => return other,
            }
        }
    }

    async fn dispatch<S>(&self, step: &Step, surface: &mut S) -> Result<Dispatched, StepError>
    where
        S: AutomationSurface + ?Sized,
    {
        let target = step.target.as_str();
        let wait = self.config.wait_timeout();

        let message = match &step.action {
            ActionKind::Goto => {
                surface
                    .navigate(target, None)
                    .await
                    .map_err(|e| StepError::from_surface(e, step))?;
                "Navigation succeeded".to_string()
            }
            ActionKind::Click => {
                self.bounded(step, surface.click(target, Some(wait))).await?;
                format!("Clicked {}", target)
            }
            ActionKind::Fill => {
                let resolved = resolve_placeholder(&step.value, self.variables.as_ref());
                self.bounded(step, surface.fill(target, &resolved, Some(wait))).await?;
                "Input filled".to_string()
            }
            ActionKind::Upload => {
                let path = Path::new(&step.value);
                if !path.exists() {
                    return Err(StepError::FileNotFound(path.display().to_string()));
                }
                let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                self.bounded(step, surface.set_input_files(target, &absolute, Some(wait)))
                    .await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| step.value.clone());
                format!("Uploaded {}", name)
            }
            ActionKind::WaitForText => {
                self.bounded(step, surface.wait_for_text(target, Some(wait))).await?;
                format!("Found text: {}", target)
            }
            ActionKind::WaitForSelector => {
                self.bounded(step, surface.wait_for_selector(target, Some(wait))).await?;
                format!("Found element: {}", target)
            }
            ActionKind::Screenshot => {
                let label = if target.is_empty() { "step" } else { target };
                let path = self.screenshot_path(label);
                surface
                    .screenshot(&path)
                    .await
                    .map_err(|e| StepError::from_surface(e, step))?;
                let message = format!("Screenshot saved: {}", path.display());
                return Ok(Dispatched::Done {
                    message,
                    screenshot: Some(path),
                });
            }
            ActionKind::Other(name) => {
                return Ok(Dispatched::Skipped(format!("Unknown action: {}", name)));
            }
        };

        Ok(Dispatched::Done {
            message,
            screenshot: None,
        })
    }

    /// Await a bounded surface call, giving up shortly after the wait timeout
    /// even if the surface does not enforce it.
    async fn bounded<F>(&self, step: &Step, call: F) -> Result<(), StepError>
    where
        F: std::future::Future<Output = Result<(), SurfaceError>>,
    {
        match tokio::time::timeout(self.config.wait_timeout() + SURFACE_GRACE, call).await {
            Ok(result) => result.map_err(|e| StepError::from_surface(e, step)),
            Err(_) => Err(StepError::Timeout {
                action: step.action.to_string(),
                target: step.target.clone(),
            }),
        }
    }

    fn may_capture(&self, steps: &[Step]) -> bool {
        self.config.screenshot_on_failure
            || self.config.screenshot_on_success
            || steps.iter().any(|s| s.action == ActionKind::Screenshot)
    }

    async fn capture_diagnostic<S>(&self, surface: &mut S, label: &str) -> Option<PathBuf>
    where
        S: AutomationSurface + ?Sized,
    {
        let path = self.screenshot_path(label);
        match surface.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Diagnostic screenshot '{}' failed: {}", label, e);
                None
            }
        }
    }

    /// `{screenshot_dir}/{label}_{yyyyMMdd_HHmmss}.png`
    fn screenshot_path(&self, label: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.config
            .screenshot_dir
            .join(format!("{}_{}.png", label, stamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::E2eError;
    use crate::mock::{MockSurface, SurfaceCall};
    use crate::resolve::MapVariables;

    fn config(dir: &Path) -> ExecutorConfig {
        ExecutorConfig {
            screenshot_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fill_resolves_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let vars = MapVariables::new().with("TEST_USERNAME", "alice");
        let executor = Executor::with_variables(config(dir.path()), Arc::new(vars));
        let mut surface = MockSurface::new();

        let step = Step::new(1, ActionKind::Fill, "#user").with_value("{{TEST_USERNAME}}");
        let result = executor.execute_step(&step, &mut surface).await;

        assert_eq!(result.status, StepStatus::Passed);
        assert_eq!(
            surface.calls(),
            &[SurfaceCall::Fill {
                selector: "#user".into(),
                value: "alice".into()
            }]
        );
        // the raw placeholder is what gets reported
        assert_eq!(result.value, "{{TEST_USERNAME}}");
    }

    #[tokio::test]
    async fn test_unset_placeholder_fills_empty() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::with_variables(config(dir.path()), Arc::new(MapVariables::new()));
        let mut surface = MockSurface::new();

        let step = Step::new(1, ActionKind::Fill, "#pw").with_value("{{TEST_PASSWORD}}");
        executor.execute_step(&step, &mut surface).await;

        assert_eq!(
            surface.calls(),
            &[SurfaceCall::Fill {
                selector: "#pw".into(),
                value: String::new()
            }]
        );
    }

    #[tokio::test]
    async fn test_timeout_message_names_action_and_target() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(ExecutorConfig {
            screenshot_on_failure: false,
            ..config(dir.path())
        });
        let mut surface = MockSurface::new().fail_on("#missing", SurfaceError::Timeout("5000ms".into()));

        let step = Step::new(4, ActionKind::Click, "#missing");
        let result = executor.execute_step(&step, &mut surface).await;

        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.message, "Timeout: click -> #missing");
        assert!(result.screenshot.is_none());
    }

    #[tokio::test]
    async fn test_other_error_keeps_description() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(config(dir.path()));
        let mut surface =
            MockSurface::new().fail_on("#bad", SurfaceError::Action("strict mode violation".into()));

        let result = executor
            .execute_step(&Step::new(1, ActionKind::WaitForSelector, "#bad"), &mut surface)
            .await;

        assert_eq!(result.status, StepStatus::Failed);
        assert!(result.message.contains("strict mode violation"));
        let shot = result.screenshot.expect("failure screenshot");
        assert!(shot
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("error_step_1_"));
    }

    #[tokio::test]
    async fn test_missing_upload_fails_before_surface_call() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(ExecutorConfig {
            screenshot_on_failure: false,
            ..config(dir.path())
        });
        let mut surface = MockSurface::new();

        let missing = dir.path().join("nope.pdf");
        let step = Step::new(1, ActionKind::Upload, "input[type='file']")
            .with_value(missing.to_string_lossy());
        let result = executor.execute_step(&step, &mut surface).await;

        assert_eq!(result.status, StepStatus::Failed);
        assert!(result.message.contains("not found"));
        assert!(surface.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sample.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();

        let executor = Executor::new(config(dir.path()));
        let mut surface = MockSurface::new();
        let step = Step::new(1, ActionKind::Upload, "input[type='file']")
            .with_value(file.to_string_lossy());
        let result = executor.execute_step(&step, &mut surface).await;

        assert_eq!(result.status, StepStatus::Passed);
        assert_eq!(result.message, "Uploaded sample.pdf");
        assert_eq!(
            surface.calls(),
            &[SurfaceCall::SetInputFiles {
                selector: "input[type='file']".into(),
                path: file.canonicalize().unwrap()
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_action_is_skipped_without_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(config(dir.path()));
        let mut surface = MockSurface::new();

        let result = executor
            .execute_step(&Step::new(1, "hover", "#menu").with_value("x"), &mut surface)
            .await;

        assert_eq!(result.status, StepStatus::Skipped);
        assert_eq!(result.message, "Unknown action: hover");
        assert!(result.screenshot.is_none());
        assert!(surface.calls().is_empty());
    }

    #[tokio::test]
    async fn test_screenshot_path_format() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(config(dir.path()));
        let mut surface = MockSurface::new();

        let result = executor
            .execute_step(&Step::new(1, ActionKind::Screenshot, "after_login"), &mut surface)
            .await;

        let path = result.screenshot.expect("screenshot path");
        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        // after_login_yyyyMMdd_HHmmss.png
        assert!(name.starts_with("after_login_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "after_login_".len() + 15 + ".png".len());
    }

    #[tokio::test]
    async fn test_retry_recovers_flaky_step() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(ExecutorConfig {
            retry_count: 1,
            ..config(dir.path())
        });
        let mut surface = MockSurface::new()
            .fail_on("#flaky", SurfaceError::Timeout("once".into()))
            .fail_times(1);

        let result = executor
            .execute_step(&Step::new(1, ActionKind::Click, "#flaky"), &mut surface)
            .await;

        assert_eq!(result.status, StepStatus::Passed);
        assert_eq!(surface.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_goto_does_not_retry() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(ExecutorConfig {
            retry_count: 2,
            screenshot_on_failure: false,
            ..config(dir.path())
        });
        let mut surface = MockSurface::new()
            .fail_on("https://example.com", SurfaceError::Action("net::ERR_ABORTED".into()))
            .fail_times(1);

        let result = executor
            .execute_step(&Step::new(1, ActionKind::Goto, "https://example.com"), &mut surface)
            .await;

        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(surface.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_wait_timeout_reaches_bounded_actions_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sample.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();

        let executor = Executor::new(ExecutorConfig {
            wait_timeout_ms: 1500,
            ..config(dir.path())
        });
        let mut surface = MockSurface::new();
        let steps = vec![
            Step::new(1, ActionKind::Goto, "https://example.com"),
            Step::new(2, ActionKind::Click, "#a"),
            Step::new(3, ActionKind::Fill, "#b").with_value("x"),
            Step::new(4, ActionKind::Upload, "input[type='file']").with_value(file.to_string_lossy()),
            Step::new(5, ActionKind::WaitForText, "done"),
            Step::new(6, ActionKind::WaitForSelector, "main"),
            Step::new(7, ActionKind::Screenshot, "end"),
        ];

        let results = executor.execute_plan(&steps, &mut surface).await.unwrap();
        assert!(results.iter().all(|r| r.status == StepStatus::Passed));

        let wait = Some(Duration::from_millis(1500));
        assert_eq!(
            surface.timeouts(),
            &[None, wait, wait, wait, wait, wait, None]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_surface_call_times_out_and_plan_continues() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(ExecutorConfig {
            screenshot_on_failure: false,
            ..config(dir.path())
        });
        let mut surface = MockSurface::new().hang_on("#x");
        let steps = vec![
            Step::new(1, ActionKind::Click, "#x"),
            Step::new(2, ActionKind::Click, "#y"),
        ];

        let results = executor.execute_plan(&steps, &mut surface).await.unwrap();

        assert_eq!(results[0].status, StepStatus::Failed);
        assert_eq!(results[0].message, "Timeout: click -> #x");
        assert_eq!(results[1].status, StepStatus::Passed);
    }

    #[tokio::test]
    async fn test_screenshot_dir_only_needed_when_capturing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let executor = Executor::new(ExecutorConfig {
            screenshot_on_failure: false,
            screenshot_dir: blocker.join("shots"),
            ..Default::default()
        });
        let mut surface = MockSurface::new();

        let results = executor
            .execute_plan(&[Step::new(1, ActionKind::Click, "#a")], &mut surface)
            .await
            .unwrap();
        assert_eq!(results[0].status, StepStatus::Passed);

        let err = executor
            .execute_plan(&[Step::new(1, ActionKind::Screenshot, "end")], &mut surface)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::Io(_)));
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(config(dir.path()));
        let mut surface = MockSurface::new();
        let steps = vec![Step::new(1, "goto", "/"), Step::new(1, "click", "a")];

        let err = executor.execute_plan(&steps, &mut surface).await.unwrap_err();
        assert!(matches!(err, E2eError::InvalidPlan(_)));
        assert!(surface.calls().is_empty());
    }

    #[tokio::test]
    async fn test_screenshot_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(ExecutorConfig {
            screenshot_on_success: true,
            ..config(dir.path())
        });
        let mut surface = MockSurface::new();

        let result = executor
            .execute_step(&Step::new(2, ActionKind::Click, "#ok"), &mut surface)
            .await;

        let shot = result.screenshot.expect("success screenshot");
        assert!(shot.file_name().unwrap().to_string_lossy().starts_with("step_2_"));
    }
}
