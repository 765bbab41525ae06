//! Step and plan model
//!
//! Steps are authored once by a [`StepProducer`](crate::planner::StepProducer)
//! and never mutated. Results are produced by the executor, one per step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

use crate::error::{E2eError, E2eResult};

/// The kind of browser action a step performs.
///
/// Unrecognized action names are kept as [`ActionKind::Other`] so that a plan
/// can carry them; the executor degrades them to `skipped`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Goto,
    Click,
    Fill,
    Upload,
    WaitForText,
    WaitForSelector,
    Screenshot,
    Other(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Goto => "goto",
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::Upload => "upload",
            ActionKind::WaitForText => "wait_for_text",
            ActionKind::WaitForSelector => "wait_for_selector",
            ActionKind::Screenshot => "screenshot",
            ActionKind::Other(name) => name,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ActionKind::Other(_))
    }

    /// Whether the action is bounded by the executor's wait timeout.
    pub fn is_bounded(&self) -> bool {
        matches!(
            self,
            ActionKind::Click
                | ActionKind::Fill
                | ActionKind::Upload
                | ActionKind::WaitForText
                | ActionKind::WaitForSelector
        )
    }
}

impl From<&str> for ActionKind {
    fn from(name: &str) -> Self {
        match name {
            "goto" => ActionKind::Goto,
            "click" => ActionKind::Click,
            "fill" => ActionKind::Fill,
            "upload" => ActionKind::Upload,
            "wait_for_text" => ActionKind::WaitForText,
            "wait_for_selector" => ActionKind::WaitForSelector,
            "screenshot" => ActionKind::Screenshot,
            other => ActionKind::Other(other.to_string()),
        }
    }
}

impl From<String> for ActionKind {
    fn from(name: String) -> Self {
        ActionKind::from(name.as_str())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single authored browser action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position in the plan, starting at 1
    pub id: u32,

    pub action: ActionKind,

    /// Locator, URL or screenshot label depending on `action`
    #[serde(default)]
    pub target: String,

    /// Input text, file path or `{{NAME}}` placeholder
    #[serde(default)]
    pub value: String,

    /// Human-readable expectation; never evaluated
    #[serde(default)]
    pub expect: String,

    #[serde(default)]
    pub note: String,
}

impl Step {
    pub fn new(id: u32, action: impl Into<ActionKind>, target: impl Into<String>) -> Self {
        Self {
            id,
            action: action.into(),
            target: target.into(),
            value: String::new(),
            expect: String::new(),
            note: String::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_expect(mut self, expect: impl Into<String>) -> Self {
        self.expect = expect.into();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Display name used in reports: the note, or the action when there is none.
    pub fn display_name(&self) -> String {
        if self.note.is_empty() {
            self.action.to_string()
        } else {
            self.note.clone()
        }
    }

    /// Convert to a plain key-value map for the reporting layer.
    pub fn to_map(&self) -> E2eResult<Map<String, Value>> {
        to_object(self)
    }

    pub fn from_map(map: Map<String, Value>) -> E2eResult<Self> {
        serde_json::from_value(Value::Object(map)).map_err(E2eError::from)
    }
}

/// An instruction together with the ordered steps derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub instruction: String,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(instruction: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            instruction: instruction.into(),
            created_at: Utc::now(),
            steps,
        }
    }

    /// Check that step ids are positive and unique.
    pub fn validate(&self) -> E2eResult<()> {
        validate_steps(&self.steps)
    }

    pub fn to_map(&self) -> E2eResult<Map<String, Value>> {
        to_object(self)
    }
}

fn to_object<T: Serialize>(value: &T) -> E2eResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(E2eError::Json(serde::ser::Error::custom(format!(
            "expected an object, got {}",
            other
        )))),
    }
}

pub(crate) fn validate_steps(steps: &[Step]) -> E2eResult<()> {
    let mut seen = std::collections::HashSet::with_capacity(steps.len());
    for step in steps {
        if step.id == 0 {
            return Err(E2eError::InvalidPlan(format!(
                "step ids must be positive, found 0 for action '{}'",
                step.action
            )));
        }
        if !seen.insert(step.id) {
            return Err(E2eError::InvalidPlan(format!("duplicate step id {}", step.id)));
        }
    }
    Ok(())
}

/// Terminal status of an executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Passed => "passed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded outcome of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub id: u32,
    pub name: String,
    pub action: ActionKind,
    pub target: String,
    /// Raw step value; placeholders are not expanded here
    pub value: String,
    pub expect: String,
    pub status: StepStatus,
    pub message: String,
    pub screenshot: Option<PathBuf>,
    /// Seconds from dispatch to terminal status
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

impl StepResult {
    pub(crate) fn for_step(
        step: &Step,
        status: StepStatus,
        message: impl Into<String>,
        screenshot: Option<PathBuf>,
        duration: f64,
    ) -> Self {
        Self {
            id: step.id,
            name: step.display_name(),
            action: step.action.clone(),
            target: step.target.clone(),
            value: step.value.clone(),
            expect: step.expect.clone(),
            status,
            message: message.into(),
            screenshot,
            duration,
            timestamp: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }

    pub fn to_map(&self) -> E2eResult<Map<String, Value>> {
        to_object(self)
    }
}
