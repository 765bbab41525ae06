//! Error types for planning, execution and reporting

use thiserror::Error;

/// Errors that abort a whole run.
///
/// Anything that goes wrong while a single step runs is recorded on that
/// step's result instead and never shows up here.
#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Automation surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Errors raised by an automation surface primitive.
///
/// `Timeout` is kept apart from every other failure so the executor can
/// report which action and target it was waiting on.
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Action(String),

    #[error("Automation surface is closed")]
    Closed,

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurfaceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SurfaceError::Timeout(_))
    }
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;
