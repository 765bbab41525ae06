//! In-memory automation surface
//!
//! Records every primitive call, with the timeout it was given, and fails or
//! stalls the ones whose target matches a configured pattern. Used to drive
//! the executor without a browser.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SurfaceError, SurfaceResult};
use crate::surface::AutomationSurface;

/// A primitive call observed by [`MockSurface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Navigate { url: String },
    Click { selector: String },
    Fill { selector: String, value: String },
    SetInputFiles { selector: String, path: PathBuf },
    WaitForText { text: String },
    WaitForSelector { selector: String },
    Screenshot { path: PathBuf },
    Title,
    Count { selector: String },
}

impl SurfaceCall {
    fn target(&self) -> &str {
        match self {
            SurfaceCall::Navigate { url } => url,
            SurfaceCall::Click { selector }
            | SurfaceCall::Fill { selector, .. }
            | SurfaceCall::SetInputFiles { selector, .. }
            | SurfaceCall::WaitForSelector { selector }
            | SurfaceCall::Count { selector } => selector,
            SurfaceCall::WaitForText { text } => text,
            SurfaceCall::Screenshot { .. } | SurfaceCall::Title => "",
        }
    }
}

enum Failure {
    Timeout(String),
    Action(String),
    Closed,
}

impl Failure {
    fn from_error(err: SurfaceError) -> Self {
        match err {
            SurfaceError::Timeout(msg) => Failure::Timeout(msg),
            SurfaceError::Closed => Failure::Closed,
            other => Failure::Action(other.to_string()),
        }
    }

    fn to_error(&self) -> SurfaceError {
        match self {
            Failure::Timeout(msg) => SurfaceError::Timeout(msg.clone()),
            Failure::Action(msg) => SurfaceError::Action(msg.clone()),
            Failure::Closed => SurfaceError::Closed,
        }
    }
}

/// Scripted [`AutomationSurface`] for tests and dry runs
#[derive(Default)]
pub struct MockSurface {
    calls: Vec<SurfaceCall>,
    timeouts: Vec<Option<Duration>>,
    failures: HashMap<String, Failure>,
    hangs: HashSet<String>,
    fail_budget: Option<usize>,
    fail_screenshots: bool,
    title: String,
    counts: HashMap<String, usize>,
    write_screenshots: bool,
}

impl MockSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call whose target equals `target` with `err`.
    pub fn fail_on(mut self, target: impl Into<String>, err: SurfaceError) -> Self {
        self.failures.insert(target.into(), Failure::from_error(err));
        self
    }

    /// Only the first `n` matching calls fail; later ones succeed.
    pub fn fail_times(mut self, n: usize) -> Self {
        self.fail_budget = Some(n);
        self
    }

    /// Calls whose target equals `target` never complete.
    pub fn hang_on(mut self, target: impl Into<String>) -> Self {
        self.hangs.insert(target.into());
        self
    }

    /// Make every screenshot capture fail with an I/O-style error.
    pub fn fail_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    /// Write an empty file at each screenshot path.
    pub fn write_screenshots(mut self) -> Self {
        self.write_screenshots = true;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_count(mut self, selector: impl Into<String>, count: usize) -> Self {
        self.counts.insert(selector.into(), count);
        self
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Timeout passed with each call, parallel to [`calls`](Self::calls).
    pub fn timeouts(&self) -> &[Option<Duration>] {
        &self.timeouts
    }

    pub fn screenshots(&self) -> Vec<&Path> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::Screenshot { path } => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    async fn record(&mut self, call: SurfaceCall, timeout: Option<Duration>) -> SurfaceResult<()> {
        let failure = self.failures.get(call.target()).map(Failure::to_error);
        let hang = self.hangs.contains(call.target());
        self.calls.push(call);
        self.timeouts.push(timeout);

        if hang {
            return std::future::pending().await;
        }

        let Some(err) = failure else {
            return Ok(());
        };
        match self.fail_budget.as_mut() {
            Some(0) => Ok(()),
            Some(remaining) => {
                *remaining -= 1;
                Err(err)
            }
            None => Err(err),
        }
    }
}

#[async_trait]
impl AutomationSurface for MockSurface {
    async fn navigate(&mut self, url: &str, timeout: Option<Duration>) -> SurfaceResult<()> {
        self.record(SurfaceCall::Navigate { url: url.to_string() }, timeout)
            .await
    }

    async fn click(&mut self, selector: &str, timeout: Option<Duration>) -> SurfaceResult<()> {
        let call = SurfaceCall::Click {
            selector: selector.to_string(),
        };
        self.record(call, timeout).await
    }

    async fn fill(
        &mut self,
        selector: &str,
        value: &str,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()> {
        let call = SurfaceCall::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
        };
        self.record(call, timeout).await
    }

    async fn set_input_files(
        &mut self,
        selector: &str,
        path: &Path,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()> {
        let call = SurfaceCall::SetInputFiles {
            selector: selector.to_string(),
            path: path.to_path_buf(),
        };
        self.record(call, timeout).await
    }

    async fn wait_for_text(&mut self, text: &str, timeout: Option<Duration>) -> SurfaceResult<()> {
        let call = SurfaceCall::WaitForText {
            text: text.to_string(),
        };
        self.record(call, timeout).await
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()> {
        let call = SurfaceCall::WaitForSelector {
            selector: selector.to_string(),
        };
        self.record(call, timeout).await
    }

    async fn screenshot(&mut self, path: &Path) -> SurfaceResult<()> {
        self.calls.push(SurfaceCall::Screenshot {
            path: path.to_path_buf(),
        });
        self.timeouts.push(None);
        if self.fail_screenshots {
            return Err(SurfaceError::Action(format!(
                "could not write {}",
                path.display()
            )));
        }
        if self.write_screenshots {
            std::fs::write(path, b"")?;
        }
        Ok(())
    }

    async fn title(&mut self) -> SurfaceResult<String> {
        self.record(SurfaceCall::Title, None).await?;
        Ok(self.title.clone())
    }

    async fn count(&mut self, selector: &str) -> SurfaceResult<usize> {
        let call = SurfaceCall::Count {
            selector: selector.to_string(),
        };
        self.record(call, None).await?;
        Ok(self.counts.get(selector).copied().unwrap_or(0))
    }
}
