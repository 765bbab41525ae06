//! Browser automation surface
//!
//! The executor only talks to the browser through this trait. Implementations
//! own the page/context; the executor borrows it mutably for one plan and
//! never opens or closes it.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::error::SurfaceResult;

#[async_trait]
pub trait AutomationSurface: Send {
    /// Navigate and wait until network activity settles.
    ///
    /// `None` leaves the bound to the surface's own default.
    async fn navigate(&mut self, url: &str, timeout: Option<Duration>) -> SurfaceResult<()>;

    async fn click(&mut self, selector: &str, timeout: Option<Duration>) -> SurfaceResult<()>;

    async fn fill(
        &mut self,
        selector: &str,
        value: &str,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()>;

    /// Set `path` as the value of the file input matched by `selector`.
    async fn set_input_files(
        &mut self,
        selector: &str,
        path: &Path,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()>;

    async fn wait_for_text(&mut self, text: &str, timeout: Option<Duration>) -> SurfaceResult<()>;

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()>;

    /// Capture the current viewport to `path`.
    async fn screenshot(&mut self, path: &Path) -> SurfaceResult<()>;

    async fn title(&mut self) -> SurfaceResult<String>;

    /// Number of elements currently matching `selector`.
    async fn count(&mut self, selector: &str) -> SurfaceResult<usize>;
}
