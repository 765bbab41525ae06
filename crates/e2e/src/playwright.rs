//! Playwright browser automation
//!
//! A [`PlaywrightSurface`] owns one `node` process running a small driver
//! script. The driver keeps a single browser page alive and answers one JSON
//! request per line on stdin with one JSON response per line on stdout, so
//! page state carries over from step to step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult, SurfaceError, SurfaceResult};
use crate::surface::AutomationSurface;

const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const config = JSON.parse(process.argv[2]);
const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
const bound = (req) => (req.timeout_ms == null ? {} : { timeout: req.timeout_ms });

(async () => {
  const browser = await playwright[config.browser].launch({
    headless: config.headless,
    slowMo: config.slow_mo_ms,
  });
  const context = await browser.newContext({
    viewport: { width: config.viewport_width, height: config.viewport_height },
  });
  context.setDefaultTimeout(config.default_timeout_ms);
  context.setDefaultNavigationTimeout(config.default_timeout_ms);
  const page = await context.newPage();

  const handlers = {
    navigate: (req) => page.goto(req.target, { waitUntil: 'networkidle', ...bound(req) }).then(() => null),
    click: (req) => page.click(req.target, bound(req)),
    fill: (req) => page.fill(req.target, req.value, bound(req)),
    set_input_files: (req) => page.locator(req.target).first().setInputFiles(req.value, bound(req)),
    wait_for_text: (req) => page.getByText(req.target).first().waitFor(bound(req)),
    wait_for_selector: (req) => page.locator(req.target).first().waitFor(bound(req)),
    screenshot: (req) => page.screenshot({ path: req.value }).then(() => null),
    title: () => page.title(),
    count: (req) => page.locator(req.target).count(),
    close: () => browser.close(),
  };

  send({ id: 0, ok: true, result: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    const req = JSON.parse(line);
    try {
      const handler = handlers[req.op];
      if (!handler) throw new Error(`unknown op ${req.op}`);
      const result = await handler(req);
      send({ id: req.id, ok: true, result: result === undefined ? null : result });
    } catch (err) {
      send({ id: req.id, ok: false, error: { name: err.name, message: err.message } });
    }
    if (req.op === 'close') break;
  }
  process.exit(0);
})().catch((err) => {
  process.stderr.write(String((err && err.stack) || err) + '\n');
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::InvalidConfig(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Delay inserted by Playwright between operations
    pub slow_mo_ms: u64,
    /// Default bound for every page operation, including navigation
    pub default_timeout_ms: u64,
    /// Directory whose `node_modules` provides `playwright`
    pub project_dir: PathBuf,
    pub node_binary: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            slow_mo_ms: 100,
            default_timeout_ms: 30_000,
            project_dir: PathBuf::from("."),
            node_binary: PathBuf::from("node"),
        }
    }
}

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    op: &'a str,
    target: &'a str,
    value: &'a str,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DriverResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<DriverError>,
}

#[derive(Debug, Deserialize)]
struct DriverError {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

impl From<DriverError> for SurfaceError {
    fn from(err: DriverError) -> Self {
        if err.name == "TimeoutError" {
            SurfaceError::Timeout(err.message)
        } else {
            SurfaceError::Action(err.message)
        }
    }
}

type DriverWriter = Box<dyn AsyncWrite + Send + Unpin>;
type DriverReader = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// Live Playwright page driven through a Node subprocess
pub struct PlaywrightSurface {
    child: Option<Child>,
    stdin: DriverWriter,
    stdout: DriverReader,
    next_id: u64,
    closed: bool,
    // keeps the driver script on disk while the process runs
    _script_dir: Option<TempDir>,
}

impl PlaywrightSurface {
    /// Launch the browser and wait for the driver to report ready.
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.project_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let driver_config = serde_json::json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "viewport_width": config.viewport_width,
            "viewport_height": config.viewport_height,
            "slow_mo_ms": config.slow_mo_ms,
            "default_timeout_ms": config.default_timeout_ms,
        });

        info!(
            browser = config.browser.as_str(),
            headless = config.headless,
            "Launching Playwright driver"
        );

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .arg(driver_config.to_string())
            .current_dir(&config.project_dir)
            .env("NODE_PATH", config.project_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "Failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".to_string()))?;

        let mut surface = Self::over_streams(stdin, stdout);
        surface.child = Some(child);
        surface._script_dir = Some(script_dir);

        let ready = tokio::time::timeout(
            Duration::from_millis(config.default_timeout_ms),
            surface.read_response(),
        )
        .await
        .map_err(|_| E2eError::Playwright("driver did not become ready".to_string()))??;
        if !ready.ok {
            return Err(E2eError::Playwright("driver failed to start".to_string()));
        }

        debug!("Playwright driver ready");
        Ok(surface)
    }

    /// Surface speaking the driver protocol over arbitrary streams. The
    /// caller is responsible for the ready handshake.
    fn over_streams<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            child: None,
            stdin: Box::new(writer),
            stdout: BufReader::new(reader).lines(),
            next_id: 1,
            closed: false,
            _script_dir: None,
        }
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(project_dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Close the browser and wait for the driver to exit.
    pub async fn close(mut self) -> E2eResult<()> {
        if !self.closed {
            if let Err(e) = self.request("close", "", "", None).await {
                warn!("Driver close request failed: {}", e);
            }
            self.closed = true;
        }
        if let Some(child) = self.child.as_mut() {
            let status = child.wait().await?;
            debug!("Playwright driver exited with {}", status);
        }
        Ok(())
    }

    async fn read_response(&mut self) -> SurfaceResult<DriverResponse> {
        let line = self.stdout.next_line().await?.ok_or(SurfaceError::Closed)?;
        serde_json::from_str(&line).map_err(|e| SurfaceError::Protocol(format!("{}: {}", e, line)))
    }

    async fn request(
        &mut self,
        op: &str,
        target: &str,
        value: &str,
        timeout: Option<Duration>,
    ) -> SurfaceResult<serde_json::Value> {
        if self.closed {
            return Err(SurfaceError::Closed);
        }

        let id = self.next_id;
        self.next_id += 1;

        let request = DriverRequest {
            id,
            op,
            target,
            value,
            timeout_ms: timeout.map(|t| t.as_millis() as u64),
        };
        let mut line = serde_json::to_string(&request)
            .map_err(|e| SurfaceError::Protocol(e.to_string()))?;
        line.push('\n');

        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        // A caller that gave up on an earlier request (e.g. the executor's
        // backstop timeout) leaves its reply queued ahead of ours.
        let response = loop {
            let response = self.read_response().await?;
            if response.id == id {
                break response;
            }
            if response.id > id {
                return Err(SurfaceError::Protocol(format!(
                    "expected response {}, got {}",
                    id, response.id
                )));
            }
            warn!(stale = response.id, expected = id, "Discarding abandoned driver response");
        };

        if response.ok {
            Ok(response.result)
        } else {
            Err(response
                .error
                .map(SurfaceError::from)
                .unwrap_or_else(|| SurfaceError::Action(format!("{} failed", op))))
        }
    }
}

#[async_trait]
impl AutomationSurface for PlaywrightSurface {
    async fn navigate(&mut self, url: &str, timeout: Option<Duration>) -> SurfaceResult<()> {
        self.request("navigate", url, "", timeout).await.map(|_| ())
    }

    async fn click(&mut self, selector: &str, timeout: Option<Duration>) -> SurfaceResult<()> {
        self.request("click", selector, "", timeout).await.map(|_| ())
    }

    async fn fill(
        &mut self,
        selector: &str,
        value: &str,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()> {
        self.request("fill", selector, value, timeout).await.map(|_| ())
    }

    async fn set_input_files(
        &mut self,
        selector: &str,
        path: &Path,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()> {
        let path = path.to_string_lossy();
        self.request("set_input_files", selector, &path, timeout)
            .await
            .map(|_| ())
    }

    async fn wait_for_text(&mut self, text: &str, timeout: Option<Duration>) -> SurfaceResult<()> {
        self.request("wait_for_text", text, "", timeout).await.map(|_| ())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> SurfaceResult<()> {
        self.request("wait_for_selector", selector, "", timeout)
            .await
            .map(|_| ())
    }

    async fn screenshot(&mut self, path: &Path) -> SurfaceResult<()> {
        let path = path.to_string_lossy();
        self.request("screenshot", "", &path, None).await.map(|_| ())
    }

    async fn title(&mut self) -> SurfaceResult<String> {
        let value = self.request("title", "", "", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count(&mut self, selector: &str) -> SurfaceResult<usize> {
        let value = self.request("count", selector, "", None).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| SurfaceError::Protocol(format!("count returned {}", value)))
    }
}
