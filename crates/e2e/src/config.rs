//! Testpilot configuration
//!
//! Configuration is an explicit value handed to the planner, executor and
//! report sink; nothing reads global state at run time.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TESTPILOT_TARGET_URL` | `planner.target_url` |
//! | `TESTPILOT_LOGIN_URL` | `planner.login_url` |
//! | `TESTPILOT_WAIT_TIMEOUT_MS` | `executor.wait_timeout_ms` |
//! | `TESTPILOT_SCREENSHOT_ON_FAILURE` | `executor.screenshot_on_failure` |
//! | `TESTPILOT_SCREENSHOT_DIR` | `executor.screenshot_dir` |
//! | `TESTPILOT_HEADLESS` | `playwright.headless` |
//! | `TESTPILOT_REPORT_DIR` | `report.output_dir` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{E2eError, E2eResult};
use crate::executor::ExecutorConfig;
use crate::planner::PlannerConfig;
use crate::playwright::PlaywrightConfig;
use crate::report::ReportConfig;

pub const ENV_TARGET_URL: &str = "TESTPILOT_TARGET_URL";
pub const ENV_LOGIN_URL: &str = "TESTPILOT_LOGIN_URL";
pub const ENV_WAIT_TIMEOUT_MS: &str = "TESTPILOT_WAIT_TIMEOUT_MS";
pub const ENV_SCREENSHOT_ON_FAILURE: &str = "TESTPILOT_SCREENSHOT_ON_FAILURE";
pub const ENV_SCREENSHOT_DIR: &str = "TESTPILOT_SCREENSHOT_DIR";
pub const ENV_HEADLESS: &str = "TESTPILOT_HEADLESS";
pub const ENV_REPORT_DIR: &str = "TESTPILOT_REPORT_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestpilotConfig {
    pub planner: PlannerConfig,
    pub executor: ExecutorConfig,
    pub playwright: PlaywrightConfig,
    pub report: ReportConfig,
}

impl TestpilotConfig {
    /// Load configuration from file, falling back to defaults when it does
    /// not exist.
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> E2eResult<String> {
        toml::to_string_pretty(self).map_err(|e| E2eError::InvalidConfig(e.to_string()))
    }

    /// Apply `TESTPILOT_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> E2eResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_TARGET_URL) {
            self.planner.target_url = url;
        }
        if let Some(url) = lookup(ENV_LOGIN_URL) {
            self.planner.login_url = url;
        }
        if let Some(raw) = lookup(ENV_WAIT_TIMEOUT_MS) {
            self.executor.wait_timeout_ms = parse(ENV_WAIT_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SCREENSHOT_ON_FAILURE) {
            self.executor.screenshot_on_failure = parse_bool(ENV_SCREENSHOT_ON_FAILURE, &raw)?;
        }
        if let Some(dir) = lookup(ENV_SCREENSHOT_DIR) {
            self.executor.screenshot_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            self.playwright.headless = parse_bool(ENV_HEADLESS, &raw)?;
        }
        if let Some(dir) = lookup(ENV_REPORT_DIR) {
            self.report.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

fn parse<T: FromStr>(name: &str, raw: &str) -> E2eResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| E2eError::InvalidConfig(format!("{}: cannot parse '{}'", name, raw)))
}

fn parse_bool(name: &str, raw: &str) -> E2eResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(E2eError::InvalidConfig(format!(
            "{}: expected a boolean, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::FailurePolicy;
    use crate::playwright::Browser;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = TestpilotConfig::default();
        assert_eq!(config.executor.wait_timeout_ms, 5000);
        assert!(config.executor.screenshot_on_failure);
        assert!(!config.executor.screenshot_on_success);
        assert_eq!(config.executor.retry_count, 0);
        assert_eq!(config.executor.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.playwright.default_timeout_ms, 30_000);
        assert_eq!(config.playwright.viewport_width, 1920);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TestpilotConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, TestpilotConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testpilot.toml");
        std::fs::write(
            &path,
            r#"
[planner]
target_url = "http://localhost:3000"

[executor]
wait_timeout_ms = 1500
failure_policy = "stop_on_first_failure"

[playwright]
browser = "firefox"
"#,
        )
        .unwrap();

        let config = TestpilotConfig::load(&path).unwrap();
        assert_eq!(config.planner.target_url, "http://localhost:3000");
        assert_eq!(config.planner.login_url, crate::planner::DEFAULT_LOGIN_URL);
        assert_eq!(config.executor.wait_timeout_ms, 1500);
        assert_eq!(config.executor.failure_policy, FailurePolicy::StopOnFirstFailure);
        assert_eq!(config.playwright.browser, Browser::Firefox);
        assert!(config.playwright.headless);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = TestpilotConfig::default();
        let text = config.to_toml().unwrap();
        let back: TestpilotConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_WAIT_TIMEOUT_MS, "250"),
            (ENV_SCREENSHOT_ON_FAILURE, "off"),
            (ENV_HEADLESS, "false"),
            (ENV_LOGIN_URL, "http://sso.local/login"),
        ]
        .into_iter()
        .collect();

        let mut config = TestpilotConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.executor.wait_timeout_ms, 250);
        assert!(!config.executor.screenshot_on_failure);
        assert!(!config.playwright.headless);
        assert_eq!(config.planner.login_url, "http://sso.local/login");
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut config = TestpilotConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_WAIT_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, E2eError::InvalidConfig(_)));
    }
}
