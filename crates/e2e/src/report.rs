//! Report sinks
//!
//! A sink receives a fully populated [`RunSummary`] and turns it into a
//! durable artifact. Only JSON is produced here.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::E2eResult;
use crate::reporter::RunSummary;

/// Where reports are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results/reports"),
        }
    }
}

pub trait ReportSink: Send + Sync {
    /// Persist `summary` and return the path of the written artifact.
    fn write(&self, summary: &RunSummary) -> E2eResult<PathBuf>;
}

/// Writes `test_report_{yyyyMMdd_HHmmss}.json` into the output directory
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    output_dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            output_dir: config.output_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ReportSink for JsonReportSink {
    fn write(&self, summary: &RunSummary) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.output_dir.join(format!("test_report_{}.json", stamp));
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json)?;

        info!("Report written to: {}", path.display());
        Ok(path)
    }
}
