//! Job results and their domain metrics.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::status::Status;
use crate::classify::clock::ClockMetrics;
use crate::classify::formal::FormalMetrics;
use crate::classify::gate_level::GateLevelMetrics;
use crate::classify::physical::PhysicalMetrics;
use crate::classify::release::ReleaseMetrics;
use crate::classify::timing::TimingMetrics;
use crate::classify::Classification;

/// Domain-specific numbers extracted alongside a verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "domain", content = "values", rename_all = "snake_case")]
pub enum Metrics {
    #[default]
    None,
    Formal(FormalMetrics),
    Timing(TimingMetrics),
    PhysicalVerification(PhysicalMetrics),
    Clock(ClockMetrics),
    Release(ReleaseMetrics),
    GateLevelCheck(GateLevelMetrics),
}

/// The authoritative outcome of one job.
///
/// Built once per job and never mutated afterwards; a later run produces a
/// fresh value instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    /// Final verdict.
    pub status: Status,

    /// Human-readable explanation.
    pub details: String,

    /// Domain metrics for presentation.
    #[serde(default)]
    pub metrics: Metrics,

    /// Where the raw tool output of the last attempt was saved.
    pub raw_output: Option<PathBuf>,

    /// Number of tool invocations spent on this job.
    pub attempts: u32,
}

impl JobResult {
    /// Result of a classified tool run.
    pub fn classified(classification: Classification, raw_output: &Path, attempts: u32) -> Self {
        Self {
            status: classification.status,
            details: classification.details,
            metrics: classification.metrics,
            raw_output: Some(raw_output.to_path_buf()),
            attempts,
        }
    }

    /// The unit's working directory does not exist.
    pub fn missing(workarea: &Path) -> Self {
        Self {
            status: Status::Missing,
            details: format!("workarea not found: {}", workarea.display()),
            metrics: Metrics::None,
            raw_output: None,
            attempts: 0,
        }
    }

    /// Placeholder for a job enumerated by a dry run.
    pub fn not_run() -> Self {
        Self {
            status: Status::NotRun,
            details: "dry run".to_string(),
            metrics: Metrics::None,
            raw_output: None,
            attempts: 0,
        }
    }

    /// Every attempt failed transiently.
    pub fn exhausted(attempts: u32, last_cause: &str, raw_output: Option<&Path>) -> Self {
        Self {
            status: Status::Error,
            details: format!("analysis tool failed after {attempts} attempts: {last_cause}"),
            metrics: Metrics::None,
            raw_output: raw_output.map(Path::to_path_buf),
            attempts,
        }
    }
}
