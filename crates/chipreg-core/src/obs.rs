//! Structured observability hooks for the regression lifecycle.
//!
//! This module provides:
//! - A run-scoped tracing span via the `RunSpan` RAII guard
//! - Emission functions for lifecycle events: run start, job retry, job
//!   finish, domain aggregation, run finish
//!
//! Every event carries an `event` field so log pipelines can filter on it.

use tracing::{info, warn};

use crate::domain::{AnalysisDomain, JobKey, Status};

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// ```ignore
/// let _span = RunSpan::enter("0b6f...");
/// // every event below carries run_id = "0b6f..."
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("chipreg.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, domains: &[AnalysisDomain], units: usize, parallel: usize) {
    let domains: Vec<&str> = domains.iter().map(|d| d.slug()).collect();
    info!(
        event = "run.started",
        run_id = %run_id,
        domains = %domains.join(","),
        units = units,
        parallel = parallel,
    );
}

/// Emit event: a job attempt failed transiently and will be retried.
pub fn emit_job_retry(key: &JobKey, attempt: u32, cause: &str) {
    warn!(event = "job.retry", job = %key, attempt = attempt, cause = %cause);
}

/// Emit event: a job reached its final status.
pub fn emit_job_finished(key: &JobKey, unit: &str, status: Status, attempts: u32, resumed: bool) {
    info!(
        event = "job.finished",
        job = %key,
        unit = %unit,
        status = %status,
        attempts = attempts,
        resumed = resumed,
    );
}

/// Emit event: all jobs of a domain finished and were summarized.
pub fn emit_domain_aggregated(domain: AnalysisDomain, total: usize, passed: usize, blocking: usize) {
    info!(
        event = "domain.aggregated",
        domain = %domain,
        total = total,
        passed = passed,
        blocking = blocking,
    );
}

/// Emit event: run finished.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, total_jobs: usize, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        total_jobs = total_jobs,
        success = success,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _span = RunSpan::enter("test-run-id");
    }
}
