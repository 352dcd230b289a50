//! Regression pipeline: domain-by-domain scheduling, aggregation and report
//! output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chipreg_core::{
    emit_domain_aggregated, emit_run_finished, emit_run_started, write_report_json,
    write_report_md, AnalysisDomain, ArtifactLayout, CounterSnapshot, ExecutionState,
    RegressionConfig, Report, ResultAggregator, ResultStore, RunSpan, StateLog, Status, Unit,
    METRICS,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::invoker::AnalysisInvoker;
use crate::job::JobContext;
use crate::retry::RetryPolicy;
use crate::scheduler::{DomainRunStats, JobScheduler};

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressionPlan {
    /// Domains in processing order.
    pub domains: Vec<AnalysisDomain>,
    /// Release-selected, filtered units.
    pub units: Vec<Unit>,
    pub dry_run: bool,
    /// State log of a previous run to resume from.
    pub resume: Option<PathBuf>,
}

/// Result of a complete regression run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    pub report: Report,

    /// Scheduler bookkeeping per domain, in processing order.
    pub domain_stats: Vec<(AnalysisDomain, DomainRunStats)>,

    /// Where `report.json` / `report.md` were written; `None` for dry runs.
    pub report_paths: Option<(PathBuf, PathBuf)>,

    /// Launches, invocations, retries and resumes of this run only.
    pub counters: CounterSnapshot,
}

impl PipelineResult {
    /// Number of results that passed outright.
    pub fn passed_count(&self) -> usize {
        self.report
            .results()
            .filter(|(_, _, r)| r.status == Status::Passed)
            .count()
    }

    /// Number of results that fail the regression.
    pub fn blocking_count(&self) -> usize {
        self.report.blocking_count()
    }

    pub fn success(&self) -> bool {
        self.blocking_count() == 0
    }

    pub fn resumed_count(&self) -> usize {
        self.domain_stats.iter().map(|(_, s)| s.resumed).sum()
    }

    pub fn executed_count(&self) -> usize {
        self.domain_stats.iter().map(|(_, s)| s.executed).sum()
    }
}

/// Regression orchestrator.
pub struct RegressionPipeline;

impl RegressionPipeline {
    /// Run every domain of `plan` one after another and write the report.
    ///
    /// Dry runs create no files at all: no state log, no records, no report.
    pub async fn run(
        invoker: Arc<dyn AnalysisInvoker>,
        config: &RegressionConfig,
        plan: &RegressionPlan,
    ) -> anyhow::Result<PipelineResult> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let run_id_str = run_id.to_string();
        let _span = RunSpan::enter(&run_id_str);
        let counters_at_start = METRICS.snapshot();

        let layout = ArtifactLayout::new(&config.output_dir);
        let resume_state = match &plan.resume {
            Some(path) => ExecutionState::load(path)?,
            None => ExecutionState::empty(),
        };

        let state_log = if plan.dry_run {
            None
        } else {
            std::fs::create_dir_all(layout.root())
                .with_context(|| format!("create {:?}", layout.root()))?;
            let log = match &plan.resume {
                Some(path) => StateLog::append_to(path).await?,
                None => StateLog::create(&layout.state_log_path()).await?,
            };
            Some(Arc::new(log))
        };

        let parallel = config.job_slots();
        let ctx = Arc::new(JobContext {
            invoker,
            layout: layout.clone(),
            retry: RetryPolicy::from_config(config),
            timeout: config.timeout(),
            state_log,
        });
        let scheduler = JobScheduler::new(ctx, parallel, plan.dry_run, resume_state);

        emit_run_started(&run_id_str, &plan.domains, plan.units.len(), parallel);

        let aggregator = ResultAggregator::new(&plan.units);
        let mut store = ResultStore::new();
        let mut domain_stats = Vec::with_capacity(plan.domains.len());

        for &domain in &plan.domains {
            let stats = scheduler.run_domain(domain, &plan.units, &mut store).await?;
            let summary = aggregator.summarize(domain, &store);
            let blocking = Status::ALL
                .iter()
                .filter(|s| s.is_blocking())
                .map(|s| summary.count(*s))
                .sum();
            emit_domain_aggregated(domain, summary.total, summary.count(Status::Passed), blocking);
            domain_stats.push((domain, stats));
        }

        let report = aggregator.build_report(run_id, &plan.domains, &store, plan.dry_run);

        let report_paths = if plan.dry_run {
            None
        } else {
            let json_path = layout.report_json_path();
            let md_path = layout.report_md_path();
            write_report_json(&json_path, &report)?;
            write_report_md(&md_path, &report)?;
            info!(json = %json_path.display(), markdown = %md_path.display(), "Wrote report");
            Some((json_path, md_path))
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = report.blocking_count() == 0;
        let counters = METRICS.flush(&run_id_str, &counters_at_start);
        emit_run_finished(&run_id_str, duration_ms, store.len(), success);

        Ok(PipelineResult {
            run_id,
            started_at,
            duration_ms,
            report,
            domain_stats,
            report_paths,
            counters,
        })
    }
}
