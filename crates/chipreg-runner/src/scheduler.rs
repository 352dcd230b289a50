//! Bounded-concurrency scheduling of one domain's jobs.

use std::sync::Arc;

use anyhow::Context;
use chipreg_core::store::load_cached;
use chipreg_core::{
    emit_job_finished, AnalysisDomain, Counter, ExecutionState, Job, JobResult, ResultStore, Unit,
    METRICS,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::job::{execute_job, persist_result, JobContext};

/// Per-domain bookkeeping returned by [`JobScheduler::run_domain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRunStats {
    /// Jobs handed to the invoker path (including `MISSING` short-circuits).
    pub executed: usize,
    /// Jobs satisfied from a previous run.
    pub resumed: usize,
    /// Jobs resolved to `NOT_RUN` by a dry run.
    pub skipped: usize,
}

/// Runs jobs with at most `parallel` in flight.
pub struct JobScheduler {
    ctx: Arc<JobContext>,
    parallel: usize,
    dry_run: bool,
    resume: ExecutionState,
}

impl JobScheduler {
    pub fn new(ctx: Arc<JobContext>, parallel: usize, dry_run: bool, resume: ExecutionState) -> Self {
        Self {
            ctx,
            parallel: parallel.max(1),
            dry_run,
            resume,
        }
    }

    pub fn parallel(&self) -> usize {
        self.parallel
    }

    /// Cached result of a job completed by a previous run, if it can be
    /// reused.
    fn resumed_result(&self, job: &Job) -> Option<JobResult> {
        let entry = self.resume.lookup(&job.key)?;
        if entry.unit_name != job.unit.name {
            warn!(
                job = %job.key,
                logged = %entry.unit_name,
                catalog = %job.unit.name,
                "State log names a different unit at this index, rerunning"
            );
            return None;
        }
        load_cached(&self.ctx.layout, job)
    }

    /// Run every job of `domain` and record the results in `store`.
    ///
    /// Returns only after all jobs of the domain have finished. Errors are
    /// bookkeeping failures or panicked tasks; remaining tasks are aborted.
    pub async fn run_domain(
        &self,
        domain: AnalysisDomain,
        units: &[Unit],
        store: &mut ResultStore,
    ) -> anyhow::Result<DomainRunStats> {
        let mut stats = DomainRunStats::default();
        let mut pending = Vec::new();

        for unit in units {
            let job = Job::new(domain, unit.clone());
            if let Some(cached) = self.resumed_result(&job) {
                METRICS.inc(Counter::Resumed);
                emit_job_finished(&job.key, &job.unit.name, cached.status, cached.attempts, true);
                store.insert(job.key, cached);
                stats.resumed += 1;
            } else {
                pending.push(job);
            }
        }

        if self.dry_run {
            for job in pending {
                debug!(job = %job.key, unit = %job.unit.name, "Dry run, not executing");
                store.insert(job.key, JobResult::not_run());
                stats.skipped += 1;
            }
            return Ok(stats);
        }

        self.ctx
            .layout
            .prepare(domain)
            .with_context(|| format!("prepare artifact directories for {domain}"))?;

        info!(domain = %domain, jobs = pending.len(), parallel = self.parallel, "Scheduling jobs");

        let mut queue = pending.into_iter();
        let mut running = JoinSet::new();
        loop {
            while running.len() < self.parallel {
                let Some(job) = queue.next() else { break };
                let ctx = Arc::clone(&self.ctx);
                METRICS.inc(Counter::JobsLaunched);
                running.spawn(async move {
                    let result = execute_job(&ctx, &job).await?;
                    persist_result(&ctx, &job, &result).await?;
                    emit_job_finished(&job.key, &job.unit.name, result.status, result.attempts, false);
                    Ok::<_, anyhow::Error>((job.key, result))
                });
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (key, result) = joined.context("job task panicked")??;
            store.insert(key, result);
            stats.executed += 1;
        }

        Ok(stats)
    }
}
