//! Execution of a single job: precondition, invocation with retry,
//! classification and bookkeeping.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chipreg_core::classify::{classify, Classification};
use chipreg_core::store::{self, ArtifactLayout};
use chipreg_core::{emit_job_retry, Counter, Job, JobResult, StateLog, METRICS};
use tracing::{debug, warn};

use crate::invoker::{AnalysisInvoker, ExitIndicator, Invocation, InvocationRequest};
use crate::retry::{retry_fixed, Attempt, RetryOutcome, RetryPolicy};

/// Everything a job task needs, shared across tasks.
pub struct JobContext {
    pub invoker: Arc<dyn AnalysisInvoker>,
    pub layout: ArtifactLayout,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    /// Completion log; `None` in dry runs.
    pub state_log: Option<Arc<StateLog>>,
}

/// Contents of the raw output file for one attempt. A timed-out attempt
/// keeps whatever output was captured followed by a marker line.
pub fn raw_contents(invocation: &Invocation, timeout: Duration, attempt: u32) -> Cow<'_, str> {
    if invocation.exit != ExitIndicator::TimedOut {
        return Cow::Borrowed(&invocation.output);
    }
    let mut text = invocation.output.clone();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&format!(
        "chipreg: analysis tool timed out after {}s (attempt {attempt})\n",
        timeout.as_secs()
    ));
    Cow::Owned(text)
}

/// Decide whether an invocation is final or worth retrying.
///
/// Timeouts are always transient. A non-zero exit is accepted only when the
/// output still carries a domain verdict.
pub fn judge(job: &Job, exit: ExitIndicator, output: &str, timeout: Duration) -> Attempt<Classification> {
    match exit {
        ExitIndicator::TimedOut => {
            Attempt::Transient(format!("timed out after {}s", timeout.as_secs()))
        }
        ExitIndicator::Success => Attempt::Final(classify(job.domain(), output)),
        ExitIndicator::NonZero(code) => {
            let classification = classify(job.domain(), output);
            if classification.status.is_domain_outcome() {
                debug!(job = %job.key, code, "Non-zero exit with a domain verdict, accepting");
                Attempt::Final(classification)
            } else {
                let last_line = output.lines().rev().find(|l| !l.trim().is_empty());
                Attempt::Transient(match last_line {
                    Some(line) => format!("exited with code {code}: {}", line.trim()),
                    None => format!("exited with code {code}"),
                })
            }
        }
    }
}

/// Run one job to its final result.
///
/// A missing workarea short-circuits to `MISSING` without invoking the tool.
/// Errors are bookkeeping failures (raw output could not be written) and
/// abort the run.
pub async fn execute_job(ctx: &JobContext, job: &Job) -> anyhow::Result<JobResult> {
    if !job.unit.workarea.is_dir() {
        warn!(job = %job.key, workarea = %job.unit.workarea.display(), "Workarea missing");
        return Ok(JobResult::missing(&job.unit.workarea));
    }

    let request = InvocationRequest::for_job(job, ctx.timeout);
    let raw_path = ctx.layout.raw_path(job);

    let outcome = retry_fixed(
        &ctx.retry,
        |attempt| {
            let request = &request;
            let raw_path = &raw_path;
            async move {
                METRICS.inc(Counter::Invocations);
                let invocation = ctx.invoker.invoke(request).await;
                debug!(
                    job = %job.key,
                    attempt,
                    exit = ?invocation.exit,
                    duration_ms = invocation.duration_ms,
                    "Analysis tool returned"
                );
                let raw = raw_contents(&invocation, ctx.timeout, attempt);
                tokio::fs::write(raw_path, raw.as_bytes())
                    .await
                    .with_context(|| format!("write {:?}", raw_path))?;
                Ok::<_, anyhow::Error>(judge(job, invocation.exit, &invocation.output, ctx.timeout))
            }
        },
        |attempt, cause| {
            METRICS.inc(Counter::Retries);
            emit_job_retry(&job.key, attempt, cause);
        },
    )
    .await?;

    Ok(match outcome {
        RetryOutcome::Completed { value, attempts } => {
            JobResult::classified(value, &raw_path, attempts)
        }
        RetryOutcome::Exhausted {
            attempts,
            last_cause,
        } => JobResult::exhausted(attempts, &last_cause, Some(&raw_path)),
    })
}

/// Write the result record and append the completion line.
pub async fn persist_result(ctx: &JobContext, job: &Job, result: &JobResult) -> anyhow::Result<()> {
    let path = ctx.layout.result_path(job);
    store::write_record(&path, result).with_context(|| format!("write {:?}", path))?;
    if let Some(log) = &ctx.state_log {
        log.record(&job.key, &job.unit.name).await?;
    }
    Ok(())
}
