//! chipreg runner
//!
//! Executes regression jobs against the analysis tool:
//! - Spawns the tool per unit and domain with a timeout
//! - Retries transient failures with a fixed delay
//! - Keeps at most N jobs in flight and resumes from a completion log
//! - Aggregates results and evaluates the exit gate

pub mod gate;
pub mod invoker;
pub mod job;
pub mod pipeline;
pub mod retry;
pub mod scheduler;

// Re-export key types
pub use gate::{GateVerdict, RegressionGate};
pub use invoker::{AnalysisInvoker, ExitIndicator, Invocation, InvocationRequest, ToolInvoker};
pub use job::{execute_job, persist_result, JobContext};
pub use pipeline::{PipelineResult, RegressionPipeline, RegressionPlan};
pub use retry::{retry_fixed, Attempt, RetryOutcome, RetryPolicy};
pub use scheduler::{DomainRunStats, JobScheduler};
