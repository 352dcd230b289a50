//! chipreg core library
//!
//! Domain model, unit catalog, output classifiers, result storage, the
//! completion log and report aggregation for chiplet regressions. Job
//! execution lives in `chipreg-runner`.

pub mod aggregate;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod render;
pub mod report;
pub mod state;
pub mod store;
pub mod telemetry;

pub use domain::{
    AnalysisDomain, CatalogError, ChipregError, Job, JobKey, JobResult, Metrics, Result, Status,
    Unit,
};

pub use aggregate::ResultAggregator;
pub use catalog::{CatalogRow, UnitCatalog, UnitFilter};
pub use classify::{classifier_for, classify, Classification, Classifier};
pub use config::{Parallelism, RegressionConfig, CONFIG_ENV};
pub use render::{render_markdown, write_report_md};
pub use report::{
    read_report_json, write_report_json, ChipletGroup, DomainSummary, Report, StatusCount, UnitRow,
};
pub use state::{CompletionEntry, ExecutionState, StateLog};
pub use store::{ArtifactLayout, ResultStore};

pub use metrics::{Counter, CounterSnapshot, METRICS};
pub use obs::{
    emit_domain_aggregated, emit_job_finished, emit_job_retry, emit_run_finished,
    emit_run_started, RunSpan,
};
pub use telemetry::{init_tracing, level_for};

/// chipreg version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
