//! Domain models for chipreg.
//!
//! Canonical definitions for the core entities:
//! - `Unit`: a design block from the catalog
//! - `AnalysisDomain`: which analysis a job runs
//! - `Status`: the closed set of verdicts
//! - `Job` / `JobKey`: one analysis of one unit
//! - `JobResult`: the write-once outcome of a job

pub mod analysis;
pub mod error;
pub mod result;
pub mod status;
pub mod unit;

// Re-export main types and errors
pub use analysis::AnalysisDomain;
pub use error::{CatalogError, ChipregError, Result};
pub use result::{JobResult, Metrics};
pub use status::Status;
pub use unit::{Job, JobKey, Unit};
