//! Analysis tool invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chipreg_core::{Job, RegressionConfig};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

/// One call of the analysis tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Unit working directory the tool inspects.
    pub workarea: PathBuf,

    /// Report sections requested from the tool.
    pub sections: Vec<String>,

    /// Wall-clock limit for this call.
    pub timeout: Duration,
}

impl InvocationRequest {
    pub fn for_job(job: &Job, timeout: Duration) -> Self {
        Self {
            workarea: job.unit.workarea.clone(),
            sections: job.domain().sections().iter().map(|s| s.to_string()).collect(),
            timeout,
        }
    }
}

/// How a tool call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitIndicator {
    Success,
    NonZero(i32),
    TimedOut,
}

/// Raw outcome of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub exit: ExitIndicator,

    /// Captured stdout followed by stderr.
    pub output: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl Invocation {
    pub fn succeeded(&self) -> bool {
        self.exit == ExitIndicator::Success
    }
}

/// Runs the analysis tool against one workarea.
///
/// Implementations never fail: spawn errors and timeouts are reported
/// through [`ExitIndicator`].
#[async_trait]
pub trait AnalysisInvoker: Send + Sync {
    async fn invoke(&self, request: &InvocationRequest) -> Invocation;
}

/// Invoker that spawns the real analysis tool as a child process.
///
/// Command line: `<binary> [tool] <workarea> <section,section>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvoker {
    binary: PathBuf,
    tool: Option<PathBuf>,
}

impl ToolInvoker {
    pub fn new(binary: impl Into<PathBuf>, tool: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            tool,
        }
    }

    pub fn from_config(config: &RegressionConfig) -> Self {
        Self::new(config.binary_path.clone(), config.tool_path.clone())
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments passed to the binary for `request`.
    pub fn args(&self, request: &InvocationRequest) -> Vec<String> {
        let mut args = Vec::with_capacity(3);
        if let Some(tool) = &self.tool {
            args.push(tool.display().to_string());
        }
        args.push(request.workarea.display().to_string());
        args.push(request.sections.join(","));
        args
    }
}

#[async_trait]
impl AnalysisInvoker for ToolInvoker {
    async fn invoke(&self, request: &InvocationRequest) -> Invocation {
        let start = Instant::now();
        let args = self.args(request);
        debug!(binary = %self.binary.display(), args = ?args, "Invoking analysis tool");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return Invocation {
                    exit: ExitIndicator::NonZero(-1),
                    output: format!("failed to spawn {}: {e}", self.binary.display()),
                    duration_ms: start.elapsed().as_millis() as u64,
                };
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = tokio::time::timeout(request.timeout, child.wait_with_output()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match waited {
            Err(_elapsed) => Invocation {
                exit: ExitIndicator::TimedOut,
                output: String::new(),
                duration_ms,
            },
            Ok(Err(e)) => Invocation {
                exit: ExitIndicator::NonZero(-1),
                output: format!("failed to collect output: {e}"),
                duration_ms,
            },
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).to_string();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                let exit = if output.status.success() {
                    ExitIndicator::Success
                } else {
                    ExitIndicator::NonZero(output.status.code().unwrap_or(-1))
                };
                Invocation {
                    exit,
                    output: text,
                    duration_ms,
                }
            }
        }
    }
}
