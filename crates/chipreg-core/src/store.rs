//! Result storage: in-memory map plus per-job record files.
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/raw/<domain>/<index>_<unit>.log         raw tool output
//! <out>/results/<domain>/<index>_<unit>.result  one-line result record
//! <out>/state.log                               completion log
//! ```
//!
//! A result record is a single line `STATUS|attempts|details|metrics|raw` in
//! which `\`, `|` and newlines inside fields are backslash-escaped.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::domain::{AnalysisDomain, ChipregError, Job, JobKey, JobResult, Metrics, Result, Status};

const RECORD_FIELDS: usize = 5;

/// Paths of every artifact a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self, domain: AnalysisDomain) -> PathBuf {
        self.root.join("raw").join(domain.slug())
    }

    pub fn results_dir(&self, domain: AnalysisDomain) -> PathBuf {
        self.root.join("results").join(domain.slug())
    }

    pub fn raw_path(&self, job: &Job) -> PathBuf {
        self.raw_dir(job.domain())
            .join(format!("{}.log", job.artifact_stem()))
    }

    pub fn result_path(&self, job: &Job) -> PathBuf {
        self.results_dir(job.domain())
            .join(format!("{}.result", job.artifact_stem()))
    }

    /// Default state log of a fresh run.
    pub fn state_log_path(&self) -> PathBuf {
        self.root.join("state.log")
    }

    pub fn report_json_path(&self) -> PathBuf {
        self.root.join("report.json")
    }

    pub fn report_md_path(&self) -> PathBuf {
        self.root.join("report.md")
    }

    /// Create the raw and result directories for `domain`.
    pub fn prepare(&self, domain: AnalysisDomain) -> Result<()> {
        fs::create_dir_all(self.raw_dir(domain))?;
        fs::create_dir_all(self.results_dir(domain))?;
        Ok(())
    }
}

fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Split on unescaped `|` and undo the escaping of each field.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => current.push(other),
                None => current.push('\\'),
            },
            '|' => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Encode a result as one record line (without the trailing newline).
pub fn encode_record(result: &JobResult) -> Result<String> {
    let metrics = serde_json::to_string(&result.metrics)?;
    let raw = result
        .raw_output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    Ok([
        result.status.as_str().to_string(),
        result.attempts.to_string(),
        escape_field(&result.details),
        escape_field(&metrics),
        escape_field(&raw),
    ]
    .join("|"))
}

/// Decode a record line. The error string names the offending field.
pub fn decode_record(line: &str) -> std::result::Result<JobResult, String> {
    let fields = split_fields(line.trim_end_matches(['\n', '\r']));
    if fields.len() != RECORD_FIELDS {
        return Err(format!(
            "expected {RECORD_FIELDS} fields, found {}",
            fields.len()
        ));
    }
    let status: Status = fields[0].parse().map_err(|e: ChipregError| e.to_string())?;
    let attempts: u32 = fields[1]
        .parse()
        .map_err(|_| format!("invalid attempt count {:?}", fields[1]))?;
    let metrics: Metrics = if fields[3].is_empty() {
        Metrics::None
    } else {
        serde_json::from_str(&fields[3]).map_err(|e| format!("invalid metrics: {e}"))?
    };
    let raw_output = Some(&fields[4])
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    Ok(JobResult {
        status,
        details: fields[2].clone(),
        metrics,
        raw_output,
        attempts,
    })
}

/// Write a record file atomically (temp file in the same directory, then
/// rename).
pub fn write_record(path: &Path, result: &JobResult) -> Result<()> {
    let dir = path.parent().ok_or_else(|| ChipregError::ResultRecord {
        path: path.to_path_buf(),
        reason: "record path has no parent directory".to_string(),
    })?;
    fs::create_dir_all(dir)?;

    let mut line = encode_record(result)?;
    line.push('\n');

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(line.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a record file written by [`write_record`].
pub fn read_record(path: &Path) -> Result<JobResult> {
    let text = fs::read_to_string(path)?;
    let line = text.lines().next().unwrap_or("");
    decode_record(line).map_err(|reason| ChipregError::ResultRecord {
        path: path.to_path_buf(),
        reason,
    })
}

/// Load the cached result of a job, `None` when the record is absent or
/// unreadable.
pub fn load_cached(layout: &ArtifactLayout, job: &Job) -> Option<JobResult> {
    let path = layout.result_path(job);
    match read_record(&path) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(job = %job.key, path = %path.display(), error = %e, "Cached result unavailable");
            None
        }
    }
}

/// Authoritative results of the current run, keyed by job.
///
/// Results are write-once: a second insert for the same key is ignored.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: BTreeMap<JobKey, JobResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result. Returns `false` if the key already had one.
    pub fn insert(&mut self, key: JobKey, result: JobResult) -> bool {
        if self.results.contains_key(&key) {
            warn!(job = %key, "Result already recorded, keeping the first one");
            return false;
        }
        self.results.insert(key, result);
        true
    }

    pub fn get(&self, key: &JobKey) -> Option<&JobResult> {
        self.results.get(key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All results in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&JobKey, &JobResult)> {
        self.results.iter()
    }

    /// Results of one domain in unit-index order.
    pub fn domain_results(
        &self,
        domain: AnalysisDomain,
    ) -> impl Iterator<Item = (&JobKey, &JobResult)> {
        self.results.iter().filter(move |(k, _)| k.domain == domain)
    }

    /// Number of results in a blocking status.
    pub fn blocking_count(&self) -> usize {
        self.results
            .values()
            .filter(|r| r.status.is_blocking())
            .count()
    }
}
