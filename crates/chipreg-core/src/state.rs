//! Append-only completion log and the resume state loaded from it.
//!
//! One line per completed job: `DOMAIN|unit-index|unit-name|RFC3339`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{AnalysisDomain, ChipregError, JobKey, Result};

/// What the log says about one completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    pub unit_name: String,
    pub completed_at: DateTime<Utc>,
}

/// Format one log line (without the trailing newline).
pub fn format_line(key: &JobKey, unit_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}|{}|{}|{}",
        key.domain.name(),
        key.unit_index,
        unit_name.replace(['|', '\n', '\r'], "_"),
        at.to_rfc3339()
    )
}

/// Parse one log line, `None` if it is malformed.
pub fn parse_line(line: &str) -> Option<(JobKey, CompletionEntry)> {
    let mut parts = line.trim().splitn(4, '|');
    let domain: AnalysisDomain = parts.next()?.parse().ok()?;
    let unit_index: usize = parts.next()?.trim().parse().ok()?;
    let unit_name = parts.next()?.trim();
    let completed_at = DateTime::parse_from_rfc3339(parts.next()?.trim())
        .ok()?
        .with_timezone(&Utc);
    if unit_name.is_empty() {
        return None;
    }
    Some((
        JobKey::new(domain, unit_index),
        CompletionEntry {
            unit_name: unit_name.to_string(),
            completed_at,
        },
    ))
}

/// Completed jobs of a previous run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    entries: HashMap<JobKey, CompletionEntry>,
}

impl ExecutionState {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build state from log text. Blank lines are ignored, malformed lines
    /// are skipped with a warning and the first line for a key wins.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((key, entry)) => {
                    entries.entry(key).or_insert(entry);
                }
                None => warn!(line = i + 1, content = %line, "Skipping malformed state log line"),
            }
        }
        Self { entries }
    }

    /// Load a state log. A missing file yields empty state.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let state = Self::parse(&text);
                info!(path = %path.display(), completed = state.len(), "Loaded execution state");
                Ok(state)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "State log not found, starting from scratch");
                Ok(Self::empty())
            }
            Err(e) => Err(ChipregError::StateLog {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn lookup(&self, key: &JobKey) -> Option<&CompletionEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialized writer of the completion log.
///
/// Each record is written with a single `write_all` under the lock so lines
/// from concurrent jobs never interleave.
#[derive(Debug)]
pub struct StateLog {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl StateLog {
    /// Start a fresh log, truncating any previous content.
    pub async fn create(path: &Path) -> Result<Self> {
        Self::open(path, false).await
    }

    /// Continue an existing log (created if absent).
    pub async fn append_to(path: &Path) -> Result<Self> {
        Self::open(path, true).await
    }

    async fn open(path: &Path, append: bool) -> Result<Self> {
        let err = |e: std::io::Error| ChipregError::StateLog {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(err)?;
        }
        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options.open(path).await.map_err(err)?;
        debug!(path = %path.display(), append, "Opened state log");
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the completion line of one job.
    pub async fn record(&self, key: &JobKey, unit_name: &str) -> Result<()> {
        let mut line = format_line(key, unit_name, Utc::now());
        line.push('\n');

        let err = |e: std::io::Error| ChipregError::StateLog {
            path: self.path.clone(),
            reason: e.to_string(),
        };
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await.map_err(err)?;
        file.flush().await.map_err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_line_roundtrip() {
        let key = JobKey::new(AnalysisDomain::PhysicalVerification, 12);
        let at = Utc::now();
        let line = format_line(&key, "ddr|phy", at);
        assert!(line.starts_with("PHYSICAL_VERIFICATION|12|ddr_phy|"));
        let (parsed_key, entry) = parse_line(&line).unwrap();
        assert_eq!(parsed_key, key);
        assert_eq!(entry.unit_name, "ddr_phy");
        assert_eq!(entry.completed_at.timestamp(), at.timestamp());
    }

    #[test]
    fn test_parse_skips_malformed_and_keeps_first() {
        let text = "\
TIMING|0|alu|2024-05-01T10:00:00+00:00

garbage line
TIMING|x|alu|2024-05-01T10:00:00+00:00
BOGUS|1|fpu|2024-05-01T10:00:00+00:00
TIMING|0|renamed|2024-05-02T10:00:00+00:00
CLOCK|3|phy|2024-05-01T11:00:00Z
";
        let state = ExecutionState::parse(text);
        assert_eq!(state.len(), 2);
        let entry = state
            .lookup(&JobKey::new(AnalysisDomain::Timing, 0))
            .unwrap();
        assert_eq!(entry.unit_name, "alu");
        assert!(state.lookup(&JobKey::new(AnalysisDomain::Clock, 3)).is_some());
        assert!(state.lookup(&JobKey::new(AnalysisDomain::Timing, 3)).is_none());
    }

    #[test]
    fn test_missing_log_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = ExecutionState::load(&dir.path().join("nope.log")).unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_create_truncates_and_append_keeps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.log");
        std::fs::write(&path, "stale\n").unwrap();

        let log = StateLog::create(&path).await.unwrap();
        log.record(&JobKey::new(AnalysisDomain::Formal, 0), "alu")
            .await
            .unwrap();
        drop(log);

        let log = StateLog::append_to(&path).await.unwrap();
        log.record(&JobKey::new(AnalysisDomain::Formal, 1), "fpu")
            .await
            .unwrap();
        drop(log);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        let state = ExecutionState::parse(&text);
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_records_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.log");
        let log = Arc::new(StateLog::create(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..32 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.record(&JobKey::new(AnalysisDomain::Timing, i), &format!("unit{i}"))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 32);
        assert!(text.lines().all(|l| parse_line(l).is_some()));
    }
}
