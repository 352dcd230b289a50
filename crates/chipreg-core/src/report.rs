//! Report model written at the end of a run.
//!
//! The model is plain data; [`crate::render`] turns it into markdown and
//! [`write_report_json`] persists it as `report.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AnalysisDomain, JobResult, Status};

/// Version of the `report.json` layout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Count and share of one status within a domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusCount {
    pub status: Status,
    pub count: usize,
    /// Percentage of the domain's units, 0..=100.
    pub percent: f64,
}

/// Per-domain status distribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainSummary {
    pub domain: AnalysisDomain,
    pub total: usize,
    /// Non-zero counts only, in [`Status::ALL`] order.
    pub counts: Vec<StatusCount>,
}

impl DomainSummary {
    pub fn count(&self, status: Status) -> usize {
        self.counts
            .iter()
            .find(|c| c.status == status)
            .map_or(0, |c| c.count)
    }

    pub fn percent(&self, status: Status) -> f64 {
        self.counts
            .iter()
            .find(|c| c.status == status)
            .map_or(0.0, |c| c.percent)
    }
}

/// One unit and its results across the requested domains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitRow {
    pub index: usize,
    pub name: String,
    pub workarea: PathBuf,
    pub rtl_tag: Option<String>,
    pub release_date: String,
    pub release_user: String,
    pub results: BTreeMap<AnalysisDomain, JobResult>,
}

/// Units of one chiplet, in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChipletGroup {
    pub chiplet: String,
    pub units: Vec<UnitRow>,
}

/// Complete regression report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub schema_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub domains: Vec<AnalysisDomain>,
    pub summaries: Vec<DomainSummary>,
    pub chiplets: Vec<ChipletGroup>,
}

impl Report {
    pub fn summary(&self, domain: AnalysisDomain) -> Option<&DomainSummary> {
        self.summaries.iter().find(|s| s.domain == domain)
    }

    pub fn unit_count(&self) -> usize {
        self.chiplets.iter().map(|c| c.units.len()).sum()
    }

    /// Every `(unit, domain, result)` triple, chiplet by chiplet.
    pub fn results(&self) -> impl Iterator<Item = (&UnitRow, AnalysisDomain, &JobResult)> {
        self.chiplets.iter().flat_map(|c| {
            c.units
                .iter()
                .flat_map(|u| u.results.iter().map(move |(d, r)| (u, *d, r)))
        })
    }

    /// Number of results that should fail the regression.
    pub fn blocking_count(&self) -> usize {
        self.results().filter(|(_, _, r)| r.status.is_blocking()).count()
    }
}

/// Write `report.json` in pretty JSON format.
pub fn write_report_json(path: &Path, report: &Report) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Read a `report.json` written by [`write_report_json`].
pub fn read_report_json(path: &Path) -> Result<Report> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parse {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_report() -> Report {
        let mut results = BTreeMap::new();
        results.insert(AnalysisDomain::Timing, JobResult::exhausted(3, "timed out", None));
        results.insert(AnalysisDomain::Clock, JobResult::not_run());
        Report {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id: Uuid::parse_str("11111111-1111-1111-1111-111111111111").expect("valid UUID"),
            generated_at: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("parse RFC3339")
                .with_timezone(&Utc),
            dry_run: false,
            domains: vec![AnalysisDomain::Timing, AnalysisDomain::Clock],
            summaries: vec![DomainSummary {
                domain: AnalysisDomain::Timing,
                total: 1,
                counts: vec![StatusCount {
                    status: Status::Error,
                    count: 1,
                    percent: 100.0,
                }],
            }],
            chiplets: vec![ChipletGroup {
                chiplet: "core0".to_string(),
                units: vec![UnitRow {
                    index: 0,
                    name: "alu".to_string(),
                    workarea: PathBuf::from("/rel/core0/alu"),
                    rtl_tag: None,
                    release_date: "2024-05-01".to_string(),
                    release_user: "jdoe".to_string(),
                    results,
                }],
            }],
        }
    }

    #[test]
    fn test_report_schema_has_expected_keys() {
        let raw = serde_json::to_value(sample_report()).expect("serialize report");
        let obj = raw.as_object().expect("report object");
        for key in ["schema_version", "run_id", "generated_at", "summaries", "chiplets"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(raw["summaries"][0]["domain"], json!("TIMING"));
        assert_eq!(raw["summaries"][0]["counts"][0]["status"], json!("ERROR"));
        assert_eq!(
            raw["chiplets"][0]["units"][0]["results"]["TIMING"]["attempts"],
            json!(3)
        );
    }

    #[test]
    fn test_summary_lookup_and_blocking_count() {
        let report = sample_report();
        let timing = report.summary(AnalysisDomain::Timing).unwrap();
        assert_eq!(timing.count(Status::Error), 1);
        assert_eq!(timing.count(Status::Passed), 0);
        assert_eq!(timing.percent(Status::Error), 100.0);
        assert!(report.summary(AnalysisDomain::Formal).is_none());
        assert_eq!(report.unit_count(), 1);
        assert_eq!(report.blocking_count(), 1);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report_json(&path, &sample_report()).unwrap();
        assert_eq!(read_report_json(&path).unwrap(), sample_report());
    }
}
