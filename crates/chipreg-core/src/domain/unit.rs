//! Units, job keys and jobs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::analysis::AnalysisDomain;

/// A hardware design unit as loaded from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Unit {
    /// Position in the release-selected catalog. Stable across runs with the
    /// same catalog and release, independent of chiplet/unit filters.
    pub index: usize,

    /// Unit identifier.
    pub name: String,

    /// Chiplet the unit belongs to.
    pub chiplet: String,

    /// Working directory the analysis tool runs against.
    pub workarea: PathBuf,

    /// RTL tag of the release, if recorded.
    pub rtl_tag: Option<String>,

    /// Release-type flags of the catalog row (e.g. `default`, `pd`).
    pub release_types: Vec<String>,

    /// Release date as written in the catalog.
    pub release_date: String,

    /// User who made the release.
    pub release_user: String,
}

impl Unit {
    /// Whether the catalog row carries the given release flag.
    pub fn has_release_type(&self, release: &str) -> bool {
        self.release_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(release))
    }
}

/// Stable identity of a job: `(domain, unit-index)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub domain: AnalysisDomain,
    pub unit_index: usize,
}

impl JobKey {
    pub fn new(domain: AnalysisDomain, unit_index: usize) -> Self {
        Self { domain, unit_index }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.domain, self.unit_index)
    }
}

/// One analysis of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub key: JobKey,
    pub unit: Unit,
}

impl Job {
    pub fn new(domain: AnalysisDomain, unit: Unit) -> Self {
        Self {
            key: JobKey::new(domain, unit.index),
            unit,
        }
    }

    pub fn domain(&self) -> AnalysisDomain {
        self.key.domain
    }

    /// File stem shared by the job's raw output and result record.
    pub fn artifact_stem(&self) -> String {
        let safe: String = self
            .unit
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{:05}_{}", self.unit.index, safe)
    }
}

#[cfg(test)]
pub(crate) fn test_unit(index: usize, name: &str, chiplet: &str) -> Unit {
    Unit {
        index,
        name: name.to_string(),
        chiplet: chiplet.to_string(),
        workarea: PathBuf::from(format!("/work/{chiplet}/{name}")),
        rtl_tag: None,
        release_types: vec!["default".to_string()],
        release_date: "2024-05-01".to_string(),
        release_user: "builder".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_orders_by_domain_then_index() {
        let a = JobKey::new(AnalysisDomain::Formal, 9);
        let b = JobKey::new(AnalysisDomain::Timing, 0);
        let c = JobKey::new(AnalysisDomain::Timing, 3);
        let mut keys = vec![c, a, b];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn test_artifact_stem_is_filesystem_safe() {
        let job = Job::new(AnalysisDomain::Clock, test_unit(7, "ddr/phy top", "io0"));
        assert_eq!(job.artifact_stem(), "00007_ddr_phy_top");
        assert_eq!(job.key, JobKey::new(AnalysisDomain::Clock, 7));
    }

    #[test]
    fn test_release_type_match_is_case_insensitive() {
        let mut unit = test_unit(0, "alu", "core0");
        unit.release_types.push("PD".to_string());
        assert!(unit.has_release_type("pd"));
        assert!(!unit.has_release_type("sd"));
    }
}
