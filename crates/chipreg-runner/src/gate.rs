//! Regression gate: decides the process exit status from a report.

use chipreg_core::Report;
use serde::{Deserialize, Serialize};

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// One line per blocking result (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

impl GateVerdict {
    /// Process exit code for this verdict.
    pub fn exit_code(&self) -> u8 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

/// Regression gate rules.
pub struct RegressionGate;

impl RegressionGate {
    /// The gate fails when any result is `FAILED`, `CRASHED` or `ERROR`.
    ///
    /// Absence states (`NOT_FOUND`, `NO_DATA`, `MISSING`, ...) and dry-run
    /// placeholders never fail the gate.
    pub fn evaluate(report: &Report) -> GateVerdict {
        let violations: Vec<String> = report
            .results()
            .filter(|(_, _, r)| r.status.is_blocking())
            .map(|(unit, domain, r)| {
                format!("{} ({}) {}: {} ({})", unit.name, unit.index, domain, r.status, r.details)
            })
            .collect();

        let passed = violations.is_empty();
        let message = if passed {
            format!("All {} units passed the gate", report.unit_count())
        } else {
            format!("Gate failed with {} blocking result(s)", violations.len())
        };

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipreg_core::report::REPORT_SCHEMA_VERSION;
    use chipreg_core::{AnalysisDomain, ChipletGroup, JobResult, Status, UnitRow};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn report(statuses: &[(AnalysisDomain, Status)]) -> Report {
        let results: BTreeMap<_, _> = statuses
            .iter()
            .map(|(d, s)| {
                let mut r = JobResult::not_run();
                r.status = *s;
                r.details = format!("{s} details");
                (*d, r)
            })
            .collect();
        Report {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id: Uuid::nil(),
            generated_at: Utc::now(),
            dry_run: false,
            domains: statuses.iter().map(|(d, _)| *d).collect(),
            summaries: Vec::new(),
            chiplets: vec![ChipletGroup {
                chiplet: "core0".to_string(),
                units: vec![UnitRow {
                    index: 4,
                    name: "alu".to_string(),
                    workarea: PathBuf::from("/w/alu"),
                    rtl_tag: None,
                    release_date: String::new(),
                    release_user: String::new(),
                    results,
                }],
            }],
        }
    }

    #[test]
    fn test_empty_report_passes() {
        let mut r = report(&[]);
        r.chiplets.clear();
        let verdict = RegressionGate::evaluate(&r);
        assert!(verdict.passed);
        assert_eq!(verdict.exit_code(), 0);
    }

    #[test]
    fn test_warnings_and_absence_states_pass() {
        let verdict = RegressionGate::evaluate(&report(&[
            (AnalysisDomain::Timing, Status::Warn),
            (AnalysisDomain::Clock, Status::NotFound),
            (AnalysisDomain::Formal, Status::PartialPass),
            (AnalysisDomain::Release, Status::Missing),
        ]));
        assert!(verdict.passed);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_blocking_statuses_fail() {
        let verdict = RegressionGate::evaluate(&report(&[
            (AnalysisDomain::Timing, Status::Failed),
            (AnalysisDomain::Formal, Status::Crashed),
            (AnalysisDomain::Clock, Status::Error),
            (AnalysisDomain::Release, Status::Passed),
        ]));
        assert!(!verdict.passed);
        assert_eq!(verdict.exit_code(), 1);
        assert_eq!(verdict.violations.len(), 3);
        assert!(verdict.violations[0].starts_with("alu (4) FORMAL: CRASHED"));
    }
}
