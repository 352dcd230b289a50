//! Verdicts a job can end in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ChipregError;

/// Closed set of job verdicts.
///
/// The first six variants are severity-ordered domain outcomes
/// (`Passed < Warn < PartialPass < Unresolved < Failed < Crashed`). The rest
/// describe absence of a result and carry no severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Passed,
    Warn,
    PartialPass,
    Unresolved,
    Failed,
    Crashed,
    NotFound,
    NoData,
    Missing,
    Error,
    Running,
    Unknown,
    /// Placeholder for jobs enumerated by a dry run.
    NotRun,
}

impl Status {
    /// Every status, in report column order.
    pub const ALL: [Status; 13] = [
        Status::Passed,
        Status::Warn,
        Status::PartialPass,
        Status::Unresolved,
        Status::Failed,
        Status::Crashed,
        Status::NotFound,
        Status::NoData,
        Status::Missing,
        Status::Error,
        Status::Running,
        Status::Unknown,
        Status::NotRun,
    ];

    /// Canonical upper-case name used in records and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "PASSED",
            Status::Warn => "WARN",
            Status::PartialPass => "PARTIAL_PASS",
            Status::Unresolved => "UNRESOLVED",
            Status::Failed => "FAILED",
            Status::Crashed => "CRASHED",
            Status::NotFound => "NOT_FOUND",
            Status::NoData => "NO_DATA",
            Status::Missing => "MISSING",
            Status::Error => "ERROR",
            Status::Running => "RUNNING",
            Status::Unknown => "UNKNOWN",
            Status::NotRun => "NOT_RUN",
        }
    }

    /// Severity rank for domain outcomes, `None` for absence states.
    pub fn severity(&self) -> Option<u8> {
        match self {
            Status::Passed => Some(0),
            Status::Warn => Some(1),
            Status::PartialPass => Some(2),
            Status::Unresolved => Some(3),
            Status::Failed => Some(4),
            Status::Crashed => Some(5),
            _ => None,
        }
    }

    /// Whether the analysis itself produced a verdict.
    ///
    /// A non-zero tool exit backed by such a verdict is final; without one it
    /// is treated as a transient execution failure.
    pub fn is_domain_outcome(&self) -> bool {
        self.severity().is_some()
    }

    /// Statuses that make the regression exit non-zero.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Status::Failed | Status::Crashed | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ChipregError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ChipregError::UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_is_strict() {
        let ranked = [
            Status::Passed,
            Status::Warn,
            Status::PartialPass,
            Status::Unresolved,
            Status::Failed,
            Status::Crashed,
        ];
        for pair in ranked.windows(2) {
            assert!(pair[0].severity() < pair[1].severity());
        }
    }

    #[test]
    fn test_absence_states_have_no_severity() {
        for status in [
            Status::NotFound,
            Status::NoData,
            Status::Missing,
            Status::Error,
            Status::Running,
            Status::Unknown,
            Status::NotRun,
        ] {
            assert!(status.severity().is_none(), "{status} must not rank");
            assert!(!status.is_domain_outcome());
        }
    }

    #[test]
    fn test_parse_roundtrip_for_every_status() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert_eq!("partial_pass".parse::<Status>().unwrap(), Status::PartialPass);
        assert!("GREEN".parse::<Status>().is_err());
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(Status::Failed.is_blocking());
        assert!(Status::Crashed.is_blocking());
        assert!(Status::Error.is_blocking());
        assert!(!Status::Warn.is_blocking());
        assert!(!Status::Missing.is_blocking());
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&Status::PartialPass).unwrap();
        assert_eq!(json, "\"PARTIAL_PASS\"");
    }
}
