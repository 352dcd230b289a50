//! Gate-level check classification by non-waived findings.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{parse_count, section_body, Classification, Classifier};
use crate::domain::{AnalysisDomain, Metrics, Status};

/// This many non-waived findings or more fails the unit.
pub const NON_WAIVED_FAIL_LIMIT: u64 = 50;

/// Number of checkers kept in the metrics.
pub const TOP_CHECKERS: usize = 5;

/// Findings reported by one checker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckerCount {
    pub checker: String,
    pub count: u64,
}

/// Metrics for the gate-level check domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateLevelMetrics {
    pub total: u64,
    pub waived: u64,
    pub non_waived: u64,
    /// Checkers with the most findings, highest first.
    pub top_checkers: Vec<CheckerCount>,
}

fn total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*total(?:\s+errors)?\s*[:=]\s*([\d,]+)").expect("total regex"))
}

fn waived_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*waived\s*[:=]\s*([\d,]+)").expect("waived regex"))
}

fn non_waived_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:non[-_ ]?waived|unwaived)\s*[:=]\s*([\d,]+)")
            .expect("non-waived regex")
    })
}

fn checker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*checker\s+([A-Za-z0-9_./-]+)\s*[:=]\s*([\d,]+)").expect("checker regex")
    })
}

fn capture_count(re: &Regex, line: &str) -> Option<u64> {
    re.captures(line).and_then(|caps| parse_count(&caps[1]))
}

/// Parse the gate-level summary, `None` when no total, waived or non-waived
/// figure is present.
pub fn parse_summary(body: &str) -> Option<GateLevelMetrics> {
    let mut total = None;
    let mut waived = None;
    let mut non_waived = None;
    let mut checkers: Vec<CheckerCount> = Vec::new();

    for line in body.lines() {
        if let Some(v) = capture_count(non_waived_re(), line) {
            non_waived = Some(v);
        } else if let Some(v) = capture_count(waived_re(), line) {
            waived = Some(v);
        } else if let Some(v) = capture_count(total_re(), line) {
            total = Some(v);
        } else if let Some(caps) = checker_re().captures(line) {
            if let Some(count) = parse_count(&caps[2]) {
                checkers.push(CheckerCount {
                    checker: caps[1].to_string(),
                    count,
                });
            }
        }
    }

    if total.is_none() && waived.is_none() && non_waived.is_none() {
        return None;
    }

    let waived = waived.unwrap_or(0);
    let non_waived = non_waived.unwrap_or_else(|| total.unwrap_or(0).saturating_sub(waived));
    let total = total.unwrap_or(waived + non_waived);

    checkers.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.checker.cmp(&b.checker)));
    checkers.truncate(TOP_CHECKERS);

    Some(GateLevelMetrics {
        total,
        waived,
        non_waived,
        top_checkers: checkers,
    })
}

/// Verdict for the number of non-waived findings.
pub fn non_waived_status(non_waived: u64) -> Status {
    if non_waived == 0 {
        Status::Passed
    } else if non_waived < NON_WAIVED_FAIL_LIMIT {
        Status::Warn
    } else {
        Status::Failed
    }
}

/// Classifier for [`AnalysisDomain::GateLevelCheck`].
pub struct GateLevelClassifier;

impl Classifier for GateLevelClassifier {
    fn domain(&self) -> AnalysisDomain {
        AnalysisDomain::GateLevelCheck
    }

    fn classify(&self, raw: &str) -> Classification {
        let domain = AnalysisDomain::GateLevelCheck;
        let Some(body) = section_body(raw, domain) else {
            return Classification::not_found(domain);
        };
        let Some(metrics) = parse_summary(&body) else {
            return Classification::no_data(domain);
        };
        let status = non_waived_status(metrics.non_waived);
        let mut details = format!(
            "{} non-waived of {} ({} waived)",
            metrics.non_waived, metrics.total, metrics.waived
        );
        if let Some(top) = metrics.top_checkers.first() {
            details.push_str(&format!(", top checker {} ({})", top.checker, top.count));
        }
        Classification::new(status, details, Metrics::GateLevelCheck(metrics))
    }
}
