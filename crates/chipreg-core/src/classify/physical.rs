//! Physical verification classification (DRC, LVS, antenna).

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{parse_count, section_body, Classification, Classifier};
use crate::domain::{AnalysisDomain, Metrics, Status};

/// More failing LVS equivalence points than this fails the unit.
pub const LVS_FAIL_LIMIT: u64 = 5;
/// More DRC violations than this fails the unit.
pub const DRC_FAIL_LIMIT: u64 = 100;
/// More antenna violations than this fails the unit.
pub const ANTENNA_FAIL_LIMIT: u64 = 10;

/// Metrics for the physical verification domain. `None` means the counter
/// was not reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PhysicalMetrics {
    pub drc: Option<u64>,
    pub lvs: Option<u64>,
    pub antenna: Option<u64>,
}

fn counter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(drc|lvs|antenna)\b[^:=\n]*[:=]\s*(clean|[\d,]+)").expect("pv regex")
    })
}

/// Extract the three counters. `CLEAN` reads as zero.
pub fn parse_counters(body: &str) -> PhysicalMetrics {
    let mut metrics = PhysicalMetrics::default();
    for line in body.lines() {
        let Some(caps) = counter_re().captures(line) else {
            continue;
        };
        let value = if caps[2].eq_ignore_ascii_case("clean") {
            Some(0)
        } else {
            parse_count(&caps[2])
        };
        match caps[1].to_ascii_lowercase().as_str() {
            "drc" => metrics.drc = value,
            "lvs" => metrics.lvs = value,
            _ => metrics.antenna = value,
        }
    }
    metrics
}

/// Verdict for the three counters.
pub fn counters_status(drc: u64, lvs: u64, antenna: u64) -> Status {
    if drc == 0 && lvs == 0 && antenna == 0 {
        Status::Passed
    } else if lvs > LVS_FAIL_LIMIT || drc > DRC_FAIL_LIMIT || antenna > ANTENNA_FAIL_LIMIT {
        Status::Failed
    } else {
        Status::Warn
    }
}

/// Classifier for [`AnalysisDomain::PhysicalVerification`].
pub struct PhysicalClassifier;

impl Classifier for PhysicalClassifier {
    fn domain(&self) -> AnalysisDomain {
        AnalysisDomain::PhysicalVerification
    }

    fn classify(&self, raw: &str) -> Classification {
        let domain = AnalysisDomain::PhysicalVerification;
        let Some(body) = section_body(raw, domain) else {
            return Classification::not_found(domain);
        };
        let metrics = parse_counters(&body);
        if metrics.drc.is_none() && metrics.lvs.is_none() && metrics.antenna.is_none() {
            return Classification::no_data(domain);
        }

        let drc = metrics.drc.unwrap_or(0);
        let lvs = metrics.lvs.unwrap_or(0);
        let antenna = metrics.antenna.unwrap_or(0);
        let status = counters_status(drc, lvs, antenna);

        let mut details = format!("DRC {drc}, LVS {lvs}, antenna {antenna}");
        let unreported: Vec<&str> = [
            ("DRC", metrics.drc),
            ("LVS", metrics.lvs),
            ("antenna", metrics.antenna),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| name)
        .collect();
        if !unreported.is_empty() {
            details.push_str(&format!(" ({} not reported)", unreported.join(", ")));
        }

        Classification::new(status, details, Metrics::PhysicalVerification(metrics))
    }
}
