//! Clock tree classification by insertion latency.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{parse_f64, section_body, Classification, Classifier};
use crate::domain::{AnalysisDomain, Metrics, Status};

/// Latencies up to and including this value (ps) pass.
pub const LATENCY_PASS_LIMIT_PS: f64 = 550.0;
/// Latencies at or above this value (ps) fail.
pub const LATENCY_FAIL_LIMIT_PS: f64 = 580.0;

/// Latency and skew of one clock, in picoseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockLatency {
    pub name: String,
    pub latency_ps: f64,
    pub skew_ps: Option<f64>,
}

/// Metrics for the clock domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockMetrics {
    pub clocks: Vec<ClockLatency>,
    /// Highest latency across all clocks.
    pub worst_latency_ps: f64,
    pub worst_clock: String,
}

fn clock_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*clock\s*[:=]?\s*([A-Za-z0-9_./\[\]-]+)").expect("clock name regex")
    })
}

fn latency_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\blatency\s*[:=]\s*([+-]?\d+(?:\.\d+)?)\s*(ps|ns)?")
            .expect("latency regex")
    })
}

fn skew_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bskew\s*[:=]\s*([+-]?\d+(?:\.\d+)?)\s*(ps|ns)?").expect("skew regex")
    })
}

fn to_ps(value: &str, unit: Option<regex::Match<'_>>) -> Option<f64> {
    let value = parse_f64(value)?;
    match unit.map(|u| u.as_str().to_ascii_lowercase()) {
        Some(u) if u == "ns" => Some(value * 1000.0),
        _ => Some(value),
    }
}

/// Parse every `Clock <name> ... latency: <v>` line.
pub fn parse_clocks(body: &str) -> Vec<ClockLatency> {
    let mut clocks = Vec::new();
    for line in body.lines() {
        let Some(name) = clock_name_re().captures(line) else {
            continue;
        };
        let Some(latency) = latency_re()
            .captures(line)
            .and_then(|caps| to_ps(&caps[1], caps.get(2)))
        else {
            continue;
        };
        let skew_ps = skew_re()
            .captures(line)
            .and_then(|caps| to_ps(&caps[1], caps.get(2)));
        clocks.push(ClockLatency {
            name: name[1].to_string(),
            latency_ps: latency,
            skew_ps,
        });
    }
    clocks
}

/// Verdict for the worst clock latency in ps.
pub fn latency_status(worst_ps: f64) -> Status {
    if worst_ps <= LATENCY_PASS_LIMIT_PS {
        Status::Passed
    } else if worst_ps < LATENCY_FAIL_LIMIT_PS {
        Status::Warn
    } else {
        Status::Failed
    }
}

/// Classifier for [`AnalysisDomain::Clock`].
pub struct ClockClassifier;

impl Classifier for ClockClassifier {
    fn domain(&self) -> AnalysisDomain {
        AnalysisDomain::Clock
    }

    fn classify(&self, raw: &str) -> Classification {
        let Some(body) = section_body(raw, AnalysisDomain::Clock) else {
            return Classification::not_found(AnalysisDomain::Clock);
        };
        let clocks = parse_clocks(&body);
        let Some(worst) = clocks
            .iter()
            .max_by(|a, b| a.latency_ps.total_cmp(&b.latency_ps))
            .cloned()
        else {
            return Classification::no_data(AnalysisDomain::Clock);
        };

        let status = latency_status(worst.latency_ps);
        let details = format!(
            "max latency {:.1} ps on {} ({} clock{})",
            worst.latency_ps,
            worst.name,
            clocks.len(),
            if clocks.len() == 1 { "" } else { "s" }
        );
        let metrics = ClockMetrics {
            clocks,
            worst_latency_ps: worst.latency_ps,
            worst_clock: worst.name,
        };
        Classification::new(status, details, Metrics::Clock(metrics))
    }
}
