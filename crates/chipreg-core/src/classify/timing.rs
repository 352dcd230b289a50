//! Static timing classification.
//!
//! Setup and hold are scored independently; the verdict uses the worse
//! (more negative) WNS of the two.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{parse_count, parse_f64, section_body, Classification, Classifier};
use crate::domain::{AnalysisDomain, Metrics, Status};

/// Negative slack beyond this magnitude (ns) fails the unit.
pub const WNS_FAIL_THRESHOLD_NS: f64 = 0.05;

/// Slack figures of one timing scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSlack {
    pub wns: Option<f64>,
    pub tns: Option<f64>,
    pub nvp: Option<u64>,
}

impl ScenarioSlack {
    fn is_empty(&self) -> bool {
        self.wns.is_none() && self.tns.is_none() && self.nvp.is_none()
    }
}

/// Metrics for the timing domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingMetrics {
    pub setup: Option<ScenarioSlack>,
    pub hold: Option<ScenarioSlack>,
    /// `min(setup_wns, hold_wns)` over the scenarios that reported a WNS.
    pub worst_wns: f64,
    /// `min(setup_tns, hold_tns)` over the scenarios that reported a TNS.
    pub worst_tns: Option<f64>,
    /// Violating paths summed over both scenarios.
    pub violating_paths: Option<u64>,
}

#[derive(Clone, Copy, PartialEq)]
enum Scenario {
    Setup,
    Hold,
}

fn scenario_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:scenario\s*[:=]?\s*)?(setup|hold)\b").expect("scenario regex")
    })
}

fn value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(wns|tns|nvp)\s*[:=]\s*([+-]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?)")
            .expect("slack regex")
    })
}

/// Extract per-scenario slack. Values printed before any scenario header are
/// ignored.
pub fn parse_scenarios(body: &str) -> (ScenarioSlack, ScenarioSlack) {
    let mut setup = ScenarioSlack::default();
    let mut hold = ScenarioSlack::default();
    let mut current: Option<Scenario> = None;

    for line in body.lines() {
        if let Some(caps) = scenario_re().captures(line) {
            current = Some(if caps[1].eq_ignore_ascii_case("setup") {
                Scenario::Setup
            } else {
                Scenario::Hold
            });
        }
        let Some(scenario) = current else {
            continue;
        };
        let target = match scenario {
            Scenario::Setup => &mut setup,
            Scenario::Hold => &mut hold,
        };
        for caps in value_re().captures_iter(line) {
            let value = &caps[2];
            match caps[1].to_ascii_lowercase().as_str() {
                "wns" => target.wns = parse_f64(value),
                "tns" => target.tns = parse_f64(value),
                _ => target.nvp = parse_count(value),
            }
        }
    }
    (setup, hold)
}

/// Verdict for a worst-negative-slack value in ns.
pub fn wns_status(worst_wns: f64) -> Status {
    if worst_wns >= 0.0 {
        Status::Passed
    } else if worst_wns.abs() > WNS_FAIL_THRESHOLD_NS {
        Status::Failed
    } else {
        Status::Warn
    }
}

fn min_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Combine setup and hold into the domain metrics, `None` when neither
/// scenario reported a WNS.
pub fn combine(setup: ScenarioSlack, hold: ScenarioSlack) -> Option<TimingMetrics> {
    let worst_wns = min_opt(setup.wns, hold.wns)?;
    let worst_tns = min_opt(setup.tns, hold.tns);
    let violating_paths = match (setup.nvp, hold.nvp) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
    };
    Some(TimingMetrics {
        setup: (!setup.is_empty()).then_some(setup),
        hold: (!hold.is_empty()).then_some(hold),
        worst_wns,
        worst_tns,
        violating_paths,
    })
}

fn details(metrics: &TimingMetrics) -> String {
    let worst_from = match (&metrics.setup, &metrics.hold) {
        (Some(s), Some(h)) => match (s.wns, h.wns) {
            (Some(sw), Some(hw)) if hw < sw => "hold",
            (None, Some(_)) => "hold",
            _ => "setup",
        },
        (None, Some(_)) => "hold",
        _ => "setup",
    };
    let mut out = format!("WNS {:.3} ns ({worst_from})", metrics.worst_wns);
    if let Some(tns) = metrics.worst_tns {
        out.push_str(&format!(", TNS {tns:.3} ns"));
    }
    if let Some(nvp) = metrics.violating_paths {
        out.push_str(&format!(", {nvp} violating paths"));
    }
    out
}

/// Classifier for [`AnalysisDomain::Timing`].
pub struct TimingClassifier;

impl Classifier for TimingClassifier {
    fn domain(&self) -> AnalysisDomain {
        AnalysisDomain::Timing
    }

    fn classify(&self, raw: &str) -> Classification {
        let Some(body) = section_body(raw, AnalysisDomain::Timing) else {
            return Classification::not_found(AnalysisDomain::Timing);
        };
        let (setup, hold) = parse_scenarios(&body);
        let Some(metrics) = combine(setup, hold) else {
            return Classification::no_data(AnalysisDomain::Timing);
        };
        let status = wns_status(metrics.worst_wns);
        Classification::new(status, details(&metrics), Metrics::Timing(metrics))
    }
}
