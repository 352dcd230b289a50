//! Formal equivalence classification.
//!
//! Up to four flows are reported: two primary flows against the
//! placed-and-routed netlist and two secondary flows against the synthesized
//! netlist. The overall verdict is resolved by a fixed priority:
//!
//! 1. any flow `CRASHED` → `CRASHED`
//! 2. any primary flow `FAILED` → `FAILED`
//! 3. any flow `RUNNING` → `RUNNING`
//! 4. any flow `UNRESOLVED` → `UNRESOLVED`
//! 5. both primary flows passed, no secondary failure → `PASSED`
//! 6. at least one primary flow passed → `PARTIAL_PASS`
//! 7. no primary verdict but a secondary failure → `FAILED`
//! 8. otherwise `UNKNOWN`

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{parse_count, section_body, Classification, Classifier};
use crate::domain::{AnalysisDomain, Metrics, Status};

/// The equivalence flows the tool may report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FormalFlow {
    RtlVsPnr,
    RtlVsPnrBbox,
    RtlVsSyn,
    RtlVsSynBbox,
}

impl FormalFlow {
    pub fn name(&self) -> &'static str {
        match self {
            FormalFlow::RtlVsPnr => "rtl_vs_pnr",
            FormalFlow::RtlVsPnrBbox => "rtl_vs_pnr_bbox",
            FormalFlow::RtlVsSyn => "rtl_vs_syn",
            FormalFlow::RtlVsSynBbox => "rtl_vs_syn_bbox",
        }
    }

    /// Primary flows compare against the placed-and-routed netlist.
    pub fn is_primary(&self) -> bool {
        matches!(self, FormalFlow::RtlVsPnr | FormalFlow::RtlVsPnrBbox)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rtl_vs_pnr" | "rtl2pnr" => Some(FormalFlow::RtlVsPnr),
            "rtl_vs_pnr_bbox" | "rtl2pnr_bbox" => Some(FormalFlow::RtlVsPnrBbox),
            "rtl_vs_syn" | "rtl2syn" => Some(FormalFlow::RtlVsSyn),
            "rtl_vs_syn_bbox" | "rtl2syn_bbox" => Some(FormalFlow::RtlVsSynBbox),
            _ => None,
        }
    }
}

/// State of one flow as printed by the tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    Passed,
    Failed,
    Unresolved,
    Running,
    Crashed,
}

impl FlowState {
    fn parse(text: &str) -> Option<Self> {
        let key = text.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        let state = match key.as_str() {
            "PASSED" | "PASS" | "SUCCEEDED" | "SUCCESS" | "EQUIVALENT" => FlowState::Passed,
            "FAILED" | "FAIL" | "NON_EQUIVALENT" | "NONEQUIVALENT" => FlowState::Failed,
            "UNRESOLVED" | "INCONCLUSIVE" | "ABORTED" => FlowState::Unresolved,
            "RUNNING" | "IN_PROGRESS" => FlowState::Running,
            "CRASHED" | "CRASH" => FlowState::Crashed,
            _ => return None,
        };
        Some(state)
    }
}

/// One reported flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowResult {
    pub flow: FormalFlow,
    pub state: FlowState,
    pub failing_points: Option<u64>,
}

/// Metrics for the formal domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormalMetrics {
    /// Reported flows in canonical flow order.
    pub flows: Vec<FlowResult>,
}

impl FormalMetrics {
    fn state_of(&self, flow: FormalFlow) -> Option<FlowState> {
        self.flows.iter().find(|f| f.flow == flow).map(|f| f.state)
    }

    fn any(&self, state: FlowState, primary_only: bool) -> Option<&FlowResult> {
        self.flows
            .iter()
            .find(|f| f.state == state && (!primary_only || f.flow.is_primary()))
    }
}

fn flow_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:flow\s+)?([a-z0-9_]+)\s*:\s*(.+?)\s*$").expect("formal flow regex")
    })
}

fn points_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:(\d[\d,]*)\s+(?:failing|non-equivalent|nonequivalent)\s+points|(?:failing|non-equivalent|nonequivalent)\s+points\s*[:=]\s*(\d[\d,]*))",
        )
        .expect("failing points regex")
    })
}

/// Split the text after `flow:` into a state keyword and failing points.
/// Anything after the keyword (a parenthetical, a runtime) is annotation.
fn parse_verdict(text: &str) -> Option<(FlowState, Option<u64>)> {
    let head = text.split('(').next().unwrap_or(text);
    let state = FlowState::parse(head)
        .or_else(|| head.split_whitespace().next().and_then(FlowState::parse))?;
    let failing_points = points_re()
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .and_then(|m| parse_count(m.as_str()));
    Some((state, failing_points))
}

/// Parse every recognised flow line. A flow reported twice keeps its last
/// line.
pub fn parse_flows(body: &str) -> FormalMetrics {
    let mut flows: Vec<FlowResult> = Vec::new();
    for line in body.lines() {
        let Some(caps) = flow_line_re().captures(line) else {
            continue;
        };
        let (Some(flow), Some((state, failing_points))) =
            (FormalFlow::from_name(&caps[1]), parse_verdict(&caps[2]))
        else {
            continue;
        };
        let entry = FlowResult {
            flow,
            state,
            failing_points,
        };
        match flows.iter_mut().find(|f| f.flow == flow) {
            Some(existing) => *existing = entry,
            None => flows.push(entry),
        }
    }
    flows.sort_by_key(|f| f.flow);
    FormalMetrics { flows }
}

/// Resolve the overall formal verdict from the reported flows.
pub fn rollup(metrics: &FormalMetrics) -> (Status, String) {
    if let Some(f) = metrics.any(FlowState::Crashed, false) {
        return (Status::Crashed, format!("{} crashed", f.flow.name()));
    }
    if let Some(f) = metrics.any(FlowState::Failed, true) {
        return (Status::Failed, failed_details(f));
    }
    if let Some(f) = metrics.any(FlowState::Running, false) {
        return (Status::Running, format!("{} still running", f.flow.name()));
    }
    if let Some(f) = metrics.any(FlowState::Unresolved, false) {
        return (Status::Unresolved, format!("{} unresolved", f.flow.name()));
    }

    let primary_passed: Vec<FormalFlow> = [FormalFlow::RtlVsPnr, FormalFlow::RtlVsPnrBbox]
        .into_iter()
        .filter(|flow| metrics.state_of(*flow) == Some(FlowState::Passed))
        .collect();
    let secondary_failure = metrics.any(FlowState::Failed, false);

    match (primary_passed.len(), secondary_failure) {
        (2, None) => (Status::Passed, "both primary flows passed".to_string()),
        (2, Some(f)) => (
            Status::PartialPass,
            format!("primary flows passed, {}", failed_details(f)),
        ),
        (1, _) => (
            Status::PartialPass,
            format!("only {} passed", primary_passed[0].name()),
        ),
        (_, Some(f)) => (Status::Failed, failed_details(f)),
        _ => (Status::Unknown, "no primary flow verdict".to_string()),
    }
}

fn failed_details(flow: &FlowResult) -> String {
    match flow.failing_points {
        Some(points) => format!("{} failed ({} failing points)", flow.flow.name(), points),
        None => format!("{} failed", flow.flow.name()),
    }
}

/// Classifier for [`AnalysisDomain::Formal`].
pub struct FormalClassifier;

impl Classifier for FormalClassifier {
    fn domain(&self) -> AnalysisDomain {
        AnalysisDomain::Formal
    }

    fn classify(&self, raw: &str) -> Classification {
        let Some(body) = section_body(raw, AnalysisDomain::Formal) else {
            return Classification::not_found(AnalysisDomain::Formal);
        };
        let metrics = parse_flows(&body);
        if metrics.flows.is_empty() {
            return Classification::no_data(AnalysisDomain::Formal);
        }
        let (status, details) = rollup(&metrics);
        Classification::new(status, details, Metrics::Formal(metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(body: &str) -> Classification {
        FormalClassifier.classify(&format!("===== FORMAL =====\n{body}"))
    }

    #[test]
    fn test_both_primary_flows_passed() {
        let c = classify(
            "rtl_vs_pnr : PASSED\nrtl_vs_pnr_bbox : SUCCEEDED\nrtl_vs_syn : PASSED\n",
        );
        assert_eq!(c.status, Status::Passed);
    }

    #[test]
    fn test_primary_pass_secondary_fail_is_partial_pass() {
        let c = classify(
            "rtl_vs_pnr : PASSED\nrtl_vs_pnr_bbox : PASSED\nrtl_vs_syn : FAILED (failing points: 14)\n",
        );
        assert_eq!(c.status, Status::PartialPass);
        assert!(c.details.contains("14 failing points"));
    }

    #[test]
    fn test_single_primary_pass_is_partial_pass() {
        let c = classify("rtl_vs_pnr : PASSED\n");
        assert_eq!(c.status, Status::PartialPass);
        assert!(c.details.contains("rtl_vs_pnr"));
    }

    #[test]
    fn test_crash_outranks_everything() {
        let c = classify(
            "rtl_vs_pnr : FAILED\nrtl_vs_pnr_bbox : RUNNING\nrtl_vs_syn_bbox : CRASHED\n",
        );
        assert_eq!(c.status, Status::Crashed);
        assert!(c.details.contains("rtl_vs_syn_bbox"));
    }

    #[test]
    fn test_primary_failure_outranks_running() {
        let c = classify("rtl_vs_pnr : RUNNING\nrtl_vs_pnr_bbox : NON-EQUIVALENT\n");
        assert_eq!(c.status, Status::Failed);
    }

    #[test]
    fn test_running_outranks_unresolved() {
        let c = classify("rtl_vs_pnr : IN PROGRESS\nrtl_vs_pnr_bbox : INCONCLUSIVE\n");
        assert_eq!(c.status, Status::Running);
    }

    #[test]
    fn test_unresolved_outranks_pass() {
        let c = classify("rtl_vs_pnr : PASSED\nrtl_vs_pnr_bbox : ABORTED\n");
        assert_eq!(c.status, Status::Unresolved);
    }

    #[test]
    fn test_only_secondary_failure_is_failed() {
        let c = classify("rtl_vs_syn : FAILED\n");
        assert_eq!(c.status, Status::Failed);
    }

    #[test]
    fn test_only_secondary_pass_is_unknown() {
        let c = classify("Flow rtl_vs_syn: PASSED\n");
        assert_eq!(c.status, Status::Unknown);
    }

    #[test]
    fn test_section_without_flows_is_no_data() {
        let c = classify("tool license unavailable\n");
        assert_eq!(c.status, Status::NoData);
    }

    #[test]
    fn test_crash_with_annotation_is_not_dropped() {
        let c = classify("Flow rtl_vs_pnr: CRASHED (core dumped)\nFlow rtl_vs_pnr_bbox: PASSED\n");
        assert_eq!(c.status, Status::Crashed);
        assert!(c.details.contains("rtl_vs_pnr crashed"));
    }

    #[test]
    fn test_primary_failure_with_point_count_annotation() {
        let c = classify("rtl_vs_pnr : FAILED (14 non-equivalent points)\nrtl_vs_pnr_bbox : PASSED\n");
        assert_eq!(c.status, Status::Failed);
        assert!(c.details.contains("14 failing points"));
    }

    #[test]
    fn test_trailing_runtime_after_state() {
        let metrics = parse_flows("rtl_vs_pnr : PASSED in 3h12m\nrtl_vs_syn : FAILED (see lec.log, failing points: 1,204)\n");
        assert_eq!(metrics.flows.len(), 2);
        assert_eq!(metrics.flows[0].state, FlowState::Passed);
        assert_eq!(metrics.flows[1].state, FlowState::Failed);
        assert_eq!(metrics.flows[1].failing_points, Some(1204));
    }

    #[test]
    fn test_last_line_for_a_flow_wins() {
        let metrics = parse_flows("rtl_vs_pnr : RUNNING\nrtl_vs_pnr : PASSED\n");
        assert_eq!(metrics.flows.len(), 1);
        assert_eq!(metrics.flows[0].state, FlowState::Passed);
    }

    #[test]
    fn test_unknown_flow_names_are_ignored() {
        let metrics = parse_flows("rtl_vs_gate : FAILED\nrtl2pnr : PASSED\n");
        assert_eq!(metrics.flows.len(), 1);
        assert_eq!(metrics.flows[0].flow, FormalFlow::RtlVsPnr);
    }
}
