//! Classifiers against complete analysis tool transcripts.

use chipreg_core::{classify, AnalysisDomain, Metrics, Status};

const FULL_TRANSCRIPT: &str = "\
unit_status 4.2.1 (c) release tooling
workarea: /proj/rel/core0/alu
===== FORMAL =====
Flow rtl_vs_pnr: PASSED
Flow rtl_vs_pnr_bbox: PASSED
Flow rtl_vs_syn: FAILED (failing points: 3)
Flow rtl_vs_syn_bbox: PASSED
===== TIMING =====
Scenario: setup
WNS: -0.10 ns
TNS: -12.4
NVP: 58
Scenario: hold
WNS: -0.02 ns
TNS: -0.1
NVP: 3
===== PV =====
DRC violations: 10
LVS failed equivalence points: 0
Antenna violations: 0
===== CLOCK =====
Clock clk_core latency: 548.0 ps skew: 22.0 ps
Clock clk_noc  latency: 0.551 ns skew: 0.018 ns
===== RELEASE =====
Release attempt 1 (2024-04-30 jdoe): FAILED
Release attempt 2 (2024-05-01 jdoe): SUCCESS
===== GLC =====
Total errors: 212
Waived: 212
Non-waived: 0
Checker reset_sync: 120
Checker x_prop: 92
";

fn status(domain: AnalysisDomain) -> Status {
    classify(domain, FULL_TRANSCRIPT).status
}

#[test]
fn test_each_domain_reads_only_its_section() {
    assert_eq!(status(AnalysisDomain::Formal), Status::PartialPass);
    assert_eq!(status(AnalysisDomain::Timing), Status::Failed);
    assert_eq!(status(AnalysisDomain::PhysicalVerification), Status::Warn);
    assert_eq!(status(AnalysisDomain::Clock), Status::Warn);
    assert_eq!(status(AnalysisDomain::Release), Status::Warn);
    assert_eq!(status(AnalysisDomain::GateLevelCheck), Status::Passed);
}

#[test]
fn test_timing_worst_wns_across_scenarios() {
    let c = classify(AnalysisDomain::Timing, FULL_TRANSCRIPT);
    let Metrics::Timing(m) = c.metrics else {
        panic!("expected timing metrics");
    };
    assert_eq!(m.worst_wns, -0.10);
}

#[test]
fn test_clock_units_are_normalised() {
    let c = classify(AnalysisDomain::Clock, FULL_TRANSCRIPT);
    let Metrics::Clock(m) = c.metrics else {
        panic!("expected clock metrics");
    };
    assert_eq!(m.worst_clock, "clk_noc");
    assert!((m.worst_latency_ps - 551.0).abs() < 1e-9);
}

#[test]
fn test_crashed_flow_dominates_formal() {
    let raw = "===== FORMAL =====\n\
               Flow rtl_vs_pnr: PASSED\n\
               Flow rtl_vs_pnr_bbox: PASSED\n\
               Flow rtl_vs_syn_bbox: CRASHED\n";
    assert_eq!(classify(AnalysisDomain::Formal, raw).status, Status::Crashed);
}

#[test]
fn test_physical_lvs_limit() {
    let raw = "===== PV =====\nDRC violations: 0\nLVS failed equivalence points: 6\nAntenna violations: 0\n";
    assert_eq!(
        classify(AnalysisDomain::PhysicalVerification, raw).status,
        Status::Failed
    );
}

#[test]
fn test_tool_error_text_is_an_absence_state() {
    let raw = "unit_status: error: workarea locked by another process\n";
    for domain in AnalysisDomain::ALL {
        let c = classify(domain, raw);
        assert!(!c.status.is_domain_outcome(), "{domain}: {}", c.status);
    }
}

#[test]
fn test_classification_is_deterministic_and_closed() {
    let fragments = [
        "",
        "=====\n",
        "===== TIMING =====\n",
        "===== TIMING =====\nWNS: abc\n",
        "===== FORMAL =====\nrtl_vs_pnr : ???\n",
        "===== CLOCK =====\nClock latency: -5 ps\n",
        FULL_TRANSCRIPT,
    ];
    for raw in fragments {
        for domain in AnalysisDomain::ALL {
            let a = classify(domain, raw);
            let b = classify(domain, raw);
            assert_eq!(a, b);
            assert!(Status::ALL.contains(&a.status));
        }
    }
}
