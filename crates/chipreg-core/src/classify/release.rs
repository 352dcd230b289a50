//! Release history classification.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{section_body, Classification, Classifier};
use crate::domain::{AnalysisDomain, Metrics, Status};

/// Metrics for the release domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseMetrics {
    pub succeeded: u32,
    pub failed: u32,
    /// The most recent attempt line, as printed.
    pub latest: Option<String>,
}

fn attempt_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\brelease\s+attempt\b.*?[:=]\s*(success|succeeded|ok|passed|fail|failed|error)\b",
        )
        .expect("release attempt regex")
    })
}

/// Count successful and failed release attempts.
pub fn parse_attempts(body: &str) -> ReleaseMetrics {
    let mut metrics = ReleaseMetrics::default();
    for line in body.lines() {
        let Some(caps) = attempt_re().captures(line) else {
            continue;
        };
        match caps[1].to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "ok" | "passed" => metrics.succeeded += 1,
            _ => metrics.failed += 1,
        }
        metrics.latest = Some(line.trim().to_string());
    }
    metrics
}

/// Verdict for the attempt counts.
pub fn attempts_status(succeeded: u32, failed: u32) -> Status {
    match (succeeded, failed) {
        (0, 0) => Status::NotFound,
        (_, 0) => Status::Passed,
        (0, _) => Status::Failed,
        _ => Status::Warn,
    }
}

/// Classifier for [`AnalysisDomain::Release`].
pub struct ReleaseClassifier;

impl Classifier for ReleaseClassifier {
    fn domain(&self) -> AnalysisDomain {
        AnalysisDomain::Release
    }

    fn classify(&self, raw: &str) -> Classification {
        let Some(body) = section_body(raw, AnalysisDomain::Release) else {
            return Classification::not_found(AnalysisDomain::Release);
        };
        let metrics = parse_attempts(&body);
        let status = attempts_status(metrics.succeeded, metrics.failed);
        let details = if status == Status::NotFound {
            "no release attempts recorded".to_string()
        } else {
            format!(
                "{} of {} release attempts succeeded",
                metrics.succeeded,
                metrics.succeeded + metrics.failed
            )
        };
        Classification::new(status, details, Metrics::Release(metrics))
    }
}
