//! Output classifiers: raw analysis-tool text in, typed verdict out.
//!
//! Each analysis domain has one [`Classifier`]. Classifiers are pure: the
//! same text always produces the same [`Classification`] and nothing outside
//! the returned value is touched.
//!
//! The tool prints one banner per requested section, e.g.
//!
//! ```text
//! ===== TIMING =====
//! Scenario: setup
//! WNS: -0.012
//! ```
//!
//! A section that is absent from the text classifies as
//! [`Status::NotFound`]; a section that is present but carries no usable
//! numbers classifies as [`Status::NoData`].

pub mod clock;
pub mod formal;
pub mod gate_level;
pub mod physical;
pub mod release;
pub mod timing;

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{AnalysisDomain, Metrics, Status};

/// Verdict produced by a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: Status,
    pub details: String,
    pub metrics: Metrics,
}

impl Classification {
    pub fn new(status: Status, details: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            status,
            details: details.into(),
            metrics,
        }
    }

    /// The domain's section banner is not in the output.
    pub fn not_found(domain: AnalysisDomain) -> Self {
        Self::new(
            Status::NotFound,
            format!("{} section not found in tool output", domain.slug()),
            Metrics::None,
        )
    }

    /// The section exists but holds nothing usable.
    pub fn no_data(domain: AnalysisDomain) -> Self {
        Self::new(
            Status::NoData,
            format!("{} section has no usable data", domain.slug()),
            Metrics::None,
        )
    }
}

/// Strategy interface implemented once per analysis domain.
pub trait Classifier: Send + Sync {
    /// Domain this classifier handles.
    fn domain(&self) -> AnalysisDomain;

    /// Classify the full raw tool output.
    fn classify(&self, raw: &str) -> Classification;
}

/// The classifier for `domain`.
pub fn classifier_for(domain: AnalysisDomain) -> &'static dyn Classifier {
    match domain {
        AnalysisDomain::Formal => &formal::FormalClassifier,
        AnalysisDomain::Timing => &timing::TimingClassifier,
        AnalysisDomain::PhysicalVerification => &physical::PhysicalClassifier,
        AnalysisDomain::Clock => &clock::ClockClassifier,
        AnalysisDomain::Release => &release::ReleaseClassifier,
        AnalysisDomain::GateLevelCheck => &gate_level::GateLevelClassifier,
    }
}

/// Classify `raw` with the classifier for `domain`.
pub fn classify(domain: AnalysisDomain, raw: &str) -> Classification {
    classifier_for(domain).classify(raw)
}

// ---------------------------------------------------------------------------
// Section extraction
// ---------------------------------------------------------------------------

fn banner_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*={3,}\s*([^=\s][^=]*?)\s*={3,}\s*$").expect("banner regex"))
}

/// Body of the first section whose banner title matches one of the domain's
/// aliases, or `None` when the tool did not emit it.
pub fn section_body(raw: &str, domain: AnalysisDomain) -> Option<String> {
    let aliases = domain.section_aliases();
    let mut body: Option<Vec<&str>> = None;

    for line in raw.lines() {
        if let Some(caps) = banner_re().captures(line) {
            if body.is_some() {
                break;
            }
            let title = caps[1].trim().to_ascii_lowercase().replace(['_', '-'], " ");
            if aliases
                .iter()
                .any(|alias| alias.replace(['_', '-'], " ") == title)
            {
                body = Some(Vec::new());
            }
            continue;
        }
        if let Some(lines) = body.as_mut() {
            lines.push(line);
        }
    }

    body.map(|lines| lines.join("\n"))
}

/// Parse a float, tolerating a leading `+` and thousands separators.
pub(crate) fn parse_f64(text: &str) -> Option<f64> {
    text.trim().trim_start_matches('+').replace(',', "").parse().ok()
}

/// Parse a non-negative count, tolerating thousands separators.
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    text.trim().replace(',', "").parse().ok()
}
