//! Analysis domains and the tool sections each one requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ChipregError;

/// The six analysis domains a regression can run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisDomain {
    Formal,
    Timing,
    PhysicalVerification,
    Clock,
    Release,
    GateLevelCheck,
}

impl AnalysisDomain {
    /// Every domain, in processing order.
    pub const ALL: [AnalysisDomain; 6] = [
        AnalysisDomain::Formal,
        AnalysisDomain::Timing,
        AnalysisDomain::PhysicalVerification,
        AnalysisDomain::Clock,
        AnalysisDomain::Release,
        AnalysisDomain::GateLevelCheck,
    ];

    /// Canonical upper-case name used in state logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisDomain::Formal => "FORMAL",
            AnalysisDomain::Timing => "TIMING",
            AnalysisDomain::PhysicalVerification => "PHYSICAL_VERIFICATION",
            AnalysisDomain::Clock => "CLOCK",
            AnalysisDomain::Release => "RELEASE",
            AnalysisDomain::GateLevelCheck => "GATE_LEVEL_CHECK",
        }
    }

    /// Short lower-case name, also used for artifact directories.
    pub fn slug(&self) -> &'static str {
        match self {
            AnalysisDomain::Formal => "formal",
            AnalysisDomain::Timing => "timing",
            AnalysisDomain::PhysicalVerification => "pv",
            AnalysisDomain::Clock => "clock",
            AnalysisDomain::Release => "release",
            AnalysisDomain::GateLevelCheck => "glc",
        }
    }

    /// Section names passed to the analysis tool for this domain.
    pub fn sections(&self) -> &'static [&'static str] {
        match self {
            AnalysisDomain::Formal => &["formal"],
            AnalysisDomain::Timing => &["timing"],
            AnalysisDomain::PhysicalVerification => &["pv"],
            AnalysisDomain::Clock => &["clock"],
            AnalysisDomain::Release => &["release"],
            AnalysisDomain::GateLevelCheck => &["glc"],
        }
    }

    /// Banner titles the classifier accepts for this domain's section.
    pub fn section_aliases(&self) -> &'static [&'static str] {
        match self {
            AnalysisDomain::Formal => &["formal", "formal verification", "lec"],
            AnalysisDomain::Timing => &["timing", "sta"],
            AnalysisDomain::PhysicalVerification => {
                &["pv", "physical", "physical verification"]
            }
            AnalysisDomain::Clock => &["clock", "cts", "clock tree"],
            AnalysisDomain::Release => &["release", "release history"],
            AnalysisDomain::GateLevelCheck => &["glc", "gate level check", "gate_level"],
        }
    }

    /// Parse a comma-separated domain list. Empty input selects every domain.
    pub fn parse_list(input: &str) -> Result<Vec<AnalysisDomain>, ChipregError> {
        let mut domains = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                return Ok(AnalysisDomain::ALL.to_vec());
            }
            let domain: AnalysisDomain = part.parse()?;
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        if domains.is_empty() {
            return Ok(AnalysisDomain::ALL.to_vec());
        }
        Ok(domains)
    }
}

impl fmt::Display for AnalysisDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisDomain {
    type Err = ChipregError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        let domain = match key.as_str() {
            "formal" | "lec" => AnalysisDomain::Formal,
            "timing" | "sta" => AnalysisDomain::Timing,
            "physical_verification" | "physical" | "pv" => AnalysisDomain::PhysicalVerification,
            "clock" | "cts" => AnalysisDomain::Clock,
            "release" => AnalysisDomain::Release,
            "gate_level_check" | "gate_level" | "glc" => AnalysisDomain::GateLevelCheck,
            _ => return Err(ChipregError::UnknownDomain(s.to_string())),
        };
        Ok(domain)
    }
}
