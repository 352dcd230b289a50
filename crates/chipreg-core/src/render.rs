//! Markdown rendering of a [`Report`].

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::Status;
use crate::report::Report;

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Render the report as a markdown summary.
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("# Regression Report\n\n");
    out.push_str(&format!(
        "- run: `{}`\n- generated: {}\n- units: {}\n",
        report.run_id,
        report.generated_at.to_rfc3339(),
        report.unit_count()
    ));
    if report.dry_run {
        out.push_str("- dry run: no analysis was executed\n");
    }
    out.push('\n');

    out.push_str("## Summary\n\n");
    for summary in &report.summaries {
        out.push_str(&format!("### {} ({} units)\n", summary.domain, summary.total));
        if summary.counts.is_empty() {
            out.push_str("- no results\n");
        }
        for c in &summary.counts {
            out.push_str(&format!("- {}: {} ({:.1}%)\n", c.status, c.count, c.percent));
        }
        out.push('\n');
    }

    for group in &report.chiplets {
        out.push_str(&format!("## Chiplet {}\n\n", group.chiplet));
        out.push_str("| unit |");
        for domain in &report.domains {
            out.push_str(&format!(" {} |", domain.slug()));
        }
        out.push_str("\n|---|");
        for _ in &report.domains {
            out.push_str("---|");
        }
        out.push('\n');

        for unit in &group.units {
            out.push_str(&format!("| {} |", escape_cell(&unit.name)));
            for domain in &report.domains {
                let cell = unit
                    .results
                    .get(domain)
                    .map_or(Status::Unknown.as_str(), |r| r.status.as_str());
                out.push_str(&format!(" {cell} |"));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    let blocking: Vec<_> = report
        .results()
        .filter(|(_, _, r)| r.status.is_blocking())
        .collect();
    if !blocking.is_empty() {
        out.push_str("## Blocking Results\n\n");
        for (unit, domain, result) in blocking {
            out.push_str(&format!(
                "- {} {} {}: {}\n",
                unit.name,
                domain.slug(),
                result.status,
                escape_cell(&result.details)
            ));
        }
    }
    out
}

/// Write `report.md`.
pub fn write_report_md(path: &Path, report: &Report) -> Result<()> {
    let md = render_markdown(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ResultAggregator;
    use crate::domain::unit::test_unit;
    use crate::domain::{AnalysisDomain, JobKey, JobResult};
    use crate::store::ResultStore;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn report() -> Report {
        let units = vec![test_unit(0, "alu", "core0"), test_unit(1, "phy", "io0")];
        let mut store = ResultStore::new();
        store.insert(
            JobKey::new(AnalysisDomain::Timing, 0),
            JobResult::exhausted(3, "timed out | killed", None),
        );
        store.insert(JobKey::new(AnalysisDomain::Timing, 1), JobResult::not_run());
        let mut report = ResultAggregator::new(&units).build_report(
            Uuid::nil(),
            &[AnalysisDomain::Timing],
            &store,
            false,
        );
        report.generated_at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("parse RFC3339")
            .with_timezone(&Utc);
        report
    }

    #[test]
    fn test_markdown_render_is_stable() {
        let actual = render_markdown(&report());
        let expected = "# Regression Report\n\n\
- run: `00000000-0000-0000-0000-000000000000`\n\
- generated: 2026-01-01T00:00:00+00:00\n\
- units: 2\n\n\
## Summary\n\n\
### TIMING (2 units)\n\
- ERROR: 1 (50.0%)\n\
- NOT_RUN: 1 (50.0%)\n\n\
## Chiplet core0\n\n\
| unit | timing |\n|---|---|\n| alu | ERROR |\n\n\
## Chiplet io0\n\n\
| unit | timing |\n|---|---|\n| phy | NOT_RUN |\n\n\
## Blocking Results\n\n\
- alu timing ERROR: analysis tool failed after 3 attempts: timed out \\| killed\n";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_dry_run_is_flagged() {
        let mut report = report();
        report.dry_run = true;
        assert!(render_markdown(&report).contains("dry run"));
    }
}
