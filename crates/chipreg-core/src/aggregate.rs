//! Turn per-job results into domain summaries and chiplet groups.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{AnalysisDomain, JobKey, Status, Unit};
use crate::report::{ChipletGroup, DomainSummary, Report, StatusCount, UnitRow, REPORT_SCHEMA_VERSION};
use crate::store::ResultStore;

/// Aggregates results of a set of units.
///
/// Units are ordered by catalog index up front, so neither the order they
/// were passed in nor the order jobs completed changes the outcome.
#[derive(Debug, Clone)]
pub struct ResultAggregator<'a> {
    units: Vec<&'a Unit>,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(units: &'a [Unit]) -> Self {
        let mut units: Vec<&Unit> = units.iter().collect();
        units.sort_by_key(|u| u.index);
        Self { units }
    }

    /// Status distribution of one domain over all units. A unit without a
    /// result counts as `UNKNOWN`.
    pub fn summarize(&self, domain: AnalysisDomain, store: &ResultStore) -> DomainSummary {
        let mut tally: BTreeMap<Status, usize> = BTreeMap::new();
        for unit in &self.units {
            let status = store
                .get(&JobKey::new(domain, unit.index))
                .map_or(Status::Unknown, |r| r.status);
            *tally.entry(status).or_default() += 1;
        }

        let total = self.units.len();
        let counts = Status::ALL
            .iter()
            .filter_map(|status| {
                let count = tally.get(status).copied().unwrap_or(0);
                (count > 0).then(|| StatusCount {
                    status: *status,
                    count,
                    percent: percent(count, total),
                })
            })
            .collect();

        debug!(domain = %domain, total, "Summarized domain");
        DomainSummary {
            domain,
            total,
            counts,
        }
    }

    /// Group units by chiplet in order of first appearance, each with its
    /// results for `domains`.
    pub fn group_by_chiplet(
        &self,
        domains: &[AnalysisDomain],
        store: &ResultStore,
    ) -> Vec<ChipletGroup> {
        let mut groups: Vec<ChipletGroup> = Vec::new();
        for unit in &self.units {
            let results = domains
                .iter()
                .filter_map(|d| {
                    store
                        .get(&JobKey::new(*d, unit.index))
                        .map(|r| (*d, r.clone()))
                })
                .collect();
            let row = UnitRow {
                index: unit.index,
                name: unit.name.clone(),
                workarea: unit.workarea.clone(),
                rtl_tag: unit.rtl_tag.clone(),
                release_date: unit.release_date.clone(),
                release_user: unit.release_user.clone(),
                results,
            };
            match groups.iter_mut().find(|g| g.chiplet == unit.chiplet) {
                Some(group) => group.units.push(row),
                None => groups.push(ChipletGroup {
                    chiplet: unit.chiplet.clone(),
                    units: vec![row],
                }),
            }
        }
        groups
    }

    /// Build the full report for a run.
    pub fn build_report(
        &self,
        run_id: Uuid,
        domains: &[AnalysisDomain],
        store: &ResultStore,
        dry_run: bool,
    ) -> Report {
        Report {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id,
            generated_at: Utc::now(),
            dry_run,
            domains: domains.to_vec(),
            summaries: domains.iter().map(|d| self.summarize(*d, store)).collect(),
            chiplets: self.group_by_chiplet(domains, store),
        }
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}
