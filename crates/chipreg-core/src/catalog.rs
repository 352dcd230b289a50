//! Unit catalog loading, release selection and filtering.
//!
//! The catalog is a delimited text table, one release of one unit per row:
//!
//! ```text
//! # unit, chiplet, workarea, rtl_tag, release_types, release_date, release_user
//! alu, core0, /proj/rel/core0/alu, rtl_v3, default;pd, 2024-05-01, jdoe
//! ```
//!
//! Several rows may describe the same unit for different release types.
//! [`UnitCatalog::select_release`] keeps exactly one row per unit and assigns
//! the stable unit indices used by job keys.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::{CatalogError, ChipregError, Result, Unit};

/// Release flag marking a unit's default release row.
pub const DEFAULT_RELEASE: &str = "default";

/// Minimum number of fields a row must carry (unit, chiplet, workarea).
const REQUIRED_FIELDS: usize = 3;

/// A catalog row before release selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub name: String,
    pub chiplet: String,
    pub workarea: PathBuf,
    pub rtl_tag: Option<String>,
    pub release_types: Vec<String>,
    pub release_date: String,
    pub release_user: String,
}

impl CatalogRow {
    fn has_release_type(&self, release: &str) -> bool {
        self.release_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(release))
    }

    fn into_unit(self, index: usize) -> Unit {
        Unit {
            index,
            name: self.name,
            chiplet: self.chiplet,
            workarea: self.workarea,
            rtl_tag: self.rtl_tag,
            release_types: self.release_types,
            release_date: self.release_date,
            release_user: self.release_user,
        }
    }
}

/// Parse catalog text into rows.
pub fn parse_rows(text: &str, delimiter: char) -> std::result::Result<Vec<CatalogRow>, CatalogError> {
    let mut rows = Vec::new();
    let mut header_checked = false;

    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();

        if !header_checked {
            header_checked = true;
            if fields[0].eq_ignore_ascii_case("unit") {
                continue;
            }
        }

        if fields.len() < REQUIRED_FIELDS {
            return Err(CatalogError::MissingFields {
                line: line_no,
                expected: REQUIRED_FIELDS,
                found: fields.len(),
            });
        }
        let field = |idx: usize| fields.get(idx).copied().unwrap_or("");
        for (idx, name) in [(0, "unit"), (1, "chiplet"), (2, "workarea")] {
            if field(idx).is_empty() {
                return Err(CatalogError::EmptyField {
                    line: line_no,
                    field: name,
                });
            }
        }

        rows.push(CatalogRow {
            name: field(0).to_string(),
            chiplet: field(1).to_string(),
            workarea: PathBuf::from(field(2)),
            rtl_tag: Some(field(3)).filter(|t| !t.is_empty()).map(str::to_string),
            release_types: field(4)
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            release_date: field(5).to_string(),
            release_user: field(6).to_string(),
        });
    }

    Ok(rows)
}

/// In-memory catalog of units for one run.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    rows: Vec<CatalogRow>,
}

impl UnitCatalog {
    /// Build a catalog from already-parsed rows.
    pub fn from_rows(rows: Vec<CatalogRow>) -> Self {
        Self { rows }
    }

    /// Load and parse a catalog file.
    pub fn load(path: &Path, delimiter: char) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let rows = parse_rows(&text, delimiter).map_err(|source| ChipregError::Catalog {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), rows = rows.len(), "Loaded unit catalog");
        Ok(Self { rows })
    }

    /// Number of raw rows (all releases).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Pick one row per `(chiplet, unit)` and number the result.
    ///
    /// With `Some(release)`, a row flagged with that release wins; units that
    /// have no such row fall back to their `default` row, then to their first
    /// row. Units keep the order of their first appearance in the catalog.
    pub fn select_release(&self, release: Option<&str>) -> Vec<Unit> {
        let mut groups: Vec<(String, String, Vec<&CatalogRow>)> = Vec::new();
        for row in &self.rows {
            match groups
                .iter_mut()
                .find(|(chiplet, name, _)| *chiplet == row.chiplet && *name == row.name)
            {
                Some((_, _, group)) => group.push(row),
                None => groups.push((row.chiplet.clone(), row.name.clone(), vec![row])),
            }
        }

        groups
            .into_iter()
            .enumerate()
            .map(|(index, (_, name, group))| {
                let requested = release.and_then(|r| group.iter().find(|row| row.has_release_type(r)));
                if let (Some(r), None) = (release, requested) {
                    warn!(unit = %name, release = %r, "Release not found, using default release");
                }
                let chosen = requested
                    .or_else(|| group.iter().find(|row| row.has_release_type(DEFAULT_RELEASE)))
                    .unwrap_or(&group[0]);
                (*chosen).clone().into_unit(index)
            })
            .collect()
    }
}

/// Chiplet and unit filters from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFilter {
    /// Lower-cased chiplet names; empty keeps every chiplet.
    pub chiplets: Vec<String>,
    /// Single unit to keep.
    pub unit: Option<String>,
}

impl UnitFilter {
    /// Build a filter from a comma-separated chiplet list and an optional
    /// unit name.
    pub fn new(chiplets: Option<&str>, unit: Option<&str>) -> Self {
        let chiplets = chiplets
            .unwrap_or("")
            .split(',')
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            chiplets,
            unit: unit.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
        }
    }

    pub fn matches(&self, unit: &Unit) -> bool {
        let chiplet_ok = self.chiplets.is_empty()
            || self
                .chiplets
                .iter()
                .any(|c| unit.chiplet.eq_ignore_ascii_case(c));
        let unit_ok = self
            .unit
            .as_ref()
            .map_or(true, |u| unit.name.eq_ignore_ascii_case(u));
        chiplet_ok && unit_ok
    }

    /// Keep the matching units, preserving their indices.
    pub fn apply(&self, units: Vec<Unit>) -> Vec<Unit> {
        let before = units.len();
        let kept: Vec<Unit> = units.into_iter().filter(|u| self.matches(u)).collect();
        debug!(before, after = kept.len(), "Applied unit filter");
        kept
    }
}
