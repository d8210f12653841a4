//! Header normalization, automatic role resolution, and column projection.
//!
//! Resolution walks the candidate table in declared order, so the result is
//! identical on every call regardless of how headers are stored.

use crate::config::{CandidateTable, Role};
use crate::error::AnalysisError;
use crate::table::{Column, Table};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Canonical form of a header for equality comparison: all whitespace
/// removed, lowercased. Total over any input; empty input → empty string.
pub fn normalize_header(s: &str) -> String {
    s.split_whitespace().collect::<String>().to_lowercase()
}

/// Role → column association, in candidate-table order. Unresolved roles
/// carry `None`; serializes as `{"review": "리뷰내용", "rating": null, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleMapping {
    entries: Vec<(Role, Option<String>)>,
}

impl RoleMapping {
    /// A mapping with every role of the candidate table unmapped.
    pub fn unmapped(candidates: &CandidateTable) -> Self {
        Self {
            entries: candidates.roles().map(|role| (role, None)).collect(),
        }
    }

    pub fn entries(&self) -> &[(Role, Option<String>)] {
        &self.entries
    }

    pub fn column_for(&self, role: Role) -> Option<&str> {
        self.entries
            .iter()
            .find(|(r, _)| *r == role)
            .and_then(|(_, col)| col.as_deref())
    }

    pub fn set(&mut self, role: Role, column: Option<String>) {
        match self.entries.iter_mut().find(|(r, _)| *r == role) {
            Some((_, col)) => *col = column,
            None => self.entries.push((role, column)),
        }
    }

    /// Apply human overrides. `None` values mean "keep the automatic
    /// choice"; a column identifier not present in the table leaves the
    /// role unmapped.
    pub fn apply_overrides(
        &mut self,
        overrides: &HashMap<Role, Option<String>>,
        table: &Table,
    ) {
        for (role, value) in overrides {
            if let Some(column) = value {
                if table.has_column(column) {
                    self.set(*role, Some(column.clone()));
                } else {
                    self.set(*role, None);
                }
            }
        }
    }
}

impl Serialize for RoleMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (role, column) in &self.entries {
            map.serialize_entry(role, column)?;
        }
        map.end()
    }
}

/// Match table headers against the candidate table. Candidate-list order
/// takes precedence over header order: the scan stops at the first candidate
/// that matches any header. An empty table maps every role to `None`.
pub fn resolve_columns(table: &Table, candidates: &CandidateTable) -> RoleMapping {
    if table.is_empty() {
        return RoleMapping::unmapped(candidates);
    }

    let headers = table.headers();
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut entries = Vec::with_capacity(candidates.entries().len());
    for (role, cands) in candidates.entries() {
        let mut matched: Option<String> = None;
        'candidates: for cand in cands {
            let wanted = normalize_header(cand);
            for (i, header) in headers.iter().enumerate() {
                if normalized[i] == wanted {
                    matched = Some(header.to_string());
                    break 'candidates;
                }
            }
        }
        entries.push((*role, matched));
    }

    RoleMapping { entries }
}

/// Reduce the table to the mapped columns, in mapping order, deduplicated by
/// identifier. The review role is mandatory; all rows are preserved.
pub fn project(table: &Table, mapping: &RoleMapping) -> Result<Table, AnalysisError> {
    if table.is_empty() {
        return Err(AnalysisError::EmptyTable);
    }

    let review_present = mapping
        .column_for(Role::Review)
        .map(|c| table.has_column(c))
        .unwrap_or(false);
    if !review_present {
        return Err(AnalysisError::MissingReviewColumn);
    }

    let mut selected: Vec<Column> = Vec::new();
    for (_, column) in mapping.entries() {
        if let Some(name) = column {
            if selected.iter().any(|c| c.name() == name) {
                continue;
            }
            if let Some(col) = table.column(name) {
                selected.push(col.clone());
            }
        }
    }

    if selected.is_empty() {
        return Err(AnalysisError::MissingReviewColumn);
    }

    Ok(Table::new(selected))
}
