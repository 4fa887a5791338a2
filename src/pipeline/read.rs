use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Engine;
use crate::audit::AuditRecord;
use crate::identity::RequestContext;
use crate::paths::{self, AliasRoots};
use crate::resolver::InversionMap;
use crate::rules::{self, Operation, RuleSet, TypeCode};
use crate::visibility;

/// One entry of an index query result. Columns the engine does not interpret ride along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    pub path: String,
    #[serde(rename = "media_type", default)]
    pub type_code: TypeCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    #[serde(flatten)]
    pub columns: serde_json::Map<String, serde_json::Value>,
}

impl IndexRow {
    pub fn new(path: impl Into<String>, type_code: TypeCode) -> Self {
        Self { path: path.into(), type_code, relative_path: None, columns: serde_json::Map::new() }
    }

    pub fn with_relative_path(mut self, rel: impl Into<String>) -> Self {
        self.relative_path = Some(rel.into());
        self
    }
}

/// Per-row visibility (by input position) and the rows that survive, translated on demand.
#[derive(Debug)]
pub struct ReadOutcome {
    pub hidden: Vec<bool>,
    pub rows: TranslatedRows,
}

impl ReadOutcome {
    pub fn hidden_count(&self) -> usize { self.hidden.iter().filter(|h| **h).count() }
}

/// Single-pass view over the visible rows. Paths under a redirect target are mapped back to
/// where the app put them, in the root spelling the row used.
#[derive(Debug)]
pub struct TranslatedRows {
    rows: std::vec::IntoIter<IndexRow>,
    hidden: Vec<bool>,
    pos: usize,
    inversion: InversionMap,
    roots: AliasRoots,
}

impl TranslatedRows {
    fn translate(&self, mut row: IndexRow) -> IndexRow {
        if self.inversion.is_empty() {
            return row;
        }
        let normalized = self.roots.normalize(&row.path);
        if let Some(visible) = self.inversion.invert(&normalized.canonical) {
            if row.relative_path.is_some() {
                if let Some(rel) = paths::relative_location(self.roots.canonical_root(), &visible) {
                    row.relative_path = Some(rel);
                }
            }
            row.path = normalized.denormalize(&visible);
        }
        row
    }
}

impl Iterator for TranslatedRows {
    type Item = IndexRow;

    fn next(&mut self) -> Option<IndexRow> {
        loop {
            let row = self.rows.next()?;
            let idx = self.pos;
            self.pos += 1;
            if self.hidden.get(idx).copied().unwrap_or(false) {
                continue;
            }
            return Some(self.translate(row));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.rows.len()))
    }
}

impl Engine {
    /// Filter and translate the rows of one index query.
    pub fn handle_read(&self, rules: &RuleSet, ctx: &RequestContext, rows: Vec<IndexRow>) -> ReadOutcome {
        let hidden_none = vec![false; rows.len()];
        if self.config.is_internal_caller(&ctx.caller) {
            let rows = TranslatedRows {
                rows: rows.into_iter(),
                hidden: hidden_none.clone(),
                pos: 0,
                inversion: InversionMap::default(),
                roots: self.roots.clone(),
            };
            return ReadOutcome { hidden: hidden_none, rows };
        }

        let rules = self.canonical_rules(rules);
        let filtering = rules::select(&rules, Operation::Query, &ctx.caller);
        let inversion = InversionMap::build(&rules::select_for_app(&rules, &ctx.caller));

        let mut record = AuditRecord::new(ctx);
        let mut hidden = hidden_none;
        for (idx, row) in rows.iter().enumerate() {
            // Visibility is judged on the physical path; inversion only changes what is displayed
            let canonical = self.roots.canonicalize(&row.path);
            if let Some(by) = visibility::hidden_by(&filtering, &canonical, row.type_code) {
                debug!(target: "mediashield", "request {}: hiding {} ({:?})", ctx.request_id, row.path, by);
                hidden[idx] = true;
            }
            record.push(row.path.clone(), row.type_code, hidden[idx]);
        }
        self.audit.report(record);

        let rows = TranslatedRows { rows: rows.into_iter(), hidden: hidden.clone(), pos: 0, inversion, roots: self.roots.clone() };
        ReadOutcome { hidden, rows }
    }
}
