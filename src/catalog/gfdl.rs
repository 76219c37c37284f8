//! Known GFDL invariant-section wordings.
//!
//! The GFDL validator reduces the text captured after a license mention to a
//! canonical sections phrase, then walks these fragments in table order. The
//! first fragment whose regex matches decides the outcome: accepted wording,
//! a fragment-specific tag, or (when a file-name restriction fails) the
//! generic invariants tag.

use crate::catalog::{row_error, TableRow};
use crate::DebcruftResult;
use regex::Regex;

/// One recognized invariant-section wording.
#[derive(Debug)]
pub struct GfdlFragment {
    /// Matched against the reduced sections text.
    pub section_regex: Regex,
    /// When set, the wording is only acceptable in files whose lowercased
    /// basename matches; elsewhere the generic violation fires.
    pub accepted_in: Option<Regex>,
    /// Tag emitted when the fragment applies. `None` means the wording is
    /// accepted outright.
    pub tag: Option<String>,
}

/// Compile rows of the form `section-regex ~~ accepted-name-regex ~~ tag`.
pub(crate) fn parse_fragments(file: &str, rows: &[TableRow]) -> DebcruftResult<Vec<GfdlFragment>> {
    let mut fragments = Vec::with_capacity(rows.len());
    for row in rows {
        let section_regex = Regex::new(&row.fields[0])
            .map_err(|e| row_error(file, row.line, &format!("invalid section regex: {}", e)))?;
        let accepted_in = if row.fields[1].is_empty() {
            None
        } else {
            Some(Regex::new(&row.fields[1]).map_err(|e| {
                row_error(file, row.line, &format!("invalid file-name regex: {}", e))
            })?)
        };
        let tag = if row.fields[2].is_empty() {
            None
        } else {
            Some(row.fields[2].clone())
        };
        fragments.push(GfdlFragment {
            section_regex,
            accepted_in,
            tag,
        });
    }
    Ok(fragments)
}
