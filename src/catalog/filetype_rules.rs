//! Content-type-driven warnings and missing-source probes.
//!
//! Each rule pairs a content-type regex with a basename regex. A file that
//! satisfies both gets the rule's tag, and rules marked for missing-source
//! checking additionally probe the tree for a plausible source file using
//! the rule's replacement pairs.

use crate::catalog::{row_error, TableRow};
use crate::DebcruftResult;
use regex::{NoExpand, Regex};

/// A basename rewrite used to derive source-candidate names.
#[derive(Debug)]
pub struct ReplacementPair {
    pub from: Regex,
    pub to: String,
}

impl ReplacementPair {
    /// Apply the rewrite to a basename. `None` when the pattern does not
    /// match, so callers can tell a rewritten candidate from a no-op.
    pub fn apply(&self, basename: &str) -> Option<String> {
        if !self.from.is_match(basename) {
            return None;
        }
        Some(
            self.from
                .replace(basename, NoExpand(self.to.as_str()))
                .into_owned(),
        )
    }
}

/// One content-type rule.
#[derive(Debug)]
pub struct FileTypeRule {
    /// Matched against the detected content-type string.
    pub content_type: Regex,
    /// Matched against the file's basename.
    pub name: Regex,
    /// Tag emitted when both regexes match.
    pub tag: String,
    /// Probe for corresponding source after tagging.
    pub check_missing_source: bool,
    /// Basename rewrites producing source-candidate names.
    pub replacements: Vec<ReplacementPair>,
}

impl FileTypeRule {
    pub fn applies(&self, content_type: &str, basename: &str) -> bool {
        self.content_type.is_match(content_type) && self.name.is_match(basename)
    }
}

/// Compile rows of the form
/// `content-type-regex ~~ name-regex ~~ tag ~~ missing-source ~~ replacements`.
///
/// Replacements are `from=>to` pairs joined by `&&`; the field may be empty.
pub(crate) fn parse_filetype_rules(
    file: &str,
    rows: &[TableRow],
) -> DebcruftResult<Vec<FileTypeRule>> {
    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        let content_type = Regex::new(&row.fields[0])
            .map_err(|e| row_error(file, row.line, &format!("invalid content-type regex: {}", e)))?;
        let name = Regex::new(&row.fields[1])
            .map_err(|e| row_error(file, row.line, &format!("invalid name regex: {}", e)))?;
        let tag = row.fields[2].clone();
        if tag.is_empty() {
            return Err(row_error(file, row.line, "empty tag name"));
        }
        let check_missing_source = match row.fields[3].as_str() {
            "0" => false,
            "1" => true,
            other => {
                return Err(row_error(
                    file,
                    row.line,
                    &format!("missing-source flag must be 0 or 1, got {:?}", other),
                ))
            }
        };
        let replacements = parse_replacements(file, row.line, &row.fields[4])?;
        rules.push(FileTypeRule {
            content_type,
            name,
            tag,
            check_missing_source,
            replacements,
        });
    }
    Ok(rules)
}

pub(crate) fn parse_replacements(
    file: &str,
    line: usize,
    field: &str,
) -> DebcruftResult<Vec<ReplacementPair>> {
    let mut pairs = Vec::new();
    for part in field.split("&&") {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (from, to) = match part.split_once("=>") {
            Some((f, t)) => (f.trim(), t.trim()),
            None => {
                return Err(row_error(
                    file,
                    line,
                    &format!("replacement {:?} is not of the form from=>to", part),
                ))
            }
        };
        let from = Regex::new(from)
            .map_err(|e| row_error(file, line, &format!("invalid replacement regex: {}", e)))?;
        pairs.push(ReplacementPair {
            from,
            to: to.to_string(),
        });
    }
    Ok(pairs)
}
