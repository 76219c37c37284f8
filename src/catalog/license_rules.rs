//! License-problem rule tables.
//!
//! Each data row compiles into a [`LicenseRule`]: a set of cheap keyword
//! gates, a literal sentence test, a final regex, and an optional validator
//! hook for rules whose firing needs more than pattern presence. Rules are
//! evaluated in table order against cleaned, lowercased text blocks.

use crate::catalog::{row_error, TableRow};
use crate::DebcruftResult;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Post-regex validation hooks. Closed set; catalog rows select by token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorKind {
    /// GFDL invariant-section analysis.
    GfdlInvariants,
    /// Suppress RFC license hits for files that are genuine RFC/I-D texts.
    RfcWhitelist,
    /// Suppress PHP license hits inside PHP's own source packages.
    PhpSourceWhitelist,
}

impl ValidatorKind {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "check-gfdl-invariants" => Some(Self::GfdlInvariants),
            "rfc-whitelist" => Some(Self::RfcWhitelist),
            "php-source-whitelist" => Some(Self::PhpSourceWhitelist),
            _ => None,
        }
    }
}

/// One compiled license-problem rule.
#[derive(Debug)]
pub struct LicenseRule {
    /// Short identifier from the table; tags are named `license-problem-<id>`.
    pub id: String,
    /// Full tag name emitted when the rule fires without a validator.
    pub tag: String,
    /// Every keyword must appear in the raw block before anything else runs.
    pub keywords: Vec<String>,
    /// Indices into the catalog-wide keyword table, resolved at load.
    pub(crate) keyword_ids: Vec<usize>,
    /// Literal substring the cleaned block must contain.
    pub sentence: String,
    /// Final pattern, run against the cleaned block.
    pub regex: Regex,
    /// Pattern used for the first block of a file instead of `regex`.
    pub first_block_regex: Regex,
    pub validator: Option<ValidatorKind>,
}

impl LicenseRule {
    /// Regex appropriate to a block position.
    pub fn regex_for_block(&self, block_index: usize) -> &Regex {
        if block_index == 0 {
            &self.first_block_regex
        } else {
            &self.regex
        }
    }
}

/// An ordered rule table compiled from one catalog file.
#[derive(Debug)]
pub struct LicenseRuleSet {
    /// Catalog file the set was loaded from.
    pub name: String,
    pub rules: Vec<LicenseRule>,
}

impl LicenseRuleSet {
    /// Compile rows of the form
    /// `id ~~ keywords ~~ sentence ~~ regex ~~ first-block-regex ~~ validator`.
    ///
    /// Keywords are `&&`-separated and stored lowercase, since every match
    /// runs against lowercased text. An empty regex field falls back to the
    /// quoted sentence; an empty first-block field falls back to the regex.
    pub(crate) fn from_rows(file: &str, rows: &[TableRow]) -> DebcruftResult<Self> {
        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.fields[0].as_str();
            if id.is_empty() {
                return Err(row_error(file, row.line, "empty rule identifier"));
            }

            let keywords: Vec<String> = row.fields[1]
                .split("&&")
                .map(|k| k.trim().to_ascii_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                return Err(row_error(
                    file,
                    row.line,
                    &format!("rule {} has no keywords", id),
                ));
            }

            let sentence = row.fields[2].clone();
            let pattern = if row.fields[3].is_empty() {
                if sentence.is_empty() {
                    return Err(row_error(
                        file,
                        row.line,
                        &format!("rule {} has neither sentence nor regex", id),
                    ));
                }
                regex::escape(&sentence)
            } else {
                row.fields[3].clone()
            };
            let regex = compile(file, row.line, id, &pattern)?;

            let first_block_regex = if row.fields[4].is_empty() {
                regex.clone()
            } else {
                compile(file, row.line, id, &row.fields[4])?
            };

            let validator = if row.fields[5].is_empty() {
                None
            } else {
                match ValidatorKind::parse(&row.fields[5]) {
                    Some(v) => Some(v),
                    None => {
                        return Err(row_error(
                            file,
                            row.line,
                            &format!("rule {} names unknown validator {:?}", id, row.fields[5]),
                        ))
                    }
                }
            };

            rules.push(LicenseRule {
                tag: format!("license-problem-{}", id),
                id: id.to_string(),
                keywords,
                keyword_ids: Vec::new(),
                sentence,
                regex,
                first_block_regex,
                validator,
            });
        }

        Ok(Self {
            name: file.to_string(),
            rules,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Look up a rule by its short identifier.
    pub fn rule(&self, id: &str) -> Option<&LicenseRule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

fn compile(file: &str, line: usize, id: &str, pattern: &str) -> DebcruftResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        row_error(
            file,
            line,
            &format!("rule {} has an invalid regex: {}", id, e),
        )
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
