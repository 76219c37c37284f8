//! Staged license-rule evaluation over text blocks.
//!
//! Stages run cheapest first and each can veto the rest: keyword presence
//! in the raw block (answered from one automaton pass shared by all
//! rules), literal sentence containment in the cleaned block, the rule
//! regex, and finally an optional validator. The non-distributable set
//! runs before the non-free set and a hit there blacklists the file on
//! the spot.
//!
//! Each rule tags a file at most once; suppression state lives in
//! [`FileLicenseState`] and spans all blocks of one file. Keyword
//! presence is valid only for the current block and is refreshed by
//! [`LicenseEvaluator::check_block`].

use crate::catalog::{Catalog, LicenseRuleSet};
use crate::scanner::validators::{run_validator, RuleMatch, ValidatorVerdict};
use crate::scanner::window::ScanBlock;
use crate::tags::TagSink;
use std::collections::HashSet;

/// Identity of the file being scanned, for validators and tag paths.
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    pub source_name: &'a str,
    /// Tree-relative path, as emitted in tags.
    pub path: &'a str,
    pub basename: &'a str,
    /// Package already lives in non-free; non-free rules are skipped.
    pub non_free_package: bool,
}

/// Per-file evaluation state.
#[derive(Debug, Default)]
pub struct FileLicenseState {
    fired: HashSet<String>,
    markers: HashSet<String>,
    block_keywords: HashSet<usize>,
}

impl FileLicenseState {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin_block(&mut self, keywords: HashSet<usize>) {
        self.block_keywords = keywords;
    }

    pub(crate) fn keyword_present(&self, id: usize) -> bool {
        self.block_keywords.contains(&id)
    }

    pub fn already_fired(&self, rule_id: &str) -> bool {
        self.fired.contains(rule_id)
    }

    pub(crate) fn mark_fired(&mut self, rule_id: &str) {
        self.fired.insert(rule_id.to_string());
    }

    /// Record a once-per-file marker; true the first time.
    pub(crate) fn mark_once(&mut self, marker: &str) -> bool {
        self.markers.insert(marker.to_string())
    }
}

/// What the caller should do with the rest of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Continue,
    /// A non-distributable rule fired; stop reading this file.
    StopFile,
}

/// Rule engine bound to a catalog.
pub struct LicenseEvaluator<'c> {
    catalog: &'c Catalog,
}

impl<'c> LicenseEvaluator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    pub fn begin_file(&self) -> FileLicenseState {
        FileLicenseState::new()
    }

    /// Evaluate both rule sets against one block.
    pub fn check_block(
        &self,
        ctx: &FileContext<'_>,
        block: &mut ScanBlock,
        state: &mut FileLicenseState,
        sink: &mut dyn TagSink,
    ) -> BlockOutcome {
        state.begin_block(self.catalog.keyword_presence(&block.raw));

        // One non-distributable hit blacklists the file, so the rest of
        // that set never runs.
        if self.run_set(&self.catalog.non_distributable, ctx, block, state, sink, true) > 0 {
            return BlockOutcome::StopFile;
        }
        if !ctx.non_free_package {
            self.run_set(&self.catalog.non_free, ctx, block, state, sink, false);
        }
        BlockOutcome::Continue
    }

    /// Run one rule set over the block; returns how many rules emitted.
    /// With `stop_at_first` the set is abandoned after its first emission.
    fn run_set(
        &self,
        set: &LicenseRuleSet,
        ctx: &FileContext<'_>,
        block: &mut ScanBlock,
        state: &mut FileLicenseState,
        sink: &mut dyn TagSink,
        stop_at_first: bool,
    ) -> usize {
        let block_index = block.index;
        let mut emitted = 0;

        for rule in &set.rules {
            if state.already_fired(&rule.id) {
                continue;
            }
            if !rule.keyword_ids.iter().all(|&k| state.keyword_present(k)) {
                continue;
            }

            let cleaned = block.cleaned();
            if !rule.sentence.is_empty() && !cleaned.contains(rule.sentence.as_str()) {
                continue;
            }
            let captures = match rule.regex_for_block(block_index).captures(cleaned) {
                Some(c) => c,
                None => continue,
            };

            match rule.validator {
                None => {
                    sink.emit(&rule.tag, ctx.path, &[]);
                    state.mark_fired(&rule.id);
                    emitted += 1;
                }
                Some(kind) => {
                    let matched = RuleMatch {
                        rule,
                        sections: captures
                            .name("rawgfdlsections")
                            .map(|m| m.as_str().to_string()),
                        context_before: captures
                            .name("rawcontextbefore")
                            .map(|m| m.as_str().to_string()),
                    };
                    match run_validator(kind, self.catalog, ctx, &matched, state, sink) {
                        ValidatorVerdict::NotAViolation => {}
                        ValidatorVerdict::ViolationEmitted => {
                            state.mark_fired(&rule.id);
                            emitted += 1;
                        }
                        // Tagged once via a marker; the rule itself stays
                        // armed for later blocks.
                        ValidatorVerdict::AmbiguousEmittedContinue => {}
                    }
                }
            }

            if stop_at_first && emitted > 0 {
                break;
            }
        }
        emitted
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
