//! Validators for rules whose regex match alone cannot decide.
//!
//! A validator sees the named captures of the rule regex plus the file
//! identity and returns a verdict. `ViolationEmitted` means the validator
//! wrote its own tags and the rule is spent for this file;
//! `AmbiguousEmittedContinue` means a marker tag may have been written
//! but the rule stays armed, because a later block can still contain the
//! real wording.

use crate::catalog::{Catalog, LicenseRule, ValidatorKind};
use crate::scanner::evaluator::{FileContext, FileLicenseState};
use crate::scanner::normalize::strip_punctuation;
use crate::tags::TagSink;
use once_cell::sync::Lazy;
use regex::Regex;

/// Validator decision for one rule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorVerdict {
    NotAViolation,
    ViolationEmitted,
    AmbiguousEmittedContinue,
}

/// A rule regex hit, with captures copied out of the block.
pub(crate) struct RuleMatch<'a> {
    pub rule: &'a LicenseRule,
    /// `rawgfdlsections` capture, when the regex defines it.
    pub sections: Option<String>,
    /// `rawcontextbefore` capture, when the regex defines it.
    pub context_before: Option<String>,
}

pub(crate) fn run_validator(
    kind: ValidatorKind,
    catalog: &Catalog,
    ctx: &FileContext<'_>,
    matched: &RuleMatch<'_>,
    state: &mut FileLicenseState,
    sink: &mut dyn TagSink,
) -> ValidatorVerdict {
    match kind {
        ValidatorKind::GfdlInvariants => check_gfdl_invariants(catalog, ctx, matched, state, sink),
        ValidatorKind::RfcWhitelist => check_rfc_whitelist(ctx, matched, sink),
        ValidatorKind::PhpSourceWhitelist => check_php_source_whitelist(ctx, matched, sink),
    }
}

// ─── RFC and PHP whitelists ─────────────────────────────────────────

/// File names under which non-free RFC/IETF boilerplate is expected:
/// the RFCs and Internet-Drafts themselves.
static RFC_TEXT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:rfc[-_]?\d+|draft-[a-z0-9-]+)\.(?:txt|xml)$").expect("fixed pattern")
});

/// Source packages that are PHP itself and may carry the PHP license.
static PHP_SOURCE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^php(?:\d+(?:\.\d+)?)?$|^php-src$").expect("fixed pattern"));

fn check_rfc_whitelist(
    ctx: &FileContext<'_>,
    matched: &RuleMatch<'_>,
    sink: &mut dyn TagSink,
) -> ValidatorVerdict {
    if RFC_TEXT_NAME.is_match(&ctx.basename.to_ascii_lowercase()) {
        return ValidatorVerdict::NotAViolation;
    }
    sink.emit(&matched.rule.tag, ctx.path, &[]);
    ValidatorVerdict::ViolationEmitted
}

fn check_php_source_whitelist(
    ctx: &FileContext<'_>,
    matched: &RuleMatch<'_>,
    sink: &mut dyn TagSink,
) -> ValidatorVerdict {
    if PHP_SOURCE_NAME.is_match(&ctx.source_name.to_ascii_lowercase()) {
        return ValidatorVerdict::NotAViolation;
    }
    sink.emit(&matched.rule.tag, ctx.path, &[]);
    ValidatorVerdict::ViolationEmitted
}

// ─── GFDL invariants ────────────────────────────────────────────────

const GFDL_EMPTY_TAG: &str = "license-problem-gfdl-invariants-empty";

/// Context that marks the match as the license's own "how to apply"
/// section rather than a grant over the package's documentation.
static USAGE_TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"to use this license in a document you have written|how to use this license for your documents",
    )
    .expect("fixed pattern")
});

/// Wordings equivalent to an unrestricted grant.
static ACCEPTED_SECTIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^no invariant sections?$").expect("fixed pattern"));

/// Rewrites applied to the captured sections text until it stops
/// changing. Head patterns peel license boilerplate the rule regex may
/// have left in front; tail patterns drop cover-text clauses and the
/// where-to-find-a-copy sentence, which say nothing about invariants.
static SECTION_REDUCTIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^[\s,.;:]+",
        r"^version \d+(?:\.\d+)* ?",
        r"^of the license\b ?",
        r"^or (?:\(at your option\) )?any later version\b[,.;]? ?",
        r"^(?:as )?published by the free software foundation\b[,.;]? ?",
        r"^with\b ?",
        r"^the\b ?",
        r"\ba copy of the license\b.*$",
        r"(?:[,;]? ?(?:and )?(?:with )?no front-? ?cover texts?)$",
        r"(?:[,;]? ?(?:and )?(?:with )?no back-? ?cover texts?)$",
        r"(?:[,;]? ?(?:and )?no cover texts?)$",
        r"[\s,.;:]+$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("fixed pattern"))
    .collect()
});

/// Boil the captured sections text down to the part that names
/// invariant material. Empty output means the wording broke off before
/// saying anything about sections.
fn reduce_sections(raw: &str) -> String {
    let mut text = strip_punctuation(raw);
    loop {
        let mut next = text.clone();
        for step in SECTION_REDUCTIONS.iter() {
            next = step.replace(&next, "").into_owned();
        }
        next = strip_punctuation(&next);
        if next == text {
            return text;
        }
        text = next;
    }
}

fn check_gfdl_invariants(
    catalog: &Catalog,
    ctx: &FileContext<'_>,
    matched: &RuleMatch<'_>,
    state: &mut FileLicenseState,
    sink: &mut dyn TagSink,
) -> ValidatorVerdict {
    let context_before = matched.context_before.as_deref().unwrap_or("");
    if USAGE_TEMPLATE.is_match(context_before) {
        return ValidatorVerdict::NotAViolation;
    }

    let reduced = reduce_sections(matched.sections.as_deref().unwrap_or(""));

    // The license's own addendum shows the grant with placeholder
    // section names; that is instruction, not a grant.
    if reduced.contains("list their titles") {
        return ValidatorVerdict::NotAViolation;
    }

    if reduced.is_empty() {
        // The with-clause said nothing. Flag it once so a human looks,
        // but keep the rule armed in case a complete wording follows.
        if state.mark_once(GFDL_EMPTY_TAG) {
            sink.emit(GFDL_EMPTY_TAG, ctx.path, &[]);
        }
        return ValidatorVerdict::AmbiguousEmittedContinue;
    }
    if ACCEPTED_SECTIONS.is_match(&reduced) {
        return ValidatorVerdict::NotAViolation;
    }

    let context: [&str; 2] = ["invariant part is:", &reduced];
    let basename = ctx.basename.to_ascii_lowercase();
    for fragment in &catalog.gfdl_fragments {
        if !fragment.section_regex.is_match(&reduced) {
            continue;
        }
        if let Some(accepted_in) = &fragment.accepted_in {
            if !accepted_in.is_match(&basename) {
                sink.emit(&matched.rule.tag, ctx.path, &context);
                return ValidatorVerdict::ViolationEmitted;
            }
        }
        return match &fragment.tag {
            Some(tag) => {
                sink.emit(tag, ctx.path, &context);
                ValidatorVerdict::ViolationEmitted
            }
            None => ValidatorVerdict::NotAViolation,
        };
    }

    sink.emit(&matched.rule.tag, ctx.path, &context);
    ValidatorVerdict::ViolationEmitted
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::tags::TagCollector;

    fn ctx<'a>(source_name: &'a str, basename: &'a str) -> FileContext<'a> {
        FileContext {
            source_name,
            path: "doc/manual.texi",
            basename,
            non_free_package: false,
        }
    }

    fn gfdl_match<'a>(catalog: &'a Catalog, sections: &str) -> RuleMatch<'a> {
        RuleMatch {
            rule: catalog.non_free.rule("gfdl-invariants").unwrap(),
            sections: Some(sections.to_string()),
            context_before: Some(String::new()),
        }
    }

    #[test]
    fn test_reduce_accepted_wording() {
        let reduced = reduce_sections(
            "no invariant sections, no front-cover texts, and no back-cover texts. \
             a copy of the license is included in the section entitled \
             \"gnu free documentation license\".",
        );
        assert_eq!(reduced, "no invariant sections");
    }

    #[test]
    fn test_reduce_keeps_named_invariant_sections() {
        let reduced = reduce_sections(
            "the invariant sections being 'foreword', no front-cover texts, \
             and no back-cover texts.",
        );
        assert_eq!(reduced, "invariant sections being 'foreword'");
    }

    #[test]
    fn test_reduce_boilerplate_to_empty() {
        let reduced = reduce_sections(
            "; a copy of the license is included in the section entitled \
             gnu free documentation license.",
        );
        assert_eq!(reduced, "");
        assert_eq!(reduce_sections("  .,; "), "");
    }

    #[test]
    fn test_reduce_handles_leading_version_boilerplate() {
        let reduced = reduce_sections(
            "version 1.2 of the license, with no invariant sections, no cover texts",
        );
        assert_eq!(reduced, "no invariant sections");
    }

    #[test]
    fn test_gfdl_sections_capture_stops_at_sentence_end() {
        // The sections capture ends at the notice's own full stop, so
        // unrelated prose after the grant never reaches the reductions.
        let catalog = Catalog::builtin().unwrap();
        let rule = catalog.non_free.rule("gfdl-invariants").unwrap();
        let cleaned = "permission is granted to copy, distribute and/or modify this \
                       document under the terms of the gnu free documentation license, \
                       version 1.3 or any later version published by the free software \
                       foundation; with no invariant sections, no front-cover texts, and \
                       no back-cover texts. this manual documents frobnicator version 2.0 \
                       and its companion tools.";
        let caps = rule.regex.captures(cleaned).unwrap();
        assert_eq!(
            caps.name("rawgfdlsections").unwrap().as_str(),
            "no invariant sections, no front-cover texts, and no back-cover texts"
        );
    }

    #[test]
    fn test_gfdl_empty_sections_tag_once_per_file() {
        let catalog = Catalog::builtin().unwrap();
        let matched = gfdl_match(&catalog, " ; a copy of the license is included below.");
        let mut state = FileLicenseState::new();
        let mut sink = TagCollector::new();
        let ctx = ctx("acme", "manual.texi");

        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx,
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::AmbiguousEmittedContinue);
        assert_eq!(sink.count("license-problem-gfdl-invariants-empty"), 1);

        // A second empty match in a later block stays quiet.
        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx,
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::AmbiguousEmittedContinue);
        assert_eq!(sink.count("license-problem-gfdl-invariants-empty"), 1);
    }

    #[test]
    fn test_gfdl_accepted_wording_is_not_a_violation() {
        let catalog = Catalog::builtin().unwrap();
        let matched = gfdl_match(
            &catalog,
            "no invariant sections, no front-cover texts, and no back-cover texts.",
        );
        let mut state = FileLicenseState::new();
        let mut sink = TagCollector::new();

        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx("acme", "manual.texi"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::NotAViolation);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_gfdl_named_sections_emit_with_extract() {
        let catalog = Catalog::builtin().unwrap();
        let matched = gfdl_match(
            &catalog,
            "the invariant sections being 'foreword', no front-cover texts, \
             and no back-cover texts.",
        );
        let mut state = FileLicenseState::new();
        let mut sink = TagCollector::new();

        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx("acme", "manual.texi"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::ViolationEmitted);
        let tag = sink.find("license-problem-gfdl-invariants").unwrap();
        assert_eq!(
            tag.context,
            vec![
                "invariant part is:".to_string(),
                "invariant sections being 'foreword'".to_string()
            ]
        );
    }

    #[test]
    fn test_gfdl_gpl_wording_accepted_only_in_license_files() {
        let catalog = Catalog::builtin().unwrap();
        let matched = gfdl_match(
            &catalog,
            "the invariant sections being the gnu general public license.",
        );

        let mut state = FileLicenseState::new();
        let mut sink = TagCollector::new();
        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx("acme", "COPYING"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::NotAViolation);
        assert!(sink.is_empty());

        let mut state = FileLicenseState::new();
        let mut sink = TagCollector::new();
        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx("acme", "intro.texi"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::ViolationEmitted);
        assert!(sink.contains("license-problem-gfdl-invariants"));
    }

    #[test]
    fn test_gfdl_manifesto_gets_non_official_text_tag() {
        let catalog = Catalog::builtin().unwrap();
        let matched = gfdl_match(&catalog, "the invariant sections being the gnu manifesto.");
        let mut state = FileLicenseState::new();
        let mut sink = TagCollector::new();

        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx("acme", "emacs.texi"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::ViolationEmitted);
        assert!(sink.contains("license-problem-gfdl-non-official-text"));
        assert!(!sink.contains("license-problem-gfdl-invariants"));
    }

    #[test]
    fn test_gfdl_usage_template_context_suppresses() {
        let catalog = Catalog::builtin().unwrap();
        let matched = RuleMatch {
            rule: catalog.non_free.rule("gfdl-invariants").unwrap(),
            sections: Some("the invariant sections being 'foreword'.".to_string()),
            context_before: Some(
                "addendum: how to use this license for your documents. to use this \
                 license in a document you have written, include a copy of the license"
                    .to_string(),
            ),
        };
        let mut state = FileLicenseState::new();
        let mut sink = TagCollector::new();

        let verdict = run_validator(
            ValidatorKind::GfdlInvariants,
            &catalog,
            &ctx("acme", "fdl.texi"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::NotAViolation);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_rfc_whitelist_spares_rfc_texts() {
        let catalog = Catalog::builtin().unwrap();
        let matched = RuleMatch {
            rule: catalog.non_free.rule("non-free-RFC").unwrap(),
            sections: None,
            context_before: None,
        };

        for name in ["rfc2119.txt", "rfc-1149.txt", "draft-ietf-tls-cached-info-08.xml"] {
            let mut sink = TagCollector::new();
            let mut state = FileLicenseState::new();
            let verdict = run_validator(
                ValidatorKind::RfcWhitelist,
                &catalog,
                &ctx("acme", name),
                &matched,
                &mut state,
                &mut sink,
            );
            assert_eq!(verdict, ValidatorVerdict::NotAViolation, "{name}");
            assert!(sink.is_empty(), "{name}");
        }

        let mut sink = TagCollector::new();
        let mut state = FileLicenseState::new();
        let verdict = run_validator(
            ValidatorKind::RfcWhitelist,
            &catalog,
            &ctx("acme", "protocol-notes.txt"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::ViolationEmitted);
        assert_eq!(sink.count("license-problem-non-free-RFC"), 1);
    }

    #[test]
    fn test_php_whitelist_spares_php_itself() {
        let catalog = Catalog::builtin().unwrap();
        let matched = RuleMatch {
            rule: catalog.non_free.rule("php-license").unwrap(),
            sections: None,
            context_before: None,
        };

        for source in ["php", "php7.4", "php8", "php-src"] {
            let mut sink = TagCollector::new();
            let mut state = FileLicenseState::new();
            let verdict = run_validator(
                ValidatorKind::PhpSourceWhitelist,
                &catalog,
                &ctx(source, "LICENSE"),
                &matched,
                &mut state,
                &mut sink,
            );
            assert_eq!(verdict, ValidatorVerdict::NotAViolation, "{source}");
        }

        let mut sink = TagCollector::new();
        let mut state = FileLicenseState::new();
        let verdict = run_validator(
            ValidatorKind::PhpSourceWhitelist,
            &catalog,
            &ctx("phpmyadmin", "LICENSE"),
            &matched,
            &mut state,
            &mut sink,
        );
        assert_eq!(verdict, ValidatorVerdict::ViolationEmitted);
        assert_eq!(sink.count("license-problem-php-license"), 1);
    }
}
