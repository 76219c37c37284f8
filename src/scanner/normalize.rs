//! Text normalization — strip markup so license prose compares bare.
//!
//! License notices reach source trees wrapped in TeX and Texinfo macros,
//! HTML/SGML tags and entities, diff hunks, Perl POD, and JavaScript
//! string arrays. [`clean_block`] removes a fixed catalog of those
//! dialects and squeezes whitespace; rule sentences and regexes are
//! written against the cleaned form. The pipeline reruns until the text
//! stops changing, so cleaning is idempotent even for nested markup.
//!
//! No markup is interpreted, only deleted. Entities are dropped rather
//! than decoded; unknown constructs pass through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

macro_rules! fixed {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).expect("fixed pattern"));
    };
}

// Escaped whitespace literals from embedded strings.
fixed!(ESCAPED_WS, r"\\[nrt]");
// JavaScript string-array glue: '", "' and friends.
fixed!(STRING_JOIN, r#"["']\s*[,+]\s*["']"#);
// Texinfo comment lines.
fixed!(TEXINFO_COMMENT, r"(?m)^\s*@(?:c|comment|ignore)\b.*$");
// POD structure lines.
fixed!(
    POD_DIRECTIVE,
    r"(?m)^=(?:pod|cut|head\d|over|back|item|begin|end|for|encoding)\b.*$"
);
// HTML/SGML comments, bounded.
fixed!(HTML_COMMENT, r"(?s)<!--.{0,2048}?-->");
// POD escapes like B<...>; the code letter must stand alone.
fixed!(POD_ESCAPE, r"\b([BCEFILSXZ])<([^<>\n]{0,256})>");
// HTML/SGML tags, bounded.
fixed!(HTML_TAG, r"(?s)</?[a-zA-Z][^>]{0,256}?>");
// Character entities, dropped not decoded.
fixed!(ENTITY, r"&#?[a-zA-Z0-9]{1,8};");
// Unified/context diff line markers and hunk headers.
fixed!(DIFF_MARK, r"(?m)^(?:@@[^\n]{0,64}@@|(?:[+\-!<>] ?)+)");
// Texinfo and TeX commands.
fixed!(TEXINFO_CMD, r"@[a-zA-Z][a-zA-Z0-9]*");
fixed!(TEX_CMD, r"\\[a-zA-Z@]+\*?");
fixed!(BRACES, r"[{}]");
// Spelling canonicalization so one pattern matches both forms.
fixed!(CANON_LICENCE, r"\blicence\b");
fixed!(CANON_FSF, r"\bf\.?s\.?f\b\.?");
fixed!(COLLAPSE, r"\s+");
// Stripped markup leaves a gap before punctuation; close it so literal
// sentences like "good, not evil" survive "<i>Good</i>, not <i>Evil</i>".
fixed!(SPACE_PUNCT, r"\s+([,.;:])");

fixed!(LEAD_PUNCT, r"^[\s,.;:]+");
fixed!(TRAIL_PUNCT, r"[\s,.;:]+$");

/// Normalize one window of text for rule matching.
///
/// Expects lowercased input; the reader's chunk transform takes care of
/// that in the scan path.
pub fn clean_block(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let t = ESCAPED_WS.replace_all(text, " ");
    let t = STRING_JOIN.replace_all(&t, " ");
    let t = TEXINFO_COMMENT.replace_all(&t, "");
    let t = POD_DIRECTIVE.replace_all(&t, "");
    let t = HTML_COMMENT.replace_all(&t, " ");
    let t = POD_ESCAPE.replace_all(&t, "$2");
    let t = HTML_TAG.replace_all(&t, " ");
    let t = ENTITY.replace_all(&t, " ");
    let t = DIFF_MARK.replace_all(&t, "");
    let t = TEXINFO_CMD.replace_all(&t, " ");
    let t = TEX_CMD.replace_all(&t, " ");
    let t = BRACES.replace_all(&t, " ");
    let t = CANON_LICENCE.replace_all(&t, "license");
    let t = CANON_FSF.replace_all(&t, "free software foundation");
    let t = COLLAPSE.replace_all(&t, " ");
    SPACE_PUNCT.replace_all(&t, "$1").trim().to_string()
}

/// Trim leading and trailing punctuation from a captured sub-text and
/// squeeze interior whitespace. Used on validator captures, not blocks.
pub fn strip_punctuation(text: &str) -> String {
    let t = LEAD_PUNCT.replace(text, "");
    let t = TRAIL_PUNCT.replace(&t, "");
    COLLAPSE.replace_all(&t, " ").into_owned()
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_markup_stripped() {
        let cleaned = clean_block(
            "<p>the software is <b>provided</b> &quot;as is&quot;</p>\n<!-- hidden note -->",
        );
        assert_eq!(cleaned, "the software is provided as is");
    }

    #[test]
    fn test_inline_tags_keep_punctuation_attached() {
        // A tag abutting punctuation must not leave a gap behind, or the
        // literal sentence tests stop matching.
        let cleaned = clean_block("used for <i>good</i>, not <i>evil</i>.");
        assert_eq!(cleaned, "used for good, not evil.");
    }

    #[test]
    fn test_tex_and_texinfo_stripped() {
        let cleaned = clean_block("@c this line vanishes\n@emph{invariant} \\emph{sections}\n");
        assert_eq!(cleaned, "invariant sections");
    }

    #[test]
    fn test_diff_markers_stripped() {
        let cleaned = clean_block("@@ -1,3 +1,4 @@\n+ added words\n- removed words\n  context");
        assert_eq!(cleaned, "added words removed words context");
    }

    #[test]
    fn test_pod_directives_and_escapes_stripped() {
        let cleaned = clean_block("=head1 LICENSE\n\nB<permission> is I<granted>\n\n=cut\n");
        assert_eq!(cleaned, "permission is granted");
    }

    #[test]
    fn test_string_array_glue_removed() {
        let cleaned = clean_block("\"used for good\", \"not evil\"");
        assert_eq!(cleaned, "\"used for good not evil\"");
    }

    #[test]
    fn test_escaped_whitespace_literals_removed() {
        let cleaned = clean_block("line one\\nline two\\tend");
        assert_eq!(cleaned, "line one line two end");
    }

    #[test]
    fn test_spelling_canonicalized() {
        assert_eq!(clean_block("this licence text"), "this license text");
        assert_eq!(
            clean_block("published by the f.s.f. today"),
            "published by the free software foundation today"
        );
    }

    #[test]
    fn test_clean_block_is_idempotent() {
        let samples = [
            "plain words, nothing else.",
            "<p>the software is <b>provided</b> &quot;as is&quot;</p>",
            "B<a B<b> c> nested pod",
            "<<i>b> tag soup",
            "@c comment\n@emph{text} \\LaTeX{} macro",
            "+ diff\n+ + doubled marker\n@@ -1 +1 @@\nbody",
            "\"a\", \"b\", \"c\" array",
            "=head1 X\n\ncontent E<lt>here\n\n=cut",
            "mixed licence &amp; f.s.f. forms",
        ];
        for sample in samples {
            let once = clean_block(sample);
            let twice = clean_block(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_strip_punctuation_trims_edges_only() {
        assert_eq!(strip_punctuation(";, no invariant sections. "), "no invariant sections");
        assert_eq!(strip_punctuation("  a , b  "), "a , b");
        assert_eq!(strip_punctuation("...."), "");
    }

    #[test]
    fn test_strip_punctuation_is_idempotent() {
        let samples = [";, no invariant sections. ", "  spaced   out  ", "clean"];
        for sample in samples {
            let once = strip_punctuation(sample);
            assert_eq!(once, strip_punctuation(&once));
        }
    }
}
