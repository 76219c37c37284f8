//! Staleness checks for vendored autotools helper files.
//!
//! `config.sub` and `config.guess` carry a `timestamp='YYYY-MM-DD'` line
//! near the top; `ltmain.sh` carries a `VERSION=` line. Trees shipping
//! helpers older than the thresholds get flagged, unless the package
//! build-depends on tooling that regenerates them at build time.

use crate::tags::TagSink;
use crate::tree::PackageMeta;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Helpers this old predate every port the archive still cares about.
const ANCIENT_HELPER_DATE: (i32, u32, u32) = (2004, 1, 1);
/// Current staleness threshold for a usable but outdated helper.
const OUTDATED_HELPER_DATE: (i32, u32, u32) = (2012, 1, 1);
/// Minimum libtool version with sane link-order handling.
const MIN_LIBTOOL_VERSION: [u32; 3] = [2, 2, 6];

/// Build-dependency packages that regenerate config.sub/config.guess.
const AUTOTOOLS_UPDATERS: &[&str] = &["autotools-dev", "automake", "automake1.11", "dh-autoreconf"];
/// Build-dependency packages that regenerate ltmain.sh.
const LIBTOOL_UPDATERS: &[&str] = &["libtool", "dh-autoreconf"];

/// Lines scanned from the head of a helper before giving up.
const HEAD_LINES: usize = 10;

static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"timestamp='(\d{4}-\d{2}-\d{2})'").expect("fixed pattern"));
static LT_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^VERSION="?(\d+(?:\.\d+)*)"#).expect("fixed pattern"));

pub(crate) fn is_autotools_helper(basename: &str) -> bool {
    matches!(basename, "config.sub" | "config.guess" | "ltmain.sh")
}

/// Inspect one helper file's content and emit staleness tags.
pub(crate) fn check_helper(
    basename: &str,
    content: &str,
    path: &str,
    meta: &PackageMeta,
    sink: &mut dyn TagSink,
) {
    match basename {
        "config.sub" | "config.guess" => {
            if meta.declares_build_tool(AUTOTOOLS_UPDATERS) {
                return;
            }
            if let Some(date) = head_timestamp(content) {
                let ancient = threshold(ANCIENT_HELPER_DATE);
                let outdated = threshold(OUTDATED_HELPER_DATE);
                if date < ancient {
                    sink.emit("ancient-autotools-helper-file", path, &[&date.to_string()]);
                } else if date < outdated {
                    sink.emit("outdated-autotools-helper-file", path, &[&date.to_string()]);
                }
            }
        }
        "ltmain.sh" => {
            if meta.declares_build_tool(LIBTOOL_UPDATERS) {
                return;
            }
            if let Some(version) = libtool_version(content) {
                if version_components(&version) < MIN_LIBTOOL_VERSION {
                    sink.emit("ancient-libtool", path, &[&version]);
                }
            }
        }
        _ => {}
    }
}

fn threshold((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("fixed date")
}

/// `timestamp='...'` from the first few lines, parsed as a date.
fn head_timestamp(content: &str) -> Option<NaiveDate> {
    for line in content.lines().take(HEAD_LINES) {
        if let Some(caps) = TIMESTAMP.captures(line) {
            return NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok();
        }
    }
    None
}

/// First `VERSION=` assignment in the script.
fn libtool_version(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| LT_VERSION.captures(line.trim_start()))
        .map(|caps| caps[1].to_string())
}

/// Up to three numeric components, missing ones read as zero.
fn version_components(version: &str) -> [u32; 3] {
    let mut parts = [0u32; 3];
    for (slot, piece) in parts.iter_mut().zip(version.split('.')) {
        *slot = piece.parse().unwrap_or(0);
    }
    parts
}

// ─── Tests ──────────────────────────────────────────────────────────
