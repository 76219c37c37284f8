//! Missing-source probing for prebuilt and minified files.
//!
//! Debian policy wants the preferred form of modification shipped next to
//! any generated artifact, conventionally beside the file or under
//! `debian/missing-sources/`. The probe derives candidate names from the
//! artifact's basename via replacement pairs, expands each search
//! template, and looks the candidates up in the tree index.

use crate::catalog::ReplacementPair;
use crate::tree::{normalize_link, SourceTree, TreeEntry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Rewrites tried for JavaScript flagged by the line-length heuristic.
pub fn javascript_source_pairs() -> &'static [ReplacementPair] {
    static PAIRS: Lazy<Vec<ReplacementPair>> = Lazy::new(|| {
        vec![
            ReplacementPair {
                from: Regex::new(r"(?i)\.js$").expect("fixed pattern"),
                to: ".debug.js".to_string(),
            },
            ReplacementPair {
                from: Regex::new(r"(?i)\.js$").expect("fixed pattern"),
                to: "-debug.js".to_string(),
            },
        ]
    });
    &PAIRS
}

/// Probe the tree for a plausible source of `entry`.
///
/// Candidate names are the replacement-pair rewrites plus the unchanged
/// basename; candidate directories come from the search templates, where
/// `$dir` expands to the entry's own directory and other templates are
/// rooted at the tree top. Returns the first existing candidate file,
/// or `None` when every probe misses. The entry itself never counts as
/// its own source.
pub fn find_missing_source(
    tree: &SourceTree,
    entry: &TreeEntry,
    search_paths: &[String],
    pairs: &[ReplacementPair],
) -> Option<PathBuf> {
    let mut names: Vec<String> = Vec::new();
    for pair in pairs {
        if let Some(rewritten) = pair.apply(&entry.basename) {
            if !names.contains(&rewritten) {
                names.push(rewritten);
            }
        }
    }
    if !names.contains(&entry.basename) {
        names.push(entry.basename.clone());
    }

    let parent = entry.parent_dir().to_string_lossy().replace('\\', "/");
    for template in search_paths {
        let dir = template.replace("$dir", &parent);
        for name in &names {
            let raw = PathBuf::from(&dir).join(name);
            let candidate = match normalize_link(Path::new(""), &raw) {
                Some(c) => c,
                None => continue,
            };
            if candidate == entry.path {
                continue;
            }
            if tree.entry(&candidate).map(|e| e.is_file()).unwrap_or(false) {
                return Some(candidate);
            }
        }
    }
    None
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn pair(from: &str, to: &str) -> ReplacementPair {
        ReplacementPair {
            from: Regex::new(from).unwrap(),
            to: to.to_string(),
        }
    }

    fn default_paths() -> Vec<String> {
        vec![
            "$dir".to_string(),
            "debian/missing-sources/$dir".to_string(),
            "debian/missing-sources".to_string(),
        ]
    }

    #[test]
    fn test_source_found_next_to_artifact() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/app.min.js"), "min").unwrap();
        fs::write(dir.path().join("js/app.js"), "source").unwrap();
        let tree = SourceTree::index(dir.path()).unwrap();
        let entry = tree.entry("js/app.min.js").unwrap();

        let found = find_missing_source(
            &tree,
            entry,
            &default_paths(),
            &[pair(r"(?i)[-._]min\.js$", ".js")],
        );
        assert_eq!(found, Some(PathBuf::from("js/app.js")));
    }

    #[test]
    fn test_source_missing_when_no_candidate_exists() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/app.min.js"), "min").unwrap();
        let tree = SourceTree::index(dir.path()).unwrap();
        let entry = tree.entry("js/app.min.js").unwrap();

        let found = find_missing_source(
            &tree,
            entry,
            &default_paths(),
            &[pair(r"(?i)[-._]min\.js$", ".js")],
        );
        assert_eq!(found, None);
    }

    #[test]
    fn test_identity_candidate_under_missing_sources() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("debian/missing-sources/js")).unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/app.min.js"), "min").unwrap();
        fs::write(dir.path().join("debian/missing-sources/js/app.min.js"), "src").unwrap();
        let tree = SourceTree::index(dir.path()).unwrap();
        let entry = tree.entry("js/app.min.js").unwrap();

        let found = find_missing_source(&tree, entry, &default_paths(), &[]);
        assert_eq!(found, Some(PathBuf::from("debian/missing-sources/js/app.min.js")));
    }

    #[test]
    fn test_entry_is_never_its_own_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bundle.js"), "x").unwrap();
        let tree = SourceTree::index(dir.path()).unwrap();
        let entry = tree.entry("bundle.js").unwrap();

        // Identity under $dir resolves to the entry itself; must not count.
        let found = find_missing_source(&tree, entry, &default_paths(), &[]);
        assert_eq!(found, None);
    }

    #[test]
    fn test_debug_js_pairs_cover_both_spellings() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lib.js"), "x").unwrap();
        fs::write(dir.path().join("lib-debug.js"), "y").unwrap();
        let tree = SourceTree::index(dir.path()).unwrap();
        let entry = tree.entry("lib.js").unwrap();

        let found =
            find_missing_source(&tree, entry, &default_paths(), javascript_source_pairs());
        assert_eq!(found, Some(PathBuf::from("lib-debug.js")));
    }

    #[test]
    fn test_directories_do_not_satisfy_the_probe() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("app.js")).unwrap();
        fs::write(dir.path().join("app.min.js"), "min").unwrap();
        let tree = SourceTree::index(dir.path()).unwrap();
        let entry = tree.entry("app.min.js").unwrap();

        let found = find_missing_source(
            &tree,
            entry,
            &default_paths(),
            &[pair(r"(?i)[-._]min\.js$", ".js")],
        );
        assert_eq!(found, None);
    }
}
