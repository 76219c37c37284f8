//! Tree walker — drives every per-entry check over a source package.
//!
//! The walk is a breadth-first pass over the tree index. Directories are
//! matched against the VCS-control rules and pruned when they are quilt
//! or test metadata; symlinks are checked for tree escapes; regular
//! files run the digest blacklists, basename rules, content-type rules,
//! autotools scrutiny, and finally the streaming license scan. Digest
//! hits short-circuit everything else for that file.
//!
//! One scan owns all of its mutable state, so independent packages can
//! be scanned in parallel over a shared catalog.

mod autotools;

use crate::catalog::Catalog;
use crate::classify::missing_source::{find_missing_source, javascript_source_pairs};
use crate::classify::{is_javascript, mean_line_length_after_strip, ContentTypeSource, MagicClassifier};
use crate::scanner::{BlockOutcome, BlockReader, FileContext, LicenseEvaluator, DEFAULT_BLOCK_SIZE, JS_BLOCK_SIZE};
use crate::tags::{ScanReport, TagCollector, TagSink};
use crate::tree::{PackageMeta, SourceTree, TreeEntry};
use crate::{DebcruftError, DebcruftResult};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

// ─── Configuration ──────────────────────────────────────────────────

/// Scanner configuration, loadable from an optional `debcruft.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Read size for the sliding window, in bytes.
    pub block_size: usize,
    /// Larger read size used for minifiable JavaScript.
    pub js_block_size: usize,
    /// Mean line length above which JavaScript counts as generated.
    pub minified_js_threshold: f64,
    /// Basenames matching this pattern are already-minified JavaScript.
    pub minified_name_pattern: String,
    /// Directory templates probed for missing sources; `$dir` expands to
    /// the artifact's own directory.
    pub missing_source_search_paths: Vec<String>,
    /// Walk the Debian diff portion: diff-only rules apply and tags use
    /// the `diff-contains-` prefix.
    pub diff_context: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            js_block_size: JS_BLOCK_SIZE,
            minified_js_threshold: 255.0,
            minified_name_pattern: r"(?i)(?:[-._]min|\.pack(?:ed)?)\.js$".to_string(),
            missing_source_search_paths: vec![
                "$dir".to_string(),
                "debian/missing-sources/$dir".to_string(),
                "debian/missing-sources".to_string(),
            ],
            diff_context: false,
        }
    }
}

impl ScanConfig {
    /// Load a TOML profile; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> DebcruftResult<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| DebcruftError::Config(format!("{}: {}", path.display(), e)))
    }
}

// ─── Summary ────────────────────────────────────────────────────────

/// Bookkeeping for one package scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub entries_visited: usize,
    pub files_scanned: usize,
    pub tags_emitted: usize,
    pub duration_ms: u64,
}

// ─── Fixed walk knowledge ───────────────────────────────────────────

/// Quilt metadata; its subtree reflects patches, not shipped content.
const PATCH_METADATA_DIR: &str = ".pc";

/// Directory basenames treated as test fixtures and skipped whole.
const TEST_DIR_NAMES: &[&str] = &[
    "t",
    "test",
    "tests",
    "testset",
    "testsuite",
    "testdata",
    "test-data",
    "__tests__",
];

/// Packages keep license-sounding phrases in change histories; scanning
/// those drowns real findings in noise.
static CHANGELOG_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:changelog|changes|news|history)(?:\.|$)").expect("fixed pattern")
});

static SUBSTVARS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\.)substvars$").expect("fixed pattern"));

// ─── Scanner ────────────────────────────────────────────────────────

/// The cruft scanner: one catalog, one configuration, many packages.
pub struct CruftScanner<'c> {
    catalog: &'c Catalog,
    config: ScanConfig,
    minified_name: Regex,
    classifier: Box<dyn ContentTypeSource>,
}

impl<'c> CruftScanner<'c> {
    pub fn new(catalog: &'c Catalog, config: ScanConfig) -> DebcruftResult<Self> {
        let minified_name = Regex::new(&config.minified_name_pattern).map_err(|e| {
            DebcruftError::Config(format!("invalid minified-name pattern: {}", e))
        })?;
        Ok(Self {
            catalog,
            config,
            minified_name,
            classifier: Box::new(MagicClassifier::new()),
        })
    }

    /// Replace the bundled magic classifier, e.g. with one backed by
    /// file(1).
    pub fn with_classifier(mut self, classifier: Box<dyn ContentTypeSource>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Walk one package tree, emitting tags into the sink.
    pub fn scan_package(
        &self,
        tree: &SourceTree,
        meta: &PackageMeta,
        sink: &mut dyn TagSink,
    ) -> ScanSummary {
        let start = Instant::now();
        let mut counter = CountingSink { inner: sink, emitted: 0 };
        let mut scan = PackageScan {
            scanner: self,
            tree,
            meta,
            evaluator: LicenseEvaluator::new(self.catalog),
            in_diff: self.config.diff_context || meta.is_native(),
            tagged_paths: HashSet::new(),
            files_scanned: 0,
            entries_visited: 0,
        };
        scan.run(&mut counter);

        let summary = ScanSummary {
            entries_visited: scan.entries_visited,
            files_scanned: scan.files_scanned,
            tags_emitted: counter.emitted,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Scanned {}: {} entries, {} files, {} tags in {}ms",
            meta.source_name(),
            summary.entries_visited,
            summary.files_scanned,
            summary.tags_emitted,
            summary.duration_ms,
        );
        summary
    }

    /// Scan one package and collect the findings into a report.
    pub fn scan_package_report(&self, tree: &SourceTree, meta: &PackageMeta) -> ScanReport {
        let mut collector = TagCollector::new();
        let summary = self.scan_package(tree, meta, &mut collector);
        ScanReport {
            source: meta.source_name().to_string(),
            tags: collector.tags,
            files_scanned: summary.files_scanned,
            duration_ms: summary.duration_ms,
        }
    }

    /// Scan independent packages in parallel over this shared scanner.
    pub fn scan_packages(&self, targets: &[(&SourceTree, &PackageMeta)]) -> Vec<ScanReport> {
        targets
            .par_iter()
            .map(|(tree, meta)| self.scan_package_report(tree, meta))
            .collect()
    }
}

/// Wraps the caller's sink to count emissions for the summary.
struct CountingSink<'s> {
    inner: &'s mut dyn TagSink,
    emitted: usize,
}

impl TagSink for CountingSink<'_> {
    fn emit(&mut self, name: &str, path: &str, context: &[&str]) {
        self.emitted += 1;
        self.inner.emit(name, path, context);
    }
}

// ─── One package scan ───────────────────────────────────────────────

/// Mutable state of a single package scan, exclusively owned.
struct PackageScan<'a, 'c> {
    scanner: &'a CruftScanner<'c>,
    tree: &'a SourceTree,
    meta: &'a PackageMeta,
    evaluator: LicenseEvaluator<'c>,
    in_diff: bool,
    /// Paths already tagged by a basename rule; never re-tagged.
    tagged_paths: HashSet<PathBuf>,
    files_scanned: usize,
    entries_visited: usize,
}

impl PackageScan<'_, '_> {
    fn run(&mut self, sink: &mut dyn TagSink) {
        let mut worklist: VecDeque<usize> = self.tree.top_level.iter().copied().collect();
        while let Some(idx) = worklist.pop_front() {
            let entry = &self.tree.entries[idx];
            self.entries_visited += 1;
            if entry.is_dir() {
                if entry.basename == PATCH_METADATA_DIR
                    || TEST_DIR_NAMES.contains(&entry.basename.as_str())
                {
                    continue;
                }
                self.check_directory(entry, sink);
                worklist.extend(entry.children.iter().copied());
            } else if entry.is_symlink() {
                self.check_symlink(entry, sink);
            } else if entry.is_file() {
                self.check_file(entry, sink);
                self.files_scanned += 1;
            }
        }
    }

    fn tag_prefix(&self) -> &'static str {
        if self.in_diff {
            "diff-contains"
        } else {
            "source-contains"
        }
    }

    /// Basename-rule tag, suppressed per path across passes.
    fn emit_path_rule(&mut self, suffix: &str, entry: &TreeEntry, sink: &mut dyn TagSink) {
        if self.tagged_paths.insert(entry.path.clone()) {
            let tag = format!("{}-{}", self.tag_prefix(), suffix);
            sink.emit(&tag, &entry.path_str(), &[]);
        }
    }

    fn check_directory(&mut self, entry: &TreeEntry, sink: &mut dyn TagSink) {
        let rule = self
            .scanner
            .catalog
            .vcs_dir_rules
            .iter()
            .filter(|r| !r.diff_only || self.in_diff)
            .find(|r| r.matches(&entry.basename));
        if let Some(rule) = rule {
            self.emit_path_rule(&rule.suffix, entry, sink);
        }
    }

    fn check_symlink(&self, entry: &TreeEntry, sink: &mut dyn TagSink) {
        let target = match &entry.link_target {
            Some(t) => t,
            None => return,
        };
        if entry.link_normalized.is_none() {
            let shown = target.to_string_lossy();
            sink.emit(
                "source-contains-unsafe-symlink",
                &entry.path_str(),
                &[&shown],
            );
        }
    }

    fn check_file(&mut self, entry: &TreeEntry, sink: &mut dyn TagSink) {
        let path = entry.path_str();

        // Digest blacklists run first and win outright. The
        // non-distributable list applies to every package; the non-free
        // list only to packages not already in non-free.
        if let Some(digest) = entry.md5.as_deref() {
            if let Some(hit) = self.scanner.catalog.md5_non_distributable.get(digest) {
                sink.emit(
                    "license-problem-md5sum-non-distributable-file",
                    &path,
                    &[&hit.name, &hit.reason, &hit.link],
                );
                return;
            }
            if !self.meta.is_non_free() {
                if let Some(hit) = self.scanner.catalog.md5_non_free.get(digest) {
                    sink.emit(
                        "license-problem-md5sum-non-free-file",
                        &path,
                        &[&hit.name, &hit.reason, &hit.link],
                    );
                    return;
                }
            }
        }

        self.check_known_paths(entry, &path, sink);

        let rule = self
            .scanner
            .catalog
            .vcs_file_rules
            .iter()
            .filter(|r| !r.diff_only || self.in_diff)
            .find(|r| r.matches(&entry.basename));
        if let Some(rule) = rule {
            self.emit_path_rule(&rule.suffix, entry, sink);
        }

        let content_type = self
            .scanner
            .classifier
            .content_type(&self.tree.abs_path(entry));
        self.check_file_type(entry, &path, &content_type, sink);

        if autotools::is_autotools_helper(&entry.basename) {
            match self.read_text(entry) {
                Ok(content) => {
                    autotools::check_helper(&entry.basename, &content, &path, self.meta, sink)
                }
                Err(e) => tracing::warn!("Cannot read {}: {}", path, e),
            }
        }

        // Everything textual that is not a change history gets the full
        // license scan.
        if content_type.contains("text") && !CHANGELOG_NAME.is_match(&entry.basename) {
            self.license_scan(entry, &path, sink);
        }
    }

    /// Fixed problem paths: packaging droppings and OS litter.
    fn check_known_paths(&mut self, entry: &TreeEntry, path: &str, sink: &mut dyn TagSink) {
        let in_debian = entry.parent_dir() == Path::new("debian");
        if in_debian && entry.basename == "files" {
            sink.emit("debian-files-list-in-source", path, &[]);
        }
        if in_debian && SUBSTVARS_NAME.is_match(&entry.basename) {
            sink.emit("source-contains-debian-substvars", path, &[]);
        }
        if entry.basename.eq_ignore_ascii_case("thumbs.db") {
            sink.emit("source-contains-windows-thumbnail-database", path, &[]);
        }
        if entry.basename == ".DS_Store" || entry.basename.starts_with("._") {
            sink.emit("source-contains-apple-double-file", path, &[]);
        }
        if entry.basename == "doxygen.png" || entry.basename == "doxygen.css" {
            let dir = entry.parent_dir().to_path_buf();
            if self.tagged_paths.insert(dir.clone()) {
                let shown = dir.to_string_lossy().replace('\\', "/");
                sink.emit(
                    "source-contains-prebuilt-doxygen-documentation",
                    &shown,
                    &[],
                );
            }
        }
    }

    /// First matching content-type rule tags the file; rules marked for
    /// missing-source checking also probe for a shipped source.
    fn check_file_type(
        &mut self,
        entry: &TreeEntry,
        path: &str,
        content_type: &str,
        sink: &mut dyn TagSink,
    ) {
        let rule = self
            .scanner
            .catalog
            .filetype_rules
            .iter()
            .find(|r| r.applies(content_type, &entry.basename));
        let rule = match rule {
            Some(r) => r,
            None => return,
        };
        sink.emit(&rule.tag, path, &[content_type]);
        if rule.check_missing_source && !self.meta.is_non_free() {
            self.probe_missing_source(entry, path, &rule.replacements, sink);
        }
    }

    fn probe_missing_source(
        &self,
        entry: &TreeEntry,
        path: &str,
        pairs: &[crate::catalog::ReplacementPair],
        sink: &mut dyn TagSink,
    ) {
        let found = find_missing_source(
            self.tree,
            entry,
            &self.scanner.config.missing_source_search_paths,
            pairs,
        );
        if found.is_none() {
            sink.emit("source-is-missing", path, &[]);
        }
    }

    /// Stream the file through the block reader and the rule evaluator.
    /// Minifiable JavaScript additionally runs the line-length heuristic
    /// per block, once per file.
    fn license_scan(&mut self, entry: &TreeEntry, path: &str, sink: &mut dyn TagSink) {
        let minifiable_js =
            is_javascript(&entry.basename) && !self.scanner.minified_name.is_match(&entry.basename);
        let block_size = if minifiable_js {
            self.scanner.config.js_block_size
        } else {
            self.scanner.config.block_size
        };

        let file = match self.tree.open(entry) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Cannot open {}: {}", path, e);
                return;
            }
        };
        let mut reader = BlockReader::with_transform(file, block_size, |chunk| {
            chunk.make_ascii_lowercase()
        });

        let ctx = FileContext {
            source_name: self.meta.source_name(),
            path,
            basename: &entry.basename,
            non_free_package: self.meta.is_non_free(),
        };
        let mut state = self.evaluator.begin_file();
        let mut js_tagged = false;

        loop {
            let mut block = match reader.next_block() {
                Ok(Some(b)) => b,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Read error in {}: {}", path, e);
                    break;
                }
            };

            if minifiable_js && !js_tagged {
                let mean = mean_line_length_after_strip(&block.raw);
                if mean > self.scanner.config.minified_js_threshold {
                    let shown = format!(
                        "mean line length is {} characters (>{})",
                        mean as u64, self.scanner.config.minified_js_threshold as u64
                    );
                    sink.emit("source-contains-prebuilt-javascript-object", path, &[&shown]);
                    js_tagged = true;
                    if !self.meta.is_non_free() {
                        self.probe_missing_source(entry, path, javascript_source_pairs(), sink);
                    }
                }
            }

            match self.evaluator.check_block(&ctx, &mut block, &mut state, sink) {
                BlockOutcome::Continue => {}
                BlockOutcome::StopFile => break,
            }
        }
    }

    /// Whole file as lossy text, for the small helper-script checks.
    fn read_text(&self, entry: &TreeEntry) -> std::io::Result<String> {
        let mut file = self.tree.open(entry)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
