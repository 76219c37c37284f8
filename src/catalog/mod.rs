//! Rule catalog — delimited text tables compiled into matchers.
//!
//! All scanner knowledge lives in small data files with ` ~~ `-separated
//! fields, one rule per line, `#` comments and blank lines ignored. The
//! catalog ships embedded copies of every table and can also load a
//! directory of replacement tables. Any malformed row aborts the load with
//! a [`DebcruftError::Catalog`] naming the file and line; a scanner must
//! never run with a partially loaded catalog.
//!
//! Tables:
//! - `license-problem` — non-free license texts (rule format, §evaluator)
//! - `non-distributable-license` — texts that block distribution outright
//! - `gfdl-fragments` — recognized GFDL invariant-section wordings
//! - `vcs-control-dirs` / `vcs-control-files` — VCS cruft basenames
//! - `md5-non-distributable` / `md5-non-free` — whole-file digest blacklists
//! - `warn-file-types` — content-type warnings and missing-source probes

mod filetype_rules;
mod gfdl;
mod license_rules;
mod md5_rules;
mod path_rules;

pub use filetype_rules::{FileTypeRule, ReplacementPair};
pub use gfdl::GfdlFragment;
pub use license_rules::{LicenseRule, LicenseRuleSet, ValidatorKind};
pub use md5_rules::Md5Entry;
pub use path_rules::PathRule;

use crate::{DebcruftError, DebcruftResult};
use aho_corasick::AhoCorasick;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const LICENSE_PROBLEM: &str = "license-problem";
pub const NON_DISTRIBUTABLE_LICENSE: &str = "non-distributable-license";
pub const GFDL_FRAGMENTS: &str = "gfdl-fragments";
pub const VCS_CONTROL_DIRS: &str = "vcs-control-dirs";
pub const VCS_CONTROL_FILES: &str = "vcs-control-files";
pub const MD5_NON_DISTRIBUTABLE: &str = "md5-non-distributable";
pub const MD5_NON_FREE: &str = "md5-non-free";
pub const WARN_FILE_TYPES: &str = "warn-file-types";

// ─── Table Format ───────────────────────────────────────────────────

/// One data row: original line number plus trimmed fields.
#[derive(Debug)]
pub(crate) struct TableRow {
    pub line: usize,
    pub fields: Vec<String>,
}

pub(crate) fn row_error(file: &str, line: usize, message: &str) -> DebcruftError {
    DebcruftError::Catalog {
        file: file.to_string(),
        line,
        message: message.to_string(),
    }
}

/// Split a table into rows, enforcing the expected field count.
///
/// Fields may not contain the ` ~~ ` delimiter; there is no escaping.
pub(crate) fn parse_table(
    file: &str,
    text: &str,
    expected_fields: usize,
) -> DebcruftResult<Vec<TableRow>> {
    let mut rows = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<String> = trimmed.split("~~").map(|f| f.trim().to_string()).collect();
        if fields.len() != expected_fields {
            return Err(row_error(
                file,
                line,
                &format!(
                    "expected {} fields, found {}",
                    expected_fields,
                    fields.len()
                ),
            ));
        }
        rows.push(TableRow { line, fields });
    }
    Ok(rows)
}

// ─── Catalog ────────────────────────────────────────────────────────

/// Raw table texts, before compilation.
struct RawTables<'a> {
    license_problem: &'a str,
    non_distributable: &'a str,
    gfdl_fragments: &'a str,
    vcs_control_dirs: &'a str,
    vcs_control_files: &'a str,
    md5_non_distributable: &'a str,
    md5_non_free: &'a str,
    warn_file_types: &'a str,
}

/// The full compiled rule catalog.
#[derive(Debug)]
pub struct Catalog {
    /// Texts that make a file non-distributable. Checked first; a hit
    /// stops all further scanning of the file.
    pub non_distributable: LicenseRuleSet,
    /// Texts that make a file non-free.
    pub non_free: LicenseRuleSet,
    pub gfdl_fragments: Vec<GfdlFragment>,
    pub vcs_dir_rules: Vec<PathRule>,
    pub vcs_file_rules: Vec<PathRule>,
    pub md5_non_distributable: HashMap<String, Md5Entry>,
    pub md5_non_free: HashMap<String, Md5Entry>,
    pub filetype_rules: Vec<FileTypeRule>,

    /// Distinct keywords across both license rule sets, in first-use order.
    keywords: Vec<String>,
    keyword_matcher: AhoCorasick,
}

impl Catalog {
    /// Compile the tables embedded in the binary.
    pub fn builtin() -> DebcruftResult<Self> {
        Self::compile(RawTables {
            license_problem: include_str!("../../data/license-problem"),
            non_distributable: include_str!("../../data/non-distributable-license"),
            gfdl_fragments: include_str!("../../data/gfdl-fragments"),
            vcs_control_dirs: include_str!("../../data/vcs-control-dirs"),
            vcs_control_files: include_str!("../../data/vcs-control-files"),
            md5_non_distributable: include_str!("../../data/md5-non-distributable"),
            md5_non_free: include_str!("../../data/md5-non-free"),
            warn_file_types: include_str!("../../data/warn-file-types"),
        })
    }

    /// Compile a directory holding all eight table files by name.
    pub fn load_from_dir(dir: &Path) -> DebcruftResult<Self> {
        let read = |name: &str| -> DebcruftResult<String> {
            std::fs::read_to_string(dir.join(name)).map_err(|e| {
                row_error(name, 0, &format!("unreadable table: {}", e))
            })
        };
        let license_problem = read(LICENSE_PROBLEM)?;
        let non_distributable = read(NON_DISTRIBUTABLE_LICENSE)?;
        let gfdl_fragments = read(GFDL_FRAGMENTS)?;
        let vcs_control_dirs = read(VCS_CONTROL_DIRS)?;
        let vcs_control_files = read(VCS_CONTROL_FILES)?;
        let md5_non_distributable = read(MD5_NON_DISTRIBUTABLE)?;
        let md5_non_free = read(MD5_NON_FREE)?;
        let warn_file_types = read(WARN_FILE_TYPES)?;
        Self::compile(RawTables {
            license_problem: &license_problem,
            non_distributable: &non_distributable,
            gfdl_fragments: &gfdl_fragments,
            vcs_control_dirs: &vcs_control_dirs,
            vcs_control_files: &vcs_control_files,
            md5_non_distributable: &md5_non_distributable,
            md5_non_free: &md5_non_free,
            warn_file_types: &warn_file_types,
        })
    }

    fn compile(tables: RawTables<'_>) -> DebcruftResult<Self> {
        let rows = parse_table(NON_DISTRIBUTABLE_LICENSE, tables.non_distributable, 6)?;
        let mut non_distributable = LicenseRuleSet::from_rows(NON_DISTRIBUTABLE_LICENSE, &rows)?;

        let rows = parse_table(LICENSE_PROBLEM, tables.license_problem, 6)?;
        let mut non_free = LicenseRuleSet::from_rows(LICENSE_PROBLEM, &rows)?;

        let rows = parse_table(GFDL_FRAGMENTS, tables.gfdl_fragments, 3)?;
        let gfdl_fragments = gfdl::parse_fragments(GFDL_FRAGMENTS, &rows)?;

        let rows = parse_table(VCS_CONTROL_DIRS, tables.vcs_control_dirs, 3)?;
        let vcs_dir_rules = path_rules::parse_path_rules(VCS_CONTROL_DIRS, &rows)?;

        let rows = parse_table(VCS_CONTROL_FILES, tables.vcs_control_files, 3)?;
        let vcs_file_rules = path_rules::parse_path_rules(VCS_CONTROL_FILES, &rows)?;

        let rows = parse_table(MD5_NON_DISTRIBUTABLE, tables.md5_non_distributable, 4)?;
        let md5_non_distributable = md5_rules::parse_md5_table(MD5_NON_DISTRIBUTABLE, &rows)?;

        let rows = parse_table(MD5_NON_FREE, tables.md5_non_free, 4)?;
        let md5_non_free = md5_rules::parse_md5_table(MD5_NON_FREE, &rows)?;

        let rows = parse_table(WARN_FILE_TYPES, tables.warn_file_types, 5)?;
        let filetype_rules = filetype_rules::parse_filetype_rules(WARN_FILE_TYPES, &rows)?;

        // Resolve every rule keyword to an index in one shared table, then
        // build a single automaton covering both rule sets. One pass over a
        // raw block answers every keyword-presence question for it.
        let mut keywords: Vec<String> = Vec::new();
        let mut ids: HashMap<String, usize> = HashMap::new();
        let mut resolve = |set: &mut LicenseRuleSet| {
            for rule in &mut set.rules {
                rule.keyword_ids = rule
                    .keywords
                    .iter()
                    .map(|kw| {
                        *ids.entry(kw.clone()).or_insert_with(|| {
                            keywords.push(kw.clone());
                            keywords.len() - 1
                        })
                    })
                    .collect();
            }
        };
        resolve(&mut non_distributable);
        resolve(&mut non_free);

        let keyword_matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&keywords)
            .map_err(|e| {
                row_error(
                    LICENSE_PROBLEM,
                    0,
                    &format!("failed to build keyword matcher: {}", e),
                )
            })?;

        let catalog = Self {
            non_distributable,
            non_free,
            gfdl_fragments,
            vcs_dir_rules,
            vcs_file_rules,
            md5_non_distributable,
            md5_non_free,
            filetype_rules,
            keywords,
            keyword_matcher,
        };

        tracing::info!(
            "Catalog loaded: {} non-distributable rules, {} non-free rules, {} gfdl fragments, {} path rules, {} digests, {} file types",
            catalog.non_distributable.len(),
            catalog.non_free.len(),
            catalog.gfdl_fragments.len(),
            catalog.vcs_dir_rules.len() + catalog.vcs_file_rules.len(),
            catalog.md5_non_distributable.len() + catalog.md5_non_free.len(),
            catalog.filetype_rules.len(),
        );
        Ok(catalog)
    }

    /// Keyword indices present anywhere in a raw block.
    pub(crate) fn keyword_presence(&self, raw_block: &str) -> HashSet<usize> {
        let mut present = HashSet::new();
        for m in self.keyword_matcher.find_overlapping_iter(raw_block) {
            present.insert(m.pattern().as_usize());
        }
        present
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
