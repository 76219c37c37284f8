//! Basename-pattern rules for version-control cruft.
//!
//! Two tables share this shape: one for directories, one for regular files.
//! Rules are tried in table order against the entry's basename; the first
//! match wins and yields a `source-contains-<suffix>` or
//! `diff-contains-<suffix>` tag depending on walk context.

use crate::catalog::{row_error, TableRow};
use crate::DebcruftResult;
use regex::Regex;

/// One basename rule.
#[derive(Debug)]
pub struct PathRule {
    pub pattern: Regex,
    /// Tag suffix; the walk context supplies the prefix.
    pub suffix: String,
    /// Only applied while walking the Debian diff portion of a package.
    pub diff_only: bool,
}

impl PathRule {
    pub fn matches(&self, basename: &str) -> bool {
        self.pattern.is_match(basename)
    }
}

/// Compile rows of the form `pattern ~~ suffix ~~ diff-only`.
pub(crate) fn parse_path_rules(file: &str, rows: &[TableRow]) -> DebcruftResult<Vec<PathRule>> {
    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        let pattern = Regex::new(&row.fields[0])
            .map_err(|e| row_error(file, row.line, &format!("invalid pattern: {}", e)))?;
        let suffix = row.fields[1].clone();
        if suffix.is_empty() {
            return Err(row_error(file, row.line, "empty tag suffix"));
        }
        let diff_only = match row.fields[2].as_str() {
            "0" => false,
            "1" => true,
            other => {
                return Err(row_error(
                    file,
                    row.line,
                    &format!("diff-only flag must be 0 or 1, got {:?}", other),
                ))
            }
        };
        rules.push(PathRule {
            pattern,
            suffix,
            diff_only,
        });
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_table;

    #[test]
    fn test_first_match_order_is_table_order() {
        let rows = parse_table(
            "vcs-control-dirs",
            "^cvs$ ~~ cvs-control-dir ~~ 0\n^\\.svn$ ~~ svn-control-dir ~~ 0\n",
            3,
        )
        .unwrap();
        let rules = parse_path_rules("vcs-control-dirs", &rows).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].matches("cvs"));
        assert!(!rules[0].matches(".svn"));
        assert!(rules[1].matches(".svn"));
        assert!(!rules[1].diff_only);
    }

    #[test]
    fn test_bad_diff_only_flag_rejected() {
        let rows = parse_table("vcs-control-files", "~$ ~~ editor-backup-file ~~ yes\n", 3).unwrap();
        let err = parse_path_rules("vcs-control-files", &rows).unwrap_err();
        assert!(err.to_string().contains("diff-only"));
    }
}
