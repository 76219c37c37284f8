//! MD5 blacklists of known problematic files.
//!
//! Whole-file digests of files that must never ship in the archive, either
//! because they are not distributable at all or because they are non-free.
//! A digest hit short-circuits every other per-file check.

use crate::catalog::{row_error, TableRow};
use crate::DebcruftResult;
use std::collections::HashMap;

/// Catalog entry for one blacklisted digest.
#[derive(Debug, Clone)]
pub struct Md5Entry {
    /// Customary upstream file name, for tag context.
    pub name: String,
    /// Short human explanation of why the file is listed.
    pub reason: String,
    /// Reference URL backing the listing.
    pub link: String,
}

/// Compile rows of the form `digest ~~ name ~~ reason ~~ link` into a
/// digest-keyed map. Digests are stored lowercased.
pub(crate) fn parse_md5_table(
    file: &str,
    rows: &[TableRow],
) -> DebcruftResult<HashMap<String, Md5Entry>> {
    let mut entries = HashMap::with_capacity(rows.len());
    for row in rows {
        let digest = row.fields[0].to_ascii_lowercase();
        if digest.len() != 32 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(row_error(
                file,
                row.line,
                &format!("{:?} is not a 32-character hex digest", row.fields[0]),
            ));
        }
        if entries.contains_key(&digest) {
            return Err(row_error(
                file,
                row.line,
                &format!("duplicate digest {}", digest),
            ));
        }
        entries.insert(
            digest,
            Md5Entry {
                name: row.fields[1].clone(),
                reason: row.fields[2].clone(),
                link: row.fields[3].clone(),
            },
        );
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_table;

    #[test]
    fn test_digests_key_the_map_lowercased() {
        let rows = parse_table(
            "md5-non-free",
            "AB54D286E7F199BDAD334F8D2B7B42F9 ~~ lena.jpg ~~ non-free test image ~~ https://example.org/lena\n",
            4,
        )
        .unwrap();
        let map = parse_md5_table("md5-non-free", &rows).unwrap();
        let entry = map.get("ab54d286e7f199bdad334f8d2b7b42f9").unwrap();
        assert_eq!(entry.name, "lena.jpg");
        assert!(entry.reason.contains("non-free"));
    }

    #[test]
    fn test_short_digest_rejected() {
        let rows = parse_table("md5-non-free", "abc123 ~~ x ~~ y ~~ z\n", 4).unwrap();
        let err = parse_md5_table("md5-non-free", &rows).unwrap_err();
        assert!(err.to_string().contains("32-character"));
    }

    #[test]
    fn test_duplicate_digest_rejected() {
        let digest = "0123456789abcdef0123456789abcdef";
        let text = format!("{d} ~~ a ~~ r ~~ l\n{d} ~~ b ~~ r ~~ l\n", d = digest);
        let rows = parse_table("md5-non-free", &text, 4).unwrap();
        let err = parse_md5_table("md5-non-free", &rows).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
