//! # debcruft — Debian Source Tree Cruft Scanner
//!
//! Static scanner for unpacked Debian source packages. Walks the upstream
//! tree, flags legally or technically problematic content — non-free and
//! non-distributable license texts, prebuilt objects without source,
//! leftover VCS metadata, stale autotools helpers — and emits structured
//! tags compatible with archive-wide QA tooling.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       CruftScanner                         │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌────────────┐  │
//! │  │SourceTree │ │ Catalog   │ │ Classify  │ │ ScanConfig │  │
//! │  │(1-pass)   │ │(rule data)│ │(magic/js) │ │ (toml)     │  │
//! │  └─────┬─────┘ └─────┬─────┘ └─────┬─────┘ └─────┬──────┘  │
//! │        │             │             │             │         │
//! │  ┌─────▼─────────────▼─────────────▼─────────────▼──────┐  │
//! │  │  Tree Walk (FIFO) → per-entry checks                 │  │
//! │  │  VCS dirs │ MD5 blacklists │ autotools │ filetypes   │  │
//! │  └──────────────────────────┬───────────────────────────┘  │
//! │                             │                              │
//! │  ┌──────────────────────────▼───────────────────────────┐  │
//! │  │  BlockReader → clean_block → rule evaluator          │  │
//! │  │  keywords → sentence → regex → validator → Tag       │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checks
//!
//! - **License Problems**: catalog-driven detection of non-free and
//!   non-distributable license texts, GFDL invariant-section analysis
//! - **MD5 Blacklists**: whole-file digests of known problematic files
//! - **Prebuilt Objects**: ELF/PE/Java/Flash blobs, minified JavaScript
//!   (by name and by mean-line-length heuristic), missing-source probing
//! - **VCS Cruft**: control directories and files left in shipped trees
//! - **Autotools Staleness**: `config.sub`/`config.guess` timestamps and
//!   `ltmain.sh` versions, suppressed by declared build tooling
//! - **Tree Hygiene**: unsafe symlinks, `debian/files`, substvars,
//!   thumbnail databases, AppleDouble droppings

pub mod catalog;
pub mod classify;
pub mod scanner;
pub mod tags;
pub mod tree;
pub mod walk;

// Re-exports for convenience
pub use catalog::{Catalog, LicenseRule, LicenseRuleSet, ValidatorKind};
pub use classify::{ContentTypeSource, MagicClassifier};
pub use scanner::{BlockReader, ScanBlock};
pub use tags::{ScanReport, Tag, TagCollector, TagSink};
pub use tree::{EntryKind, PackageMeta, SourceTree, TreeEntry};
pub use walk::{CruftScanner, ScanConfig, ScanSummary};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebcruftError {
    #[error("Catalog error in {file} line {line}: {message}")]
    Catalog {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tree index error: {0}")]
    Tree(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type DebcruftResult<T> = Result<T, DebcruftError>;
