//! Tag emission — the only externally observable output of a scan.
//!
//! Every check reports findings by emitting a named tag against a path,
//! optionally with extra context strings (digest owners, line lengths,
//! extracted license text). Consumers provide a [`TagSink`]; the bundled
//! [`TagCollector`] accumulates tags in memory for reporting and tests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single finding: tag name, the path it applies to, extra context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.path)?;
        for part in &self.context {
            write!(f, " {}", part)?;
        }
        Ok(())
    }
}

/// Receiver for emitted tags.
///
/// Implementations must tolerate repeated emission; deduplication is the
/// emitter's job, not the sink's.
pub trait TagSink {
    fn emit(&mut self, name: &str, path: &str, context: &[&str]);
}

/// In-memory sink used by [`ScanReport`] and throughout the test suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagCollector {
    pub tags: Vec<Tag>,
}

impl TagCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// True if any tag with this name was emitted.
    pub fn contains(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Number of tags emitted under this name.
    pub fn count(&self, name: &str) -> usize {
        self.tags.iter().filter(|t| t.name == name).count()
    }

    /// All tags recorded against a path, in emission order.
    pub fn for_path(&self, path: &str) -> Vec<&Tag> {
        self.tags.iter().filter(|t| t.path == path).collect()
    }

    /// First tag with this name, if any.
    pub fn find(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }
}

impl TagSink for TagCollector {
    fn emit(&mut self, name: &str, path: &str, context: &[&str]) {
        self.tags.push(Tag {
            name: name.to_string(),
            path: path.to_string(),
            context: context.iter().map(|c| c.to_string()).collect(),
        });
    }
}

/// Full result of scanning one source package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Source package name.
    pub source: String,
    pub tags: Vec<Tag>,
    pub files_scanned: usize,
    pub duration_ms: u64,
}

impl ScanReport {
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

/// Render a report as pretty-printed JSON.
pub fn render_json(report: &ScanReport) -> crate::DebcruftResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
