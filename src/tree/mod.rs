//! Single-pass source tree indexing — walk once, serve every check.
//!
//! The index records every entry of an unpacked source package with the
//! metadata the checks need: kind, size, permission bits, raw and
//! normalized symlink targets, and a whole-file MD5 digest for regular
//! files. Checks never touch the filesystem for metadata again; only
//! file content is read on demand.

use crate::{DebcruftError, DebcruftResult};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

// ─── Entries ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    /// Fifos, sockets, devices. Indexed but never scanned.
    Other,
}

/// One indexed tree entry with pre-computed metadata.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Path relative to the tree root.
    pub path: PathBuf,
    pub basename: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Unix permission bits; zero on platforms without them.
    pub mode: u32,
    /// Raw symlink target as stored on disk.
    pub link_target: Option<PathBuf>,
    /// Target resolved lexically within the tree; `None` when the link
    /// escapes the root or is absolute.
    pub link_normalized: Option<PathBuf>,
    /// Whole-file MD5, lowercased hex. `None` for non-files and files
    /// that could not be read.
    pub md5: Option<String>,
    /// Indices of direct children, for directories.
    pub children: Vec<usize>,
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    /// Containing directory, relative to the root. Empty for top level.
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Relative path as a displayable string, `/`-separated.
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

// ─── Tree Index ─────────────────────────────────────────────────────

/// Pre-built index of an unpacked source tree.
#[derive(Debug)]
pub struct SourceTree {
    pub root: PathBuf,
    pub entries: Vec<TreeEntry>,
    /// Indices of entries directly under the root.
    pub top_level: Vec<usize>,
    by_path: HashMap<PathBuf, usize>,
}

impl SourceTree {
    /// Walk the tree once and build the complete index.
    ///
    /// Symlinks are never followed. Files that cannot be read still get
    /// an entry, just without a digest.
    pub fn index(root: &Path) -> DebcruftResult<Self> {
        if !root.is_dir() {
            return Err(DebcruftError::Tree(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut entries = Vec::new();
        for item in WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let rel = match item.path().strip_prefix(root) {
                Ok(r) => r.to_path_buf(),
                Err(_) => continue,
            };
            let basename = rel
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let file_type = item.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_symlink() {
                EntryKind::Symlink
            } else {
                EntryKind::Other
            };

            let (size, mode) = match item.metadata() {
                Ok(md) => (md.len(), mode_bits(&md)),
                Err(_) => (0, 0),
            };

            let (link_target, link_normalized) = if kind == EntryKind::Symlink {
                match std::fs::read_link(item.path()) {
                    Ok(target) => {
                        let parent = rel.parent().unwrap_or_else(|| Path::new(""));
                        let normalized = normalize_link(parent, &target);
                        (Some(target), normalized)
                    }
                    Err(e) => {
                        tracing::warn!("Cannot read symlink {}: {}", rel.display(), e);
                        (None, None)
                    }
                }
            } else {
                (None, None)
            };

            let md5 = if kind == EntryKind::File {
                match file_md5(item.path()) {
                    Ok(digest) => Some(digest),
                    Err(e) => {
                        tracing::warn!("Cannot digest {}: {}", rel.display(), e);
                        None
                    }
                }
            } else {
                None
            };

            entries.push(TreeEntry {
                path: rel,
                basename,
                kind,
                size,
                mode,
                link_target,
                link_normalized,
                md5,
                children: Vec::new(),
            });
        }

        // Wire parent → child indices after the walk so ordering does not
        // matter.
        let by_path: HashMap<PathBuf, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.path.clone(), i))
            .collect();
        let mut top_level = Vec::new();
        for idx in 0..entries.len() {
            let parent = entries[idx].parent_dir().to_path_buf();
            if parent.as_os_str().is_empty() {
                top_level.push(idx);
            } else if let Some(&pidx) = by_path.get(&parent) {
                entries[pidx].children.push(idx);
            }
        }

        tracing::info!(
            "SourceTree: {} entries under {} ({} top-level)",
            entries.len(),
            root.display(),
            top_level.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            entries,
            top_level,
            by_path,
        })
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<&TreeEntry> {
        self.by_path.get(path.as_ref()).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.by_path.contains_key(path.as_ref())
    }

    /// Digest lookup for a relative path.
    pub fn md5(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.entry(path).and_then(|e| e.md5.as_deref())
    }

    pub fn abs_path(&self, entry: &TreeEntry) -> PathBuf {
        self.root.join(&entry.path)
    }

    /// Open an entry's content for streaming.
    pub fn open(&self, entry: &TreeEntry) -> std::io::Result<File> {
        File::open(self.abs_path(entry))
    }

    pub fn children<'a>(&'a self, entry: &'a TreeEntry) -> impl Iterator<Item = &'a TreeEntry> {
        entry.children.iter().map(move |&i| &self.entries[i])
    }

    pub fn total_entries(&self) -> usize {
        self.entries.len()
    }
}

fn mode_bits(md: &std::fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        md.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        let _ = md;
        0
    }
}

/// Stream a file through MD5 and return the lowercased hex digest.
pub fn file_md5(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Resolve a symlink target lexically against its containing directory.
///
/// Returns the root-relative path of the target, or `None` when the
/// target is absolute or any `..` step leaves the tree.
pub fn normalize_link(parent: &Path, target: &Path) -> Option<PathBuf> {
    if target.is_absolute() {
        return None;
    }
    let mut stack: Vec<std::ffi::OsString> = parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_os_string()),
            _ => None,
        })
        .collect();
    for comp in target.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                stack.pop()?;
            }
            Component::Normal(part) => stack.push(part.to_os_string()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(stack.iter().collect())
}

// ─── Package Metadata ───────────────────────────────────────────────

/// Metadata of the package under scan, supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMeta {
    /// Source package name.
    pub source: String,
    /// Package lives in the non-free archive area.
    pub non_free: bool,
    /// Native package: no separate Debian diff portion.
    pub native: bool,
    /// Declared build-dependency package names, lowercased.
    pub build_deps: Vec<String>,
}

impl PackageMeta {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source
    }

    pub fn is_non_free(&self) -> bool {
        self.non_free
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    /// True when any of the given tool packages is build-depended on.
    pub fn declares_build_tool(&self, tools: &[&str]) -> bool {
        self.build_deps
            .iter()
            .any(|dep| tools.iter().any(|t| dep == t))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
