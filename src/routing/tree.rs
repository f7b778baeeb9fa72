//! Feature tree: the typed directory description routes are built from.
//!
//! # Responsibilities
//! - Walk a features directory on disk into typed entries
//! - Allow the same description to be assembled in memory
//!
//! # Design Decisions
//! - Directories are kept as entries so empty method directories still
//!   produce (empty) routes
//! - Only `.toml` files carry meaning; other files are skipped at scan time
//! - Entries are sorted by path so discovery order is deterministic

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// What a feature-tree entry is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    /// A `.toml` declaration file with its contents.
    File(String),
}

/// One directory or declaration file, addressed relative to the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEntry {
    segments: Vec<String>,
    kind: EntryKind,
}

impl FeatureEntry {
    /// A directory at a slash-separated relative path.
    pub fn dir(path: &str) -> Self {
        Self {
            segments: split(path),
            kind: EntryKind::Dir,
        }
    }

    /// A declaration file at a slash-separated relative path.
    pub fn file(path: &str, source: impl Into<String>) -> Self {
        Self {
            segments: split(path),
            kind: EntryKind::File(source.into()),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    /// Relative path for diagnostics.
    pub fn display_path(&self) -> String {
        self.segments.join("/")
    }
}

fn split(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Error raised while reading a feature tree from disk.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("feature root {0:?} is not a directory")]
    MissingRoot(PathBuf),
    #[error("failed to walk feature tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path {0:?} is not valid UTF-8")]
    NonUtf8(PathBuf),
}

/// A full feature tree.
#[derive(Debug, Clone, Default)]
pub struct FeatureTree {
    entries: Vec<FeatureEntry>,
}

impl FeatureTree {
    /// Build a tree from in-memory entries. Parent directories of files are
    /// implied and do not need to be listed.
    pub fn from_entries(entries: impl IntoIterator<Item = FeatureEntry>) -> Self {
        let mut entries: Vec<FeatureEntry> = entries.into_iter().collect();
        let implied: Vec<FeatureEntry> = entries
            .iter()
            .flat_map(|e| {
                let depth = match e.kind {
                    EntryKind::File(_) => e.segments.len().saturating_sub(1),
                    EntryKind::Dir => e.segments.len(),
                };
                (1..=depth).map(move |n| FeatureEntry {
                    segments: e.segments[..n].to_vec(),
                    kind: EntryKind::Dir,
                })
            })
            .collect();
        entries.extend(implied);
        entries.sort_by(|a, b| a.segments.cmp(&b.segments));
        entries.dedup();
        Self { entries }
    }

    /// Walk `root` on disk.
    pub fn scan(root: &Path) -> Result<Self, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::MissingRoot(root.to_path_buf()));
        }

        let mut entries = Vec::new();
        for item in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let item = item?;
            let relative = item
                .path()
                .strip_prefix(root)
                .map_err(|_| ScanError::NonUtf8(item.path().to_path_buf()))?;

            let mut segments = Vec::new();
            for component in relative.components() {
                let name = component
                    .as_os_str()
                    .to_str()
                    .ok_or_else(|| ScanError::NonUtf8(item.path().to_path_buf()))?;
                segments.push(name.to_string());
            }

            if item.file_type().is_dir() {
                entries.push(FeatureEntry {
                    segments,
                    kind: EntryKind::Dir,
                });
            } else if item.path().extension().and_then(|e| e.to_str()) == Some("toml") {
                let source = std::fs::read_to_string(item.path()).map_err(|source| {
                    ScanError::Read {
                        path: item.path().to_path_buf(),
                        source,
                    }
                })?;
                entries.push(FeatureEntry {
                    segments,
                    kind: EntryKind::File(source),
                });
            } else {
                tracing::debug!(path = %item.path().display(), "Skipping non-declaration file");
            }
        }

        tracing::debug!(root = %root.display(), entries = entries.len(), "Feature tree scanned");
        Ok(Self::from_entries(entries))
    }

    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_dirs_are_implied() {
        let tree = FeatureTree::from_entries([FeatureEntry::file(
            "about/@get/steps/100-prepare.toml",
            "handler = \"x\"",
        )]);
        let paths: Vec<String> = tree.entries().iter().map(|e| e.display_path()).collect();
        assert_eq!(
            paths,
            vec![
                "about",
                "about/@get",
                "about/@get/steps",
                "about/@get/steps/100-prepare.toml",
            ]
        );
    }

    #[test]
    fn test_scan_reads_toml_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let steps = dir.path().join("about/@get/steps");
        std::fs::create_dir_all(&steps).unwrap();
        std::fs::create_dir_all(dir.path().join("empty/@post")).unwrap();
        std::fs::write(steps.join("100-prepare.toml"), "handler = \"about.prepare\"").unwrap();
        std::fs::write(steps.join("NOTES.md"), "ignored").unwrap();

        let tree = FeatureTree::scan(dir.path()).unwrap();
        let files: Vec<&FeatureEntry> = tree
            .entries()
            .iter()
            .filter(|e| matches!(e.kind(), EntryKind::File(_)))
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].display_path(), "about/@get/steps/100-prepare.toml");
        assert!(tree
            .entries()
            .iter()
            .any(|e| e.display_path() == "empty/@post" && *e.kind() == EntryKind::Dir));
    }

    #[test]
    fn test_scan_missing_root() {
        let err = FeatureTree::scan(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, ScanError::MissingRoot(_)));
    }
}
