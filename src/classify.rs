//! Flat source listing and extension-based classification

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};

/// A regular file found in a flat directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    /// Lowercased suffix from the last `.` on, e.g. `.jpg`.
    pub extension: Option<String>,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&name);
        Self {
            path,
            name,
            extension,
        }
    }
}

/// `.tar.gz` yields `.gz`; `.DS_Store` yields `.ds_store`; `README` has none.
pub fn extension_of(name: &str) -> Option<String> {
    name.rfind('.').map(|i| name[i..].to_lowercase())
}

/// Case-normalized set of dot-prefixed extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(exts.into_iter().map(|e| e.as_ref().to_lowercase()).collect())
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.0.contains(&ext.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Entries that are not a `.`-prefixed suffix.
    pub fn malformed(&self) -> Vec<&str> {
        self.iter()
            .filter(|e| !e.starts_with('.') || e.len() < 2)
            .collect()
    }
}

/// Three disjoint groups, each in listing order.
#[derive(Debug, Default, Clone)]
pub struct Classification {
    pub transfer: Vec<FileEntry>,
    pub delete: Vec<FileEntry>,
    pub ignored: Vec<FileEntry>,
}

/// Split entries by extension. A suffix present in both sets is deleted.
pub fn classify<I>(entries: I, keep: &ExtensionSet, delete: &ExtensionSet) -> Classification
where
    I: IntoIterator<Item = FileEntry>,
{
    let mut out = Classification::default();
    for entry in entries {
        match entry.extension.as_deref() {
            Some(ext) if delete.contains(ext) => out.delete.push(entry),
            Some(ext) if keep.contains(ext) => out.transfer.push(entry),
            _ => out.ignored.push(entry),
        }
    }
    out
}

/// Regular files directly inside `dir`, in directory order (not sorted).
/// Directories and symlinks to directories are skipped; symlinks to
/// regular files count as files.
pub fn list_regular_files(dir: &Path) -> SyncResult<Vec<FileEntry>> {
    let mut entries = Vec::new();

    for item in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = match item {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop"));
                return Err(SyncError::SourceUnreadable {
                    path: dir.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        let ft = entry.file_type();
        let is_file = if ft.is_symlink() {
            fs::metadata(entry.path()).map(|m| m.is_file()).unwrap_or(false)
        } else {
            ft.is_file()
        };
        if is_file {
            entries.push(FileEntry::new(entry.into_path()));
        }
    }

    Ok(entries)
}
