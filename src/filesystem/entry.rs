use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::filesystem::FileMode;

/// Result of a `stat` call, independent of the backing filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub is_directory: bool,
    pub size: u64,
    pub mode: FileMode,
    pub modified_time: Option<SystemTime>,
}

impl From<&Metadata> for EntryMetadata {
    fn from(metadata: &Metadata) -> Self {
        Self {
            is_directory: metadata.is_dir(),
            size: metadata.len(),
            mode: FileMode::from_metadata(metadata),
            modified_time: metadata.modified().ok(),
        }
    }
}

/// One file or directory found under a tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    /// Path relative to the tree root; unique within a snapshot.
    pub relative_path: PathBuf,
    /// Only meaningful for non-directories.
    pub size: u64,
    pub is_directory: bool,
    pub permissions: FileMode,
    /// Recorded but never compared.
    pub modified_time: Option<SystemTime>,
}

impl DirectoryEntry {
    pub fn new(relative_path: impl Into<PathBuf>, metadata: EntryMetadata) -> Self {
        let relative_path = relative_path.into();
        let name = relative_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name,
            relative_path,
            size: metadata.size,
            is_directory: metadata.is_directory,
            permissions: metadata.mode,
            modified_time: metadata.modified_time,
        }
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}
