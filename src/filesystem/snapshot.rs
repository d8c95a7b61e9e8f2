use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::PathDisplayExt;
use crate::filesystem::{DirectoryEntry, FileSystem, WalkError};

/// Every entry below a tree root at one instant, keyed by relative path.
///
/// Keys are ordered component-wise, so a directory always comes before
/// anything inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<PathBuf, DirectoryEntry>,
}

impl Snapshot {
    /// Walks the whole tree under `root`. The root itself is not recorded;
    /// it may be a symbolic link to a directory, nothing below it is
    /// followed.
    ///
    /// Stops at the first entry that cannot be read; no partial snapshot is
    /// ever returned.
    pub fn capture<F: FileSystem>(fs: &F, root: &Path) -> Result<Self, SnapshotError> {
        let entries: BTreeMap<PathBuf, DirectoryEntry> = fs
            .walk(root)
            .context(ReadSnafu { root })?
            .into_iter()
            .map(|(relative_path, metadata)| {
                (
                    relative_path.clone(),
                    DirectoryEntry::new(relative_path, metadata),
                )
            })
            .collect();

        debug!(
            "Captured {} entries under {}",
            entries.len(),
            root.best_effort_display()
        );
        Ok(Self { entries })
    }

    pub fn get(&self, relative_path: impl AsRef<Path>) -> Option<&DirectoryEntry> {
        self.entries.get(relative_path.as_ref())
    }

    pub fn contains(&self, relative_path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(relative_path.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.values()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }
}

impl FromIterator<DirectoryEntry> for Snapshot {
    fn from_iter<I: IntoIterator<Item = DirectoryEntry>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| (entry.relative_path.clone(), entry))
                .collect(),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotError {
    #[snafu(display("Failed to walk {}", root.best_effort_display()))]
    ReadError { root: PathBuf, source: WalkError },
}

impl SnapshotError {
    /// The entry that could not be read.
    pub fn path(&self) -> &Path {
        match self {
            SnapshotError::ReadError { source, .. } => source.path(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.io_error().kind() == io::ErrorKind::PermissionDenied
    }

    pub fn io_error(&self) -> &io::Error {
        match self {
            SnapshotError::ReadError { source, .. } => source.io_error(),
        }
    }
}
