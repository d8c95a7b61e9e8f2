use std::io;
use std::path::{Path, PathBuf};

use derive_more::Display;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::ext::PathDisplayExt;
use crate::filesystem::{DirectoryEntry, FileSystem};
use crate::sync::{ActionSet, UpdateAction};

/// Counts of the filesystem operations a reconciliation performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[display(
    "{directories_created} directories created, {files_copied} files copied, \
     {entries_updated} entries updated, {entries_removed} entries removed, \
     {bytes_copied} bytes copied"
)]
pub struct ReconcileReport {
    pub directories_created: u64,
    pub files_copied: u64,
    pub entries_updated: u64,
    pub entries_removed: u64,
    pub bytes_copied: u64,
}

/// Applies an [`ActionSet`] to a destination tree.
///
/// Phases run in a fixed order: adds, then updates, then deletes. The first
/// failing operation aborts the rest; whatever was applied before it stays.
pub struct Reconciler<'a, F> {
    fs: &'a F,
    source_root: &'a Path,
    destination_root: &'a Path,
}

impl<'a, F: FileSystem> Reconciler<'a, F> {
    pub fn new(fs: &'a F, source_root: &'a Path, destination_root: &'a Path) -> Self {
        Self {
            fs,
            source_root,
            destination_root,
        }
    }

    pub fn apply(&self, actions: &ActionSet) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();

        // Entries below a file that is turning into a directory can only be
        // added once the update phase has created that directory.
        let replaced_by_directory: Vec<&Path> = actions
            .to_update
            .iter()
            .filter(|update| update.kind_changed() && update.source.is_directory)
            .map(UpdateAction::relative_path)
            .collect();
        let (deferred_adds, adds): (Vec<&DirectoryEntry>, Vec<&DirectoryEntry>) = actions
            .to_add
            .iter()
            .partition(|entry| is_within_any(entry.relative_path(), &replaced_by_directory));

        // A directory that is writable in the source is opened up before
        // anything is added to or removed from it.
        for update in actions
            .to_update
            .iter()
            .filter(|update| opens_directory(update))
        {
            self.apply_directory_mode(&update.source)?;
        }

        self.add_all(adds, &mut report)?;

        // Existing directories may still lose entries in the delete phase,
        // so their new modes wait until it is over.
        let mut pending_modes = Vec::new();
        for update in &actions.to_update {
            self.update(update, &deferred_adds, &mut pending_modes, &mut report)?;
        }

        let mut removed_directories: Vec<&Path> = actions
            .to_update
            .iter()
            .filter(|update| update.kind_changed() && update.destination.is_directory)
            .map(UpdateAction::relative_path)
            .collect();
        for entry in &actions.to_delete {
            if is_within_any(entry.relative_path(), &removed_directories) {
                debug!(
                    "Skipping {}, its directory is already gone",
                    entry.relative_path().display()
                );
                continue;
            }
            self.delete(entry, &mut report)?;
            if entry.is_directory {
                removed_directories.push(entry.relative_path());
            }
        }

        for entry in pending_modes.into_iter().rev() {
            self.apply_directory_mode(entry)?;
        }

        Ok(report)
    }

    /// Adds entries in the given order, parents first. Directory modes are
    /// applied once all entries exist, deepest first, so a read-only
    /// directory can still be populated.
    fn add_all<'e>(
        &self,
        entries: impl IntoIterator<Item = &'e DirectoryEntry>,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let mut created_directories = Vec::new();
        for entry in entries {
            self.add(entry, report)?;
            if entry.is_directory {
                created_directories.push(entry);
            }
        }

        for entry in created_directories.into_iter().rev() {
            self.apply_directory_mode(entry)?;
        }
        Ok(())
    }

    fn apply_directory_mode(&self, entry: &DirectoryEntry) -> Result<(), ReconcileError> {
        let path = self.destination_path(entry.relative_path());
        self.fs
            .set_mode(&path, entry.permissions)
            .context(SetPermissionsSnafu { path })
    }

    fn add(
        &self,
        entry: &DirectoryEntry,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let path = self.destination_path(entry.relative_path());
        if entry.is_directory {
            info!("Creating directory {}", path.display());
            self.fs
                .create_dir(&path)
                .context(CreateDirSnafu { path })?;
            report.directories_created += 1;
        } else {
            info!(
                "Copying file {} to {}. File size - {} bytes",
                entry.name,
                self.destination_root.display(),
                entry.size
            );
            self.copy_file(entry.relative_path(), report)?;
        }
        Ok(())
    }

    fn update<'e>(
        &self,
        update: &'e UpdateAction,
        deferred_adds: &[&'e DirectoryEntry],
        pending_modes: &mut Vec<&'e DirectoryEntry>,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let relative_path = update.relative_path();
        if update.kind_changed() {
            info!(
                "Replacing {} ({} -> {})",
                self.destination_path(relative_path).display(),
                update.destination.permissions,
                update.source.permissions
            );
            self.delete(&update.destination, report)?;
            let below = deferred_adds
                .iter()
                .copied()
                .filter(|entry| entry.relative_path().starts_with(relative_path));
            self.add_all(std::iter::once(&update.source).chain(below), report)?;
        } else if update.source.is_directory {
            info!(
                "Updating permissions of directory {} to {}",
                self.destination_path(relative_path).display(),
                update.source.permissions
            );
            if !opens_directory(update) {
                pending_modes.push(&update.source);
            }
        } else {
            info!(
                "Updating file {}. File size - {} bytes",
                self.destination_path(relative_path).display(),
                update.source.size
            );
            self.copy_file(relative_path, report)?;
        }
        report.entries_updated += 1;
        Ok(())
    }

    fn delete(
        &self,
        entry: &DirectoryEntry,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let path = self.destination_path(entry.relative_path());
        if entry.is_directory {
            info!("Removing directory {}", path.display());
            self.fs
                .remove_dir_all(&path)
                .context(RemoveDirSnafu { path })?;
        } else {
            info!(
                "Removing file {}. File size - {} bytes",
                entry.name, entry.size
            );
            self.fs
                .remove_file(&path)
                .context(RemoveFileSnafu { path })?;
        }
        report.entries_removed += 1;
        Ok(())
    }

    /// Streams the content, then applies the source's current mode. Not
    /// atomic: a failure midway leaves a truncated destination file.
    fn copy_file(
        &self,
        relative_path: &Path,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        let from = self.source_path(relative_path);
        let to = self.destination_path(relative_path);

        let bytes = self
            .fs
            .copy_content(&from, &to)
            .context(CopySnafu {
                from: &from,
                to: &to,
            })?;
        let mode = self
            .fs
            .stat(&from)
            .context(StatSnafu { path: &from })?
            .mode;
        self.fs
            .set_mode(&to, mode)
            .context(SetPermissionsSnafu { path: &to })?;

        report.files_copied += 1;
        report.bytes_copied += bytes;
        Ok(())
    }

    fn source_path(&self, relative_path: &Path) -> PathBuf {
        self.source_root.join(relative_path)
    }

    fn destination_path(&self, relative_path: &Path) -> PathBuf {
        self.destination_root.join(relative_path)
    }
}

/// A directory whose mode changes to one its owner can write to.
fn opens_directory(update: &UpdateAction) -> bool {
    !update.kind_changed()
        && update.source.is_directory
        && update.source.permissions.is_owner_writable()
}

fn is_within_any(path: &Path, directories: &[&Path]) -> bool {
    directories.iter().any(|directory| path.starts_with(directory))
}

#[derive(Debug, Snafu)]
pub enum ReconcileError {
    #[snafu(display("Failed to create directory {}", path.best_effort_display()))]
    CreateDirError { path: PathBuf, source: io::Error },
    #[snafu(display(
        "Failed to copy file {} to {}",
        from.best_effort_display(),
        to.best_effort_display()
    ))]
    CopyError {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[snafu(display("Failed to inspect {}", path.best_effort_display()))]
    StatError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to set permissions of {}", path.best_effort_display()))]
    SetPermissionsError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to remove file {}", path.best_effort_display()))]
    RemoveFileError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to remove directory {}", path.best_effort_display()))]
    RemoveDirError { path: PathBuf, source: io::Error },
}

impl ReconcileError {
    /// The destination-side path the failed operation was working on, or the
    /// source path when the source could not be read.
    pub fn path(&self) -> &Path {
        match self {
            ReconcileError::CopyError { to, .. } => to,
            ReconcileError::CreateDirError { path, .. }
            | ReconcileError::StatError { path, .. }
            | ReconcileError::SetPermissionsError { path, .. }
            | ReconcileError::RemoveFileError { path, .. }
            | ReconcileError::RemoveDirError { path, .. } => path,
        }
    }

    pub fn io_error(&self) -> &io::Error {
        match self {
            ReconcileError::CreateDirError { source, .. }
            | ReconcileError::CopyError { source, .. }
            | ReconcileError::StatError { source, .. }
            | ReconcileError::SetPermissionsError { source, .. }
            | ReconcileError::RemoveFileError { source, .. }
            | ReconcileError::RemoveDirError { source, .. } => source,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.io_error().kind() == io::ErrorKind::PermissionDenied
    }
}
