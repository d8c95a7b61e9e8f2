use std::path::Path;

use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::filesystem::{FileSystem, Snapshot, SnapshotError};
use crate::sync::{ActionSet, ReconcileError, ReconcileReport, Reconciler};

/// Runs one reconciliation cycle of `source` onto `destination`.
///
/// Both trees are snapshotted before anything is written, so a failing
/// snapshot leaves the destination untouched.
pub fn sync_dirs<F: FileSystem>(
    fs: &F,
    source: &Path,
    destination: &Path,
) -> Result<ReconcileReport, SyncError> {
    let destination_snapshot =
        Snapshot::capture(fs, destination).context(DestinationSnapshotSnafu)?;
    let source_snapshot = Snapshot::capture(fs, source).context(SourceSnapshotSnafu)?;

    let actions = ActionSet::diff(&source_snapshot, &destination_snapshot);
    if actions.is_empty() {
        debug!("Destination is already in sync");
        return Ok(ReconcileReport::default());
    }
    debug!(
        "Planned {} actions: {} additions, {} updates, {} deletions",
        actions.len(),
        actions.to_add.len(),
        actions.to_update.len(),
        actions.to_delete.len()
    );

    Reconciler::new(fs, source, destination)
        .apply(&actions)
        .context(ReconcileSnafu)
}

#[derive(Debug, Snafu)]
pub enum SyncError {
    #[snafu(display("Failed to snapshot the source tree"))]
    SourceSnapshotError { source: SnapshotError },
    #[snafu(display("Failed to snapshot the destination tree"))]
    DestinationSnapshotError { source: SnapshotError },
    #[snafu(display("Failed to reconcile the destination tree"))]
    ReconcileError { source: ReconcileError },
}

impl SyncError {
    pub fn path(&self) -> &Path {
        match self {
            SyncError::SourceSnapshotError { source }
            | SyncError::DestinationSnapshotError { source } => source.path(),
            SyncError::ReconcileError { source } => source.path(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        match self {
            SyncError::SourceSnapshotError { source }
            | SyncError::DestinationSnapshotError { source } => source.is_permission_denied(),
            SyncError::ReconcileError { source } => source.is_permission_denied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::HostFs;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_source_leaves_destination_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("missing");
        let destination = temp_dir.path().join("dst");
        fs::create_dir(&destination).expect("Failed to create destination");
        fs::write(destination.join("keep.txt"), "keep").expect("Failed to write");

        let error = sync_dirs(&HostFs, &source, &destination).expect_err("Sync should fail");

        assert!(matches!(error, SyncError::SourceSnapshotError { .. }));
        assert_eq!(error.path(), source);
        assert!(!error.is_permission_denied());
        assert!(destination.join("keep.txt").exists());
    }

    #[test]
    fn test_missing_destination_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let destination = temp_dir.path().join("missing");

        let error =
            sync_dirs(&HostFs, temp_dir.path(), &destination).expect_err("Sync should fail");

        assert!(matches!(error, SyncError::DestinationSnapshotError { .. }));
    }

    #[test]
    fn test_sync_converges_in_one_cycle() {
        let source = TempDir::new().expect("Failed to create source");
        let destination = TempDir::new().expect("Failed to create destination");
        fs::create_dir_all(source.path().join("a/b")).expect("Failed to create dirs");
        fs::write(source.path().join("a/b/c.txt"), "content").expect("Failed to write");
        fs::write(destination.path().join("stale.txt"), "stale").expect("Failed to write");

        let first = sync_dirs(&HostFs, source.path(), destination.path()).expect("First sync");
        let second = sync_dirs(&HostFs, source.path(), destination.path()).expect("Second sync");

        assert_eq!(first.directories_created, 2);
        assert_eq!(first.files_copied, 1);
        assert_eq!(first.entries_removed, 1);
        assert_eq!(second, ReconcileReport::default());

        let source_snapshot = Snapshot::capture(&HostFs, source.path()).expect("Snapshot");
        let destination_snapshot =
            Snapshot::capture(&HostFs, destination.path()).expect("Snapshot");
        assert!(ActionSet::diff(&source_snapshot, &destination_snapshot).is_empty());
    }
}
