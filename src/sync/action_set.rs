use std::path::Path;

use crate::filesystem::{DirectoryEntry, Snapshot};

/// A key present in both trees whose destination side must be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAction {
    pub source: DirectoryEntry,
    pub destination: DirectoryEntry,
}

impl UpdateAction {
    pub fn relative_path(&self) -> &Path {
        self.destination.relative_path()
    }

    /// One side is a directory and the other is not.
    pub fn kind_changed(&self) -> bool {
        self.source.is_directory != self.destination.is_directory
    }
}

/// Actions needed to turn a destination tree into a copy of a source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    pub to_add: Vec<DirectoryEntry>,
    pub to_update: Vec<UpdateAction>,
    pub to_delete: Vec<DirectoryEntry>,
}

impl ActionSet {
    /// Compares two snapshots. Pure; the outputs follow snapshot order.
    pub fn diff(source: &Snapshot, destination: &Snapshot) -> Self {
        let to_add = source
            .iter()
            .filter(|entry| !destination.contains(entry.relative_path()))
            .cloned()
            .collect();

        let to_update = destination
            .iter()
            .filter_map(|dst| {
                let src = source.get(dst.relative_path())?;
                needs_update(src, dst).then(|| UpdateAction {
                    source: src.clone(),
                    destination: dst.clone(),
                })
            })
            .collect();

        let to_delete = destination
            .iter()
            .filter(|entry| !source.contains(entry.relative_path()))
            .cloned()
            .collect();

        Self {
            to_add,
            to_update,
            to_delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_delete.len()
    }
}

/// Decides whether an entry present in both trees has to be rewritten.
///
/// The directory guard only covers the size comparison: a permission
/// mismatch flags the pair even when one or both sides are directories.
/// Since the mode carries the entry kind, a kind change is always flagged.
pub fn needs_update(source: &DirectoryEntry, destination: &DirectoryEntry) -> bool {
    (!destination.is_directory && !source.is_directory && destination.size != source.size)
        || destination.permissions != source.permissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{EntryMetadata, FileMode};
    use rstest::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn file(path: &str, size: u64, permissions: u32) -> DirectoryEntry {
        DirectoryEntry::new(
            path,
            EntryMetadata {
                is_directory: false,
                size,
                mode: FileMode::from_raw(0o100000 | permissions),
                modified_time: None,
            },
        )
    }

    fn dir(path: &str, permissions: u32) -> DirectoryEntry {
        DirectoryEntry::new(
            path,
            EntryMetadata {
                is_directory: true,
                size: 4096,
                mode: FileMode::from_raw(0o040000 | permissions),
                modified_time: None,
            },
        )
    }

    fn keys<'a>(entries: impl Iterator<Item = &'a Path>) -> BTreeSet<PathBuf> {
        entries.map(Path::to_path_buf).collect()
    }

    #[test]
    fn test_diff_partitions_keys() {
        let source: Snapshot = [
            file("only_src.txt", 1, 0o644),
            file("both_same.txt", 2, 0o644),
            file("both_resized.txt", 10, 0o644),
            dir("src_dir", 0o755),
        ]
        .into_iter()
        .collect();
        let destination: Snapshot = [
            file("only_dst.txt", 1, 0o644),
            file("both_same.txt", 2, 0o644),
            file("both_resized.txt", 5, 0o644),
            dir("dst_dir", 0o755),
        ]
        .into_iter()
        .collect();

        let actions = ActionSet::diff(&source, &destination);

        let src_keys = keys(source.paths());
        let dst_keys = keys(destination.paths());
        assert_eq!(
            keys(actions.to_add.iter().map(DirectoryEntry::relative_path)),
            src_keys.difference(&dst_keys).cloned().collect::<BTreeSet<_>>()
        );
        assert_eq!(
            keys(actions.to_delete.iter().map(DirectoryEntry::relative_path)),
            dst_keys.difference(&src_keys).cloned().collect::<BTreeSet<_>>()
        );
        assert_eq!(
            keys(actions.to_update.iter().map(UpdateAction::relative_path)),
            BTreeSet::from([PathBuf::from("both_resized.txt")])
        );
        assert_eq!(actions.len(), 5);
    }

    #[test]
    fn test_update_carries_both_sides() {
        let source: Snapshot = [file("a.txt", 10, 0o644)].into_iter().collect();
        let destination: Snapshot = [file("a.txt", 5, 0o644)].into_iter().collect();

        let actions = ActionSet::diff(&source, &destination);

        assert_eq!(actions.to_update.len(), 1);
        let update = &actions.to_update[0];
        assert_eq!(update.source.size, 10);
        assert_eq!(update.destination.size, 5);
        assert!(!update.kind_changed());
    }

    #[test]
    fn test_identical_snapshots_produce_no_actions() {
        let snapshot: Snapshot = [dir("d", 0o755), file("d/f.txt", 3, 0o600)]
            .into_iter()
            .collect();

        let actions = ActionSet::diff(&snapshot, &snapshot.clone());

        assert!(actions.is_empty());
    }

    #[test]
    fn test_empty_snapshots_produce_no_actions() {
        assert!(ActionSet::diff(&Snapshot::default(), &Snapshot::default()).is_empty());
    }

    #[rstest]
    #[case::same_file(file("x", 5, 0o644), file("x", 5, 0o644), false)]
    #[case::file_size_differs(file("x", 10, 0o644), file("x", 5, 0o644), true)]
    #[case::file_permissions_differ(file("x", 5, 0o755), file("x", 5, 0o644), true)]
    #[case::dir_size_ignored(dir("x", 0o755), dir("x", 0o755), false)]
    #[case::dir_permissions_differ(dir("x", 0o700), dir("x", 0o755), true)]
    #[case::file_became_dir(dir("x", 0o755), file("x", 5, 0o755), true)]
    #[case::dir_became_file(file("x", 5, 0o755), dir("x", 0o755), true)]
    fn test_update_predicate(
        #[case] source: DirectoryEntry,
        #[case] destination: DirectoryEntry,
        #[case] expected: bool,
    ) {
        assert_eq!(needs_update(&source, &destination), expected);
    }

    #[test]
    fn test_directory_size_mismatch_alone_is_not_an_update() {
        let mut source = dir("x", 0o755);
        source.size = 64;
        let destination = dir("x", 0o755);

        assert!(!needs_update(&source, &destination));
    }

    #[test]
    fn test_kind_change_is_reported() {
        let source: Snapshot = [dir("x", 0o755)].into_iter().collect();
        let destination: Snapshot = [file("x", 5, 0o755)].into_iter().collect();

        let actions = ActionSet::diff(&source, &destination);

        assert_eq!(actions.to_update.len(), 1);
        assert!(actions.to_update[0].kind_changed());
        assert!(actions.to_add.is_empty());
        assert!(actions.to_delete.is_empty());
    }
}
