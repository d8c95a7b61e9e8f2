//! Filesystem access for the sync engine.
//!
//! Everything the engine does to a tree goes through the [`FileSystem`]
//! trait, so the snapshotter and the reconciler never touch `std::fs`
//! directly. [`HostFs`] is the implementation backed by the host OS.

mod entry;
mod file_mode;
mod host;
mod snapshot;

pub use entry::{DirectoryEntry, EntryMetadata};
pub use file_mode::FileMode;
pub use host::{FileSystem, HostFs, WalkError};
pub use snapshot::{Snapshot, SnapshotError};
