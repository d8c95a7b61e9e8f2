use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use snafu::Snafu;
use walkdir::WalkDir;

use crate::ext::PathDisplayExt;
use crate::filesystem::{EntryMetadata, FileMode};

/// The filesystem operations the sync engine relies on.
///
/// All calls are blocking; they run on whichever thread drives the cycle.
pub trait FileSystem {
    /// Inspects `path` without following a trailing symbolic link.
    fn stat(&self, path: &Path) -> io::Result<EntryMetadata>;
    /// Every entry below the directory `root`, paired with its path relative
    /// to `root`. The root may be a symbolic link to a directory; links found
    /// below it are reported, not followed.
    fn walk(&self, root: &Path) -> Result<Vec<(PathBuf, EntryMetadata)>, WalkError>;
    /// Creates exactly one directory; the parent must already exist.
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    /// Streams the content of `from` into `to`, creating or truncating it.
    /// Returns the number of bytes written.
    fn copy_content(&self, from: &Path, to: &Path) -> io::Result<u64>;
    fn set_mode(&self, path: &Path, mode: FileMode) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by the host OS through `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl FileSystem for HostFs {
    fn stat(&self, path: &Path) -> io::Result<EntryMetadata> {
        fs::symlink_metadata(path).map(|metadata| EntryMetadata::from(&metadata))
    }

    fn walk(&self, root: &Path) -> Result<Vec<(PathBuf, EntryMetadata)>, WalkError> {
        let root_metadata = fs::metadata(root).map_err(|error| WalkError::new(root, error))?;
        if !root_metadata.is_dir() {
            return Err(WalkError::new(
                root,
                io::Error::from(io::ErrorKind::NotADirectory),
            ));
        }

        WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .map(|entry| {
                let entry = entry.map_err(|error| {
                    let path = error.path().unwrap_or(root).to_path_buf();
                    WalkError::new(path, io::Error::from(error))
                })?;
                let metadata = entry
                    .metadata()
                    .map_err(|error| WalkError::new(entry.path(), io::Error::from(error)))?;
                let relative_path = entry
                    .path()
                    .strip_prefix(root)
                    .map_err(|error| WalkError::new(entry.path(), io::Error::other(error)))?
                    .to_path_buf();
                Ok((relative_path, EntryMetadata::from(&metadata)))
            })
            .collect()
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn copy_content(&self, from: &Path, to: &Path) -> io::Result<u64> {
        let mut reader = File::open(from)?;
        let mut writer = File::create(to)?;
        io::copy(&mut reader, &mut writer)
    }

    fn set_mode(&self, path: &Path, mode: FileMode) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(mode.permission_bits()))
        }
        #[cfg(not(unix))]
        {
            let mut permissions = fs::metadata(path)?.permissions();
            permissions.set_readonly(mode.is_readonly());
            fs::set_permissions(path, permissions)
        }
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}

/// A walk that stopped at an entry it could not read.
#[derive(Debug, Snafu)]
#[snafu(display("Failed to read {}", path.best_effort_display()))]
pub struct WalkError {
    path: PathBuf,
    source: io::Error,
}

impl WalkError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}
