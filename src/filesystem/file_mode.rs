use std::fmt;
use std::fs::Metadata;

const TYPE_MASK: u32 = 0o170000;
const TYPE_DIRECTORY: u32 = 0o040000;
const TYPE_REGULAR: u32 = 0o100000;
const TYPE_SYMLINK: u32 = 0o120000;
const TYPE_FIFO: u32 = 0o010000;
const TYPE_SOCKET: u32 = 0o140000;
const TYPE_CHAR_DEVICE: u32 = 0o020000;
const TYPE_BLOCK_DEVICE: u32 = 0o060000;

const SET_UID: u32 = 0o4000;
const SET_GID: u32 = 0o2000;
const STICKY: u32 = 0o1000;

/// Mode of a filesystem entry: the entry kind plus its permission bits.
///
/// The kind is part of the value, so a directory and a file never compare
/// equal even when their permission bits match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    pub const PERMISSION_BITS: u32 = 0o7777;

    #[cfg(test)]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn from_metadata(metadata: &Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self(metadata.mode())
        }
        #[cfg(not(unix))]
        {
            let kind = if metadata.is_dir() {
                TYPE_DIRECTORY
            } else if metadata.is_symlink() {
                TYPE_SYMLINK
            } else {
                TYPE_REGULAR
            };
            let permissions = if metadata.permissions().readonly() {
                0o444
            } else {
                0o666
            };
            Self(kind | permissions)
        }
    }

    #[cfg(test)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Only these bits are ever applied to a destination entry.
    pub const fn permission_bits(self) -> u32 {
        self.0 & Self::PERMISSION_BITS
    }

    #[cfg(test)]
    pub const fn is_directory(self) -> bool {
        self.0 & TYPE_MASK == TYPE_DIRECTORY
    }

    pub const fn is_owner_writable(self) -> bool {
        self.0 & 0o200 != 0
    }

    #[cfg(any(test, not(unix)))]
    pub const fn is_readonly(self) -> bool {
        self.0 & 0o222 == 0
    }

    fn kind_char(self) -> char {
        match self.0 & TYPE_MASK {
            TYPE_DIRECTORY => 'd',
            TYPE_SYMLINK => 'l',
            TYPE_FIFO => 'p',
            TYPE_SOCKET => 's',
            TYPE_CHAR_DEVICE => 'c',
            TYPE_BLOCK_DEVICE => 'b',
            TYPE_REGULAR => '-',
            _ => '?',
        }
    }
}

/// Renders the mode the way `ls -l` does, e.g. `drwxr-xr-x`.
impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |mask: u32, c: char| if self.0 & mask != 0 { c } else { '-' };
        let special = |exec_mask: u32, special_mask: u32, set: char, unset: char| {
            match (self.0 & exec_mask != 0, self.0 & special_mask != 0) {
                (true, true) => set,
                (false, true) => unset,
                (true, false) => 'x',
                (false, false) => '-',
            }
        };

        let rendered: String = [
            self.kind_char(),
            bit(0o400, 'r'),
            bit(0o200, 'w'),
            special(0o100, SET_UID, 's', 'S'),
            bit(0o040, 'r'),
            bit(0o020, 'w'),
            special(0o010, SET_GID, 's', 'S'),
            bit(0o004, 'r'),
            bit(0o002, 'w'),
            special(0o001, STICKY, 't', 'T'),
        ]
        .into_iter()
        .collect();

        f.write_str(&rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(0o100644, "-rw-r--r--")]
    #[case(0o040755, "drwxr-xr-x")]
    #[case(0o100777, "-rwxrwxrwx")]
    #[case(0o104755, "-rwsr-xr-x")]
    #[case(0o102644, "-rw-r-Sr--")]
    #[case(0o041777, "drwxrwxrwt")]
    #[case(0o120777, "lrwxrwxrwx")]
    #[case(0o100000, "----------")]
    fn test_display_matches_ls_format(#[case] raw: u32, #[case] expected: &str) {
        assert_eq!(FileMode::from_raw(raw).to_string(), expected);
    }

    #[test]
    fn test_permission_bits_strip_the_kind() {
        let mode = FileMode::from_raw(0o104755);
        assert_eq!(mode.permission_bits(), 0o4755);
        assert!(!mode.is_directory());
    }

    #[test]
    fn test_kind_is_part_of_equality() {
        let file = FileMode::from_raw(0o100755);
        let dir = FileMode::from_raw(0o040755);
        assert_eq!(file.permission_bits(), dir.permission_bits());
        assert_ne!(file, dir);
        assert!(dir.is_directory());
    }

    #[rstest]
    #[case(0o100444, true)]
    #[case(0o100644, false)]
    #[case(0o040555, true)]
    fn test_readonly(#[case] raw: u32, #[case] expected: bool) {
        assert_eq!(FileMode::from_raw(raw).is_readonly(), expected);
    }

    #[rstest]
    #[case(0o040755, true)]
    #[case(0o040555, false)]
    #[case(0o040577, false)]
    #[case(0o100200, true)]
    fn test_owner_writable(#[case] raw: u32, #[case] expected: bool) {
        assert_eq!(FileMode::from_raw(raw).is_owner_writable(), expected);
    }
}
