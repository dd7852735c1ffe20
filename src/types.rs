use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const S_IFMT: u32 = 0o170000;
const S_IFREG: u32 = 0o100000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;
const S_IFCHR: u32 = 0o020000;
const S_IFBLK: u32 = 0o060000;
const S_IFIFO: u32 = 0o010000;
const S_IFSOCK: u32 = 0o140000;

/// Type of a filesystem entry as reported by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileKind {
    #[serde(rename = "f")]
    Regular,
    #[serde(rename = "d")]
    Directory,
    #[serde(rename = "l")]
    Symlink,
    #[serde(rename = "c")]
    CharDevice,
    #[serde(rename = "b")]
    BlockDevice,
    #[serde(rename = "s")]
    Socket,
    #[serde(rename = "p")]
    Fifo,
    #[serde(rename = "-")]
    Unknown,
}

impl FileKind {
    /// Every kind a file-type filter can select.
    pub const SELECTABLE: [FileKind; 7] = [
        FileKind::Regular,
        FileKind::Directory,
        FileKind::Symlink,
        FileKind::BlockDevice,
        FileKind::CharDevice,
        FileKind::Socket,
        FileKind::Fifo,
    ];

    /// Classifies raw `st_mode` bits. The first matching format wins.
    pub fn from_mode(mode: u32) -> Self {
        let format = mode & S_IFMT;
        let chain: [(u32, FileKind); 7] = [
            (S_IFREG, FileKind::Regular),
            (S_IFDIR, FileKind::Directory),
            (S_IFLNK, FileKind::Symlink),
            (S_IFCHR, FileKind::CharDevice),
            (S_IFBLK, FileKind::BlockDevice),
            (S_IFIFO, FileKind::Fifo),
            (S_IFSOCK, FileKind::Socket),
        ];
        chain
            .iter()
            .find(|(bits, _)| format == *bits)
            .map(|(_, kind)| *kind)
            .unwrap_or(FileKind::Unknown)
    }

    /// Classifies a portable [`std::fs::FileType`] on hosts without mode bits.
    pub fn from_file_type(file_type: &std::fs::FileType) -> Self {
        if file_type.is_file() {
            FileKind::Regular
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Unknown
        }
    }

    /// One-letter symbol used in records, `None` for [`FileKind::Unknown`].
    pub fn symbol(self) -> Option<char> {
        match self {
            FileKind::Regular => Some('f'),
            FileKind::Directory => Some('d'),
            FileKind::Symlink => Some('l'),
            FileKind::CharDevice => Some('c'),
            FileKind::BlockDevice => Some('b'),
            FileKind::Socket => Some('s'),
            FileKind::Fifo => Some('p'),
            FileKind::Unknown => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(symbol) => write!(f, "{symbol}"),
            None => f.write_str("unknown"),
        }
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileKind::SELECTABLE
            .into_iter()
            .find(|kind| kind.symbol().map(String::from).as_deref() == Some(s))
            .ok_or_else(|| format!("invalid file type '{s}', expected one of f, d, l, b, c, s, p"))
    }
}

/// A metadata snapshot of one filesystem entry.
///
/// Every field except `path` is independently optional: a lookup that is not
/// supported, not permitted or not enabled leaves its field `None` without
/// affecting the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// The path as visited, neither quoted nor made absolute.
    pub path: PathBuf,
    pub inode: Option<u64>,
    /// Raw `st_mode`, file type bits included.
    pub mode: Option<u32>,
    pub kind: Option<FileKind>,
    pub size_bytes: Option<u64>,
    /// Permission bits as three octal digits, e.g. `644`.
    pub access_rights: Option<String>,
    pub uid: Option<u32>,
    pub user_name: Option<String>,
    pub gid: Option<u32>,
    pub group_name: Option<String>,
    pub link_count: Option<u64>,
    /// Birth time in seconds since the epoch.
    pub creation_time: Option<i64>,
    /// Inode change time in seconds since the epoch.
    pub change_time: Option<i64>,
    pub modification_time: Option<i64>,
    pub access_time: Option<i64>,
    /// Digest reported by the hashing utility, regular files only.
    pub content_hash: Option<String>,
    /// Target of a symbolic link as stored in the link.
    pub link_target: Option<String>,
}

impl FileMetadata {
    /// A snapshot that only knows its path, used for entries that could not be stat'ed.
    pub fn unreadable(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == Some(FileKind::Directory)
    }
}

/// Counters of one recording run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub top_dirs: usize,
    /// Record lines written for entries that could be stat'ed.
    pub records: usize,
    /// Record lines written for entries that could not be stat'ed.
    pub placeholders: usize,
    /// Entries left out by the file-type filter.
    pub filtered: usize,
    /// Entries pruned by an exclude pattern, subtrees not counted.
    pub excluded: usize,
    /// Entries recorded by an earlier run, passed over when continuing.
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_format_exactly_once() {
        let cases = [
            (0o100644, FileKind::Regular),
            (0o040755, FileKind::Directory),
            (0o120777, FileKind::Symlink),
            (0o020620, FileKind::CharDevice),
            (0o060660, FileKind::BlockDevice),
            (0o010644, FileKind::Fifo),
            (0o140755, FileKind::Socket),
        ];
        for (mode, expected) in cases {
            assert_eq!(FileKind::from_mode(mode), expected, "mode {mode:o}");
            let matching = cases
                .iter()
                .filter(|(bits, _)| bits & S_IFMT == mode & S_IFMT)
                .count();
            assert_eq!(matching, 1);
        }
    }

    #[test]
    fn unknown_format_bits() {
        assert_eq!(FileKind::from_mode(0o000644), FileKind::Unknown);
        assert_eq!(FileKind::from_mode(0o170000), FileKind::Unknown);
        assert_eq!(FileKind::Unknown.symbol(), None);
    }

    #[test]
    fn parses_symbols() {
        assert_eq!("p".parse::<FileKind>(), Ok(FileKind::Fifo));
        assert_eq!("l".parse::<FileKind>(), Ok(FileKind::Symlink));
        assert!("x".parse::<FileKind>().is_err());
        assert!("-".parse::<FileKind>().is_err());
    }
}
