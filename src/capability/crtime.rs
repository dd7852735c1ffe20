//! Creation (birth) time strategies.

use super::{Capability, CreationTimeSource, locate_utility, run_utility};
use crate::collector::EntryStat;
use crate::host;
use chrono::{Local, NaiveDateTime, TimeZone};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Where `debugfs` usually lives when `/sbin` is not on `PATH`.
pub const DEBUGFS_FALLBACK: &str = "/sbin/debugfs";

/// Filesystem type and backing device of a directory, as reported by `df`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemInfo {
    pub fs_type: String,
    pub device: String,
}

impl FilesystemInfo {
    /// Queries `df -P -T` for the filesystem holding `path`.
    pub fn probe(path: &Path) -> Option<Self> {
        let df = locate_utility("df")?;
        let output = run_utility(&df, [OsStr::new("-P"), OsStr::new("-T"), path.as_os_str()])?;
        Self::parse_df(&output)
    }

    /// Parses the first data row of `df -P -T` output: device, then type.
    pub fn parse_df(output: &str) -> Option<Self> {
        let row = output.lines().nth(1)?;
        let mut columns = row.split_whitespace();
        let device = columns.next()?.to_string();
        let fs_type = columns.next()?.to_string();
        Some(Self { fs_type, device })
    }
}

/// Reads `crtime` from the inode table of an ext4 device through `debugfs`.
/// Needs read access to the raw device, which in practice means root.
#[derive(Debug)]
pub struct DebugfsCreationTime {
    debugfs: PathBuf,
    device: String,
}

impl DebugfsCreationTime {
    pub fn new(debugfs: PathBuf, device: impl Into<String>) -> Self {
        Self {
            debugfs,
            device: device.into(),
        }
    }

    /// Checks everything the strategy needs for `top_dir`, once.
    pub fn probe(top_dir: &Path) -> Capability<Box<dyn CreationTimeSource>> {
        let Some(fs) = FilesystemInfo::probe(top_dir) else {
            return Capability::Unavailable(format!(
                "cannot determine the filesystem of {}",
                top_dir.display()
            ));
        };
        if fs.fs_type != "ext4" {
            return Capability::Unavailable(format!(
                "creation time is not supported on {} filesystems",
                fs.fs_type
            ));
        }
        if !host::is_privileged() {
            return Capability::Unavailable("creation time requires root privileges".into());
        }
        match locate_utility("debugfs").or_else(|| locate_utility(DEBUGFS_FALLBACK)) {
            Some(debugfs) => Capability::Available(Box::new(Self::new(debugfs, fs.device))),
            None => Capability::Unavailable("debugfs was not found".into()),
        }
    }

    /// Extracts `crtime` from `debugfs -R "stat <inode>"` output and converts the
    /// human readable local time after ` -- ` to epoch seconds.
    pub fn parse_stat_output(output: &str) -> Option<i64> {
        let line = output
            .lines()
            .find(|line| line.trim_start().starts_with("crtime:"))?;
        let (_, stamp) = line.split_once(" -- ")?;
        let stamp = stamp.split_whitespace().collect::<Vec<_>>().join(" ");
        let naive = NaiveDateTime::parse_from_str(&stamp, "%a %b %d %H:%M:%S %Y").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|time| time.timestamp())
    }
}

impl CreationTimeSource for DebugfsCreationTime {
    fn name(&self) -> &str {
        "debugfs"
    }

    fn creation_time(&self, entry: &EntryStat) -> Option<i64> {
        let request = format!("stat <{}>", entry.inode()?);
        let output = run_utility(
            &self.debugfs,
            ["-R", request.as_str(), self.device.as_str()],
        )?;
        let crtime = Self::parse_stat_output(&output);
        if crtime.is_none() {
            #[cfg(feature = "logging")]
            tracing::debug!("no crtime for {}", entry.path.display());
        }
        crtime
    }
}

/// Birth time straight from the platform metadata, where the OS reports it.
#[derive(Debug, Default)]
pub struct MetadataBirthTime;

impl CreationTimeSource for MetadataBirthTime {
    fn name(&self) -> &str {
        "metadata"
    }

    fn creation_time(&self, entry: &EntryStat) -> Option<i64> {
        let created = entry.metadata.created().ok()?;
        let seconds = created.duration_since(UNIX_EPOCH).ok()?.as_secs();
        i64::try_from(seconds).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBUGFS_STAT: &str = "\
Inode: 393223   Type: regular    Mode:  0644   Flags: 0x80000
Generation: 2981203940    Version: 0x00000000:00000001
User:  1000   Group:  1000   Project:     0   Size: 42
 ctime: 0x5e0f1c2a:8d2c1b44 -- Fri Jan  3 11:00:58 2020
 atime: 0x5e0f1c2a:8d2c1b44 -- Fri Jan  3 11:00:58 2020
 mtime: 0x5e0f1c2a:8d2c1b44 -- Fri Jan  3 11:00:58 2020
crtime: 0x5e0f1c20:1a2b3c4d -- Fri Jan  3 11:00:48 2020
Size of extra inode fields: 32
";

    #[test]
    fn parses_crtime_line_as_local_time() {
        let expected = Local
            .with_ymd_and_hms(2020, 1, 3, 11, 0, 48)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(
            DebugfsCreationTime::parse_stat_output(DEBUGFS_STAT),
            Some(expected)
        );
    }

    #[test]
    fn missing_or_garbled_crtime_is_unset() {
        assert_eq!(DebugfsCreationTime::parse_stat_output("Inode: 12\n"), None);
        assert_eq!(
            DebugfsCreationTime::parse_stat_output("crtime: 0x0 -- not a date\n"),
            None
        );
    }

    #[test]
    fn parses_df_row() {
        let output = "Filesystem     Type 1024-blocks     Used Available Capacity Mounted on\n\
                      /dev/nvme0n1p2 ext4   486903968 12345678 449000000       3% /\n";
        assert_eq!(
            FilesystemInfo::parse_df(output),
            Some(FilesystemInfo {
                fs_type: "ext4".into(),
                device: "/dev/nvme0n1p2".into(),
            })
        );
        assert_eq!(FilesystemInfo::parse_df("Filesystem Type\n"), None);
    }

    #[test]
    fn unknown_debugfs_binary_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "x").unwrap();
        let entry = EntryStat::lstat(&file).unwrap();
        let source = DebugfsCreationTime::new(PathBuf::from("/nonexistent/debugfs"), "/dev/null");
        assert_eq!(source.creation_time(&entry), None);
    }
}
