//! Metadata collection for a single path.
//!
//! Collection runs in two steps so the traversal can filter cheaply: [`MetadataCollector::stat`]
//! performs the `lstat` (the only step that can fail for an entry) and
//! [`MetadataCollector::complete`] adds owner names and the optional lookups.

use crate::capability::{
    Capability, ContentHasher, CreationTimeSource, DebugfsCreationTime, LinkResolver,
    MetadataBirthTime, NativeLinkResolver, ReadlinkUtility, SumUtilityHasher,
};
use crate::error::RecordError;
use crate::options::{Capabilities, RecordOptions};
use crate::types::{FileKind, FileMetadata};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// The result of `lstat` on one path.
#[derive(Debug, Clone)]
pub struct EntryStat {
    pub path: PathBuf,
    pub metadata: fs::Metadata,
    pub kind: FileKind,
}

impl EntryStat {
    /// Stats `path` without following a final symlink.
    pub fn lstat(path: &Path) -> Result<Self, RecordError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| RecordError::stat(path, e))?;
        #[cfg(unix)]
        let kind = {
            use std::os::unix::fs::MetadataExt;
            FileKind::from_mode(metadata.mode())
        };
        #[cfg(not(unix))]
        let kind = FileKind::from_file_type(&metadata.file_type());
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            kind,
        })
    }

    pub fn inode(&self) -> Option<u64> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Some(self.metadata.ino())
        }
        #[cfg(not(unix))]
        {
            None
        }
    }
}

/// Host family, which decides the lookup strategies a collector is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
    Other,
}

impl Platform {
    pub fn host() -> Self {
        if cfg!(unix) {
            Platform::Unix
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

/// Produces [`FileMetadata`] for the entries of one top directory.
#[derive(Debug)]
pub struct MetadataCollector {
    platform: Platform,
    creation_time: Capability<Box<dyn CreationTimeSource>>,
    hasher: Capability<Box<dyn ContentHasher>>,
    links: Capability<Box<dyn LinkResolver>>,
}

impl MetadataCollector {
    /// Probes the host's strategies for `top_dir`. The filesystem behind the top
    /// directory is resolved here, once, and shared by every entry below it.
    pub fn for_top_dir(top_dir: &Path, options: &RecordOptions) -> Self {
        Self::probe(
            Platform::host(),
            top_dir,
            &options.hash_type,
            options.capabilities(),
        )
    }

    pub fn probe(platform: Platform, top_dir: &Path, hash_type: &str, caps: Capabilities) -> Self {
        let collector = match platform {
            Platform::Unix => Self {
                platform,
                creation_time: Capability::probe_if(caps.creation_time, || {
                    DebugfsCreationTime::probe(top_dir)
                }),
                hasher: Capability::probe_if(caps.hash, || SumUtilityHasher::probe(hash_type)),
                links: Capability::probe_if(caps.link_target, ReadlinkUtility::probe),
            },
            Platform::Windows => Self {
                platform,
                creation_time: Capability::probe_if(caps.creation_time, || {
                    Capability::Available(Box::new(MetadataBirthTime) as Box<dyn CreationTimeSource>)
                }),
                hasher: Capability::probe_if(caps.hash, || {
                    Capability::Unavailable("no hashing utility on this platform".into())
                }),
                links: Capability::probe_if(caps.link_target, || {
                    Capability::Available(Box::new(NativeLinkResolver) as Box<dyn LinkResolver>)
                }),
            },
            Platform::Other => Self::inert(),
        };
        #[cfg(feature = "logging")]
        {
            collector.creation_time.report("creation time", top_dir);
            collector.hasher.report("content hash", top_dir);
            collector.links.report("link target", top_dir);
        }
        collector
    }

    /// A collector with every optional lookup unset.
    pub fn inert() -> Self {
        Self {
            platform: Platform::Other,
            creation_time: Capability::Disabled,
            hasher: Capability::Disabled,
            links: Capability::Disabled,
        }
    }

    /// Builds a collector from explicit strategies.
    pub fn with_capabilities(
        platform: Platform,
        creation_time: Capability<Box<dyn CreationTimeSource>>,
        hasher: Capability<Box<dyn ContentHasher>>,
        links: Capability<Box<dyn LinkResolver>>,
    ) -> Self {
        Self {
            platform,
            creation_time,
            hasher,
            links,
        }
    }

    pub fn stat(&self, path: &Path) -> Result<EntryStat, RecordError> {
        EntryStat::lstat(path)
    }

    pub fn collect(&self, path: &Path) -> Result<FileMetadata, RecordError> {
        Ok(self.complete(self.stat(path)?))
    }

    /// Fills in everything derivable from a successful stat. Lookups that fail
    /// leave their field unset.
    pub fn complete(&self, stat: EntryStat) -> FileMetadata {
        let mut meta = FileMetadata {
            path: stat.path.clone(),
            kind: Some(stat.kind),
            ..Default::default()
        };
        self.fill_stat_fields(&mut meta, &stat.metadata);
        meta.creation_time = self
            .creation_time
            .get()
            .and_then(|source| source.creation_time(&stat));
        if stat.kind == FileKind::Regular {
            meta.content_hash = self.hasher.get().and_then(|h| h.hash(&stat.path));
        }
        if stat.kind == FileKind::Symlink {
            meta.link_target = self.links.get().and_then(|l| l.link_target(&stat.path));
        }
        meta
    }

    #[cfg(unix)]
    fn fill_stat_fields(&self, meta: &mut FileMetadata, metadata: &fs::Metadata) {
        use std::os::unix::fs::MetadataExt;
        meta.inode = Some(metadata.ino());
        meta.mode = Some(metadata.mode());
        meta.size_bytes = Some(metadata.size());
        meta.access_rights = Some(format!("{:03o}", metadata.mode() & 0o777));
        meta.uid = Some(metadata.uid());
        meta.user_name = crate::host::user_name(metadata.uid());
        meta.gid = Some(metadata.gid());
        meta.group_name = crate::host::group_name(metadata.gid());
        meta.link_count = Some(metadata.nlink());
        if self.platform == Platform::Unix {
            meta.change_time = Some(metadata.ctime());
        }
        meta.modification_time = Some(metadata.mtime());
        meta.access_time = Some(metadata.atime());
    }

    #[cfg(not(unix))]
    fn fill_stat_fields(&self, meta: &mut FileMetadata, metadata: &fs::Metadata) {
        meta.size_bytes = Some(metadata.len());
        meta.modification_time = metadata.modified().ok().and_then(epoch_seconds);
        meta.access_time = metadata.accessed().ok().and_then(epoch_seconds);
    }
}

#[cfg_attr(unix, allow(dead_code))]
fn epoch_seconds(time: SystemTime) -> Option<i64> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).ok(),
        Err(before) => i64::try_from(before.duration().as_secs()).ok().map(|s| -s),
    }
}
