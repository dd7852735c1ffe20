//! # Recdir
//!
//! `recdir` walks one or more directory trees and records, for every entry, a line of
//! metadata: path, inode, mode, type, size, permissions, ownership, link count,
//! birth/change/modification/access times, content hash and symlink target. The
//! result is a plain text report meant for archiving or auditing a filesystem.
//!
//! Lookups that need help from the outside world (birth time through `debugfs`,
//! content hashes through `sha1sum` and friends, link targets through `readlink`)
//! are probed once per top directory. When one is unavailable its field is written
//! as the unset symbol and everything else is still recorded.
//!
//! # Features
//!
//! - `logging`: Enables diagnostics via the `tracing` crate (on by default).
//!
//! # Example
//!
//! ```no_run
//! use recdir::{RecordBuilder, record_dirs};
//!
//! let options = RecordBuilder::new("/srv/data")
//!     .absolute_paths(true)
//!     .quote_paths(true)
//!     .time_format("%Y-%m-%d_%H-%M-%S_%Z")
//!     .exclude_regexes(vec!["/srv/data/cache$".into()])
//!     .output(Some("srv-data.rec".into()))
//!     .build();
//!
//! let summary = record_dirs(&options).expect("recording failed");
//! println!("{} entries recorded", summary.records);
//! ```
//!
//! Records can also be produced one path at a time:
//!
//! ```no_run
//! use recdir::{MetadataCollector, RecordBuilder, RecordFormatter};
//! use std::path::Path;
//!
//! let options = RecordBuilder::new(".").template("%p;%s;%H").build();
//! let collector = MetadataCollector::for_top_dir(Path::new("."), &options);
//! let formatter = RecordFormatter::new(&options);
//! let meta = collector.collect(Path::new("Cargo.toml")).unwrap();
//! println!("{}", formatter.format(&meta));
//! ```

pub mod capability;
mod collector;
mod engine;
mod error;
pub mod format;
mod host;
mod options;
pub mod output;
mod types;

pub use collector::{EntryStat, MetadataCollector, Platform};
pub use engine::{EntryOutcome, TopDirSession, normalize_path, record_dirs, record_to};
pub use error::RecordError;
pub use format::{Field, Layout, RecordFormatter, RecordValues, Template, TimeFormat};
pub use options::{Capabilities, RecordBuilder, RecordOptions};
pub use output::{LineSink, RunInfo};
pub use types::{FileKind, FileMetadata, RecordSummary};
