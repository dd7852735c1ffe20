//! Optional metadata lookups.
//!
//! Each lookup family (creation time, content hash, link target) is a small trait
//! with one or more platform strategies. A strategy is chosen and probed once per
//! top directory; the outcome is stored as a [`Capability`] so that per-entry code
//! never retries a probe that already failed.

pub mod crtime;
pub mod hash;
pub mod link;

use crate::collector::EntryStat;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub use crtime::{DebugfsCreationTime, FilesystemInfo, MetadataBirthTime};
pub use hash::SumUtilityHasher;
pub use link::{NativeLinkResolver, ReadlinkUtility};

/// Looks up the birth time of an entry, in seconds since the epoch.
pub trait CreationTimeSource: fmt::Debug {
    fn name(&self) -> &str;
    fn creation_time(&self, entry: &EntryStat) -> Option<i64>;
}

/// Computes a content digest of a regular file.
pub trait ContentHasher: fmt::Debug {
    fn name(&self) -> &str;
    fn hash(&self, path: &Path) -> Option<String>;
}

/// Reads the target stored in a symbolic link.
pub trait LinkResolver: fmt::Debug {
    fn name(&self) -> &str;
    fn link_target(&self, path: &Path) -> Option<String>;
}

/// Outcome of probing one lookup family for a top directory.
#[derive(Debug)]
pub enum Capability<T> {
    /// Not requested by the run configuration.
    Disabled,
    /// Requested, but the probe failed. Lookups short-circuit to unset for the
    /// rest of the top directory.
    Unavailable(String),
    Available(T),
}

impl<T> Capability<T> {
    /// Runs `probe` only when the lookup is wanted.
    pub fn probe_if(enabled: bool, probe: impl FnOnce() -> Capability<T>) -> Self {
        if enabled { probe() } else { Capability::Disabled }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Capability::Available(strategy) => Some(strategy),
            _ => None,
        }
    }

    /// Logs the probe outcome; an unavailable lookup is worth a warning.
    #[cfg(feature = "logging")]
    pub(crate) fn report(&self, family: &str, top_dir: &Path) {
        match self {
            Capability::Disabled => tracing::debug!("{}: {family} disabled", top_dir.display()),
            Capability::Unavailable(reason) => tracing::warn!(
                "{}: {family} will not be recorded: {reason}",
                top_dir.display()
            ),
            Capability::Available(_) => tracing::debug!("{}: {family} available", top_dir.display()),
        }
    }
}

/// Finds an executable on `PATH`. Names containing a separator are checked as
/// given.
pub fn locate_utility(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Runs `program` to completion and returns its stdout, `None` on a spawn error
/// or a nonzero exit status. There is no timeout.
pub(crate) fn run_utility<I, S>(program: &Path, args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output();
    match output {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(_output) => {
            #[cfg(feature = "logging")]
            tracing::debug!(
                "{} exited with {}: {}",
                program.display(),
                _output.status,
                String::from_utf8_lossy(&_output.stderr).trim()
            );
            None
        }
        Err(_e) => {
            #[cfg(feature = "logging")]
            tracing::debug!("failed to run {}: {}", program.display(), _e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_if_skips_disabled_probe() {
        let mut probed = false;
        let cap: Capability<u8> = Capability::probe_if(false, || {
            probed = true;
            Capability::Available(1)
        });
        assert!(matches!(cap, Capability::Disabled));
        assert!(!probed);
        assert_eq!(Capability::probe_if(true, || Capability::Available(7)).get(), Some(&7));
    }

    #[test]
    fn missing_utility_is_not_located() {
        assert!(locate_utility("recdir-no-such-utility-xyz").is_none());
        assert!(locate_utility("/nonexistent/dir/tool").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn locates_shell_and_captures_output() {
        let sh = locate_utility("sh").expect("sh on PATH");
        assert_eq!(run_utility(&sh, ["-c", "echo hi"]).as_deref(), Some("hi\n"));
        assert!(run_utility(&sh, ["-c", "exit 3"]).is_none());
    }
}
