//! Symbolic link target strategies.

use super::{Capability, LinkResolver, locate_utility, run_utility};
use std::path::{Path, PathBuf};

/// Runs `readlink` on the link.
#[derive(Debug)]
pub struct ReadlinkUtility {
    program: PathBuf,
}

impl ReadlinkUtility {
    pub fn probe() -> Capability<Box<dyn LinkResolver>> {
        match locate_utility("readlink") {
            Some(program) => Capability::Available(Box::new(Self { program })),
            None => Capability::Unavailable("readlink was not found".into()),
        }
    }
}

impl LinkResolver for ReadlinkUtility {
    fn name(&self) -> &str {
        "readlink"
    }

    fn link_target(&self, path: &Path) -> Option<String> {
        let output = run_utility(&self.program, [path.as_os_str()])?;
        Some(output.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Reads the link through the standard library, for hosts without `readlink`.
#[derive(Debug, Default)]
pub struct NativeLinkResolver;

impl LinkResolver for NativeLinkResolver {
    fn name(&self) -> &str {
        "read_link"
    }

    fn link_target(&self, path: &Path) -> Option<String> {
        let target = std::fs::read_link(path).ok()?;
        Some(target.to_string_lossy().into_owned())
    }
}
