//! Content hashing through the coreutils `<algorithm>sum` family.

use super::{Capability, ContentHasher, locate_utility, run_utility};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct SumUtilityHasher {
    utility: String,
    program: PathBuf,
}

impl SumUtilityHasher {
    /// Binds `sha1` to `sha1sum`, `md5` to `md5sum` and so on.
    pub fn probe(algorithm: &str) -> Capability<Box<dyn ContentHasher>> {
        if algorithm.is_empty() || !algorithm.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Capability::Unavailable(format!("unsupported hash algorithm '{algorithm}'"));
        }
        let utility = format!("{algorithm}sum");
        match locate_utility(&utility) {
            Some(program) => Capability::Available(Box::new(Self { utility, program })),
            None => Capability::Unavailable(format!("{utility} was not found")),
        }
    }

    /// The digest is the first token of the output. GNU tools prefix it with a
    /// backslash when the file name needed escaping.
    pub fn parse_output(output: &str) -> Option<String> {
        let digest = output.split_whitespace().next()?;
        let digest = digest.strip_prefix('\\').unwrap_or(digest);
        (!digest.is_empty()).then(|| digest.to_string())
    }
}

impl ContentHasher for SumUtilityHasher {
    fn name(&self) -> &str {
        &self.utility
    }

    fn hash(&self, path: &Path) -> Option<String> {
        let output = run_utility(&self.program, [path.as_os_str()])?;
        Self::parse_output(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_token() {
        assert_eq!(
            SumUtilityHasher::parse_output("a9993e364706816aba3e25717850c26c9cd0d89d  /tmp/abc\n")
                .as_deref(),
            Some("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(
            SumUtilityHasher::parse_output("\\d41d8cd98f00b204e9800998ecf8427e  /tmp/a\\nb\n")
                .as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
        assert_eq!(SumUtilityHasher::parse_output("   \n"), None);
    }

    #[test]
    fn unknown_algorithm_is_unavailable() {
        assert!(matches!(
            SumUtilityHasher::probe("nosuchdigest"),
            Capability::Unavailable(_)
        ));
        assert!(matches!(
            SumUtilityHasher::probe("../../bin/sh"),
            Capability::Unavailable(_)
        ));
    }

    #[test]
    fn hashes_with_sha1sum_when_present() {
        let Capability::Available(hasher) = SumUtilityHasher::probe("sha1") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("abc");
        std::fs::write(&file, "abc").unwrap();
        assert_eq!(hasher.name(), "sha1sum");
        assert_eq!(
            hasher.hash(&file).as_deref(),
            Some("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert_eq!(hasher.hash(&dir.path().join("missing")), None);
    }
}
