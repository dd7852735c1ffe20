use crate::error::RecordError;
use crate::format::{Field, Layout, Template, TimeFormat};
use crate::types::FileKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    pub top_dirs: Vec<PathBuf>,
    /// `None` writes the report to stdout.
    pub output: Option<PathBuf>,
    pub append: bool,
    pub absolute_paths: bool,
    pub quote_paths: bool,
    pub quote: String,
    pub delimiter: String,
    pub comment_prefix: String,
    pub unset_symbol: String,
    pub hash_type: String,
    pub template: Option<String>,
    pub time_format: Option<String>,
    pub file_types: Option<Vec<FileKind>>,
    pub exclude_regexes: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub continue_from: Option<PathBuf>,
}
impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            top_dirs: Vec::new(),
            output: None,
            append: false,
            absolute_paths: false,
            quote_paths: false,
            quote: "\"\"\"".to_string(),
            delimiter: ";".to_string(),
            comment_prefix: "#".to_string(),
            unset_symbol: "-".to_string(),
            hash_type: "sha1".to_string(),
            template: None,
            time_format: None,
            file_types: None,
            exclude_regexes: Vec::new(),
            ignore_patterns: Vec::new(),
            continue_from: None,
        }
    }
}
/// Which expensive lookups a run performs. Derived once from [`RecordOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub hash: bool,
    pub creation_time: bool,
    pub link_target: bool,
}
impl Capabilities {
    pub const ALL: Capabilities = Capabilities {
        hash: true,
        creation_time: true,
        link_target: true,
    };
}
impl RecordOptions {
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        serde_json::from_str(text).map_err(|e| RecordError::Config(e.to_string()))
    }
    pub fn from_json_file(path: &Path) -> Result<Self, RecordError> {
        let text = std::fs::read_to_string(path).map_err(|e| RecordError::io(path, e))?;
        Self::from_json(&text)
    }
    pub fn layout(&self) -> Layout {
        match &self.template {
            Some(template) => Layout::Template(Template::parse(template)),
            None => Layout::Delimited(self.delimiter.clone()),
        }
    }
    pub fn time_format(&self) -> TimeFormat {
        match &self.time_format {
            Some(pattern) => TimeFormat::Custom(pattern.clone()),
            None => TimeFormat::EpochSeconds,
        }
    }
    /// The file-type filter, `None` when every type is output.
    pub fn file_type_filter(&self) -> Option<BTreeSet<FileKind>> {
        let kinds: BTreeSet<FileKind> = self.file_types.as_ref()?.iter().copied().collect();
        if FileKind::SELECTABLE.iter().all(|k| kinds.contains(k)) {
            None
        } else {
            Some(kinds)
        }
    }
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::ALL;
        if let Some(template) = &self.template {
            let template = Template::parse(template);
            caps.hash = template.uses(Field::Hash);
            caps.creation_time = template.uses(Field::CreationTime);
            caps.link_target = template.uses(Field::LinkTarget);
        }
        if let Some(kinds) = self.file_type_filter() {
            caps.hash &= kinds.contains(&FileKind::Regular);
            caps.link_target &= kinds.contains(&FileKind::Symlink);
        }
        caps
    }
    /// Run-level checks. Nothing has been written when this fails.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.top_dirs.is_empty() {
            return Err(RecordError::Config("at least one top directory is required".into()));
        }
        if self.delimiter.is_empty() && self.template.is_none() {
            return Err(RecordError::Config("the field delimiter must not be empty".into()));
        }
        if let Some(pattern) = &self.time_format {
            if !self.time_format().is_valid() {
                return Err(RecordError::InvalidTimeFormat(pattern.clone()));
            }
        }
        for pattern in &self.exclude_regexes {
            regex::Regex::new(pattern).map_err(|e| RecordError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        for pattern in &self.ignore_patterns {
            globset::Glob::new(pattern).map_err(|e| RecordError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(output) = &self.output {
            let exists = output.symlink_metadata().is_ok();
            if exists && !self.append {
                return Err(RecordError::OutputExists(output.clone()));
            }
            if !exists && self.append {
                return Err(RecordError::OutputMissing(output.clone()));
            }
        }
        Ok(())
    }
}
#[derive(Debug, Default)]
pub struct RecordBuilder {
    options: RecordOptions,
}
impl RecordBuilder {
    pub fn new(top_dir: impl Into<PathBuf>) -> Self {
        Self {
            options: RecordOptions {
                top_dirs: vec![top_dir.into()],
                ..Default::default()
            },
        }
    }
    pub fn from_options(options: RecordOptions) -> Self {
        Self { options }
    }
    pub fn top_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.top_dirs.push(dir.into());
        self
    }
    pub fn output(mut self, path: Option<PathBuf>) -> Self {
        self.options.output = path;
        self
    }
    pub fn append(mut self, yes: bool) -> Self {
        self.options.append = yes;
        self
    }
    pub fn absolute_paths(mut self, yes: bool) -> Self {
        self.options.absolute_paths = yes;
        self
    }
    pub fn quote_paths(mut self, yes: bool) -> Self {
        self.options.quote_paths = yes;
        self
    }
    pub fn quote(mut self, quote: impl Into<String>) -> Self {
        self.options.quote = quote.into();
        self
    }
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.options.delimiter = delimiter.into();
        self
    }
    pub fn comment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.comment_prefix = prefix.into();
        self
    }
    pub fn unset_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.options.unset_symbol = symbol.into();
        self
    }
    pub fn hash_type(mut self, algorithm: impl Into<String>) -> Self {
        self.options.hash_type = algorithm.into();
        self
    }
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.options.template = Some(template.into());
        self
    }
    pub fn time_format(mut self, pattern: impl Into<String>) -> Self {
        self.options.time_format = Some(pattern.into());
        self
    }
    pub fn file_types(mut self, kinds: Vec<FileKind>) -> Self {
        self.options.file_types = Some(kinds);
        self
    }
    pub fn exclude_regexes(mut self, patterns: Vec<String>) -> Self {
        self.options.exclude_regexes = patterns;
        self
    }
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.options.ignore_patterns = patterns;
        self
    }
    pub fn continue_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.continue_from = Some(path.into());
        self
    }
    pub fn build(self) -> RecordOptions {
        self.options
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    #[test]
    fn defaults_enable_every_capability() {
        let options = RecordBuilder::new(".").build();
        assert_eq!(options.capabilities(), Capabilities::ALL);
        assert_eq!(options.layout(), Layout::Delimited(";".into()));
    }
    #[test]
    fn template_disables_unreferenced_capabilities() {
        let options = RecordBuilder::new(".").template("%p;%H").build();
        let caps = options.capabilities();
        assert!(caps.hash);
        assert!(!caps.creation_time);
        assert!(!caps.link_target);
    }
    #[test]
    fn type_filter_disables_hash_and_link_target() {
        let options = RecordBuilder::new(".")
            .file_types(vec![FileKind::Directory])
            .build();
        let caps = options.capabilities();
        assert!(!caps.hash);
        assert!(!caps.link_target);
        assert!(caps.creation_time);
        let options = RecordBuilder::new(".")
            .file_types(vec![FileKind::Symlink])
            .build();
        assert!(options.capabilities().link_target);
        assert!(!options.capabilities().hash);
    }
    #[test]
    fn full_type_filter_is_no_filter() {
        let options = RecordBuilder::new(".")
            .file_types(FileKind::SELECTABLE.to_vec())
            .build();
        assert!(options.file_type_filter().is_none());
    }
    #[test]
    fn existing_output_requires_append() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("report.txt");
        std::fs::write(&out, "keep").unwrap();
        let options = RecordBuilder::new(dir.path()).output(Some(out.clone())).build();
        assert!(matches!(options.validate(), Err(RecordError::OutputExists(_))));
        let options = RecordBuilder::from_options(options).append(true).build();
        assert!(options.validate().is_ok());
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "keep");
    }
    #[test]
    fn append_requires_existing_output() {
        let dir = tempdir().unwrap();
        let options = RecordBuilder::new(dir.path())
            .output(Some(dir.path().join("missing.txt")))
            .append(true)
            .build();
        assert!(matches!(options.validate(), Err(RecordError::OutputMissing(_))));
    }
    #[test]
    fn rejects_bad_patterns_and_time_formats() {
        let options = RecordBuilder::new(".")
            .exclude_regexes(vec!["(".into()])
            .build();
        assert!(matches!(
            options.validate(),
            Err(RecordError::InvalidPattern { .. })
        ));
        let options = RecordBuilder::new(".").time_format("%Q").build();
        assert!(matches!(
            options.validate(),
            Err(RecordError::InvalidTimeFormat(_))
        ));
    }
    #[test]
    fn loads_partial_json_config() {
        let options = RecordOptions::from_json(
            r#"{ "top_dirs": ["/srv"], "delimiter": "|", "file_types": ["f", "l"] }"#,
        )
        .unwrap();
        assert_eq!(options.top_dirs, vec![PathBuf::from("/srv")]);
        assert_eq!(options.delimiter, "|");
        assert_eq!(options.hash_type, "sha1");
        assert_eq!(
            options.file_types,
            Some(vec![FileKind::Regular, FileKind::Symlink])
        );
        assert!(RecordOptions::from_json("{ \"append\": 3 }").is_err());
    }
}
