use crate::collector::MetadataCollector;
use crate::error::RecordError;
use crate::format::RecordFormatter;
use crate::options::RecordOptions;
use crate::output::{self, Banner, LineSink, RunInfo};
use crate::types::{FileKind, FileMetadata, RecordSummary};
use chrono::Local;
use globset::GlobSet;
use ignore::WalkBuilder;
use regex::Regex;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
/// What happened to one entry handed to [`TopDirSession::process_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Record { line: String, is_dir: bool },
    /// The entry could not be stat'ed; the line carries only its path.
    Placeholder { line: String },
    /// Excluded by the file-type filter.
    Filtered { is_dir: bool },
}
impl EntryOutcome {
    pub fn line(&self) -> Option<&str> {
        match self {
            EntryOutcome::Record { line, .. } | EntryOutcome::Placeholder { line } => Some(line),
            EntryOutcome::Filtered { .. } => None,
        }
    }
    pub fn is_dir(&self) -> bool {
        match self {
            EntryOutcome::Record { is_dir, .. } | EntryOutcome::Filtered { is_dir } => *is_dir,
            EntryOutcome::Placeholder { .. } => false,
        }
    }
}
/// Collector and formatter for the entries of one top directory.
pub struct TopDirSession<'a> {
    collector: MetadataCollector,
    formatter: &'a RecordFormatter,
    filter: Option<BTreeSet<FileKind>>,
}
impl<'a> TopDirSession<'a> {
    pub fn new(top_dir: &Path, options: &RecordOptions, formatter: &'a RecordFormatter) -> Self {
        Self::with_collector(
            MetadataCollector::for_top_dir(top_dir, options),
            options,
            formatter,
        )
    }
    pub fn with_collector(
        collector: MetadataCollector,
        options: &RecordOptions,
        formatter: &'a RecordFormatter,
    ) -> Self {
        Self {
            collector,
            formatter,
            filter: options.file_type_filter(),
        }
    }
    fn wants(&self, kind: Option<FileKind>) -> bool {
        match &self.filter {
            None => true,
            Some(kinds) => kind.is_some_and(|k| kinds.contains(&k)),
        }
    }
    /// Stats, filters, collects and formats one entry. Never fails: an entry that
    /// cannot be stat'ed becomes a placeholder line, unless a type filter is
    /// active, in which case its unknown type keeps it out of the report.
    pub fn process_entry(&self, path: &Path) -> EntryOutcome {
        match self.collector.stat(path) {
            Ok(stat) => {
                let is_dir = stat.kind == FileKind::Directory;
                if !self.wants(Some(stat.kind)) {
                    #[cfg(feature = "logging")]
                    tracing::trace!("filtered out {}", path.display());
                    return EntryOutcome::Filtered { is_dir };
                }
                let meta = self.collector.complete(stat);
                EntryOutcome::Record {
                    line: self.formatter.format(&meta),
                    is_dir,
                }
            }
            Err(_e) => {
                #[cfg(feature = "logging")]
                tracing::warn!("{}", _e);
                if !self.wants(None) {
                    return EntryOutcome::Filtered { is_dir: false };
                }
                EntryOutcome::Placeholder {
                    line: self.formatter.format(&FileMetadata::unreadable(path)),
                }
            }
        }
    }
}
struct Listed {
    path: PathBuf,
    name: OsString,
    is_dir: bool,
}
struct Walker {
    excludes: Vec<Regex>,
    matcher: Option<Arc<GlobSet>>,
}
impl Walker {
    fn new(options: &RecordOptions) -> Result<Self, RecordError> {
        let excludes = options
            .exclude_regexes
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| RecordError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let matcher = if !options.ignore_patterns.is_empty() {
            let mut glob_builder = globset::GlobSetBuilder::new();
            for pattern in &options.ignore_patterns {
                let glob = globset::Glob::new(pattern).map_err(|e| RecordError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                glob_builder.add(glob);
            }
            Some(Arc::new(glob_builder.build().map_err(|e| {
                RecordError::InvalidPattern {
                    pattern: options.ignore_patterns.join(", "),
                    reason: e.to_string(),
                }
            })?))
        } else {
            None
        };
        Ok(Self { excludes, matcher })
    }
    fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.excludes.iter().any(|re| re.is_match(&text))
    }
    /// Lists the direct children of `dir` sorted by name, minus excluded ones.
    /// An unreadable directory lists as empty.
    fn list(&self, dir: &Path, summary: &mut RecordSummary) -> Vec<Listed> {
        let mut builder = WalkBuilder::new(dir);
        builder
            .standard_filters(false)
            .max_depth(Some(1))
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        if let Some(matcher) = &self.matcher {
            let matcher = Arc::clone(matcher);
            builder.filter_entry(move |entry| entry.depth() == 0 || !matcher.is_match(entry.path()));
        }
        let mut listed = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(_e) => {
                    #[cfg(feature = "logging")]
                    tracing::warn!("cannot list {}: {}", dir.display(), _e);
                    continue;
                }
            };
            if entry.depth() != 1 {
                continue;
            }
            if self.is_excluded(entry.path()) {
                summary.excluded += 1;
                continue;
            }
            listed.push(Listed {
                path: entry.path().to_path_buf(),
                name: entry.file_name().to_os_string(),
                is_dir: entry.file_type().is_some_and(|t| t.is_dir()),
            });
        }
        listed
    }
}
/// Drops `.` components and trailing separators; the root stays the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}
/// Components of `target` below `top_dir`, both compared as absolute paths.
/// `None` when `target` lies outside `top_dir` or does not exist.
fn resume_components(top_dir: &Path, target: &Path) -> Option<Vec<OsString>> {
    let target = normalize_path(target);
    if target.symlink_metadata().is_err() {
        #[cfg(feature = "logging")]
        tracing::warn!(
            "continue-from path {} does not exist, recording everything",
            target.display()
        );
        return None;
    }
    let top = normalize_path(&std::path::absolute(top_dir).ok()?);
    let target = normalize_path(&std::path::absolute(&target).ok()?);
    let rest = target.strip_prefix(&top).ok()?;
    Some(rest.iter().map(|c| c.to_os_string()).collect())
}
struct Recorder<'a> {
    options: &'a RecordOptions,
    formatter: RecordFormatter,
    walker: Walker,
    banner: Banner<'a>,
}
impl<'a> Recorder<'a> {
    fn new(options: &'a RecordOptions) -> Result<Self, RecordError> {
        Ok(Self {
            options,
            formatter: RecordFormatter::new(options),
            walker: Walker::new(options)?,
            banner: Banner::new(&options.comment_prefix),
        })
    }
    fn emit(
        &self,
        outcome: &EntryOutcome,
        sink: &mut dyn LineSink,
        summary: &mut RecordSummary,
    ) -> Result<(), RecordError> {
        match outcome {
            EntryOutcome::Record { line, .. } => {
                summary.records += 1;
                sink.write_line(line)
            }
            EntryOutcome::Placeholder { line } => {
                summary.placeholders += 1;
                sink.write_line(line)
            }
            EntryOutcome::Filtered { .. } => {
                summary.filtered += 1;
                Ok(())
            }
        }
    }
    fn record_top_dir(
        &self,
        top_dir: &Path,
        sink: &mut dyn LineSink,
        summary: &mut RecordSummary,
    ) -> Result<(), RecordError> {
        sink.write_line(&self.banner.top_dir(top_dir))?;
        let mut top = normalize_path(top_dir);
        if self.options.absolute_paths {
            top = std::path::absolute(&top).map_err(|e| RecordError::io(&top, e))?;
        }
        let session = TopDirSession::new(&top, self.options, &self.formatter);
        let resume = self
            .options
            .continue_from
            .as_deref()
            .and_then(|target| resume_components(&top, target));
        if resume.is_none() {
            let outcome = session.process_entry(&top);
            self.emit(&outcome, sink, summary)?;
        } else {
            #[cfg(feature = "logging")]
            tracing::info!("resuming {} after {:?}", top.display(), resume);
        }
        summary.top_dirs += 1;
        let mut pending = vec![(top, resume.filter(|rest| !rest.is_empty()))];
        while let Some((dir, resume)) = pending.pop() {
            let subdirs = self.record_dir(&session, &dir, resume.as_deref(), sink, summary)?;
            pending.extend(subdirs.into_iter().rev());
        }
        Ok(())
    }
    /// Records the children of `dir` and returns the subdirectories to visit next,
    /// in order. With `resume` set, `dir` is an ancestor of the continue-from path
    /// and `resume` holds the remaining components of that path.
    #[allow(clippy::type_complexity)]
    fn record_dir(
        &self,
        session: &TopDirSession<'_>,
        dir: &Path,
        resume: Option<&[OsString]>,
        sink: &mut dyn LineSink,
        summary: &mut RecordSummary,
    ) -> Result<Vec<(PathBuf, Option<Vec<OsString>>)>, RecordError> {
        let children = self.walker.list(dir, summary);
        let mut subdirs = Vec::new();
        match resume {
            None | Some([]) => {
                for child in children {
                    let outcome = session.process_entry(&child.path);
                    self.emit(&outcome, sink, summary)?;
                    if outcome.is_dir() {
                        subdirs.push((child.path, None));
                    }
                }
            }
            Some([last]) => {
                // Siblings up to the resume point were recorded by the earlier run;
                // every subdirectory, the resume point included, is still unvisited.
                for child in children {
                    let is_dir = if child.name > *last {
                        let outcome = session.process_entry(&child.path);
                        self.emit(&outcome, sink, summary)?;
                        outcome.is_dir()
                    } else {
                        summary.skipped += 1;
                        child.is_dir
                    };
                    if is_dir {
                        subdirs.push((child.path, None));
                    }
                }
            }
            Some([next, rest @ ..]) => {
                summary.skipped += children.len();
                for child in children.into_iter().filter(|c| c.is_dir) {
                    if child.name < *next {
                        continue;
                    }
                    let remaining = (child.name == *next).then(|| rest.to_vec());
                    subdirs.push((child.path, remaining));
                }
            }
        }
        Ok(subdirs)
    }
    fn record_all(
        &self,
        info: &RunInfo,
        sink: &mut dyn LineSink,
    ) -> Result<RecordSummary, RecordError> {
        let mut summary = RecordSummary::default();
        for line in self
            .banner
            .header(info, &self.formatter.layout().describe())
        {
            sink.write_line(&line)?;
        }
        for top_dir in &self.options.top_dirs {
            self.record_top_dir(top_dir, sink, &mut summary)?;
        }
        for line in self.banner.footer(Local::now()) {
            sink.write_line(&line)?;
        }
        Ok(summary)
    }
}
/// Records every top directory into `sink`, framed by the header and footer lines.
///
/// The options are validated here except for the output file, which this
/// function never touches.
pub fn record_to(
    options: &RecordOptions,
    info: &RunInfo,
    sink: &mut dyn LineSink,
) -> Result<RecordSummary, RecordError> {
    if options.top_dirs.is_empty() {
        return Err(RecordError::Config("at least one top directory is required".into()));
    }
    if !options.time_format().is_valid() {
        return Err(RecordError::InvalidTimeFormat(
            options.time_format.clone().unwrap_or_default(),
        ));
    }
    let recorder = Recorder::new(options)?;
    recorder.record_all(info, sink)
}
/// Validates `options`, opens the configured output and records every top directory.
pub fn record_dirs(options: &RecordOptions) -> Result<RecordSummary, RecordError> {
    options.validate()?;
    let recorder = Recorder::new(options)?;
    let mut sink = output::open_sink(options)?;
    let summary = recorder.record_all(&RunInfo::detect(), sink.as_mut())?;
    sink.finish()?;
    #[cfg(feature = "logging")]
    tracing::info!(
        "recorded {} entries ({} placeholders) under {} top directories; {} filtered, {} excluded, {} skipped",
        summary.records,
        summary.placeholders,
        summary.top_dirs,
        summary.filtered,
        summary.excluded,
        summary.skipped
    );
    Ok(summary)
}
