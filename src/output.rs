//! Report output.
//!
//! Record lines and the comment lines framing them go to a [`LineSink`]. The sink
//! is either stdout or a file that is created fresh or appended to; both receive
//! exactly the same lines in traversal order.

use crate::error::RecordError;
use crate::host;
use crate::options::RecordOptions;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{self, LineWriter, Write};
use std::path::{Component, Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S_%z";

/// Receives report lines, without line terminators.
pub trait LineSink {
    fn write_line(&mut self, line: &str) -> Result<(), RecordError>;

    /// Flushes buffered output. Called once after the last line.
    fn finish(&mut self) -> Result<(), RecordError> {
        Ok(())
    }
}

/// Collects lines in memory.
impl LineSink for Vec<String> {
    fn write_line(&mut self, line: &str) -> Result<(), RecordError> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Writes newline-terminated lines to any writer, flushing after each line.
pub struct WriterSink<W: Write> {
    target: PathBuf,
    writer: LineWriter<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(target: impl Into<PathBuf>, writer: W) -> Self {
        Self {
            target: target.into(),
            writer: LineWriter::new(writer),
        }
    }
}

impl<W: Write> LineSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) -> Result<(), RecordError> {
        writeln!(self.writer, "{line}").map_err(|e| RecordError::io(&self.target, e))
    }

    fn finish(&mut self) -> Result<(), RecordError> {
        self.writer
            .flush()
            .map_err(|e| RecordError::io(&self.target, e))
    }
}

/// Opens the configured output: stdout, a new file, or an existing file in append mode.
pub fn open_sink(options: &RecordOptions) -> Result<Box<dyn LineSink>, RecordError> {
    match &options.output {
        None => Ok(Box::new(WriterSink::new("<stdout>", io::stdout()))),
        Some(path) => {
            let file = OpenOptions::new()
                .append(options.append)
                .write(true)
                .create_new(!options.append)
                .open(path)
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => RecordError::OutputExists(path.clone()),
                    io::ErrorKind::NotFound if options.append => {
                        RecordError::OutputMissing(path.clone())
                    }
                    _ => RecordError::io(path, e),
                })?;
            Ok(Box::new(WriterSink::new(path, file)))
        }
    }
}

/// Who ran the recording, where and how.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub started: DateTime<Local>,
    pub user: String,
    pub login_user: String,
    pub hostname: String,
    pub command_line: String,
}

impl RunInfo {
    pub fn detect() -> Self {
        let user = host::user().unwrap_or_else(|| "unknown".into());
        Self {
            started: Local::now(),
            login_user: host::login_user().unwrap_or_else(|| user.clone()),
            user,
            hostname: host::hostname().unwrap_or_else(|| "localhost".into()),
            command_line: std::env::args().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Builds the comment lines around the records.
#[derive(Debug, Clone)]
pub struct Banner<'a> {
    prefix: &'a str,
}

impl<'a> Banner<'a> {
    pub fn new(prefix: &'a str) -> Self {
        Self { prefix }
    }

    pub fn header(&self, info: &RunInfo, record_format: &str) -> Vec<String> {
        let p = self.prefix;
        vec![
            format!("{p} --- --- start of recording"),
            format!(
                "{p} created on {} by user {} on {}@{} by application {} version {}",
                stamp(info.started),
                info.user,
                info.login_user,
                info.hostname,
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            format!("{p} script run with arguments: \"\"\"{}\"\"\"", info.command_line),
            format!("{p} record line format: \"\"\"{record_format}\"\"\""),
        ]
    }

    pub fn top_dir(&self, top_dir: &Path) -> String {
        format!(
            "{}--- --top-dir \"\"\"{}\"\"\":",
            self.prefix,
            absolute_lexical(top_dir).display()
        )
    }

    pub fn footer(&self, finished: DateTime<Local>) -> Vec<String> {
        let p = self.prefix;
        vec![
            format!(
                "{p} recording finished at {}",
                stamp(finished)
            ),
            format!("{p} --- --- end of recording (recording finished successfully)"),
        ]
    }
}

/// Local time with its numeric UTC offset, e.g. `2020-01-03_11-00-48_+0100`.
fn stamp(time: DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Absolute form of `path` with `.` and `..` resolved without touching the filesystem.
fn absolute_lexical(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}
