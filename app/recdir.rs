//! Command-line interface for recdir.
//!
//! Records the metadata of every entry below the given top directories into a
//! report file, or stdout when the output is `-`.

use clap::Parser;
use recdir::{FileKind, RecordBuilder, RecordError, RecordOptions, record_dirs};
use std::path::PathBuf;
use std::process::exit;

/// recdir: record filesystem metadata of directory trees
#[derive(Parser)]
#[command(name = "recdir", version, about, long_about = None)]
struct Cli {
    /// Report file to create, `-` for stdout
    #[arg(value_name = "OUTPUT-FILE")]
    output: PathBuf,

    /// Directory to record (can be repeated)
    #[arg(short = 'd', long = "top-dir", value_name = "DIR")]
    top_dirs: Vec<PathBuf>,

    /// Record absolute paths
    #[arg(short, long)]
    absolute_paths: bool,

    /// Wrap paths and link targets in the quote string
    #[arg(short = 'u', long)]
    quoted_paths: bool,

    /// Field delimiter of the default record format
    #[arg(short = 'i', long, value_name = "DELIM")]
    field_delimiter: Option<String>,

    /// Skip entries whose path matches this regex, with their subtrees (can be repeated)
    #[arg(short = 'e', long = "exclude-regex", value_name = "REGEX")]
    exclude_regexes: Vec<String>,

    /// Skip entries whose path matches this glob (can be repeated)
    #[arg(short = 'I', long = "ignore", value_name = "GLOB")]
    ignore_patterns: Vec<String>,

    /// Hash algorithm, run as the `<ALGO>sum` utility
    #[arg(short = 's', long, value_name = "ALGO")]
    hash_type: Option<String>,

    /// Custom record template, e.g. "%p;%s;%H"
    #[arg(short = 'f', long, value_name = "TEMPLATE")]
    format: Option<String>,

    /// strftime pattern for timestamps (epoch seconds if not set)
    #[arg(short = 't', long, value_name = "PATTERN")]
    time_format: Option<String>,

    /// Only record entries of this type: f d l b c s p (can be repeated)
    #[arg(short = 'y', long = "file-type", value_parser = parse_file_kind)]
    file_types: Vec<FileKind>,

    /// Resume an interrupted recording after this path
    #[arg(short = 'c', long, value_name = "PATH")]
    continue_from: Option<PathBuf>,

    /// Append to an existing report instead of creating a new one
    #[arg(short = 'p', long)]
    file_append: bool,

    /// Quote string used with --quoted-paths
    #[arg(long)]
    quote: Option<String>,

    /// Prefix of the header, footer and top-dir comment lines
    #[arg(long)]
    comment_prefix: Option<String>,

    /// Text written for fields without a value
    #[arg(long)]
    unset_symbol: Option<String>,

    /// Load options from a JSON file; flags given here take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// More diagnostics on stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parse a file-type symbol into FileKind.
fn parse_file_kind(s: &str) -> Result<FileKind, String> {
    s.parse()
}

impl Cli {
    fn into_options(self) -> Result<RecordOptions, RecordError> {
        let base = match &self.config {
            Some(path) => RecordOptions::from_json_file(path)?,
            None => RecordOptions::default(),
        };
        let mut builder = RecordBuilder::from_options(base);

        for dir in self.top_dirs {
            builder = builder.top_dir(dir);
        }
        builder = if self.output.as_os_str() == "-" {
            builder.output(None)
        } else {
            builder.output(Some(self.output))
        };
        if self.file_append {
            builder = builder.append(true);
        }
        if self.absolute_paths {
            builder = builder.absolute_paths(true);
        }
        if self.quoted_paths {
            builder = builder.quote_paths(true);
        }
        if let Some(delimiter) = self.field_delimiter {
            builder = builder.delimiter(delimiter);
        }
        if let Some(quote) = self.quote {
            builder = builder.quote(quote);
        }
        if let Some(prefix) = self.comment_prefix {
            builder = builder.comment_prefix(prefix);
        }
        if let Some(symbol) = self.unset_symbol {
            builder = builder.unset_symbol(symbol);
        }
        if let Some(algorithm) = self.hash_type {
            builder = builder.hash_type(algorithm);
        }
        if let Some(template) = self.format {
            builder = builder.template(template);
        }
        if let Some(pattern) = self.time_format {
            builder = builder.time_format(pattern);
        }
        if !self.file_types.is_empty() {
            builder = builder.file_types(self.file_types);
        }
        if !self.exclude_regexes.is_empty() {
            builder = builder.exclude_regexes(self.exclude_regexes);
        }
        if !self.ignore_patterns.is_empty() {
            builder = builder.ignore_patterns(self.ignore_patterns);
        }
        if let Some(path) = self.continue_from {
            builder = builder.continue_from(path);
        }

        Ok(builder.build())
    }
}

#[cfg(feature = "logging")]
fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recdir={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    init_logging(cli.verbose, cli.quiet);

    let options = match cli.into_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    if let Err(e) = record_dirs(&options) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}
