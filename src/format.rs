//! Record formatting.
//!
//! A [`FileMetadata`] snapshot is first turned into [`RecordValues`], one string per
//! [`Field`] in canonical order, and then rendered as a line either by joining the
//! values with a delimiter or by substituting them into a user template.
//!
//! Both renderers are driven by the same token table, so a field added to [`Field`]
//! is automatically available to each of them.

use crate::options::RecordOptions;
use crate::types::FileMetadata;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::ops::Index;
use std::path::{Path, PathBuf};

/// Number of fields in a record.
pub const FIELD_COUNT: usize = 17;

/// A record field, declared in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Path,
    Inode,
    Mode,
    FileType,
    Size,
    AccessRights,
    Uid,
    UserName,
    Gid,
    GroupName,
    LinkCount,
    CreationTime,
    ChangeTime,
    ModificationTime,
    AccessTime,
    Hash,
    LinkTarget,
}

const TOKENS: [(Field, &str); FIELD_COUNT] = [
    (Field::Path, "%p"),
    (Field::Inode, "%i"),
    (Field::Mode, "%M"),
    (Field::FileType, "%F"),
    (Field::Size, "%s"),
    (Field::AccessRights, "%a"),
    (Field::Uid, "%u"),
    (Field::UserName, "%U"),
    (Field::Gid, "%g"),
    (Field::GroupName, "%G"),
    (Field::LinkCount, "%L"),
    (Field::CreationTime, "%W"),
    (Field::ChangeTime, "%Z"),
    (Field::ModificationTime, "%Y"),
    (Field::AccessTime, "%X"),
    (Field::Hash, "%H"),
    (Field::LinkTarget, "%T"),
];

impl Field {
    /// All fields in canonical order.
    pub fn all() -> impl Iterator<Item = Field> {
        TOKENS.iter().map(|(field, _)| *field)
    }

    /// Position of the field inside a record.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The two-character template token bound to the field.
    pub fn token(self) -> &'static str {
        TOKENS[self.index()].1
    }

    pub fn from_token(token: &str) -> Option<Field> {
        TOKENS
            .iter()
            .find(|(_, t)| *t == token)
            .map(|(field, _)| *field)
    }
}

/// The record format used when no template is configured: every token, delimited.
pub fn default_format(delimiter: &str) -> String {
    TOKENS
        .iter()
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join(delimiter)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field(Field),
}

/// A parsed record template.
///
/// Tokens are recognised in a single left-to-right pass and never overlap: once a
/// token is consumed, scanning resumes after it. Substituted values are never
/// rescanned, so a value that itself contains a token text is emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut pieces = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;
        while i < bytes.len() {
            let field = if bytes[i] == b'%' {
                source.get(i..i + 2).and_then(Field::from_token)
            } else {
                None
            };
            match field {
                Some(field) => {
                    if literal_start < i {
                        pieces.push(Piece::Literal(source[literal_start..i].to_string()));
                    }
                    pieces.push(Piece::Field(field));
                    i += 2;
                    literal_start = i;
                }
                None => i += 1,
            }
        }
        if literal_start < bytes.len() {
            pieces.push(Piece::Literal(source[literal_start..].to_string()));
        }
        Self {
            source: source.to_string(),
            pieces,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template references `field` at least once.
    pub fn uses(&self, field: Field) -> bool {
        self.pieces.contains(&Piece::Field(field))
    }

    pub fn render(&self, values: &RecordValues) -> String {
        let mut line = String::with_capacity(self.source.len() + 64);
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => line.push_str(text),
                Piece::Field(field) => line.push_str(&values[*field]),
            }
        }
        line
    }
}

/// How a record is laid out on its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// All fields in canonical order, joined by the delimiter.
    Delimited(String),
    /// A user template with field tokens substituted.
    Template(Template),
}

impl Layout {
    pub fn render(&self, values: &RecordValues) -> String {
        match self {
            Layout::Delimited(delimiter) => values.0.join(delimiter),
            Layout::Template(template) => template.render(values),
        }
    }

    /// Human readable format description written into the report header.
    pub fn describe(&self) -> String {
        match self {
            Layout::Delimited(delimiter) => default_format(delimiter),
            Layout::Template(template) => template.as_str().to_string(),
        }
    }
}

/// Renders epoch seconds for the time fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFormat {
    EpochSeconds,
    /// A strftime pattern evaluated in UTC. `%s` is replaced by the epoch seconds
    /// and `%Z` by `UTC` before formatting.
    Custom(String),
}

impl TimeFormat {
    pub fn format(&self, seconds: i64) -> Option<String> {
        match self {
            TimeFormat::EpochSeconds => Some(seconds.to_string()),
            TimeFormat::Custom(pattern) => {
                let pattern = pattern
                    .replace("%Z", "UTC")
                    .replace("%s", &seconds.to_string());
                let time = DateTime::<Utc>::from_timestamp(seconds, 0)?;
                let mut out = String::new();
                write!(out, "{}", time.format(&pattern)).ok()?;
                Some(out)
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.format(0).is_some()
    }
}

/// String values of one record, indexed by [`Field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordValues([String; FIELD_COUNT]);

impl RecordValues {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Index<Field> for RecordValues {
    type Output = String;

    fn index(&self, field: Field) -> &String {
        &self.0[field.index()]
    }
}

/// Converts metadata snapshots into record lines.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    unset: String,
    quote: Option<String>,
    absolute_paths: bool,
    time: TimeFormat,
    layout: Layout,
}

impl RecordFormatter {
    pub fn new(options: &RecordOptions) -> Self {
        Self {
            unset: options.unset_symbol.clone(),
            quote: options.quote_paths.then(|| options.quote.clone()),
            absolute_paths: options.absolute_paths,
            time: options.time_format(),
            layout: options.layout(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Renders every field of `meta` to text, in canonical order.
    pub fn to_values(&self, meta: &FileMetadata) -> RecordValues {
        let number = |value: Option<u64>| self.or_unset(value.map(|v| v.to_string()));
        let time = |value: Option<i64>| self.or_unset(value.and_then(|s| self.time.format(s)));
        RecordValues(std::array::from_fn(|index| {
            match TOKENS[index].0 {
                Field::Path => self.path_value(&meta.path),
                Field::Inode => number(meta.inode),
                Field::Mode => number(meta.mode.map(u64::from)),
                Field::FileType => {
                    self.or_unset(meta.kind.and_then(|k| k.symbol()).map(String::from))
                }
                Field::Size => number(meta.size_bytes),
                Field::AccessRights => self.or_unset(meta.access_rights.clone()),
                Field::Uid => number(meta.uid.map(u64::from)),
                Field::UserName => self.or_unset(meta.user_name.clone()),
                Field::Gid => number(meta.gid.map(u64::from)),
                Field::GroupName => self.or_unset(meta.group_name.clone()),
                Field::LinkCount => number(meta.link_count),
                Field::CreationTime => time(meta.creation_time),
                Field::ChangeTime => time(meta.change_time),
                Field::ModificationTime => time(meta.modification_time),
                Field::AccessTime => time(meta.access_time),
                Field::Hash => self.or_unset(meta.content_hash.clone()),
                Field::LinkTarget => match &meta.link_target {
                    Some(target) => self.link_target_value(&meta.path, target),
                    None => self.unset.clone(),
                },
            }
        }))
    }

    pub fn render(&self, values: &RecordValues) -> String {
        self.layout.render(values)
    }

    pub fn format(&self, meta: &FileMetadata) -> String {
        self.render(&self.to_values(meta))
    }

    fn or_unset(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| self.unset.clone())
    }

    fn path_value(&self, path: &Path) -> String {
        let path = if self.absolute_paths && !path.is_absolute() {
            std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
        } else {
            path.to_path_buf()
        };
        self.quoted(&path.to_string_lossy())
    }

    fn link_target_value(&self, link: &Path, target: &str) -> String {
        if self.absolute_paths && !Path::new(target).is_absolute() {
            let base: PathBuf = link.parent().map(Path::to_path_buf).unwrap_or_default();
            return self.path_value(&base.join(target));
        }
        self.quoted(target)
    }

    fn quoted(&self, text: &str) -> String {
        match &self.quote {
            Some(quote) => format!("{quote}{text}{quote}"),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RecordBuilder;
    use crate::types::FileKind;

    fn sample() -> FileMetadata {
        FileMetadata {
            path: PathBuf::from("/tmp/a"),
            inode: Some(1234),
            mode: Some(0o100644),
            kind: Some(FileKind::Regular),
            size_bytes: Some(42),
            access_rights: Some("644".into()),
            uid: Some(1000),
            user_name: Some("alice".into()),
            gid: Some(100),
            group_name: None,
            link_count: Some(1),
            creation_time: None,
            change_time: Some(1_500_000_000),
            modification_time: Some(1_500_000_001),
            access_time: Some(1_500_000_002),
            content_hash: Some("da39a3ee5e6b4b0d3255bfef95601890afd80709".into()),
            link_target: None,
        }
    }

    #[test]
    fn token_table_is_in_field_order() {
        for (position, field) in Field::all().enumerate() {
            assert_eq!(field.index(), position);
            assert_eq!(Field::from_token(field.token()), Some(field));
        }
        assert_eq!(Field::all().count(), FIELD_COUNT);
    }

    #[test]
    fn default_format_lists_every_token() {
        assert_eq!(
            default_format(";"),
            "%p;%i;%M;%F;%s;%a;%u;%U;%g;%G;%L;%W;%Z;%Y;%X;%H;%T"
        );
    }

    #[test]
    fn delimited_line_splits_back_into_seventeen_fields() {
        let options = RecordBuilder::new("/tmp").build();
        let formatter = RecordFormatter::new(&options);
        let line = formatter.format(&sample());
        let fields: Vec<&str> = line.split(';').collect();
        assert_eq!(fields.len(), FIELD_COUNT);
        assert_eq!(fields[Field::Path.index()], "/tmp/a");
        assert_eq!(fields[Field::Mode.index()], "33188");
        assert_eq!(fields[Field::FileType.index()], "f");
        assert_eq!(fields[Field::GroupName.index()], "-");
        assert_eq!(fields[Field::CreationTime.index()], "-");
        assert_eq!(fields[Field::AccessTime.index()], "1500000002");
        assert_eq!(fields[Field::LinkTarget.index()], "-");
    }

    #[test]
    fn unset_fields_use_configured_symbol() {
        let options = RecordBuilder::new("/tmp").unset_symbol("?").delimiter("|").build();
        let formatter = RecordFormatter::new(&options);
        let values = formatter.to_values(&FileMetadata::unreadable("/gone"));
        assert_eq!(values[Field::Path], "/gone");
        assert!(values.as_slice()[1..].iter().all(|v| v == "?"));
        assert_eq!(formatter.render(&values).matches('|').count(), FIELD_COUNT - 1);
    }

    #[test]
    fn template_substitutes_path_and_size() {
        let options = RecordBuilder::new("/tmp").template("%p;%s").build();
        let formatter = RecordFormatter::new(&options);
        assert_eq!(formatter.format(&sample()), "/tmp/a;42");
    }

    #[test]
    fn template_replaces_every_occurrence() {
        let template = Template::parse("%s-%s %F%F");
        let formatter = RecordFormatter::new(&RecordBuilder::new("/tmp").build());
        let values = formatter.to_values(&sample());
        assert_eq!(template.render(&values), "42-42 ff");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let mut meta = sample();
        meta.path = PathBuf::from("/tmp/100%s%H");
        let options = RecordBuilder::new("/tmp").template("%p|%s").build();
        let formatter = RecordFormatter::new(&options);
        assert_eq!(formatter.format(&meta), "/tmp/100%s%H|42");
    }

    #[test]
    fn tokens_do_not_overlap() {
        // "%%s" holds no "%%" token, so the scan moves one byte and then finds "%s".
        let template = Template::parse("%%s%Ls");
        assert!(template.uses(Field::Size));
        assert!(template.uses(Field::LinkCount));
        let values = RecordFormatter::new(&RecordBuilder::new("/tmp").build()).to_values(&sample());
        assert_eq!(template.render(&values), "%421s");
    }

    #[test]
    fn template_without_tokens_is_literal() {
        let template = Template::parse("plain ünïcode %q");
        let values = RecordFormatter::new(&RecordBuilder::new("/tmp").build()).to_values(&sample());
        assert_eq!(template.render(&values), "plain ünïcode %q");
        assert!(Field::all().all(|f| !template.uses(f)));
    }

    #[test]
    fn quoting_applies_to_paths_only() {
        let mut meta = sample();
        meta.kind = Some(FileKind::Symlink);
        meta.link_target = Some("target".into());
        let options = RecordBuilder::new("/tmp")
            .quote_paths(true)
            .template("%p %T %U")
            .build();
        let formatter = RecordFormatter::new(&options);
        assert_eq!(
            formatter.format(&meta),
            "\"\"\"/tmp/a\"\"\" \"\"\"target\"\"\" alice"
        );
    }

    #[test]
    fn absolute_link_targets_resolve_against_link_parent() {
        let mut meta = sample();
        meta.path = PathBuf::from("/data/dir/link");
        meta.link_target = Some("../file".into());
        let options = RecordBuilder::new("/tmp")
            .absolute_paths(true)
            .template("%T")
            .build();
        let formatter = RecordFormatter::new(&options);
        assert_eq!(formatter.format(&meta), "/data/dir/../file");
    }

    #[test]
    fn custom_time_format_in_utc() {
        let format = TimeFormat::Custom("%Y-%m-%d_%H-%M-%S_%Z".into());
        assert_eq!(format.format(0).as_deref(), Some("1970-01-01_00-00-00_UTC"));
        let format = TimeFormat::Custom("%s@%Y".into());
        assert_eq!(format.format(86_400 * 366).as_deref(), Some("31622400@1971"));
    }

    #[test]
    fn invalid_time_format_is_detected() {
        assert!(!TimeFormat::Custom("%Q %".into()).is_valid());
        assert!(TimeFormat::EpochSeconds.is_valid());
    }

    #[test]
    fn custom_time_format_applies_to_time_fields() {
        let options = RecordBuilder::new("/tmp")
            .time_format("%Y")
            .template("%Z %W %s")
            .build();
        let formatter = RecordFormatter::new(&options);
        assert_eq!(formatter.format(&sample()), "2017 - 42");
    }
}
