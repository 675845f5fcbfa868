//! Named fields pulled out of filepaths with regular expressions.
//!
//! Each [`FieldPattern`] adds one nullable column to the table. A record the
//! pattern does not match (or whose configured group did not participate in
//! the match) gets a null; extraction itself never fails per record.

use crate::error::{ErrorKind, Result};
use crate::table::{FileRecord, RecordTable};
use exn::ResultExt;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::instrument;

static BIDS_SESSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_ses-(\d+)").unwrap());
static BIDS_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_run-(\d+)").unwrap());
static BIDS_DATA_TYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"func|dwi|fmap|anat|meg|eeg|ieeg|beh").unwrap());
static BIDS_ECHO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_echo-(\d+)").unwrap());

/// Which string a pattern is searched in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchTarget {
    /// The whole filepath as stored in the table.
    #[default]
    Filepath,
    /// Only the final path component.
    Filename,
}

/// The capture group a field takes its value from. Group `0` is the whole
/// match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureGroup {
    Index(usize),
    Name(String),
}

impl Default for CaptureGroup {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<usize> for CaptureGroup {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for CaptureGroup {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for CaptureGroup {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// One output column and the pattern that fills it.
#[derive(Clone, Debug)]
pub struct FieldPattern {
    name: String,
    regex: Regex,
    group: CaptureGroup,
    target: MatchTarget,
}

impl FieldPattern {
    /// Compiles `pattern` for the field `name`, taking the whole match from
    /// the full filepath until configured otherwise.
    ///
    /// # Errors
    /// [`ErrorKind::InvalidPattern`] if the pattern does not compile.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        let regex = Regex::new(pattern).or_raise(|| ErrorKind::InvalidPattern {
            field: name.clone(),
            pattern: pattern.to_string(),
        })?;
        Ok(Self::from_regex(name, regex))
    }

    fn from_regex(name: impl Into<String>, regex: Regex) -> Self {
        Self { name: name.into(), regex, group: CaptureGroup::default(), target: MatchTarget::default() }
    }

    /// Selects the capture group to extract.
    ///
    /// # Errors
    /// [`ErrorKind::InvalidPattern`] if the pattern has no such group.
    pub fn with_group(mut self, group: impl Into<CaptureGroup>) -> Result<Self> {
        let group = group.into();
        let exists = match &group {
            CaptureGroup::Index(index) => *index < self.regex.captures_len(),
            CaptureGroup::Name(name) => self.regex.capture_names().flatten().any(|n| n == name),
        };
        if !exists {
            exn::bail!(ErrorKind::InvalidPattern { field: self.name, pattern: self.regex.as_str().to_string() });
        }
        self.group = group;
        Ok(self)
    }

    pub fn with_target(mut self, target: MatchTarget) -> Self {
        self.target = target;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn group(&self) -> &CaptureGroup {
        &self.group
    }

    pub fn target(&self) -> MatchTarget {
        self.target
    }

    /// The field's value for one record.
    pub fn extract(&self, record: &FileRecord) -> Option<String> {
        let path = record.filepath();
        let haystack = match self.target {
            MatchTarget::Filepath => path.to_string_lossy(),
            MatchTarget::Filename => path.file_name()?.to_string_lossy(),
        };
        self.extract_from(&haystack)
    }

    /// The configured group of the leftmost match in `haystack`.
    pub fn extract_from(&self, haystack: &str) -> Option<String> {
        let captures = self.regex.captures(haystack)?;
        let found = match &self.group {
            CaptureGroup::Index(index) => captures.get(*index),
            CaptureGroup::Name(name) => captures.name(name),
        };
        found.map(|m| m.as_str().to_string())
    }
}

/// An ordered set of fields to extract in one pass.
#[derive(Clone, Debug, Default)]
pub struct ExtractionSpec {
    fields: Vec<FieldPattern>,
}

impl ExtractionSpec {
    pub fn with_field(mut self, field: FieldPattern) -> Self {
        self.fields.push(field);
        self
    }

    /// Common BIDS entities: `session`, `run`, `data_type` and `echo`.
    ///
    /// The numeric entities take the digits after their key (`_ses-2` →
    /// `2`); `data_type` takes the first data type directory name found
    /// anywhere in the filepath.
    pub fn bids_entities() -> Self {
        let preset = |regex: &LazyLock<Regex>, name: &str, index: usize| FieldPattern {
            group: CaptureGroup::Index(index),
            ..FieldPattern::from_regex(name, Regex::clone(regex))
        };
        Self {
            fields: vec![
                preset(&BIDS_SESSION, "session", 1),
                preset(&BIDS_RUN, "run", 1),
                preset(&BIDS_DATA_TYPE, "data_type", 0),
                preset(&BIDS_ECHO, "echo", 1),
            ],
        }
    }

    pub fn fields(&self) -> &[FieldPattern] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldPattern::name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldPattern> for ExtractionSpec {
    fn from_iter<T: IntoIterator<Item = FieldPattern>>(iter: T) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

/// Adds one column per field of `spec` to `table`.
///
/// # Errors
/// [`ErrorKind::DuplicateColumn`] if any field name is already a column,
/// reserved, or repeated within `spec`. Names are checked before any column
/// is added, so a failed call leaves the table unchanged.
#[instrument(skip_all, fields(fields = spec.fields.len(), rows = table.len()))]
pub fn extract_fields(table: &mut RecordTable, spec: &ExtractionSpec) -> Result<()> {
    let mut seen = HashSet::new();
    for name in spec.names() {
        table.check_new_column(name)?;
        if !seen.insert(name) {
            exn::bail!(ErrorKind::DuplicateColumn(name.to_string()));
        }
    }
    for field in &spec.fields {
        let values: Vec<Option<String>> = table.iter().map(|record| field.extract(record)).collect();
        let nulls = values.iter().filter(|v| v.is_none()).count();
        tracing::debug!(field = field.name(), pattern = field.pattern(), nulls, "Extracted field");
        table.add_column(field.name(), values)?;
    }
    Ok(())
}
