//! Destination paths rendered from `{name}` templates.
//!
//! A [`PathTemplate`] is literal text with `{name}` placeholders. Each
//! placeholder is resolved against the record being rendered, in order:
//!
//! 1. an extracted field column (a null value is an error, not an empty
//!    string),
//! 2. `filepath`, the record's source path,
//! 3. `file_extension`, everything from the first dot of the file name
//!    (`.nii.gz`),
//! 4. the caller's constants.
//!
//! `{{` and `}}` produce literal braces.
//!
//! ```
//! use nisupply_library::PathTemplate;
//!
//! let template: PathTemplate = "{dst}/sub-{subject}/sub-{subject}_task-{task}{file_extension}".parse().unwrap();
//! assert_eq!(template.placeholders(), vec!["dst", "subject", "task", "file_extension"]);
//! ```

use crate::error::{Error, ErrorKind, Result};
use crate::table::{FILE_EXTENSION, FILEPATH, FileRecord, RecordTable};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed destination template.
///
/// Constructed via [`FromStr`], which validates the syntax eagerly: an
/// unclosed `{`, a stray `}` or an empty `{}` fails with
/// [`ErrorKind::InvalidTemplate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FromStr for PathTemplate {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::from(ErrorKind::InvalidTemplate(s.to_string()));
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                },
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                },
                '}' => return Err(invalid()),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(invalid()),
                            Some(c) => name.push(c),
                        }
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(invalid());
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                },
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { source: s.to_string(), segments })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PathTemplate {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Every referenced name, once each, in order of first use.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment
                && !names.contains(&name.as_str())
            {
                names.push(name);
            }
        }
        names
    }

    /// Renders the destination path for a single record.
    ///
    /// # Errors
    /// [`ErrorKind::TemplateResolution`] naming the record and the first
    /// placeholder that has no value.
    pub fn render(&self, record: &FileRecord, constants: &BTreeMap<String, String>) -> Result<PathBuf> {
        let mut rendered = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Placeholder(name) => rendered.push_str(&Self::resolve(record, name, constants)?),
            }
        }
        Ok(PathBuf::from(rendered))
    }

    fn resolve(record: &FileRecord, name: &str, constants: &BTreeMap<String, String>) -> Result<String> {
        let value = if record.has_field(name) {
            record.field(name).map(str::to_string)
        } else {
            match name {
                FILEPATH => Some(record.filepath().to_string_lossy().into_owned()),
                FILE_EXTENSION => Some(record.file_extension()),
                _ => constants.get(name).cloned(),
            }
        };
        value.ok_or_else(|| {
            Error::from(ErrorKind::TemplateResolution {
                filepath: record.filepath().to_path_buf(),
                placeholder: name.to_string(),
            })
        })
    }
}

/// What [`render_destinations`] does with records it cannot render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderPolicy {
    /// Fail the whole batch on the first unresolvable record. No destination
    /// is written for any record.
    #[default]
    FailFast,
    /// Remove unresolvable records from the table and hand their errors back.
    DropUnresolved,
}

/// Sets `destination_path` on every record of `table`.
///
/// Rendering is idempotent: calling it again replaces every destination with
/// the same value. Returns the errors of records dropped under
/// [`RenderPolicy::DropUnresolved`]; always empty under
/// [`RenderPolicy::FailFast`].
///
/// # Errors
/// - [`ErrorKind::DuplicateColumn`] if a constant shares its name with a
///   column (or `file_extension`), checked before anything is rendered.
/// - [`ErrorKind::TemplateResolution`] under [`RenderPolicy::FailFast`]; the
///   table is left untouched.
#[instrument(skip_all, fields(template = %template, rows = table.len(), policy = ?policy))]
pub fn render_destinations(
    table: &mut RecordTable,
    template: &PathTemplate,
    constants: &BTreeMap<String, String>,
    policy: RenderPolicy,
) -> Result<Vec<Error>> {
    if let Some(name) = constants.keys().find(|name| table.has_column(name) || *name == FILE_EXTENSION) {
        exn::bail!(ErrorKind::DuplicateColumn(name.clone()));
    }

    let mut destinations = Vec::with_capacity(table.len());
    let mut dropped = Vec::new();
    for record in table.iter() {
        match template.render(record, constants) {
            Ok(destination) => destinations.push(Some(destination)),
            Err(err) if policy == RenderPolicy::DropUnresolved => {
                tracing::warn!(filepath = %record.filepath().display(), "Dropping record: {}", *err);
                destinations.push(None);
                dropped.push(err);
            },
            Err(err) => return Err(err),
        }
    }
    table.apply_destinations(destinations);
    tracing::info!(rendered = table.len(), dropped = dropped.len(), "Rendered destination paths");
    Ok(dropped)
}

/// Sets each destination to `dst_root` joined with the record's filepath
/// relative to `src_root`, reproducing the source layout under a new root.
///
/// # Errors
/// [`ErrorKind::OutsideRoot`] if any filepath is not below `src_root`; no
/// destination is written in that case.
#[instrument(skip_all, fields(src = %src_root.as_ref().display(), dst = %dst_root.as_ref().display()))]
pub fn mirror_destinations(table: &mut RecordTable, src_root: impl AsRef<Path>, dst_root: impl AsRef<Path>) -> Result<()> {
    let (src_root, dst_root) = (src_root.as_ref(), dst_root.as_ref());
    let destinations = table
        .iter()
        .map(|record| match record.filepath().strip_prefix(src_root) {
            Ok(relative) => Ok(Some(dst_root.join(relative))),
            Err(_) => Err(Error::from(ErrorKind::OutsideRoot {
                filepath: record.filepath().to_path_buf(),
                root: src_root.to_path_buf(),
            })),
        })
        .collect::<Result<Vec<_>>>()?;
    table.apply_destinations(destinations);
    Ok(())
}
