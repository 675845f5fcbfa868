//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Lower-level failures (storage, regex compilation, CSV
//! parsing) are attached as children of the kind describing which record or
//! column they concern.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies a library failure.
///
/// ### Input Errors
/// - [`ErrorKind::NotFound`] - a scan root does not exist or is not a directory.
/// - [`ErrorKind::InvalidPattern`], [`ErrorKind::InvalidTemplate`]
///
/// ### Table Errors
/// - [`ErrorKind::DuplicateColumn`], [`ErrorKind::UnknownColumn`],
///   [`ErrorKind::ColumnLength`], [`ErrorKind::DuplicateFilepath`],
///   [`ErrorKind::MissingFilepath`], [`ErrorKind::Table`]
///
/// ### Per-record Errors
/// - [`ErrorKind::TemplateResolution`], [`ErrorKind::OutsideRoot`]
/// - [`ErrorKind::Transfer`] - always the parent of the underlying cause
///   ([`ErrorKind::MissingDestination`], [`ErrorKind::DuplicateDestination`]
///   or a storage error).
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A scan root does not exist or is not a directory.
    #[display("directory not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Walking a scan root failed below the root itself.
    #[display("scanning {} failed", _0.display())]
    Scan(#[error(not(source))] PathBuf),
    /// A column with this name already exists (or the name is reserved).
    #[display("column already exists: {_0}")]
    DuplicateColumn(#[error(not(source))] String),
    /// No column with this name exists.
    #[display("no such column: {_0}")]
    UnknownColumn(#[error(not(source))] String),
    /// Values supplied for a new column do not line up with the table rows.
    #[display("column `{column}` has {found} values but the table has {expected} rows")]
    ColumnLength { column: String, expected: usize, found: usize },
    /// The same filepath appeared twice where duplicates are not allowed.
    #[display("duplicate filepath: {}", _0.display())]
    DuplicateFilepath(#[error(not(source))] PathBuf),
    /// An imported row has an empty filepath. Rows are numbered from 1,
    /// excluding the header.
    #[display("row {row} has no filepath")]
    MissingFilepath { row: usize },
    /// Reading or writing a delimited table failed.
    #[display("delimited table I/O failed")]
    Table,
    /// A field pattern failed to compile or names a capture group it lacks.
    #[display("invalid pattern for field `{field}`: {pattern}")]
    InvalidPattern { field: String, pattern: String },
    /// A path template is syntactically invalid.
    #[display("invalid template: {_0}")]
    InvalidTemplate(#[error(not(source))] String),
    /// A placeholder has no matching column/constant, or its value is null.
    #[display("cannot resolve placeholder `{placeholder}` for {}", filepath.display())]
    TemplateResolution { filepath: PathBuf, placeholder: String },
    /// A record's filepath does not live below the root being mirrored.
    #[display("{} is not below {}", filepath.display(), root.display())]
    OutsideRoot { filepath: PathBuf, root: PathBuf },
    /// Transferring the record with this filepath failed.
    #[display("transfer failed for {}", _0.display())]
    Transfer(#[error(not(source))] PathBuf),
    /// The record has no destination path to transfer to.
    #[display("record has no destination path")]
    MissingDestination,
    /// Another record in the same batch already targets this destination.
    #[display("destination claimed by an earlier record: {}", _0.display())]
    DuplicateDestination(#[error(not(source))] PathBuf),
    /// At least one record of a transfer batch failed.
    #[display("{failed} of {total} transfers failed")]
    Incomplete { failed: usize, total: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_resolution_names_record_and_placeholder() {
        let err = ErrorKind::TemplateResolution {
            filepath: PathBuf::from("src/subject_4.txt"),
            placeholder: "subject_id".to_string(),
        };
        assert_eq!(err.to_string(), "cannot resolve placeholder `subject_id` for src/subject_4.txt");
    }
}
