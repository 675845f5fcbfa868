//! The in-memory table passed between every pipeline stage.
//!
//! A [`RecordTable`] is an ordered list of [`FileRecord`]s sharing one column
//! set: the mandatory `filepath`, any number of extracted field columns, and
//! the `destination_path` once rendering has happened. A field that failed to
//! extract is stored as null, never as a missing column.

mod delimited;
mod rank;
mod record;

pub use self::record::FileRecord;
use crate::error::{ErrorKind, Result};
use std::collections::HashSet;
use std::path::PathBuf;

/// Name of the source path column.
pub const FILEPATH: &str = "filepath";
/// Name of the rendered destination column.
pub const DESTINATION_PATH: &str = "destination_path";
/// Name of the derived extension field available to templates.
pub const FILE_EXTENSION: &str = "file_extension";

const RESERVED: [&str; 3] = [FILEPATH, DESTINATION_PATH, FILE_EXTENSION];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordTable {
    columns: Vec<String>,
    records: Vec<FileRecord>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table with one record per path, in iteration order.
    ///
    /// # Errors
    /// [`ErrorKind::DuplicateFilepath`] on a repeated path, unless
    /// `allow_duplicates` is set.
    pub fn from_filepaths<I, P>(paths: I, allow_duplicates: bool) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut table = Self::new();
        table.extend_filepaths(paths, allow_duplicates)?;
        Ok(table)
    }

    /// Appends one record per path. New records get a null for every
    /// existing field column.
    pub fn extend_filepaths<I, P>(&mut self, paths: I, allow_duplicates: bool) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut seen: HashSet<PathBuf> = match allow_duplicates {
            true => HashSet::new(),
            false => self.records.iter().map(|r| r.filepath.clone()).collect(),
        };
        let mut added = Vec::new();
        for path in paths {
            let path = path.into();
            if !allow_duplicates && !seen.insert(path.clone()) {
                exn::bail!(ErrorKind::DuplicateFilepath(path));
            }
            let mut record = FileRecord::new(path);
            record.fields = self.columns.iter().map(|c| (c.clone(), None)).collect();
            added.push(record);
        }
        self.records.extend(added);
        Ok(())
    }

    /// Appends another table's records. Both tables must have the same field
    /// columns (in any order).
    pub fn append(&mut self, other: RecordTable, allow_duplicates: bool) -> Result<()> {
        let ours: HashSet<&String> = self.columns.iter().collect();
        let theirs: HashSet<&String> = other.columns.iter().collect();
        if let Some(column) = theirs.symmetric_difference(&ours).next() {
            exn::bail!(ErrorKind::UnknownColumn((*column).clone()));
        }
        if !allow_duplicates {
            let existing: HashSet<&PathBuf> = self.records.iter().map(|r| &r.filepath).collect();
            let mut incoming = HashSet::new();
            for record in &other.records {
                if existing.contains(&record.filepath) || !incoming.insert(&record.filepath) {
                    exn::bail!(ErrorKind::DuplicateFilepath(record.filepath.clone()));
                }
            }
        }
        self.records.extend(other.records);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Extracted field columns, in the order they were added.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Every column name in export order: `filepath`, the field columns, then
    /// `destination_path` if any record has one.
    pub fn column_names(&self) -> Vec<&str> {
        let mut names = vec![FILEPATH];
        names.extend(self.columns.iter().map(String::as_str));
        if self.has_destinations() {
            names.push(DESTINATION_PATH);
        }
        names
    }

    /// `true` for `filepath`, `destination_path` and every field column.
    pub fn has_column(&self, name: &str) -> bool {
        name == FILEPATH || name == DESTINATION_PATH || self.columns.iter().any(|c| c == name)
    }

    pub fn has_destinations(&self) -> bool {
        self.records.iter().any(|r| r.destination.is_some())
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// Adds a field column with one value per record, in record order.
    ///
    /// # Errors
    /// - [`ErrorKind::DuplicateColumn`] if the name is taken or reserved
    ///   (`filepath`, `destination_path`, `file_extension`).
    /// - [`ErrorKind::ColumnLength`] if `values` does not have exactly one
    ///   entry per record.
    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Option<String>>) -> Result<()> {
        let name = name.into();
        self.check_new_column(&name)?;
        if values.len() != self.records.len() {
            exn::bail!(ErrorKind::ColumnLength { column: name, expected: self.records.len(), found: values.len() });
        }
        for (record, value) in self.records.iter_mut().zip(values) {
            record.fields.insert(name.clone(), value);
        }
        self.columns.push(name);
        Ok(())
    }

    pub(crate) fn check_new_column(&self, name: &str) -> Result<()> {
        if RESERVED.contains(&name) || self.columns.iter().any(|c| c == name) {
            exn::bail!(ErrorKind::DuplicateColumn(name.to_string()));
        }
        Ok(())
    }

    /// All values of a column, in record order. Works for `filepath` and
    /// `destination_path` as well as field columns.
    pub fn column(&self, name: &str) -> Result<Vec<Option<String>>> {
        if !self.has_column(name) {
            exn::bail!(ErrorKind::UnknownColumn(name.to_string()));
        }
        Ok(self.records.iter().map(|r| cell(r, name)).collect())
    }

    /// Removes every record with a null in any of `columns`, returning how
    /// many were removed.
    ///
    /// # Errors
    /// [`ErrorKind::UnknownColumn`] if a column does not exist; the table is
    /// left untouched.
    pub fn drop_nulls<I, S>(&mut self, columns: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<S> = columns.into_iter().collect();
        if let Some(unknown) = columns.iter().find(|c| !self.has_column(c.as_ref())) {
            exn::bail!(ErrorKind::UnknownColumn(unknown.as_ref().to_string()));
        }
        let before = self.records.len();
        self.records.retain(|record| columns.iter().all(|c| cell(record, c.as_ref()).is_some()));
        let dropped = before - self.records.len();
        tracing::debug!(dropped, remaining = self.records.len(), "Dropped records with null values");
        Ok(dropped)
    }

    /// Replaces every destination. `None` entries remove their record.
    pub(crate) fn apply_destinations(&mut self, destinations: Vec<Option<PathBuf>>) {
        debug_assert_eq!(destinations.len(), self.records.len());
        let records = std::mem::take(&mut self.records);
        self.records = records
            .into_iter()
            .zip(destinations)
            .filter_map(|(mut record, destination)| {
                record.destination = Some(destination?);
                Some(record)
            })
            .collect();
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;
    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Text value of a named cell, for export and null checks.
fn cell(record: &FileRecord, name: &str) -> Option<String> {
    match name {
        FILEPATH => Some(record.filepath.to_string_lossy().into_owned()),
        DESTINATION_PATH => record.destination.as_ref().map(|d| d.to_string_lossy().into_owned()),
        _ => record.field(name).map(str::to_string),
    }
}
