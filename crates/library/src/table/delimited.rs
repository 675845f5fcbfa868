//! Delimited-text interchange for [`RecordTable`].
//!
//! The header row is `filepath`, the field columns in table order, then
//! `destination_path` when any record has one. Nulls are written as empty
//! cells and empty cells read back as nulls.
//!
//! An extracted empty string (a pattern such as `(\d*)` matching nothing)
//! is written as an empty cell too, so it reads back as null. Tables that
//! must keep the distinction should require the field with
//! [`RecordTable::drop_nulls`] before export, or use patterns that cannot
//! match empty.

use super::{DESTINATION_PATH, FILEPATH, FileRecord, RecordTable};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;

impl RecordTable {
    /// Writes the table with the given field delimiter (e.g. `b'\t'`).
    pub fn write_delimited<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut out = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
        let header = self.column_names();
        out.write_record(&header).or_raise(|| ErrorKind::Table)?;
        for record in &self.records {
            let row = header.iter().map(|name| super::cell(record, name).unwrap_or_default());
            out.write_record(row).or_raise(|| ErrorKind::Table)?;
        }
        out.flush().or_raise(|| ErrorKind::Table)?;
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        self.write_delimited(writer, b',')
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display(), rows = self.len()))]
    pub fn write_csv_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref()).or_raise(|| ErrorKind::Table)?;
        self.write_csv(file)
    }

    /// Reads a table written by [`write_delimited`](Self::write_delimited)
    /// (or any delimited file with a `filepath` column).
    ///
    /// A `destination_path` column is restored as record destinations; every
    /// other column becomes a field column. Duplicate filepaths are accepted.
    ///
    /// # Errors
    /// - [`ErrorKind::UnknownColumn`] if there is no `filepath` column.
    /// - [`ErrorKind::DuplicateColumn`] if a header name repeats or a field
    ///   column uses a reserved name.
    /// - [`ErrorKind::MissingFilepath`] for a row with an empty filepath.
    /// - [`ErrorKind::Table`] for malformed input.
    pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut input = csv::ReaderBuilder::new().delimiter(delimiter).from_reader(reader);
        let header: Vec<String> = input.headers().or_raise(|| ErrorKind::Table)?.iter().map(str::to_string).collect();

        let mut seen = HashSet::new();
        if let Some(duplicate) = header.iter().find(|name| !seen.insert(name.to_string())) {
            exn::bail!(ErrorKind::DuplicateColumn(duplicate.clone()));
        }
        let filepath_idx = header
            .iter()
            .position(|name| name == FILEPATH)
            .ok_or_else(|| ErrorKind::UnknownColumn(FILEPATH.to_string()))?;
        let destination_idx = header.iter().position(|name| name == DESTINATION_PATH);

        let mut table = RecordTable::new();
        for (idx, name) in header.iter().enumerate() {
            if idx != filepath_idx && Some(idx) != destination_idx {
                table.check_new_column(name)?;
                table.columns.push(name.clone());
            }
        }

        for (row, result) in input.records().enumerate() {
            let cells = result.or_raise(|| ErrorKind::Table)?;
            let filepath = cells.get(filepath_idx).unwrap_or_default();
            if filepath.is_empty() {
                exn::bail!(ErrorKind::MissingFilepath { row: row + 1 });
            }
            let mut fields = HashMap::with_capacity(table.columns.len());
            let mut destination = None;
            for (idx, name) in header.iter().enumerate() {
                let value = cells.get(idx).filter(|v| !v.is_empty());
                if Some(idx) == destination_idx {
                    destination = value.map(PathBuf::from);
                } else if idx != filepath_idx {
                    fields.insert(name.clone(), value.map(str::to_string));
                }
            }
            table.records.push(FileRecord { filepath: PathBuf::from(filepath), fields, destination });
        }
        tracing::debug!(rows = table.len(), columns = table.columns.len(), "Read delimited table");
        Ok(table)
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        Self::read_delimited(reader, b',')
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).or_raise(|| ErrorKind::Table)?;
        Self::read_csv(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> RecordTable {
        let mut table = RecordTable::from_filepaths(["src/subject_1/fmri.nii.gz", "src/subject_4.txt"], false).unwrap();
        table.add_column("subject", vec![Some("1".into()), Some("4".into())]).unwrap();
        table.add_column("session", vec![None, Some("a,b".into())]).unwrap();
        table
    }

    fn to_string(table: &RecordTable, delimiter: u8) -> String {
        let mut buf = Vec::new();
        table.write_delimited(&mut buf, delimiter).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_nulls_are_empty_cells() {
        let csv = to_string(&sample(), b',');
        assert_eq!(
            csv,
            "filepath,subject,session\nsrc/subject_1/fmri.nii.gz,1,\nsrc/subject_4.txt,4,\"a,b\"\n"
        );
    }

    #[test]
    fn test_empty_string_reads_back_as_null() {
        let mut table = RecordTable::from_filepaths(["run-/bold.nii"], false).unwrap();
        table.add_column("run", vec![Some(String::new())]).unwrap();
        let csv = to_string(&table, b',');
        assert_eq!(csv, "filepath,run\nrun-/bold.nii,\n");
        let restored = RecordTable::read_csv(csv.as_bytes()).unwrap();
        assert_eq!(restored.column("run").unwrap(), vec![None::<String>]);
    }

    #[test]
    fn test_destination_column_written_last() {
        let mut table = sample();
        table.apply_destinations(vec![Some("out/sub-1.nii.gz".into()), None]);
        let tsv = to_string(&table, b'\t');
        assert_eq!(tsv, "filepath\tsubject\tsession\tdestination_path\nsrc/subject_1/fmri.nii.gz\t1\t\tout/sub-1.nii.gz\n");
    }

    #[rstest]
    #[case(b',')]
    #[case(b'\t')]
    fn test_read_back(#[case] delimiter: u8) {
        let mut table = sample();
        table.apply_destinations(vec![Some("out/a".into()), Some("out/b".into())]);
        let text = to_string(&table, delimiter);
        let read = RecordTable::read_delimited(text.as_bytes(), delimiter).unwrap();
        assert_eq!(read, table);
    }

    #[test]
    fn test_read_requires_filepath_column() {
        let err = RecordTable::read_csv("path,subject\na,1\n".as_bytes()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownColumn(c) if c == FILEPATH));
    }

    #[test]
    fn test_read_rejects_empty_filepath() {
        let err = RecordTable::read_csv("filepath,subject\na,1\n,2\n".as_bytes()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFilepath { row: 2 }));
    }

    #[rstest]
    #[case("filepath,subject,subject\na,1,2\n", "subject")]
    #[case("filepath,file_extension\na,.nii\n", "file_extension")]
    fn test_read_rejects_bad_headers(#[case] input: &str, #[case] column: &str) {
        let err = RecordTable::read_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicateColumn(c) if c == column));
    }

    #[test]
    fn test_read_ragged_rows_fail() {
        let err = RecordTable::read_csv("filepath,subject\na,1,extra\n".as_bytes()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Table));
    }

    #[test]
    fn test_path_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        sample().write_csv_path(&path).unwrap();
        assert_eq!(RecordTable::read_csv_path(&path).unwrap(), sample());
    }
}
