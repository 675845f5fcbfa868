use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One discovered file: its path, the fields extracted from it, and (once
/// rendered) where it should go.
///
/// Records are only ever created and mutated through their
/// [`RecordTable`](super::RecordTable), which keeps every record's field set
/// identical to the table's columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub(super) filepath: PathBuf,
    pub(super) fields: HashMap<String, Option<String>>,
    pub(super) destination: Option<PathBuf>,
}

impl FileRecord {
    pub(super) fn new(filepath: PathBuf) -> Self {
        Self { filepath, fields: HashMap::new(), destination: None }
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    /// The value of an extracted field. `None` both for a null value and for
    /// a column that does not exist; use [`has_field`](Self::has_field) to
    /// tell them apart.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|value| value.as_deref())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn destination_path(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    /// Everything from the first dot of the file name onwards, so compound
    /// extensions survive intact (`bold.nii.gz` → `.nii.gz`). Leading dots of
    /// hidden files are not extension separators. Empty when there is no
    /// extension.
    pub fn file_extension(&self) -> String {
        file_extension(&self.filepath)
    }
}

fn file_extension(path: &Path) -> String {
    let Some(name) = path.file_name() else {
        return String::new();
    };
    let name = name.to_string_lossy();
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].find('.') {
        Some(dot) => name[stem_start + dot..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("src/fmri_nback_subject_3_session_2.nii.gz", ".nii.gz")]
    #[case("subject_4.txt", ".txt")]
    #[case("sub-01/anat/sub-01_T1w.nii", ".nii")]
    #[case("data.v2/README", "")]
    #[case(".bashrc", "")]
    #[case(".hidden.tar.gz", ".tar.gz")]
    #[case("trailing.", ".")]
    fn test_file_extension(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(file_extension(Path::new(path)), expected);
    }

    #[test]
    fn test_null_and_missing_fields() {
        let mut record = FileRecord::new(PathBuf::from("a/b.nii"));
        record.fields.insert("subject".to_string(), Some("3".to_string()));
        record.fields.insert("session".to_string(), None);
        assert_eq!(record.field("subject"), Some("3"));
        assert_eq!(record.field("session"), None);
        assert!(record.has_field("session"));
        assert!(!record.has_field("run"));
    }
}
