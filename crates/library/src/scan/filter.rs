use std::borrow::Cow;
use std::path::Path;

/// What the substring predicates are tested against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchScope {
    /// The file name only.
    #[default]
    Filename,
    /// The path relative to the scan root, including the file name.
    RelativePath,
}

/// Conjunctive predicates a file must satisfy to be scanned.
///
/// Suffixes and prefixes are always tested against the file name; a file
/// passes if it matches *any* of the listed values (an empty list accepts
/// everything). The substring predicates are tested against the
/// [`MatchScope`]:
///
/// - `contains_all`: every needle must appear.
/// - `contains_any`: at least one needle must appear.
/// - `not_contains_all`: rejected if every needle appears.
/// - `not_contains_any`: rejected if any needle appears.
///
/// Directories named in `exclude_dirs` are never descended into.
///
/// With `case_sensitive` off, both the candidate and the needles are
/// lowercased before comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterSpec {
    pub suffixes: Vec<String>,
    pub prefixes: Vec<String>,
    pub contains_all: Vec<String>,
    pub contains_any: Vec<String>,
    pub not_contains_all: Vec<String>,
    pub not_contains_any: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub case_sensitive: bool,
    pub contains_scope: MatchScope,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            suffixes: Vec::new(),
            prefixes: Vec::new(),
            contains_all: Vec::new(),
            contains_any: Vec::new(),
            not_contains_all: Vec::new(),
            not_contains_any: Vec::new(),
            exclude_dirs: Vec::new(),
            case_sensitive: true,
            contains_scope: MatchScope::Filename,
        }
    }
}

impl FilterSpec {
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn containing(mut self, needle: impl Into<String>) -> Self {
        self.contains_all.push(needle.into());
        self
    }

    pub fn containing_any<I, S>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contains_any.extend(needles.into_iter().map(Into::into));
        self
    }

    pub fn not_containing(mut self, needle: impl Into<String>) -> Self {
        self.not_contains_any.push(needle.into());
        self
    }

    pub fn not_containing_all<I, S>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_contains_all.extend(needles.into_iter().map(Into::into));
        self
    }

    pub fn excluding_dir(mut self, name: impl Into<String>) -> Self {
        self.exclude_dirs.push(name.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn scope(mut self, scope: MatchScope) -> Self {
        self.contains_scope = scope;
        self
    }

    /// Tests a path relative to the scan root against every predicate.
    pub fn matches(&self, relative: &Path) -> bool {
        let Some(name) = relative.file_name() else {
            return false;
        };
        let name = self.fold(name.to_string_lossy());
        if !self.suffixes.is_empty() && !self.suffixes.iter().any(|s| name.ends_with(&*self.fold(s.into()))) {
            return false;
        }
        if !self.prefixes.is_empty() && !self.prefixes.iter().any(|p| name.starts_with(&*self.fold(p.into()))) {
            return false;
        }

        let haystack = match self.contains_scope {
            MatchScope::Filename => name,
            MatchScope::RelativePath => self.fold(relative.to_string_lossy()),
        };
        let found = |needle: &String| haystack.contains(&*self.fold(needle.into()));
        if !self.contains_all.iter().all(found) {
            return false;
        }
        if !self.contains_any.is_empty() && !self.contains_any.iter().any(found) {
            return false;
        }
        if !self.not_contains_all.is_empty() && self.not_contains_all.iter().all(found) {
            return false;
        }
        !self.not_contains_any.iter().any(found)
    }

    fn fold<'a>(&self, value: Cow<'a, str>) -> Cow<'a, str> {
        match self.case_sensitive {
            true => value,
            false => Cow::Owned(value.to_lowercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fmri_nback_subject_3_session_2.nii.gz", true)]
    #[case("subject_1/fmri_nback.nii.gz", true)]
    #[case("subject_4.txt", false)]
    #[case("fmri_nback.nii", false)]
    #[case("fmri_nback/other.nii.gz", false)]
    fn test_suffix_and_prefix(#[case] path: &str, #[case] expected: bool) {
        let filter = FilterSpec::default().with_suffix(".nii.gz").with_prefix("fmri_nback");
        assert_eq!(filter.matches(Path::new(path)), expected);
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = FilterSpec::default();
        assert!(filter.matches(Path::new("a/b/c.txt")));
        assert!(filter.matches(Path::new(".hidden")));
    }

    #[test]
    fn test_any_of_suffixes() {
        let filter = FilterSpec::default().with_suffix(".nii").with_suffix(".nii.gz");
        assert!(filter.matches(Path::new("a.nii")));
        assert!(filter.matches(Path::new("a.nii.gz")));
        assert!(!filter.matches(Path::new("a.json")));
    }

    #[rstest]
    #[case(true, false)]
    #[case(false, true)]
    fn test_case_sensitivity(#[case] case_sensitive: bool, #[case] expected: bool) {
        let filter = FilterSpec::default().with_suffix(".NII").containing("T1W").case_sensitive(case_sensitive);
        assert_eq!(filter.matches(Path::new("sub-01_T1w.nii")), expected);
    }

    #[test]
    fn test_contains_scope() {
        let filter = FilterSpec::default().containing("anat");
        assert!(!filter.matches(Path::new("sub-01/anat/T1w.nii")));
        let filter = filter.scope(MatchScope::RelativePath);
        assert!(filter.matches(Path::new("sub-01/anat/T1w.nii")));
        assert!(!filter.matches(Path::new("sub-01/func/bold.nii")));
    }

    #[rstest]
    #[case("task-rest_bold.nii", true)]
    #[case("task-nback_bold.nii", true)]
    #[case("T1w.nii", false)]
    fn test_contains_any(#[case] name: &str, #[case] expected: bool) {
        let filter = FilterSpec::default().containing_any(["rest", "nback"]);
        assert_eq!(filter.matches(Path::new(name)), expected);
    }

    #[rstest]
    #[case("sub-01_run-1_echo-2.nii", false)]
    #[case("sub-01_run-1.nii", true)]
    #[case("sub-01_echo-2.nii", true)]
    fn test_not_contains_all(#[case] name: &str, #[case] expected: bool) {
        let filter = FilterSpec::default().not_containing_all(["run-", "echo-"]);
        assert_eq!(filter.matches(Path::new(name)), expected);
    }

    #[rstest]
    #[case("sub-01_T1w.nii", true)]
    #[case("sub-01_T1w_defaced.nii", false)]
    #[case("sub-01_T1w_mask.nii", false)]
    fn test_not_contains_any(#[case] name: &str, #[case] expected: bool) {
        let filter = FilterSpec::default().not_containing("defaced").not_containing("mask");
        assert_eq!(filter.matches(Path::new(name)), expected);
    }
}
