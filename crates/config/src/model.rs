use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nisupply_library::PathTemplate;
use nisupply_library::extract::{CaptureGroup, ExtractionSpec, FieldPattern, MatchTarget};
use nisupply_library::scan::{FilterSpec, MatchScope, ScanOptions};
use nisupply_library::transfer::{FailurePolicy, TransferMode, TransferOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a pipeline run needs.
///
/// ```toml
/// sources = ["./raw"]
/// template = "{dst}/sub-{subject}/sub-{subject}_task-nback{file_extension}"
/// require = ["subject"]
///
/// [filter]
/// suffixes = [".nii.gz"]
/// prefixes = ["fmri_nback"]
///
/// [fields.subject]
/// pattern = 'subject_(\d+)'
/// group = 1
///
/// [constants]
/// dst = "./bids"
///
/// [transfer]
/// mode = "copy"
/// decompress = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sources: Vec<PathBuf>,
    pub filter: FilterConfig,
    pub scan: ScanConfig,
    /// Output column name to extraction pattern.
    pub fields: BTreeMap<String, FieldConfig>,
    /// Fields that must have a value; records with nulls are dropped.
    pub require: Vec<String>,
    /// Output column name to a per-group ranking of another column.
    pub ranks: BTreeMap<String, RankConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub constants: BTreeMap<String, String>,
    pub transfer: TransferConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub suffixes: Vec<String>,
    pub prefixes: Vec<String>,
    pub contains_all: Vec<String>,
    pub contains_any: Vec<String>,
    pub not_contains_all: Vec<String>,
    pub not_contains_any: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub case_sensitive: bool,
    pub contains_scope: Scope,
}

impl Default for FilterConfig {
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
            contains_scope: Scope::Filename,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Filename,
    RelativePath,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub follow_links: bool,
    pub allow_duplicates: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub pattern: String,
    /// Capture group index or name; the whole match when omitted.
    #[serde(default)]
    pub group: Group,
    #[serde(default)]
    pub target: Target,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Group {
    Index(usize),
    Name(String),
}

impl Default for Group {
    fn default() -> Self {
        Self::Index(0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    #[default]
    Filepath,
    Filename,
}

/// Numbers the distinct `order_by` values within each `group_by` value,
/// e.g. timepoints from session labels per subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankConfig {
    pub group_by: String,
    pub order_by: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Copy,
    Move,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    pub mode: Mode,
    pub overwrite: bool,
    pub decompress: bool,
    pub fail_fast: bool,
}

impl Config {
    pub fn filter_spec(&self) -> FilterSpec {
        let filter = &self.filter;
        FilterSpec {
            suffixes: filter.suffixes.clone(),
            prefixes: filter.prefixes.clone(),
            contains_all: filter.contains_all.clone(),
            contains_any: filter.contains_any.clone(),
            not_contains_all: filter.not_contains_all.clone(),
            not_contains_any: filter.not_contains_any.clone(),
            exclude_dirs: filter.exclude_dirs.clone(),
            case_sensitive: filter.case_sensitive,
            contains_scope: match filter.contains_scope {
                Scope::Filename => MatchScope::Filename,
                Scope::RelativePath => MatchScope::RelativePath,
            },
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions { follow_links: self.scan.follow_links, allow_duplicates: self.scan.allow_duplicates }
    }

    /// Compiles every configured field, in name order.
    ///
    /// # Errors
    /// [`ErrorKind::Value`] naming the field, with the library's
    /// `InvalidPattern` attached.
    pub fn extraction_spec(&self) -> Result<ExtractionSpec> {
        self.fields
            .iter()
            .map(|(name, field)| field.compile(name).or_raise(|| ErrorKind::Value(format!("fields.{name}"))))
            .collect()
    }

    /// The parsed template, if one is configured.
    pub fn path_template(&self) -> Result<Option<PathTemplate>> {
        self.template
            .as_deref()
            .map(|template| template.parse::<PathTemplate>().or_raise(|| ErrorKind::Value("template".to_string())))
            .transpose()
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            mode: match self.transfer.mode {
                Mode::Copy => TransferMode::Copy,
                Mode::Move => TransferMode::Move,
            },
            overwrite: self.transfer.overwrite,
            decompress: self.transfer.decompress,
            policy: match self.transfer.fail_fast {
                true => FailurePolicy::FailFast,
                false => FailurePolicy::Accumulate,
            },
        }
    }
}

impl FieldConfig {
    pub fn compile(&self, name: &str) -> nisupply_library::error::Result<FieldPattern> {
        let group = match &self.group {
            Group::Index(index) => CaptureGroup::Index(*index),
            Group::Name(label) => CaptureGroup::Name(label.clone()),
        };
        let target = match self.target {
            Target::Filepath => MatchTarget::Filepath,
            Target::Filename => MatchTarget::Filename,
        };
        Ok(FieldPattern::new(name, &self.pattern)?.with_group(group)?.with_target(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_defaults() {
        let config = Config::default();
        assert_eq!(config.filter_spec(), FilterSpec::default());
        assert_eq!(config.scan_options(), ScanOptions::default());
        assert_eq!(config.transfer_options(), TransferOptions::default());
        assert!(config.extraction_spec().unwrap().is_empty());
        assert!(config.path_template().unwrap().is_none());
    }

    #[test]
    fn test_fields_compile_in_name_order() {
        let mut config = Config::default();
        config.fields.insert(
            "subject".to_string(),
            FieldConfig { pattern: r"subject_(\d+)".to_string(), group: Group::Index(1), target: Target::Filepath },
        );
        config.fields.insert(
            "run".to_string(),
            FieldConfig { pattern: r"run-(?P<n>\d+)".to_string(), group: Group::Name("n".into()), target: Target::Filename },
        );
        let spec = config.extraction_spec().unwrap();
        assert_eq!(spec.names().collect::<Vec<_>>(), vec!["run", "subject"]);
        assert_eq!(spec.fields()[0].extract_from("x_run-4.nii").as_deref(), Some("4"));
        assert_eq!(spec.fields()[1].extract_from("a/subject_7").as_deref(), Some("7"));
    }

    #[test]
    fn test_bad_field_is_named() {
        let mut config = Config::default();
        config.fields.insert(
            "subject".to_string(),
            FieldConfig { pattern: r"subject_(\d+)".to_string(), group: Group::Index(3), target: Target::Filepath },
        );
        let err = config.extraction_spec().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Value(key) if key == "fields.subject"));
    }

    #[test]
    fn test_bad_template() {
        let config = Config { template: Some("{unclosed".to_string()), ..Config::default() };
        let err = config.path_template().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Value(key) if key == "template"));
    }

    #[test]
    fn test_fail_fast_maps_to_policy() {
        let mut config = Config::default();
        config.transfer.fail_fast = true;
        config.transfer.mode = Mode::Move;
        let options = config.transfer_options();
        assert_eq!(options.policy, FailurePolicy::FailFast);
        assert_eq!(options.mode, TransferMode::Move);
    }
}
