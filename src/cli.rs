use clap::{Args, Parser, Subcommand};
use nisupply_config::{Config, FieldConfig, Group, Mode, RankConfig, Scope, Target};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(name = "nisupply", version, about = "Find, tabulate, rename and copy scientific data files", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan source directories, extract fields and print the table as CSV
    Scan(ScanArgs),
    /// Scan, extract, render destinations and transfer the files
    Run(RunArgs),
    /// Transfer files listed in a CSV table with filepath and destination_path columns
    Transfer(TransferArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write the table to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Destination template, e.g. "{dst}/sub-{subject}/sub-{subject}{file_extension}"
    #[arg(short, long)]
    pub template: Option<String>,

    /// Template constant (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub constants: Vec<KeyValue>,

    /// Drop records whose destination cannot be rendered instead of failing
    #[arg(long)]
    pub drop_unresolved: bool,

    #[command(flatten)]
    pub transfer: TransferFlags,

    /// Render destinations and print the table without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Also save the rendered table to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    /// CSV table to transfer
    pub table: PathBuf,

    #[command(flatten)]
    pub transfer: TransferFlags,
}

/// Where to look and what to extract.
#[derive(Debug, Default, Args)]
pub struct InputArgs {
    /// Source directory (repeatable); replaces configured sources
    #[arg(short, long = "source", value_name = "DIR")]
    pub sources: Vec<PathBuf>,

    /// File name suffix; any of several matches
    #[arg(long = "suffix")]
    pub suffixes: Vec<String>,

    /// File name prefix; any of several matches
    #[arg(long = "prefix")]
    pub prefixes: Vec<String>,

    /// Substring that must appear (all of several)
    #[arg(long = "contains")]
    pub contains_all: Vec<String>,

    /// Substring of which at least one must appear
    #[arg(long = "contains-any")]
    pub contains_any: Vec<String>,

    /// Substring that must not appear
    #[arg(long = "exclude")]
    pub not_contains_any: Vec<String>,

    /// Directory name never descended into
    #[arg(long = "exclude-dir")]
    pub exclude_dirs: Vec<String>,

    /// Compare names case-insensitively
    #[arg(long)]
    pub ignore_case: bool,

    /// Test substrings against the path below the source, not just the file name
    #[arg(long)]
    pub match_path: bool,

    /// Follow symbolic links
    #[arg(long)]
    pub follow_links: bool,

    /// Keep files found under more than one source
    #[arg(long)]
    pub allow_duplicates: bool,

    /// Field to extract (repeatable), matched against the filepath
    #[arg(short, long = "field", value_name = "NAME[:GROUP]=REGEX")]
    pub fields: Vec<FieldArg>,

    /// Also extract the BIDS session, run, data_type and echo entities
    #[arg(long)]
    pub bids: bool,

    /// Drop records where this field is null (repeatable)
    #[arg(long = "require", value_name = "FIELD")]
    pub require: Vec<String>,

    /// Number the distinct ORDER_BY values within each GROUP_BY value, e.g.
    /// `t=subject:session` for timepoints (repeatable)
    #[arg(long = "rank", value_name = "NAME=GROUP_BY:ORDER_BY")]
    pub ranks: Vec<RankArg>,
}

#[derive(Debug, Default, Args)]
pub struct TransferFlags {
    /// Move files instead of copying them
    #[arg(long = "move")]
    pub move_files: bool,

    /// Replace existing destination files
    #[arg(long)]
    pub overwrite: bool,

    /// Decompress .gz and .bz2 files after transfer
    #[arg(long)]
    pub decompress: bool,

    /// Stop at the first failed transfer
    #[arg(long)]
    pub fail_fast: bool,
}

/// `NAME[:GROUP]=REGEX`. A numeric group is an index, anything else a group
/// name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldArg {
    pub name: String,
    pub field: FieldConfig,
}

impl FromStr for FieldArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, pattern) = s.split_once('=').ok_or_else(|| format!("expected NAME[:GROUP]=REGEX, got `{s}`"))?;
        let (name, group) = match head.split_once(':') {
            Some((name, group)) => match group.parse::<usize>() {
                Ok(index) => (name, Group::Index(index)),
                Err(_) => (name, Group::Name(group.to_string())),
            },
            None => (head, Group::default()),
        };
        if name.is_empty() || pattern.is_empty() {
            return Err(format!("expected NAME[:GROUP]=REGEX, got `{s}`"));
        }
        let field = FieldConfig { pattern: pattern.to_string(), group, target: Target::Filepath };
        Ok(Self { name: name.to_string(), field })
    }
}

/// `NAME=GROUP_BY:ORDER_BY`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankArg {
    pub name: String,
    pub rank: RankConfig,
}

impl FromStr for RankArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("expected NAME=GROUP_BY:ORDER_BY, got `{s}`");
        let (name, columns) = s.split_once('=').ok_or_else(invalid)?;
        let (group_by, order_by) = columns.split_once(':').ok_or_else(invalid)?;
        if [name, group_by, order_by].iter().any(|part| part.is_empty()) {
            return Err(invalid());
        }
        let rank = RankConfig { group_by: group_by.to_string(), order_by: order_by.to_string() };
        Ok(Self { name: name.to_string(), rank })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl FromStr for KeyValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self { key: key.to_string(), value: value.to_string() }),
            _ => Err(format!("expected KEY=VALUE, got `{s}`")),
        }
    }
}

/// Replaces a configured list only when the flag was given.
fn replace<T: Clone>(target: &mut Vec<T>, values: &[T]) {
    if !values.is_empty() {
        *target = values.to_vec();
    }
}

impl InputArgs {
    /// Layers the command-line flags over the loaded configuration. Lists
    /// given on the command line replace configured ones; switches only turn
    /// options on; fields are added to (or replace same-named) configured
    /// fields.
    pub fn apply(&self, config: &mut Config) {
        replace(&mut config.sources, &self.sources);
        replace(&mut config.filter.suffixes, &self.suffixes);
        replace(&mut config.filter.prefixes, &self.prefixes);
        replace(&mut config.filter.contains_all, &self.contains_all);
        replace(&mut config.filter.contains_any, &self.contains_any);
        replace(&mut config.filter.not_contains_any, &self.not_contains_any);
        replace(&mut config.filter.exclude_dirs, &self.exclude_dirs);
        replace(&mut config.require, &self.require);
        if self.ignore_case {
            config.filter.case_sensitive = false;
        }
        if self.match_path {
            config.filter.contains_scope = Scope::RelativePath;
        }
        config.scan.follow_links |= self.follow_links;
        config.scan.allow_duplicates |= self.allow_duplicates;
        for arg in &self.fields {
            config.fields.insert(arg.name.clone(), arg.field.clone());
        }
        for arg in &self.ranks {
            config.ranks.insert(arg.name.clone(), arg.rank.clone());
        }
    }
}

impl TransferFlags {
    pub fn apply(&self, config: &mut Config) {
        if self.move_files {
            config.transfer.mode = Mode::Move;
        }
        config.transfer.overwrite |= self.overwrite;
        config.transfer.decompress |= self.decompress;
        config.transfer.fail_fast |= self.fail_fast;
    }
}

impl RunArgs {
    pub fn apply(&self, config: &mut Config) {
        self.input.apply(config);
        self.transfer.apply(config);
        if let Some(template) = &self.template {
            config.template = Some(template.clone());
        }
        for constant in &self.constants {
            config.constants.insert(constant.key.clone(), constant.value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("subject=subject_\\d+", "subject", Group::Index(0), "subject_\\d+")]
    #[case("subject:1=subject_(\\d+)", "subject", Group::Index(1), "subject_(\\d+)")]
    #[case("task:label=task-(?P<label>[a-z]+)", "task", Group::Name("label".into()), "task-(?P<label>[a-z]+)")]
    #[case("eq:0=a=b", "eq", Group::Index(0), "a=b")]
    fn test_field_arg(#[case] input: &str, #[case] name: &str, #[case] group: Group, #[case] pattern: &str) {
        let arg: FieldArg = input.parse().unwrap();
        assert_eq!(arg.name, name);
        assert_eq!(arg.field.group, group);
        assert_eq!(arg.field.pattern, pattern);
    }

    #[rstest]
    #[case("subject")]
    #[case("=regex")]
    #[case("subject=")]
    fn test_field_arg_invalid(#[case] input: &str) {
        assert!(input.parse::<FieldArg>().is_err());
    }

    #[test]
    fn test_rank_arg() {
        let arg: RankArg = "t=subject:session".parse().unwrap();
        assert_eq!(arg.name, "t");
        assert_eq!((arg.rank.group_by.as_str(), arg.rank.order_by.as_str()), ("subject", "session"));
        assert!("t=subject".parse::<RankArg>().is_err());
        assert!("t=:session".parse::<RankArg>().is_err());
    }

    #[test]
    fn test_key_value() {
        let kv: KeyValue = "dst=./out=x".parse().unwrap();
        assert_eq!((kv.key.as_str(), kv.value.as_str()), ("dst", "./out=x"));
        assert!("=x".parse::<KeyValue>().is_err());
        assert!("novalue".parse::<KeyValue>().is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "nisupply", "run", "-s", "raw", "--suffix", ".nii.gz", "--ignore-case", "--field", "subject:1=sub-(\\d+)",
            "--template", "{dst}/{subject}{file_extension}", "--set", "dst=out", "--move", "--fail-fast",
        ]);
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        let mut config = Config::default();
        config.sources = vec![PathBuf::from("configured")];
        config.filter.prefixes = vec!["kept".to_string()];
        args.apply(&mut config);
        assert_eq!(config.sources, vec![PathBuf::from("raw")]);
        assert_eq!(config.filter.suffixes, vec![".nii.gz".to_string()]);
        assert_eq!(config.filter.prefixes, vec!["kept".to_string()]);
        assert!(!config.filter.case_sensitive);
        assert_eq!(config.fields["subject"].group, Group::Index(1));
        assert_eq!(config.template.as_deref(), Some("{dst}/{subject}{file_extension}"));
        assert_eq!(config.constants["dst"], "out");
        assert_eq!(config.transfer.mode, Mode::Move);
        assert!(config.transfer.fail_fast);
        assert!(!config.transfer.overwrite);
    }
}
