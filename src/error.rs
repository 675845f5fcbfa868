use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Which stage of a command failed; the cause is attached as a child.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("no source directories given (use --source or `sources` in the config file)")]
    NoSources,
    #[display("no destination template given (use --template or `template` in the config file)")]
    NoTemplate,
    #[display("scan failed")]
    Scan,
    #[display("field extraction failed")]
    Extract,
    #[display("could not render destination paths")]
    Render,
    #[display("could not read table {}", _0.display())]
    ReadTable(#[error(not(source))] PathBuf),
    #[display("could not write table")]
    WriteTable,
    #[display("transfer failed")]
    Transfer,
}
