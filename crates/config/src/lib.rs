//! Configuration for nisupply pipeline runs.
//!
//! [`ConfigLoader`] merges built-in defaults, the user config file, an
//! explicit config file and `NISUPPLY_*` environment variables into a
//! [`Config`], which converts into the library's scan, extraction, template
//! and transfer settings.

pub mod error;
mod load;
mod model;

pub use self::load::{ConfigLoader, ENV_PREFIX, user_config_path};
pub use self::model::{Config, FieldConfig, FilterConfig, Group, Mode, RankConfig, ScanConfig, Scope, Target, TransferConfig};
