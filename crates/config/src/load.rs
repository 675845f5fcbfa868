use crate::Config;
use crate::error::{Error, ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const ENV_PREFIX: &str = "NISUPPLY_";

/// Builds a [`Config`] from layered sources, lowest priority first:
///
/// 1. built-in defaults,
/// 2. the user config file (`config.toml` in the platform config directory),
///    if it exists,
/// 3. an explicit config file, chosen format by extension,
/// 4. environment variables with the `NISUPPLY_` prefix, nested keys split
///    on `__` (`NISUPPLY_TRANSFER__OVERWRITE=true`).
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    user_file: Option<PathBuf>,
    file: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self { user_file: user_config_path(), file: None, env_prefix: ENV_PREFIX.to_string() }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_file(mut self, path: Option<PathBuf>) -> Self {
        self.user_file = path;
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// The merged figment, before extraction.
    ///
    /// # Errors
    /// - [`ErrorKind::NotFound`] if the explicit file does not exist.
    /// - [`ErrorKind::UnsupportedFormat`] for an unknown file extension.
    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user_file) = &self.user_file
            && user_file.is_file()
        {
            tracing::debug!(path = %user_file.display(), "Merging user config");
            figment = figment.merge(Toml::file_exact(user_file));
        }
        if let Some(file) = &self.file {
            if !file.is_file() {
                exn::bail!(ErrorKind::NotFound(file.clone()));
            }
            tracing::debug!(path = %file.display(), "Merging config file");
            figment = merge_file(figment, file)?;
        }
        Ok(figment.merge(Env::prefixed(&self.env_prefix).split("__")))
    }

    #[instrument(skip(self), fields(file = ?self.file))]
    pub fn load(&self) -> Result<Config> {
        self.figment()?.extract().or_raise(|| ErrorKind::Invalid)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("toml") => Ok(figment.merge(Toml::file_exact(path))),
        Some("yaml" | "yml") => Ok(figment.merge(Yaml::file_exact(path))),
        Some("json") => Ok(figment.merge(Json::file_exact(path))),
        _ => Err(Error::from(ErrorKind::UnsupportedFormat(path.to_path_buf()))),
    }
}

/// `config.toml` in the platform's config directory for nisupply.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nisupply").map(|dirs| dirs.config_dir().join("config.toml"))
}
