//! XDG-compliant path resolution for the tariff fetcher.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

const APP_DIR: &str = "swiss-tariffs";

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(tariffs::paths::no_home),
        help("Set the HOME environment variable, or pass --config with an explicit path.")
    )]
    NoHome,
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Directories used by the fetcher.
#[derive(Debug, Clone)]
pub struct TariffPaths {
    /// `$XDG_CONFIG_HOME/swiss-tariffs/`
    pub config_dir: PathBuf,
}

impl TariffPaths {
    /// Resolve directories from the environment with the standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let config_home = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .map_err(|_| PathError::NoHome)?,
        };

        Ok(Self {
            config_dir: config_home.join(APP_DIR),
        })
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}
