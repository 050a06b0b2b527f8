//! Fetcher configuration, persisted as TOML.
//!
//! Only the municipality IRI, its label, and the year influence what a
//! refresh computes. The remaining fields tune the endpoint, the query
//! bounds, and the refresh period.

use std::path::Path;
use std::time::Duration;

use chrono::Datelike;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading, saving, or validating a configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(tariffs::config::read),
        help("Create one with `swiss-tariffs init --uri <municipality IRI>`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(tariffs::config::parse),
        help("Check the TOML syntax; `municipality_uri` is the only required key.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(tariffs::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config value for `{field}`: {message}")]
    #[diagnostic(
        code(tariffs::config::invalid),
        help("Fix the value in the config file or override it on the command line.")
    )]
    Invalid { field: &'static str, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Default SPARQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://lindas.admin.ch/query";

/// Default named graph holding the ElCom tariff cube.
pub const DEFAULT_NAMED_GRAPH: &str = "https://lindas.admin.ch/elcom/electricityprice";

/// Persisted configuration of one tariff feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffConfig {
    /// IRI of the selected municipality.
    pub municipality_uri: String,
    /// Display label. Cosmetic only.
    #[serde(default)]
    pub municipality_label: String,
    /// Tariff year.
    #[serde(default = "default_year")]
    pub year: i32,
    /// Refresh period in hours (values below 1 are treated as 1).
    #[serde(default = "default_update_interval_hours")]
    pub update_interval_hours: u64,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_named_graph")]
    pub named_graph: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Triples sampled for predicate discovery.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    /// Upper bound on fetched observation triples.
    #[serde(default = "default_observation_limit")]
    pub observation_limit: usize,
    /// Upper bound on municipality search matches.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_year() -> i32 {
    chrono::Utc::now().year()
}
fn default_update_interval_hours() -> u64 {
    24
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_named_graph() -> String {
    DEFAULT_NAMED_GRAPH.into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_sample_limit() -> usize {
    2000
}
fn default_observation_limit() -> usize {
    200_000
}
fn default_search_limit() -> usize {
    10
}

impl TariffConfig {
    /// A config for one municipality and year, everything else at defaults.
    pub fn new(
        municipality_uri: impl Into<String>,
        municipality_label: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            municipality_uri: municipality_uri.into(),
            municipality_label: municipality_label.into(),
            year,
            update_interval_hours: default_update_interval_hours(),
            endpoint: default_endpoint(),
            named_graph: default_named_graph(),
            timeout_secs: default_timeout_secs(),
            sample_limit: default_sample_limit(),
            observation_limit: default_observation_limit(),
            search_limit: default_search_limit(),
        }
    }

    /// Refresh period, never shorter than one hour.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_hours.max(1).saturating_mul(3600))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the values that end up inside generated queries.
    pub fn validate(&self) -> ConfigResult<()> {
        check_iri("municipality_uri", &self.municipality_uri)?;
        self.validate_source()
    }

    /// Check only the endpoint, graph, and limits.
    ///
    /// Enough for municipality search and discovery, which do not need a
    /// municipality to be selected yet.
    pub fn validate_source(&self) -> ConfigResult<()> {
        check_iri("named_graph", &self.named_graph)?;
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "endpoint",
                message: "must not be empty".into(),
            });
        }
        for (field, value) in [
            ("sample_limit", self.sample_limit),
            ("observation_limit", self.observation_limit),
            ("search_limit", self.search_limit),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "must be greater than zero".into(),
                });
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Reject values that cannot appear between `<` and `>` in a query.
fn check_iri(field: &'static str, iri: &str) -> ConfigResult<()> {
    if iri.is_empty() {
        return Err(ConfigError::Invalid {
            field,
            message: "must not be empty".into(),
        });
    }
    if let Some(bad) = iri
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(*c))
    {
        return Err(ConfigError::Invalid {
            field,
            message: format!("character {bad:?} is not allowed in an IRI"),
        });
    }
    Ok(())
}
