use graphbulk::{Destination, WriteMode};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_DATABASE: &str = "graphdb";
pub const DEFAULT_CONTAINER: &str = "graph";

/// Settings read from `config.toml`; every value may be overridden on the command line.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    mode: Option<WriteMode>,
}

impl CliConfig {
    /// Loads `explicit` (which must exist) or the default config file (which may not).
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let (path, data) = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Missing { path });
                }
                let data = read_file(&path)?;
                (Some(path), data)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    let data = read_file(&path)?;
                    (Some(path), data)
                }
                other => (other, RawConfig::default()),
            },
        };
        let mode = match data.ingest.mode.as_deref() {
            Some(value) => Some(
                value
                    .parse::<WriteMode>()
                    .map_err(|_| ConfigError::InvalidMode {
                        value: value.to_string(),
                    })?,
            ),
            None => None,
        };
        if data.ingest.batch_size == Some(0) {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(Self { path, data, mode })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Destination from the file, falling back to the built-in names.
    pub fn destination(&self, database: Option<String>, container: Option<String>) -> Destination {
        Destination::new(
            database
                .or_else(|| self.data.destination.database.clone())
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            container
                .or_else(|| self.data.destination.container.clone())
                .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
        )
    }

    pub fn min_value(&self) -> Option<f64> {
        self.data.ingest.min_value
    }

    pub fn batch_size(&self) -> Option<usize> {
        self.data.ingest.batch_size
    }

    pub fn mode(&self) -> Option<WriteMode> {
        self.mode
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    destination: DestinationSection,
    #[serde(default)]
    ingest: IngestSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DestinationSection {
    database: Option<String>,
    container: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IngestSection {
    min_value: Option<f64>,
    batch_size: Option<usize>,
    mode: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config file {path} does not exist")]
    Missing { path: PathBuf },
    #[error("ingest mode '{value}' is invalid (expected create or upsert)")]
    InvalidMode { value: String },
    #[error("ingest batch_size must be at least 1")]
    InvalidBatchSize,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("graphbulk").join("config.toml"))
}
