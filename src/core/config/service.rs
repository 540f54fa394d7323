use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::paths::AppPaths;
use super::settings::{AppConfig, DEFAULT_PORT};
use super::validation::validate_config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("ZIZ_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads `config.yml`, falling back to defaults when it does not exist.
    ///
    /// Relative paths in the `paths` and `logging` sections are resolved
    /// against the project root before the config is returned.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        let mut config = load_yaml_file(&self.config_path())?;
        validate_config(&config)?;

        config.paths.index_dir = self.paths.resolve(&config.paths.index_dir);
        config.paths.static_dir = self.paths.resolve(&config.paths.static_dir);
        if let Some(dir) = config.logging.dir.take() {
            config.logging.dir = Some(self.paths.resolve(&dir));
        }

        Ok(config)
    }
}

/// Bind port from `PORT`, defaulting to 8080 when unset or unparsable.
pub fn port_from_env() -> u16 {
    parse_port(env::var("PORT").ok().as_deref())
}

fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|val| val.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn load_yaml_file(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    serde_yaml::from_str::<AppConfig>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
