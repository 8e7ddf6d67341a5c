//! # Configuration Module
//!
//! Handles loading and managing apicheck configuration from `apicheck.toml`.
//! A configuration holds one or more projects, each describing a target
//! environment: its base URL, credentials and execution settings.
//!
//! ## Config File Location
//!
//! 1. If `APICHECK_CONFIG` environment variable is set, load from that path
//! 2. Otherwise, load from `apicheck.toml` in the current directory
//!
//! ## Configuration Structure
//!
//! ```toml
//! [[projects]]
//! name = "dummyjson"
//! base_url = "https://dummyjson.com"
//! timeout = "10s"
//! concurrency = 4
//! scenario_ignore = ["add_product"]
//! valid_token = "..."
//! ```
//!
//! Any key other than `name`, `timeout`, `concurrency` and `scenario_ignore`
//! is free-form data accessible through [`ProjectConfig::get_str`] and
//! friends. Credentials belong here (or in the environment), never in code.
//!
//! ## Environment Overrides
//!
//! - `APICHECK_<KEY>=value` sets `key` in every project.
//! - `APICHECK_<PROJECT>_<KEY>=value` sets `key` in project `<project>` only.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{de::DeserializeOwned, Deserialize};
use std::{collections::HashMap, io::Read, path::Path, sync::Arc, time::Duration};
pub use toml::Value as TomlValue;
use tracing::*;

use crate::{Error, Result};

/// Environment variable name for specifying the config file path.
const CONFIG_ENV: &str = "APICHECK_CONFIG";

const ENV_PREFIX: &str = "APICHECK";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static CONFIG: Lazy<Result<Config>> = Lazy::new(|| {
    let _ = dotenv::dotenv();
    Config::load()
});

/// Configuration loaded once per process from `apicheck.toml`.
pub fn get_apicheck_config() -> Result<&'static Config> {
    CONFIG
        .as_ref()
        .map_err(|e| Error::LoadError(e.to_string()))
}

/// apicheck's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub projects: Vec<Arc<ProjectConfig>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            projects: vec![Arc::new(ProjectConfig {
                name: "default".to_string(),
                ..Default::default()
            })],
        }
    }
}

impl Config {
    /// Load configuration from path. A missing file yields the default config.
    pub fn load_from(path: &Path) -> Result<Config> {
        let Ok(mut file) = std::fs::File::open(path) else {
            debug!("{path:?} not found, using default configuration");
            let mut cfg = Config::default();
            cfg.load_env();
            return Ok(cfg);
        };

        let mut buf = String::new();
        file.read_to_string(&mut buf)
            .map_err(|e| Error::LoadError(e.to_string()))?;

        #[derive(Deserialize)]
        struct ConfigHelper {
            #[serde(default)]
            projects: Vec<ProjectConfig>,
        }

        let helper: ConfigHelper = toml::from_str(&buf).map_err(|e| {
            Error::LoadError(format!("failed to deserialize {path:?} into Config: {e}"))
        })?;

        let mut cfg = if helper.projects.is_empty() {
            Config::default()
        } else {
            Config {
                projects: helper.projects.into_iter().map(Arc::new).collect(),
            }
        };

        debug!("{path:?} was successfully loaded: {cfg:#?}");

        cfg.load_env();

        Ok(cfg)
    }

    fn load() -> Result<Config> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let path = Path::new(&path);

                if path.extension().is_none_or(|ext| ext != "toml")
                    && !path.to_string_lossy().contains(std::path::MAIN_SEPARATOR)
                    && !path.to_string_lossy().contains('/')
                {
                    return Err(Error::LoadError(format!(
                        "{CONFIG_ENV} should be a path to a config file, not a config value. \
                         Got: {path:?}. Use {ENV_PREFIX}_<KEY>=value for config values instead."
                    )));
                }

                if !path.exists() {
                    return Err(Error::LoadError(format!(
                        "Config file specified by {CONFIG_ENV} not found: {path:?}"
                    )));
                }

                debug!("Loading config from {CONFIG_ENV}={path:?}");
                Config::load_from(path)
            }
            Err(_) => Config::load_from(Path::new("apicheck.toml")),
        }
    }

    fn load_env(&mut self) {
        let global_prefix = format!("{ENV_PREFIX}_");
        let project_prefixes: Vec<_> = self
            .projects
            .iter()
            .map(|p| project_prefix(&p.name))
            .collect();

        let global_vars: HashMap<_, _> = std::env::vars()
            .filter_map(|(k, v)| {
                if k == CONFIG_ENV {
                    return None;
                }
                if project_prefixes.iter().any(|pp| k.starts_with(pp)) {
                    return None;
                }
                let key = k.strip_prefix(&global_prefix)?;
                Some((key.to_lowercase(), TomlValue::String(v)))
            })
            .collect();

        for project_arc in &mut self.projects {
            let prefix = project_prefix(&project_arc.name);
            let vars: HashMap<_, _> = std::env::vars()
                .filter_map(|(k, v)| {
                    let key = k.strip_prefix(&prefix)?;
                    Some((key.to_lowercase(), TomlValue::String(v)))
                })
                .collect();
            let project = Arc::make_mut(project_arc);
            project.data.extend(global_vars.clone());
            project.data.extend(vars);
        }

        trace!("configuration after env overrides: {self:#?}");
    }

    pub fn project(&self, name: &str) -> Option<&Arc<ProjectConfig>> {
        self.projects.iter().find(|p| p.name == name)
    }
}

/// Env prefix of a project's overrides, e.g. `APICHECK_MY_API_` for `my-api`.
pub fn project_prefix(name: &str) -> String {
    format!("{ENV_PREFIX}_{}_", name.to_uppercase().replace('-', "_"))
}

/// One target environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Per-request timeout. Defaults to [`DEFAULT_TIMEOUT`].
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Maximum number of scenarios in flight. Unlimited when unset.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Scenario names to skip in this project.
    #[serde(default)]
    pub scenario_ignore: Vec<String>,
    /// Keys and values specified by user.
    #[serde(flatten)]
    pub data: HashMap<String, TomlValue>,
}

impl ProjectConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> Result<&str> {
        self.get_str("base_url")
    }

    pub fn get(&self, key: impl AsRef<str>) -> Result<&TomlValue> {
        let key = key.as_ref();
        self.data
            .get(key)
            .ok_or_else(|| Error::ValueNotFound(key.to_string()))
    }

    pub fn get_str(&self, key: impl AsRef<str>) -> Result<&str> {
        let key = key.as_ref();
        self.get(key)?
            .as_str()
            .ok_or_else(|| Error::ValueNotFound(key.to_string()))
    }

    pub fn get_int(&self, key: impl AsRef<str>) -> Result<i64> {
        match self.get(key.as_ref())? {
            TomlValue::Integer(i) => Ok(*i),
            _ => self
                .get_str(key)?
                .parse()
                .map_err(|e| Error::ValueError(eyre::Error::from(e))),
        }
    }

    pub fn get_float(&self, key: impl AsRef<str>) -> Result<f64> {
        match self.get(key.as_ref())? {
            TomlValue::Float(f) => Ok(*f),
            TomlValue::Integer(i) => Ok(*i as f64),
            _ => self
                .get_str(key)?
                .parse()
                .map_err(|e| Error::ValueError(eyre::Error::from(e))),
        }
    }

    pub fn get_bool(&self, key: impl AsRef<str>) -> Result<bool> {
        match self.get(key.as_ref())? {
            TomlValue::Boolean(b) => Ok(*b),
            _ => self
                .get_str(key)?
                .parse()
                .map_err(|e| Error::ValueError(eyre::Error::from(e))),
        }
    }

    pub fn get_datetime(&self, key: impl AsRef<str>) -> Result<DateTime<Utc>> {
        let key = key.as_ref();
        let raw = match self.get(key)? {
            TomlValue::Datetime(dt) => dt.to_string(),
            _ => self.get_str(key)?.to_string(),
        };
        raw.parse::<DateTime<Utc>>()
            .map_err(|e| Error::ValueError(eyre::Error::from(e)))
    }

    pub fn get_array<T: DeserializeOwned>(&self, key: impl AsRef<str>) -> Result<Vec<T>> {
        match self.get(key.as_ref())? {
            TomlValue::Array(array) => TomlValue::Array(array.clone())
                .try_into()
                .map_err(|e: toml::de::Error| Error::ValueError(eyre::Error::from(e))),
            _ => serde_json::from_str(self.get_str(key)?)
                .map_err(|e| Error::ValueError(eyre::Error::from(e))),
        }
    }

    pub fn get_object<T: DeserializeOwned>(&self, key: impl AsRef<str>) -> Result<T> {
        match self.get(key.as_ref())? {
            TomlValue::Table(table) => TomlValue::Table(table.clone())
                .try_into()
                .map_err(|e: toml::de::Error| Error::ValueError(eyre::Error::from(e))),
            _ => serde_json::from_str(self.get_str(key)?)
                .map_err(|e| Error::ValueError(eyre::Error::from(e))),
        }
    }
}
