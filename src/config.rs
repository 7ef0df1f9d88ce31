//! Connector configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{RdfXaError, Result};

pub const ENV_DATA: &str = "RDFXA_DATA";
pub const ENV_REPOSITORY: &str = "RDFXA_REPOSITORY";
pub const ENV_WORKING_REPOSITORY: &str = "RDFXA_WORKING_REPOSITORY";
pub const ENV_DERIVE_TRANSFORMATIONS: &str = "RDFXA_DERIVE_TRANSFORMATIONS";
pub const ENV_LOCK_TIMEOUT_MS: &str = "RDFXA_LOCK_TIMEOUT_MS";

/// Settings of a [`Connector`](crate::connector::Connector).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Directory holding the repositories. `None` keeps them in memory.
    pub data_dir: Option<PathBuf>,
    /// Name of the main repository.
    pub repository_name: String,
    /// Name of the working repository used for materialization.
    pub working_repository_name: String,
    /// Whether closing a connection that registered a service derives its
    /// transformations.
    pub derive_transformations: bool,
    /// How long to wait for the repository lock. `None` waits forever.
    pub lock_timeout_ms: Option<u64>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            repository_name: "main".to_string(),
            working_repository_name: "working".to_string(),
            derive_transformations: true,
            lock_timeout_ms: None,
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(RdfXaError::Config(format!("{} is not a boolean: {}", name, other))),
    }
}

impl ConnectorConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RdfXaError::Config(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `RDFXA_DATA`: repository directory (default: in memory)
    /// - `RDFXA_REPOSITORY`: main repository name (default: main)
    /// - `RDFXA_WORKING_REPOSITORY`: working repository name (default: working)
    /// - `RDFXA_DERIVE_TRANSFORMATIONS`: derive service transformations (default: true)
    /// - `RDFXA_LOCK_TIMEOUT_MS`: lock wait limit in milliseconds (default: none)
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Like [`ConnectorConfig::from_env`], reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_DATA).filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(name) = lookup(ENV_REPOSITORY) {
            config.repository_name = name;
        }
        if let Some(name) = lookup(ENV_WORKING_REPOSITORY) {
            config.working_repository_name = name;
        }
        if let Some(flag) = lookup(ENV_DERIVE_TRANSFORMATIONS) {
            config.derive_transformations = parse_bool(ENV_DERIVE_TRANSFORMATIONS, &flag)?;
        }
        if let Some(ms) = lookup(ENV_LOCK_TIMEOUT_MS) {
            let ms = ms.trim().parse::<u64>().map_err(|e| {
                RdfXaError::Config(format!("{} is not a number of milliseconds: {}", ENV_LOCK_TIMEOUT_MS, e))
            })?;
            config.lock_timeout_ms = Some(ms);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    /// Directory of the main repository, if on disk.
    pub fn repository_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(&self.repository_name))
    }

    /// Directory of the working repository, if on disk.
    pub fn working_repository_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|d| d.join(&self.working_repository_name))
    }

    pub fn validate(&self) -> Result<()> {
        if self.repository_name.trim().is_empty() {
            return Err(RdfXaError::Config("repository name is empty".into()));
        }
        if self.working_repository_name.trim().is_empty() {
            return Err(RdfXaError::Config("working repository name is empty".into()));
        }
        if self.repository_name == self.working_repository_name {
            return Err(RdfXaError::Config(format!(
                "main and working repository are both named `{}`",
                self.repository_name
            )));
        }
        if let Some(dir) = &self.data_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(RdfXaError::Config(format!(
                    "{} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}
