use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub crm: CrmConfig,
}

/// How the server introduces itself to MCP clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrmConfig {
    /// Prefix for resource URIs, e.g. `crm://` or `https://crm.example.com/api/`
    pub base_uri: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid server name: {0:?} (cannot be empty)")]
    InvalidName(String),
    #[error("Invalid server version: {0:?} (cannot be empty)")]
    InvalidVersion(String),
    #[error("Invalid CRM base URI: {0}")]
    InvalidBaseUri(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "enterprise-crm-server".to_string(),
                version: "1.0.0".to_string(),
                instructions: Some(
                    "Enterprise CRM access: query customers, open support tickets, and read the \
                     customer and open-ticket listings."
                        .to_string(),
                ),
            },
            crm: CrmConfig {
                base_uri: "crm://".to_string(),
            },
        }
    }
}

impl Config {
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".crm-mcp"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("crm-mcp"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when no file
    /// exists there
    #[inline]
    pub fn load() -> Result<Self> {
        let config_path =
            Self::config_file_path().context("Failed to determine config file path")?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit path. The file must exist.
    #[inline]
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.crm.validate()
    }
}

impl ServerConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }

        if self.version.trim().is_empty() {
            return Err(ConfigError::InvalidVersion(self.version.clone()));
        }

        Ok(())
    }
}

impl CrmConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url().map(|_| ())
    }

    /// Parsed form of [`Self::base_uri`]
    #[inline]
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_uri)
            .map_err(|e| ConfigError::InvalidBaseUri(format!("{}: {}", self.base_uri, e)))?;

        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUri(format!(
                "{}: cannot be used as a base",
                self.base_uri
            )));
        }

        // Resource names are appended to the serialized base, so a trailing
        // path segment would be glued onto them.
        if !url.as_str().ends_with('/') {
            return Err(ConfigError::InvalidBaseUri(format!(
                "{}: path must end with '/'",
                self.base_uri
            )));
        }

        Ok(url)
    }
}
