//! Fake connection configuration.
//!
//! Loaded from a `fakedb.toml` (or any TOML string); every key is optional:
//!
//! ```toml
//! connection_string = "Server=fake;Database=orders"
//! database = "orders"
//! data_source = "fake"
//! server_version = "16.2"
//! command_timeout = 30
//! ```

use crate::error::{FakeDbError, FakeDbResult};
use serde::Deserialize;
use std::path::Path;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "fakedb.toml";

/// Default command timeout in seconds.
pub const DEFAULT_COMMAND_TIMEOUT: u32 = 30;

/// Properties reported by the fake connection and its commands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FakeDbConfig {
    /// Reported verbatim by `connection_string()`.
    pub connection_string: String,

    /// Initial database name; `change_database` replaces it.
    pub database: String,

    pub data_source: String,

    pub server_version: String,

    /// Timeout in seconds given to every new command.
    pub command_timeout: u32,
}

impl Default for FakeDbConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            database: "fakedb".to_string(),
            data_source: "fake".to_string(),
            server_version: "0.0.0".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl FakeDbConfig {
    /// Create a new configuration builder
    pub fn builder() -> FakeDbConfigBuilder {
        FakeDbConfigBuilder::default()
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(toml_str: &str) -> FakeDbResult<Self> {
        toml::from_str(toml_str).map_err(|e| FakeDbError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> FakeDbResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded fake connection config from {}", path.display());
        Ok(config)
    }
}

/// Builder for FakeDbConfig
#[derive(Debug, Default)]
pub struct FakeDbConfigBuilder {
    config: FakeDbConfig,
}

impl FakeDbConfigBuilder {
    pub fn connection_string(mut self, value: impl Into<String>) -> Self {
        self.config.connection_string = value.into();
        self
    }

    pub fn database(mut self, value: impl Into<String>) -> Self {
        self.config.database = value.into();
        self
    }

    pub fn data_source(mut self, value: impl Into<String>) -> Self {
        self.config.data_source = value.into();
        self
    }

    pub fn server_version(mut self, value: impl Into<String>) -> Self {
        self.config.server_version = value.into();
        self
    }

    /// Set the default command timeout in seconds
    pub fn command_timeout(mut self, seconds: u32) -> Self {
        self.config.command_timeout = seconds;
        self
    }

    pub fn build(self) -> FakeDbConfig {
        self.config
    }
}
