//! Arrival Configuration
//!
//! TOML-based configuration loading with defaults taken from long-running
//! deployments. Only the sections a command needs have to be present.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use arrival_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[sensor]\ntype = \"path\"\nbucket = \"b\"").unwrap();
//! ```
//!
//! # Example
//!
//! ```toml
//! debug = false
//!
//! [log]
//! level = "info"
//!
//! [sensor]
//! type = "clock"
//! cron_constraint = "0 0 * * *"
//! delay_seconds = 3600
//!
//! [source]
//! type = "postgres"
//! database = "shop"
//! table = "orders"
//!
//! [extract]
//! batch_rows = 100000
//! compression = "gzip"
//! ```

mod credentials;
mod error;
mod extract;
mod logging;
mod sensors;
mod sources;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use credentials::Credentials;
pub use error::{ConfigError, Result};
pub use extract::{Compression, ExtractConfig, StorageConfig, WarehouseConfig};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use sensors::{
    ClockSensorConfig, PathSensorConfig, SensorConfig, StateSensorConfig, SuccessCriteriaConfig,
};
pub use sources::{PostgresSourceConfig, SalesforceSourceConfig, SourceConfig, TableDetails};
pub use validation::{KNOWN_SUCCESS_CRITERIA, is_known_success_criteria};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional; commands check for the ones they need.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Verbose tracing of sensing and extraction decisions
    pub debug: bool,

    /// Logging configuration
    pub log: LogConfig,

    /// Arrival sensor
    pub sensor: Option<SensorConfig>,

    /// Row source for extraction
    pub source: Option<SourceConfig>,

    /// Extraction loop settings
    pub extract: ExtractConfig,

    /// Warehouse client settings
    pub warehouse: WarehouseConfig,

    /// Object-store client settings
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// The `[sensor]` section, required by sensing commands
    pub fn require_sensor(&self) -> Result<&SensorConfig> {
        self.sensor
            .as_ref()
            .ok_or(ConfigError::MissingSection("sensor"))
    }

    /// The `[source]` section, required by extraction commands
    pub fn require_source(&self) -> Result<&SourceConfig> {
        self.source
            .as_ref()
            .ok_or(ConfigError::MissingSection("source"))
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
