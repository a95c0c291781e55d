//! Configuration validation
//!
//! Validates config consistency before any remote call:
//! - Required fields are present for the configured sensor and source
//! - URIs parse and use a known scheme
//! - Success criteria names are known
//! - Batch sizes are positive

use arrival_protocol::{INSTANCE_TS_FORMAT, StorageLocation, parse_instance_ts};

use crate::error::{ConfigError, Result};
use crate::sensors::{
    ClockSensorConfig, PathSensorConfig, SensorConfig, StateSensorConfig, SuccessCriteriaConfig,
};
use crate::sources::SourceConfig;
use crate::Config;

/// Success criteria accepted by name
pub const KNOWN_SUCCESS_CRITERIA: &[&str] = &[
    "success_file",
    "manifest_file",
    "manifest_file_with_replacement",
    "none",
];

/// Check whether a success criteria name is known
pub fn is_known_success_criteria(name: &str) -> bool {
    KNOWN_SUCCESS_CRITERIA.contains(&name)
}

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(sensor) = &config.sensor {
        validate_sensor(sensor, config)?;
    }
    if let Some(source) = &config.source {
        validate_source(source)?;
    }
    if config.extract.batch_rows == 0 {
        return Err(ConfigError::invalid_value(
            "extract",
            "extract",
            "batch_rows",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_sensor(sensor: &SensorConfig, config: &Config) -> Result<()> {
    match sensor {
        SensorConfig::Path(path) => validate_path_sensor(path),
        SensorConfig::Clock(clock) => validate_clock_sensor(clock, config),
        SensorConfig::State(state) => validate_state_sensor(state),
    }
}

fn validate_path_sensor(path: &PathSensorConfig) -> Result<()> {
    const NAME: &str = "path";

    if path.bucket.is_empty() {
        return Err(ConfigError::missing_field("sensor", NAME, "bucket"));
    }
    validate_location(NAME, "bucket", &path.uri())?;

    if path.instance_ts_format.is_empty() {
        return Err(ConfigError::missing_field("sensor", NAME, "instance_ts_format"));
    }

    if let SuccessCriteriaConfig::Named(name) = &path.success_criteria
        && !is_known_success_criteria(name)
    {
        return Err(ConfigError::invalid_value(
            "sensor",
            NAME,
            "success_criteria",
            format!(
                "unknown criteria '{name}', expected one of: {}",
                KNOWN_SUCCESS_CRITERIA.join(", ")
            ),
        ));
    }

    if let Some(min_ts) = &path.min_instance_ts
        && parse_instance_ts(min_ts, INSTANCE_TS_FORMAT).is_err()
    {
        return Err(ConfigError::invalid_value(
            "sensor",
            NAME,
            "min_instance_ts",
            format!("'{min_ts}' does not match {INSTANCE_TS_FORMAT}"),
        ));
    }

    if path.known_contents_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "sensor",
            NAME,
            "known_contents_capacity",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn validate_clock_sensor(clock: &ClockSensorConfig, config: &Config) -> Result<()> {
    const NAME: &str = "clock";

    if clock.cron_constraint.trim().is_empty() {
        return Err(ConfigError::missing_field("sensor", NAME, "cron_constraint"));
    }
    if clock.discover_tables && config.source.is_none() {
        return Err(ConfigError::invalid_value(
            "sensor",
            NAME,
            "discover_tables",
            "requires a [source] section to list tables from",
        ));
    }
    Ok(())
}

fn validate_state_sensor(state: &StateSensorConfig) -> Result<()> {
    const NAME: &str = "state";

    if state.state_path_to_monitor.is_empty() {
        return Err(ConfigError::missing_field("sensor", NAME, "state_path_to_monitor"));
    }
    validate_location(NAME, "state_path_to_monitor", &state.state_path_to_monitor)?;

    if state.mutable_data_path.is_empty() {
        return Err(ConfigError::missing_field("sensor", NAME, "mutable_data_path"));
    }
    if state.state_ts_key.is_empty() {
        return Err(ConfigError::missing_field("sensor", NAME, "state_ts_key"));
    }
    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<()> {
    match source {
        SourceConfig::Postgres(pg) => {
            if pg.database.is_empty() {
                return Err(ConfigError::missing_field("source", "postgres", "database"));
            }
            if pg.table.is_empty() {
                return Err(ConfigError::missing_field("source", "postgres", "table"));
            }
        }
        SourceConfig::Salesforce(sf) => {
            if sf.api_version.is_empty() {
                return Err(ConfigError::missing_field("source", "salesforce", "api_version"));
            }
        }
    }
    Ok(())
}

fn validate_location(name: &str, field: &'static str, uri: &str) -> Result<()> {
    uri.parse::<StorageLocation>()
        .map(|_| ())
        .map_err(|e| ConfigError::invalid_value("sensor", name, field, e.to_string()))
}
