//! Sensor configuration types
//!
//! One `[sensor]` section per config file, tagged by `type`:
//! - `path` - object-store subfolders, one instance per timestamped subfolder
//! - `clock` - ready periods of a cron constraint, optionally fanned out per table
//! - `state` - a single state object holding the latest timestamp

use arrival_protocol::Precision;
use serde::Deserialize;

/// Sensor configuration, selected by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorConfig {
    /// Object-store subfolder sensor
    Path(PathSensorConfig),
    /// Cron-driven sensor for table and API replication
    Clock(ClockSensorConfig),
    /// State-object monitor for mutable sources
    State(StateSensorConfig),
}

impl SensorConfig {
    /// Sensor type name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Clock(_) => "clock",
            Self::State(_) => "state",
        }
    }
}

/// Success criteria as written in config
///
/// Either a bare name (`"success_file"`, `"manifest_file"`,
/// `"manifest_file_with_replacement"`, `"none"`) or a table carrying a
/// threshold (`{ min_files = 2 }`, `{ min_age = 3600 }`). Names are checked
/// when the sensor is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SuccessCriteriaConfig {
    /// Named strategy without parameters
    Named(String),
    /// At least this many objects under the prefix
    MinFiles { min_files: usize },
    /// Every object at least this many seconds old
    MinAge { min_age: u64 },
}

impl Default for SuccessCriteriaConfig {
    fn default() -> Self {
        Self::Named("success_file".into())
    }
}

/// Path sensor configuration
///
/// # Example
///
/// ```toml
/// [sensor]
/// type = "path"
/// bucket = "landing"
/// prefix = "vendor/daily/"
/// instance_ts_format = "%Y%m%d"
/// success_criteria = "success_file"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSensorConfig {
    /// Object-store scheme (s3, gs, file, memory)
    /// Default: s3
    pub scheme: String,

    /// Bucket to monitor (required)
    pub bucket: String,

    /// Key prefix holding the timestamped subfolders
    /// Default: "" (bucket root)
    pub prefix: String,

    /// Only subfolders starting with this are considered; the rest of the
    /// name is the timestamp
    /// Default: ""
    pub subfolder_prefix: String,

    /// strftime format of the timestamp part
    /// Default: %Y%m%d
    pub instance_ts_format: String,

    /// Default: D
    pub instance_ts_precision: Precision,

    /// Instance prefix for created instances
    pub instance_prefix: Option<String>,

    /// Default: success_file
    pub success_criteria: SuccessCriteriaConfig,

    /// Subfolders older than this are ignored
    /// Default: unbounded
    pub max_instance_age_seconds: Option<u64>,

    /// Subfolders before this timestamp (`YYYY-MM-DD HH:MM:SS`) are ignored
    pub min_instance_ts: Option<String>,

    /// Default: 30
    pub locking_seconds: u64,

    /// Upper bound on remembered excluded subfolders
    /// Default: 100000
    pub known_contents_capacity: usize,
}

impl Default for PathSensorConfig {
    fn default() -> Self {
        Self {
            scheme: "s3".into(),
            bucket: String::new(),
            prefix: String::new(),
            subfolder_prefix: String::new(),
            instance_ts_format: "%Y%m%d".into(),
            instance_ts_precision: Precision::Day,
            instance_prefix: None,
            success_criteria: SuccessCriteriaConfig::default(),
            max_instance_age_seconds: None,
            min_instance_ts: None,
            locking_seconds: 30,
            known_contents_capacity: 100_000,
        }
    }
}

impl PathSensorConfig {
    /// Monitored location as a URI
    pub fn uri(&self) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, self.prefix)
    }
}

/// Clock sensor configuration
///
/// # Example
///
/// ```toml
/// [sensor]
/// type = "clock"
/// cron_constraint = "0 0 * * *"
/// delay_seconds = 3600
/// max_instance_age_seconds = 864000
/// backfill_newest_first = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClockSensorConfig {
    /// Cron expression whose matches are the period anchors (required)
    pub cron_constraint: String,

    /// A period is ready this long after it ends
    /// Default: 0
    pub delay_seconds: u64,

    /// Periods starting earlier than this are not backfilled
    /// Default: 7 days
    pub max_instance_age_seconds: u64,

    /// Offer the most recent period first
    /// Default: false
    pub backfill_newest_first: bool,

    /// Default: D
    pub instance_ts_precision: Precision,

    /// Instance prefix for created instances
    pub instance_prefix: Option<String>,

    /// Default: 600
    pub locking_seconds: u64,

    /// Prefix of per-table dataset classes; the table name is appended
    /// Default: ""
    pub dataset_class_prefix: String,

    /// Fixed list of tables to fan out over
    pub tables: Vec<String>,

    /// List tables from the `[source]` catalog at sensing time
    /// Default: false
    pub discover_tables: bool,
}

impl Default for ClockSensorConfig {
    fn default() -> Self {
        Self {
            cron_constraint: String::new(),
            delay_seconds: 0,
            max_instance_age_seconds: 7 * 24 * 3600,
            backfill_newest_first: false,
            instance_ts_precision: Precision::Day,
            instance_prefix: None,
            locking_seconds: 600,
            dataset_class_prefix: String::new(),
            tables: Vec::new(),
            discover_tables: false,
        }
    }
}

impl ClockSensorConfig {
    /// Whether proposals are made per table
    pub fn fans_out(&self) -> bool {
        self.discover_tables || !self.tables.is_empty()
    }
}

/// State-monitor sensor configuration
///
/// # Example
///
/// ```toml
/// [sensor]
/// type = "state"
/// state_path_to_monitor = "s3://vendor/exports/state.json"
/// mutable_data_path = "s3://vendor/exports/current/"
/// instance_ts_precision = "H"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateSensorConfig {
    /// URI of the JSON or YAML state object (required)
    pub state_path_to_monitor: String,

    /// URI recorded as the instance location (required)
    pub mutable_data_path: String,

    /// Field holding the timestamp
    /// Default: ts
    pub state_ts_key: String,

    /// Default: %Y-%m-%d %H:%M:%S
    pub instance_ts_format: String,

    /// Default: D
    pub instance_ts_precision: Precision,

    /// Shift applied to the state timestamp before truncation
    /// Default: 0
    pub offset_seconds: i64,

    /// Instance prefix for created instances
    pub instance_prefix: Option<String>,

    /// Default: 30
    pub locking_seconds: u64,
}

impl Default for StateSensorConfig {
    fn default() -> Self {
        Self {
            state_path_to_monitor: String::new(),
            mutable_data_path: String::new(),
            state_ts_key: "ts".into(),
            instance_ts_format: "%Y-%m-%d %H:%M:%S".into(),
            instance_ts_precision: Precision::Day,
            offset_seconds: 0,
            instance_prefix: None,
            locking_seconds: 30,
        }
    }
}
