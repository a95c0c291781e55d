//! Load descriptors and known instances
//!
//! A `LoadDescriptor` is produced by a sensor for each proposed dataset
//! instance and consumed later by the extraction entry point. The platform
//! persists it as JSON between the two phases.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::instance::{Precision, ts_format};

/// Parameter bundle handed from detection to extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadDescriptor {
    /// Instance prefix of the dataset instance to create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_prefix: Option<String>,

    /// Instance timestamp (wire format)
    #[serde(with = "ts_format")]
    pub instance_ts: NaiveDateTime,

    /// Truncation precision of `instance_ts`
    pub instance_ts_precision: Precision,

    /// Lease the caller holds on the instance while loading
    pub locking_seconds: u64,

    /// Exclusive end of the period, for clock-driven loads
    #[serde(
        default,
        with = "ts_format::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub period_end: Option<NaiveDateTime>,

    /// Ready-to-read location of the discovered data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_uri: Option<String>,

    /// Source table, for multi-table fan-out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
}

impl LoadDescriptor {
    /// Create a descriptor with no optional fields set
    pub fn new(instance_ts: NaiveDateTime, precision: Precision, locking_seconds: u64) -> Self {
        Self {
            instance_prefix: None,
            instance_ts,
            instance_ts_precision: precision,
            locking_seconds,
            period_end: None,
            alt_uri: None,
            table_name: None,
        }
    }

    /// Set the instance prefix
    pub fn with_instance_prefix(mut self, prefix: Option<String>) -> Self {
        self.instance_prefix = prefix;
        self
    }

    /// Set the period end
    pub fn with_period_end(mut self, end: NaiveDateTime) -> Self {
        self.period_end = Some(end);
        self
    }

    /// Set the alternate URI
    pub fn with_alt_uri(mut self, uri: impl Into<String>) -> Self {
        self.alt_uri = Some(uri.into());
        self
    }

    /// Set the table name
    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }
}

/// One proposal from a sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDataset {
    /// Instance key, unique per sensor
    pub key: String,

    /// Dataset class when a sensor fans out over tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_class: Option<String>,

    /// Parameters for the extraction phase
    pub load_info: LoadDescriptor,
}

impl NewDataset {
    /// Proposal without a dataset class
    pub fn new(key: impl Into<String>, load_info: LoadDescriptor) -> Self {
        Self {
            key: key.into(),
            dataset_class: None,
            load_info,
        }
    }

    /// Attach a dataset class
    pub fn with_dataset_class(mut self, class: impl Into<String>) -> Self {
        self.dataset_class = Some(class.into());
        self
    }
}

/// An already-registered dataset instance, as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingInstance {
    #[serde(with = "ts_format")]
    pub instance_ts: NaiveDateTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_class: Option<String>,
}

/// Snapshot of known instances supplied with each sensor invocation
///
/// Instances with a dataset class are tracked per class so that table
/// fan-out can tell `sf_Account@t` apart from `sf_Contact@t`.
#[derive(Debug, Clone, Default)]
pub struct ExistingInstances {
    timestamps: HashSet<NaiveDateTime>,
    classified: HashSet<(String, NaiveDateTime)>,
}

impl ExistingInstances {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instance timestamp
    pub fn insert(&mut self, ts: NaiveDateTime) {
        self.timestamps.insert(ts);
    }

    /// Record an instance timestamp for a dataset class
    pub fn insert_for_class(&mut self, class: impl Into<String>, ts: NaiveDateTime) {
        self.classified.insert((class.into(), ts));
        self.timestamps.insert(ts);
    }

    /// Whether any instance exists at this timestamp
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        self.timestamps.contains(ts)
    }

    /// Whether an instance of this class exists at this timestamp
    pub fn contains_for_class(&self, class: &str, ts: &NaiveDateTime) -> bool {
        self.classified.contains(&(class.to_string(), *ts))
    }

    /// Number of known timestamps
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

impl FromIterator<ExistingInstance> for ExistingInstances {
    fn from_iter<I: IntoIterator<Item = ExistingInstance>>(iter: I) -> Self {
        let mut instances = Self::new();
        for instance in iter {
            match instance.dataset_class {
                Some(class) => instances.insert_for_class(class, instance.instance_ts),
                None => instances.insert(instance.instance_ts),
            }
        }
        instances
    }
}

impl FromIterator<NaiveDateTime> for ExistingInstances {
    fn from_iter<I: IntoIterator<Item = NaiveDateTime>>(iter: I) -> Self {
        let mut instances = Self::new();
        for ts in iter {
            instances.insert(ts);
        }
        instances
    }
}
