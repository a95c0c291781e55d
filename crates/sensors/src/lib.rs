//! Arrival - Sensors
//!
//! Sensors decide which dataset instances are ready to be registered. Each
//! invocation receives a snapshot of the instances the platform already
//! knows and a reference clock, and returns a finite stream of proposals.
//!
//! # Available Sensors
//!
//! | Sensor | Watches | Key |
//! |--------|---------|-----|
//! | `path` | timestamped subfolders under an object-store prefix | subfolder name |
//! | `clock` | ready periods of a cron constraint | period start |
//! | `state` | a JSON/YAML state object with a timestamp field | state timestamp |
//!
//! Sensors never write to the catalog. The only remote side effect is the
//! `manifest_file_with_replacement` criteria, see [`reconcile_and_check`].
//!
//! # Example
//!
//! ```ignore
//! let mut sensor = Sensor::from_config(&config.sensor, store)?;
//! let mut proposals = sensor.new_datasets(&existing, now).await?;
//! while let Some(dataset) = proposals.next().await {
//!     println!("{}", serde_json::to_string(&dataset)?);
//! }
//! ```

mod clock;
mod criteria;
mod error;
mod known;
mod path;
mod period;
mod state;

use std::sync::Arc;

use arrival_config::SensorConfig;
use arrival_protocol::{ExistingInstances, NewDataset};
use chrono::NaiveDateTime;
use futures::stream::BoxStream;
use object_store::ObjectStore;

pub use clock::ClockSensor;
pub use criteria::{
    SuccessCriteria, all_older_than, find_manifest, has_success_marker, reconcile_and_check,
};
pub use error::SensorError;
pub use known::KnownContents;
pub use path::PathSensor;
pub use period::{CronConstraint, Period, PeriodBounds, ready_periods};
pub use state::StateSensor;

#[cfg(test)]
mod path_test;
#[cfg(test)]
mod state_test;

/// Configured sensor, dispatched by kind
#[derive(Debug)]
pub enum Sensor {
    Path(PathSensor),
    Clock(ClockSensor),
    State(StateSensor),
}

impl Sensor {
    /// Build the sensor named by the `[sensor]` section
    ///
    /// `store` is the object store for the path or state location; the
    /// clock sensor ignores it.
    pub fn from_config(
        config: &SensorConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, SensorError> {
        Ok(match config {
            SensorConfig::Path(c) => Self::Path(PathSensor::new(c, store)?),
            SensorConfig::Clock(c) => Self::Clock(ClockSensor::new(c)?),
            SensorConfig::State(c) => Self::State(StateSensor::new(c, store)?),
        })
    }

    /// Sensor type name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Clock(_) => "clock",
            Self::State(_) => "state",
        }
    }

    /// Proposals for this invocation
    pub async fn new_datasets<'a>(
        &'a mut self,
        existing: &ExistingInstances,
        now: NaiveDateTime,
    ) -> Result<BoxStream<'a, NewDataset>, SensorError> {
        match self {
            Self::Path(s) => s.new_datasets(existing, now).await,
            Self::Clock(s) => Ok(s.new_datasets(existing, now)),
            Self::State(s) => s.new_datasets(existing).await,
        }
    }
}
