//! State-monitor sensor
//!
//! Some vendors overwrite one location in place and publish the time of the
//! last refresh in a small JSON or YAML state object. Each distinct state
//! timestamp becomes one instance pointing at the mutable location.

use std::sync::Arc;

use arrival_config::StateSensorConfig;
use arrival_protocol::{
    ExistingInstances, LoadDescriptor, NewDataset, Precision, StorageLocation, format_instance_ts,
    parse_instance_ts,
};
use chrono::{NaiveDateTime, TimeDelta};
use futures::stream::{self, BoxStream, StreamExt};
use object_store::ObjectStore;
use object_store::path::Path;
use serde_json::{Map, Value};

use crate::error::SensorError;

/// State-object monitor
pub struct StateSensor {
    store: Arc<dyn ObjectStore>,
    state_location: StorageLocation,
    mutable_data_path: String,
    state_ts_key: String,
    instance_ts_format: String,
    precision: Precision,
    offset: TimeDelta,
    instance_prefix: Option<String>,
    locking_seconds: u64,
}

impl StateSensor {
    pub fn new(config: &StateSensorConfig, store: Arc<dyn ObjectStore>) -> Result<Self, SensorError> {
        let state_location: StorageLocation = config.state_path_to_monitor.parse()?;
        let offset = TimeDelta::try_seconds(config.offset_seconds).ok_or_else(|| {
            SensorError::state(
                &config.state_path_to_monitor,
                format!("offset_seconds {} out of range", config.offset_seconds),
            )
        })?;

        Ok(Self {
            store,
            state_location,
            mutable_data_path: config.mutable_data_path.clone(),
            state_ts_key: config.state_ts_key.clone(),
            instance_ts_format: config.instance_ts_format.clone(),
            precision: config.instance_ts_precision,
            offset,
            instance_prefix: config.instance_prefix.clone(),
            locking_seconds: config.locking_seconds,
        })
    }

    /// Zero or one proposal for the current state
    ///
    /// A missing or empty state object, or one without the timestamp field,
    /// is an error. A timestamp that does not match the format is logged and
    /// yields nothing.
    pub async fn new_datasets(
        &self,
        existing: &ExistingInstances,
    ) -> Result<BoxStream<'static, NewDataset>, SensorError> {
        let state = self.load_state().await?;
        let uri = self.state_location.uri();

        let raw_ts = match state.get(&self.state_ts_key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(SensorError::state(
                    uri,
                    format!("missing field '{}'", self.state_ts_key),
                ));
            }
        };

        let parsed = match parse_instance_ts(&raw_ts, &self.instance_ts_format) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(state = %uri, error = %e, "unable to parse state timestamp");
                return Ok(stream::empty().boxed());
            }
        };

        let Some(instance_ts) = self.adjust(parsed) else {
            tracing::warn!(state = %uri, ts = %parsed, "state timestamp out of range after offset");
            return Ok(stream::empty().boxed());
        };

        if existing.contains(&instance_ts) {
            tracing::debug!(state = %uri, %instance_ts, "state already registered");
            return Ok(stream::empty().boxed());
        }

        let load_info = LoadDescriptor::new(instance_ts, self.precision, self.locking_seconds)
            .with_instance_prefix(self.instance_prefix.clone())
            .with_alt_uri(self.mutable_data_path.as_str());
        let proposal = NewDataset::new(format_instance_ts(instance_ts), load_info);
        Ok(stream::iter([proposal]).boxed())
    }

    /// Apply the offset, then truncate to the precision
    fn adjust(&self, ts: NaiveDateTime) -> Option<NaiveDateTime> {
        ts.checked_add_signed(self.offset)
            .map(|ts| self.precision.truncate(ts))
    }

    async fn load_state(&self) -> Result<Map<String, Value>, SensorError> {
        let uri = self.state_location.uri();
        let path = Path::from(self.state_location.prefix());

        let bytes = match self.store.get(&path).await {
            Ok(result) => result
                .bytes()
                .await
                .map_err(|e| SensorError::store(uri.as_str(), e))?,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(SensorError::state(uri, "state object not found"));
            }
            Err(e) => return Err(SensorError::store(uri, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(SensorError::state(uri, "state object is empty"));
        }

        let prefix = self.state_location.prefix();
        let value: Value = if prefix.ends_with(".yaml") || prefix.ends_with(".yml") {
            serde_yaml::from_slice(&bytes).map_err(|e| SensorError::state(uri.as_str(), e.to_string()))?
        } else {
            serde_json::from_slice(&bytes).map_err(|e| SensorError::state(uri.as_str(), e.to_string()))?
        };

        match value {
            Value::Object(map) if !map.is_empty() => Ok(map),
            _ => Err(SensorError::state(uri, "state object is empty")),
        }
    }
}

impl std::fmt::Debug for StateSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSensor")
            .field("state", &self.state_location)
            .field("mutable_data_path", &self.mutable_data_path)
            .finish()
    }
}
