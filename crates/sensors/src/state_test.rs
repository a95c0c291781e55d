//! Tests for the state-monitor sensor

use std::sync::Arc;

use arrival_config::StateSensorConfig;
use arrival_protocol::{ExistingInstances, INSTANCE_TS_FORMAT, NewDataset, Precision, parse_instance_ts};
use bytes::Bytes;
use chrono::NaiveDateTime;
use futures::StreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::error::SensorError;
use crate::state::StateSensor;

fn ts(s: &str) -> NaiveDateTime {
    parse_instance_ts(s, INSTANCE_TS_FORMAT).unwrap()
}

fn config(state_key: &str) -> StateSensorConfig {
    StateSensorConfig {
        state_path_to_monitor: format!("memory://vendor/{state_key}"),
        mutable_data_path: "memory://vendor/current/".into(),
        ..Default::default()
    }
}

async fn put(store: &InMemory, key: &str, body: &'static str) {
    store
        .put(
            &Path::from(key),
            PutPayload::from_bytes(Bytes::from_static(body.as_bytes())),
        )
        .await
        .unwrap();
}

async fn sense(
    sensor: &StateSensor,
    existing: &ExistingInstances,
) -> Result<Vec<NewDataset>, SensorError> {
    Ok(sensor.new_datasets(existing).await?.collect().await)
}

#[tokio::test]
async fn test_json_state_proposed() {
    let store = Arc::new(InMemory::new());
    put(&store, "state.json", r#"{"ts": "2023-03-04 05:06:07", "rows": 10}"#).await;

    let sensor = StateSensor::new(&config("state.json"), store.clone()).unwrap();
    let proposals = sense(&sensor, &ExistingInstances::new()).await.unwrap();

    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].key, "2023-03-04 00:00:00");
    let load = &proposals[0].load_info;
    assert_eq!(load.instance_ts, ts("2023-03-04 00:00:00"));
    assert_eq!(load.alt_uri.as_deref(), Some("memory://vendor/current/"));
    assert_eq!(load.locking_seconds, 30);
}

#[tokio::test]
async fn test_yaml_state_with_offset_and_hour_precision() {
    let store = Arc::new(InMemory::new());
    put(&store, "state.yaml", "refreshed: '2023-03-04 05:59:07'\n").await;

    let config = StateSensorConfig {
        state_ts_key: "refreshed".into(),
        instance_ts_precision: Precision::Hour,
        offset_seconds: 3600,
        ..config("state.yaml")
    };
    let sensor = StateSensor::new(&config, store.clone()).unwrap();
    let proposals = sense(&sensor, &ExistingInstances::new()).await.unwrap();

    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].key, "2023-03-04 06:00:00");
}

#[tokio::test]
async fn test_known_state_yields_nothing() {
    let store = Arc::new(InMemory::new());
    put(&store, "state.json", r#"{"ts": "2023-03-04 05:06:07"}"#).await;

    let existing: ExistingInstances = [ts("2023-03-04 00:00:00")].into_iter().collect();
    let sensor = StateSensor::new(&config("state.json"), store.clone()).unwrap();
    assert!(sense(&sensor, &existing).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_timestamp_yields_nothing() {
    let store = Arc::new(InMemory::new());
    put(&store, "state.json", r#"{"ts": "yesterday"}"#).await;

    let sensor = StateSensor::new(&config("state.json"), store.clone()).unwrap();
    assert!(sense(&sensor, &ExistingInstances::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_or_empty_state_is_error() {
    let store = Arc::new(InMemory::new());
    let sensor = StateSensor::new(&config("state.json"), store.clone()).unwrap();
    assert!(matches!(
        sense(&sensor, &ExistingInstances::new()).await,
        Err(SensorError::State { .. })
    ));

    put(&store, "state.json", "{}").await;
    let err = sense(&sensor, &ExistingInstances::new()).await.unwrap_err();
    assert!(err.to_string().contains("empty"));

    put(&store, "state.json", r#"{"other": 1}"#).await;
    let err = sense(&sensor, &ExistingInstances::new()).await.unwrap_err();
    assert!(err.to_string().contains("'ts'"));
}
