//! Tests for the path sensor

use std::sync::Arc;

use arrival_config::{PathSensorConfig, SuccessCriteriaConfig};
use arrival_protocol::{ExistingInstances, NewDataset, parse_instance_ts, INSTANCE_TS_FORMAT};
use bytes::Bytes;
use chrono::NaiveDateTime;
use futures::StreamExt;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::path::PathSensor;

fn ts(s: &str) -> NaiveDateTime {
    parse_instance_ts(s, INSTANCE_TS_FORMAT).unwrap()
}

fn config() -> PathSensorConfig {
    PathSensorConfig {
        scheme: "memory".into(),
        bucket: "b".into(),
        prefix: "p/".into(),
        instance_ts_format: "%Y%m%d".into(),
        success_criteria: SuccessCriteriaConfig::Named("success_file".into()),
        ..Default::default()
    }
}

async fn put(store: &InMemory, key: &str) {
    store
        .put(&Path::from(key), PutPayload::from_bytes(Bytes::from_static(b"x")))
        .await
        .unwrap();
}

async fn sense(
    sensor: &mut PathSensor,
    existing: &ExistingInstances,
    now: NaiveDateTime,
) -> Vec<NewDataset> {
    sensor
        .new_datasets(existing, now)
        .await
        .unwrap()
        .collect()
        .await
}

fn keys(proposals: &[NewDataset]) -> Vec<&str> {
    proposals.iter().map(|p| p.key.as_str()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_only_complete_subfolder_proposed() {
    let store = Arc::new(InMemory::new());
    put(&store, "p/20230101/data.csv").await;
    put(&store, "p/20230101/_SUCCESS").await;
    put(&store, "p/20230102/data.csv").await;

    let mut sensor = PathSensor::new(&config(), store.clone()).unwrap();
    let proposals = sense(&mut sensor, &ExistingInstances::new(), ts("2023-01-05 00:00:00")).await;

    assert_eq!(keys(&proposals), vec!["20230101"]);
    let load = &proposals[0].load_info;
    assert_eq!(load.instance_ts, ts("2023-01-01 00:00:00"));
    assert_eq!(load.alt_uri.as_deref(), Some("memory://b/p/20230101/"));
    assert_eq!(load.locking_seconds, 30);
    assert!(proposals[0].dataset_class.is_none());
}

#[tokio::test]
async fn test_registered_instance_skipped_next_one_proposed() {
    let store = Arc::new(InMemory::new());
    put(&store, "p/20230101/_SUCCESS").await;
    put(&store, "p/20230102/data.csv").await;
    put(&store, "p/20230102/_SUCCESS").await;

    let existing: ExistingInstances = [ts("2023-01-01 00:00:00")].into_iter().collect();
    let mut sensor = PathSensor::new(&config(), store.clone()).unwrap();
    let proposals = sense(&mut sensor, &existing, ts("2023-01-05 00:00:00")).await;

    assert_eq!(keys(&proposals), vec!["20230102"]);
    assert_eq!(sensor.known_len(), 1);
}

#[tokio::test]
async fn test_two_calls_are_idempotent() {
    let store = Arc::new(InMemory::new());
    put(&store, "p/20230101/_SUCCESS").await;
    put(&store, "p/20230102/_SUCCESS").await;
    put(&store, "p/20230103/data.csv").await;

    let existing: ExistingInstances = [ts("2023-01-01 00:00:00")].into_iter().collect();
    let now = ts("2023-01-05 00:00:00");
    let mut sensor = PathSensor::new(&config(), store.clone()).unwrap();

    let first = sense(&mut sensor, &existing, now).await;
    let second = sense(&mut sensor, &existing, now).await;
    assert_eq!(first, second);
    assert_eq!(keys(&first), vec!["20230102"]);
}

#[tokio::test]
async fn test_incomplete_subfolder_proposed_once_marked() {
    let store = Arc::new(InMemory::new());
    put(&store, "p/20230102/data.csv").await;
    let now = ts("2023-01-05 00:00:00");
    let mut sensor = PathSensor::new(&config(), store.clone()).unwrap();

    assert!(sense(&mut sensor, &ExistingInstances::new(), now).await.is_empty());
    put(&store, "p/20230102/_SUCCESS").await;
    let proposals = sense(&mut sensor, &ExistingInstances::new(), now).await;
    assert_eq!(keys(&proposals), vec!["20230102"]);
}

#[tokio::test]
async fn test_ascending_order_and_unparseable_names() {
    let store = Arc::new(InMemory::new());
    for key in ["p/20230103/_SUCCESS", "p/20230101/_SUCCESS", "p/latest/_SUCCESS"] {
        put(&store, key).await;
    }

    let mut sensor = PathSensor::new(&config(), store.clone()).unwrap();
    let proposals = sense(&mut sensor, &ExistingInstances::new(), ts("2023-01-05 00:00:00")).await;
    assert_eq!(keys(&proposals), vec!["20230101", "20230103"]);
    assert_eq!(sensor.known_len(), 0);
}

#[tokio::test]
async fn test_subfolder_prefix_and_hour_format() {
    let store = Arc::new(InMemory::new());
    put(&store, "p/dump_2023010106/_SUCCESS").await;
    put(&store, "p/other_2023010107/_SUCCESS").await;

    let config = PathSensorConfig {
        subfolder_prefix: "dump_".into(),
        instance_ts_format: "%Y%m%d%H".into(),
        ..config()
    };
    let mut sensor = PathSensor::new(&config, store.clone()).unwrap();
    let proposals = sense(&mut sensor, &ExistingInstances::new(), ts("2023-01-05 00:00:00")).await;

    assert_eq!(keys(&proposals), vec!["dump_2023010106"]);
    assert_eq!(proposals[0].load_info.instance_ts, ts("2023-01-01 06:00:00"));
}

// ============================================================================
// Exclusions
// ============================================================================

#[tokio::test]
async fn test_max_age_and_min_ts_exclusions_are_remembered() {
    let store = Arc::new(InMemory::new());
    for key in [
        "p/20221201/_SUCCESS",
        "p/20221230/_SUCCESS",
        "p/20230103/_SUCCESS",
    ] {
        put(&store, key).await;
    }

    let config = PathSensorConfig {
        max_instance_age_seconds: Some(10 * 86_400),
        min_instance_ts: Some("2023-01-01 00:00:00".into()),
        ..config()
    };
    let mut sensor = PathSensor::new(&config, store.clone()).unwrap();
    let proposals = sense(&mut sensor, &ExistingInstances::new(), ts("2023-01-05 00:00:00")).await;

    assert_eq!(keys(&proposals), vec!["20230103"]);
    assert_eq!(sensor.known_len(), 2);
}

#[tokio::test]
async fn test_stale_exclusion_is_permanent() {
    let store = Arc::new(InMemory::new());
    put(&store, "p/20230101/_SUCCESS").await;

    let config = PathSensorConfig {
        max_instance_age_seconds: Some(86_400),
        ..config()
    };
    let mut sensor = PathSensor::new(&config, store.clone()).unwrap();

    assert!(sense(&mut sensor, &ExistingInstances::new(), ts("2023-01-05 00:00:00")).await.is_empty());
    // Back in time the subfolder would qualify, but it is already known
    assert!(sense(&mut sensor, &ExistingInstances::new(), ts("2023-01-01 12:00:00")).await.is_empty());
}

#[test]
fn test_invalid_config_fails_before_any_call() {
    let store = Arc::new(InMemory::new());

    let bad_criteria = PathSensorConfig {
        success_criteria: SuccessCriteriaConfig::Named("eventually".into()),
        ..config()
    };
    assert!(PathSensor::new(&bad_criteria, store.clone()).is_err());

    let bad_scheme = PathSensorConfig {
        scheme: "ftp".into(),
        ..config()
    };
    assert!(PathSensor::new(&bad_scheme, store).is_err());
}
