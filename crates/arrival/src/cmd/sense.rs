//! Sense command - Propose dataset instances that are ready
//!
//! Prints one JSON line per proposal: `{"key": ..., "load_info": {...}}`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use arrival_config::SensorConfig;
use arrival_protocol::{
    ExistingInstance, ExistingInstances, INSTANCE_TS_FORMAT, StorageLocation, parse_instance_ts,
};
use arrival_sensors::Sensor;
use chrono::NaiveDateTime;
use clap::Args;
use futures::StreamExt;
use object_store::ObjectStore;
use object_store::memory::InMemory;

use super::Context;
use crate::clients;

/// Sense command arguments
#[derive(Args, Debug)]
pub struct SenseArgs {
    /// JSON array of already-registered instances (`[{"instance_ts": ...}]`)
    #[arg(short, long, value_name = "FILE")]
    existing: Option<PathBuf>,

    /// Reference time, `YYYY-MM-DD HH:MM:SS` UTC (default: now)
    #[arg(long, value_parser = parse_now)]
    now: Option<NaiveDateTime>,
}

/// Run the sense command
pub async fn run(args: SenseArgs, ctx: &Context) -> Result<()> {
    let config = ctx.config.require_sensor()?;
    let existing = match &args.existing {
        Some(path) => read_existing(path)?,
        None => ExistingInstances::new(),
    };
    let now = args.now.unwrap_or_else(|| chrono::Utc::now().naive_utc());

    let store = sensor_store(config, ctx)?;
    let mut sensor = Sensor::from_config(config, store).context("invalid sensor configuration")?;

    if let (Sensor::Clock(clock), SensorConfig::Clock(clock_config)) = (&mut sensor, config)
        && clock_config.discover_tables
    {
        let catalog = clients::connect_catalog(ctx).await?;
        let filter = clients::table_filter(ctx.config.require_source()?);
        let tables = super::tables::discover(&catalog, &filter).await?;
        clock.set_tables(clock_config.tables.iter().cloned().chain(tables));
    }

    tracing::info!(
        sensor = sensor.kind(),
        now = %now,
        existing = existing.len(),
        "sensing"
    );

    let mut proposals = sensor
        .new_datasets(&existing, now)
        .await
        .context("sensor invocation failed")?;

    let mut out = std::io::stdout().lock();
    let mut count = 0usize;
    while let Some(dataset) = proposals.next().await {
        writeln!(out, "{}", serde_json::to_string(&dataset)?)?;
        count += 1;
    }
    out.flush()?;

    tracing::info!(proposals = count, "sensing complete");
    Ok(())
}

/// Store the sensor reads from; the clock sensor reads nothing
fn sensor_store(config: &SensorConfig, ctx: &Context) -> Result<Arc<dyn ObjectStore>> {
    let uri = match config {
        SensorConfig::Path(path) => path.uri(),
        SensorConfig::State(state) => state.state_path_to_monitor.clone(),
        SensorConfig::Clock(_) => return Ok(Arc::new(InMemory::new())),
    };
    let location: StorageLocation = uri.parse().with_context(|| format!("invalid location '{uri}'"))?;
    clients::open_store(&location, &ctx.config.storage, &ctx.credentials)
}

fn read_existing(path: &std::path::Path) -> Result<ExistingInstances> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read existing instances from {}", path.display()))?;
    parse_existing(&contents)
}

fn parse_existing(contents: &str) -> Result<ExistingInstances> {
    let instances: Vec<ExistingInstance> =
        serde_json::from_str(contents).context("existing instances must be a JSON array")?;
    Ok(instances.into_iter().collect())
}

fn parse_now(value: &str) -> Result<NaiveDateTime, String> {
    parse_instance_ts(value, INSTANCE_TS_FORMAT).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_existing_with_classes() {
        let existing = parse_existing(
            r#"[
                {"instance_ts": "2023-01-01 00:00:00"},
                {"instance_ts": "2023-01-02 00:00:00", "dataset_class": "sf_Account"}
            ]"#,
        )
        .unwrap();

        let day1 = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(existing.contains(&day1));
        assert!(existing.contains_for_class("sf_Account", &day2));
        assert!(!existing.contains_for_class("sf_Contact", &day2));
    }

    #[test]
    fn test_parse_existing_rejects_object() {
        assert!(parse_existing(r#"{"instance_ts": "2023-01-01 00:00:00"}"#).is_err());
    }

    #[test]
    fn test_parse_now() {
        let now = parse_now("2023-01-03 12:30:00").unwrap();
        assert_eq!(now.to_string(), "2023-01-03 12:30:00");
        assert!(parse_now("yesterday").is_err());
    }
}
