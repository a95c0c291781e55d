//! Clock sensor
//!
//! Proposes one instance per ready period of a cron constraint. With a table
//! list the sensor fans out: every ready period yields one proposal per
//! table, each under its own dataset class.

use arrival_config::ClockSensorConfig;
use arrival_protocol::{ExistingInstances, LoadDescriptor, NewDataset, Precision, format_instance_ts};
use chrono::NaiveDateTime;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::SensorError;
use crate::period::{CronConstraint, Period, PeriodBounds};

/// Cron-driven sensor
#[derive(Debug, Clone)]
pub struct ClockSensor {
    cron: CronConstraint,
    bounds: PeriodBounds,
    precision: Precision,
    instance_prefix: Option<String>,
    locking_seconds: u64,
    dataset_class_prefix: String,
    tables: Vec<String>,
}

impl ClockSensor {
    /// Build from config; the cron constraint is parsed here
    pub fn new(config: &ClockSensorConfig) -> Result<Self, SensorError> {
        let cron = CronConstraint::parse(&config.cron_constraint)?;
        let bounds = PeriodBounds::from_seconds(
            config.delay_seconds,
            config.max_instance_age_seconds,
            config.backfill_newest_first,
        );

        let mut sensor = Self {
            cron,
            bounds,
            precision: config.instance_ts_precision,
            instance_prefix: config.instance_prefix.clone(),
            locking_seconds: config.locking_seconds,
            dataset_class_prefix: config.dataset_class_prefix.clone(),
            tables: Vec::new(),
        };
        sensor.set_tables(config.tables.iter().cloned());
        Ok(sensor)
    }

    /// Replace the fan-out table list; tables are kept sorted and unique
    pub fn set_tables(&mut self, tables: impl IntoIterator<Item = String>) {
        let mut tables: Vec<String> = tables.into_iter().collect();
        tables.sort();
        tables.dedup();
        self.tables = tables;
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Dataset class for a fanned-out table
    pub fn dataset_class(&self, table: &str) -> String {
        format!("{}{}", self.dataset_class_prefix, table)
    }

    /// Proposals for every ready period not yet registered
    pub fn proposals(&self, existing: &ExistingInstances, now: NaiveDateTime) -> Vec<NewDataset> {
        let periods = self.cron.ready_periods(now, self.bounds);
        tracing::debug!(
            cron_constraint = %self.cron.expr(),
            periods = periods.len(),
            tables = self.tables.len(),
            "ready periods"
        );

        let mut proposals = Vec::new();
        for period in periods {
            if self.tables.is_empty() {
                if !existing.contains(&period.start) {
                    proposals.push(NewDataset::new(
                        format_instance_ts(period.start),
                        self.load_info(&period),
                    ));
                }
                continue;
            }

            for table in &self.tables {
                let class = self.dataset_class(table);
                if existing.contains_for_class(&class, &period.start) {
                    continue;
                }
                let load_info = self.load_info(&period).with_table_name(table.as_str());
                proposals.push(
                    NewDataset::new(format_instance_ts(period.start), load_info)
                        .with_dataset_class(class),
                );
            }
        }
        proposals
    }

    /// Stream form of [`ClockSensor::proposals`]
    pub fn new_datasets(
        &self,
        existing: &ExistingInstances,
        now: NaiveDateTime,
    ) -> BoxStream<'static, NewDataset> {
        stream::iter(self.proposals(existing, now)).boxed()
    }

    fn load_info(&self, period: &Period) -> LoadDescriptor {
        LoadDescriptor::new(period.start, self.precision, self.locking_seconds)
            .with_instance_prefix(self.instance_prefix.clone())
            .with_period_end(period.end)
    }
}
