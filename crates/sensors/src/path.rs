//! Path sensor
//!
//! Watches the immediate subfolders of an object-store prefix. Each
//! subfolder whose name carries a timestamp is a candidate instance, proposed
//! once its success criteria hold.
//!
//! Subfolders that are already registered, too old or below the configured
//! minimum are remembered in a bounded [`KnownContents`] set so later polls
//! skip them without any remote call. Subfolders that fail their criteria
//! are never remembered and are re-checked on the next poll.

use std::sync::Arc;

use arrival_config::PathSensorConfig;
use arrival_protocol::{
    ExistingInstances, INSTANCE_TS_FORMAT, LoadDescriptor, NewDataset, Precision,
    StorageLocation, parse_instance_ts,
};
use chrono::{NaiveDateTime, TimeDelta};
use futures::stream::{self, BoxStream, StreamExt};
use object_store::ObjectStore;
use object_store::path::Path;

use crate::criteria::SuccessCriteria;
use crate::error::SensorError;
use crate::known::KnownContents;
use crate::period::{oldest_start, seconds};

/// A subfolder that survived the cheap exclusion checks
#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    instance_ts: NaiveDateTime,
    path: Path,
}

/// Object-store subfolder sensor
pub struct PathSensor {
    store: Arc<dyn ObjectStore>,
    location: StorageLocation,
    subfolder_prefix: String,
    instance_ts_format: String,
    precision: Precision,
    instance_prefix: Option<String>,
    criteria: SuccessCriteria,
    max_age: Option<TimeDelta>,
    min_instance_ts: Option<NaiveDateTime>,
    locking_seconds: u64,
    known: KnownContents,
}

impl PathSensor {
    /// Build from config, failing on any invalid value before remote calls
    pub fn new(config: &PathSensorConfig, store: Arc<dyn ObjectStore>) -> Result<Self, SensorError> {
        let location: StorageLocation = config.uri().parse()?;
        let criteria = SuccessCriteria::try_from(&config.success_criteria)?;
        let min_instance_ts = config
            .min_instance_ts
            .as_deref()
            .map(|ts| parse_instance_ts(ts, INSTANCE_TS_FORMAT))
            .transpose()?;

        Ok(Self {
            store,
            location,
            subfolder_prefix: config.subfolder_prefix.clone(),
            instance_ts_format: config.instance_ts_format.clone(),
            precision: config.instance_ts_precision,
            instance_prefix: config.instance_prefix.clone(),
            criteria,
            max_age: config.max_instance_age_seconds.map(seconds),
            min_instance_ts,
            locking_seconds: config.locking_seconds,
            known: KnownContents::new(config.known_contents_capacity),
        })
    }

    /// Monitored location
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Number of subfolders currently excluded without a remote call
    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    /// Lazily evaluated proposals in ascending timestamp order
    ///
    /// Listing happens eagerly; success criteria run as the stream is
    /// polled, so a consumer that stops early leaves later subfolders
    /// unchecked.
    pub async fn new_datasets<'a>(
        &'a mut self,
        existing: &ExistingInstances,
        now: NaiveDateTime,
    ) -> Result<BoxStream<'a, NewDataset>, SensorError> {
        let subfolders = self.list_subfolders().await?;
        let candidates = self.select_candidates(subfolders, existing, now);

        tracing::debug!(
            location = %self.location,
            candidates = candidates.len(),
            known = self.known.len(),
            "evaluating subfolders"
        );

        let this: &'a Self = self;
        let now_utc = now.and_utc();
        Ok(stream::iter(candidates)
            .filter_map(move |candidate| async move {
                match this
                    .criteria
                    .evaluate(this.store.as_ref(), &candidate.path, now_utc)
                    .await
                {
                    Ok(true) => Some(this.proposal(candidate)),
                    Ok(false) => {
                        tracing::debug!(
                            subfolder = %candidate.name,
                            criteria = this.criteria.name(),
                            "subfolder not complete yet"
                        );
                        None
                    }
                    Err(e) => {
                        tracing::warn!(
                            subfolder = %candidate.name,
                            error = %e,
                            "success criteria check failed, will retry"
                        );
                        None
                    }
                }
            })
            .boxed())
    }

    /// Names of the immediate subfolders, filtered by `subfolder_prefix`
    async fn list_subfolders(&self) -> Result<Vec<String>, SensorError> {
        let root = self.root_path();
        let listing = self
            .store
            .list_with_delimiter(Some(&root))
            .await
            .map_err(|e| SensorError::store(self.location.uri(), e))?;

        Ok(listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename())
            .filter(|name| name.starts_with(&self.subfolder_prefix))
            .map(str::to_string)
            .collect())
    }

    /// Parse, exclude and sort; exclusions are remembered
    fn select_candidates(
        &mut self,
        subfolders: Vec<String>,
        existing: &ExistingInstances,
        now: NaiveDateTime,
    ) -> Vec<Candidate> {
        let oldest = self.max_age.map(|age| oldest_start(now, age));
        let root = self.root_path();
        let mut candidates = Vec::new();

        for name in subfolders {
            if self.known.contains(&name) {
                continue;
            }

            let ts_part = &name[self.subfolder_prefix.len()..];
            let instance_ts = match parse_instance_ts(ts_part, &self.instance_ts_format) {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::warn!(subfolder = %name, error = %e, "unable to parse timestamp from subfolder");
                    continue;
                }
            };

            if existing.contains(&instance_ts) {
                tracing::debug!(subfolder = %name, %instance_ts, "already registered");
                self.known.insert(name);
                continue;
            }
            if oldest.is_some_and(|oldest| instance_ts < oldest) {
                tracing::debug!(subfolder = %name, %instance_ts, "older than max_instance_age_seconds");
                self.known.insert(name);
                continue;
            }
            if self.min_instance_ts.is_some_and(|min| instance_ts < min) {
                tracing::debug!(subfolder = %name, %instance_ts, "before min_instance_ts");
                self.known.insert(name);
                continue;
            }

            let path = root.child(name.as_str());
            candidates.push(Candidate {
                name,
                instance_ts,
                path,
            });
        }

        candidates.sort_by(|a, b| a.instance_ts.cmp(&b.instance_ts).then_with(|| a.name.cmp(&b.name)));
        candidates
    }

    fn proposal(&self, candidate: Candidate) -> NewDataset {
        let alt_uri = self.location.child(&candidate.name).uri();
        let load_info = LoadDescriptor::new(candidate.instance_ts, self.precision, self.locking_seconds)
            .with_instance_prefix(self.instance_prefix.clone())
            .with_alt_uri(alt_uri);
        NewDataset::new(candidate.name, load_info)
    }

    fn root_path(&self) -> Path {
        Path::from(self.location.prefix())
    }
}

impl std::fmt::Debug for PathSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathSensor")
            .field("location", &self.location)
            .field("criteria", &self.criteria)
            .field("known", &self.known.len())
            .finish()
    }
}
