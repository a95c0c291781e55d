//! Success criteria
//!
//! Policies deciding whether a storage prefix holds a complete partition.
//! All strategies are read-only except `ManifestFileWithReplacement`, which
//! goes through [`reconcile_and_check`] and rewrites the prefix while
//! checking it.

use arrival_config::{ConfigError, SuccessCriteriaConfig};
use arrival_protocol::{MANIFEST_SUFFIX, SUCCESS_MARKER};
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};

use crate::error::SensorError;
use crate::period::seconds;

/// Completeness policy for one candidate prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessCriteria {
    /// Presence of the prefix is enough
    Always,
    /// A `_SUCCESS` object exists directly under the prefix
    SuccessFile,
    /// Any object under the prefix ends in `.manifest`
    ManifestFile,
    /// Manifest is swapped for a `_SUCCESS` marker; see [`reconcile_and_check`]
    ManifestFileWithReplacement,
    /// At least this many objects under the prefix
    MinFiles(usize),
    /// Every object under the prefix is at least this old
    MinAge(TimeDelta),
}

impl TryFrom<&SuccessCriteriaConfig> for SuccessCriteria {
    type Error = ConfigError;

    fn try_from(config: &SuccessCriteriaConfig) -> Result<Self, Self::Error> {
        match config {
            SuccessCriteriaConfig::Named(name) => match name.as_str() {
                "none" => Ok(Self::Always),
                "success_file" => Ok(Self::SuccessFile),
                "manifest_file" => Ok(Self::ManifestFile),
                "manifest_file_with_replacement" => Ok(Self::ManifestFileWithReplacement),
                other => Err(ConfigError::invalid_value(
                    "sensor",
                    "path",
                    "success_criteria",
                    format!("unknown criteria '{other}'"),
                )),
            },
            SuccessCriteriaConfig::MinFiles { min_files } => Ok(Self::MinFiles(*min_files)),
            SuccessCriteriaConfig::MinAge { min_age } => Ok(Self::MinAge(seconds(*min_age))),
        }
    }
}

impl SuccessCriteria {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Always => "none",
            Self::SuccessFile => "success_file",
            Self::ManifestFile => "manifest_file",
            Self::ManifestFileWithReplacement => "manifest_file_with_replacement",
            Self::MinFiles(_) => "min_files",
            Self::MinAge(_) => "min_age",
        }
    }

    /// Evaluate against `prefix` at the instant `now`
    ///
    /// `ManifestFileWithReplacement` writes or deletes objects under the
    /// prefix as a side effect.
    pub async fn evaluate(
        &self,
        store: &dyn ObjectStore,
        prefix: &Path,
        now: DateTime<Utc>,
    ) -> Result<bool, SensorError> {
        match self {
            Self::Always => Ok(true),
            Self::SuccessFile => has_success_marker(store, prefix).await,
            Self::ManifestFile => Ok(find_manifest(store, prefix).await?.is_some()),
            Self::ManifestFileWithReplacement => reconcile_and_check(store, prefix).await,
            Self::MinFiles(min) => Ok(list_objects(store, prefix).await?.len() >= *min),
            Self::MinAge(age) => all_older_than(store, prefix, now, *age).await,
        }
    }
}

/// Whether `<prefix>/_SUCCESS` exists
pub async fn has_success_marker(store: &dyn ObjectStore, prefix: &Path) -> Result<bool, SensorError> {
    let marker = prefix.child(SUCCESS_MARKER);
    match store.head(&marker).await {
        Ok(_) => Ok(true),
        Err(object_store::Error::NotFound { .. }) => Ok(false),
        Err(e) => Err(SensorError::store(marker.as_ref(), e)),
    }
}

/// First object under the prefix, at any depth, whose key ends in `.manifest`
pub async fn find_manifest(
    store: &dyn ObjectStore,
    prefix: &Path,
) -> Result<Option<Path>, SensorError> {
    Ok(list_objects(store, prefix)
        .await?
        .into_iter()
        .map(|meta| meta.location)
        .find(|location| location.as_ref().ends_with(MANIFEST_SUFFIX)))
}

/// Replace a manifest with a `_SUCCESS` marker, then report completeness
///
/// This is a state transition, not a predicate:
/// - manifest only: an empty marker is written
/// - manifest and marker: the manifest is deleted
///
/// Returns true when the marker is present and no manifest remains. Calling
/// it again on a reconciled prefix is a read-only check.
pub async fn reconcile_and_check(
    store: &dyn ObjectStore,
    prefix: &Path,
) -> Result<bool, SensorError> {
    let mut manifest = find_manifest(store, prefix).await?;
    let mut has_marker = has_success_marker(store, prefix).await?;

    if manifest.is_some() && !has_marker {
        let marker = prefix.child(SUCCESS_MARKER);
        store
            .put(&marker, PutPayload::from_bytes(Bytes::new()))
            .await
            .map_err(|e| SensorError::store(marker.as_ref(), e))?;
        tracing::info!(prefix = %prefix, "wrote success marker for manifest");
        has_marker = true;
    }

    if has_marker && let Some(location) = manifest.take() {
        store
            .delete(&location)
            .await
            .map_err(|e| SensorError::store(location.as_ref(), e))?;
        tracing::info!(manifest = %location, "removed manifest replaced by success marker");
    }

    Ok(has_marker && manifest.is_none())
}

/// Whether every object under the prefix was modified at least `age` before `now`
///
/// An empty prefix is not complete.
pub async fn all_older_than(
    store: &dyn ObjectStore,
    prefix: &Path,
    now: DateTime<Utc>,
    age: TimeDelta,
) -> Result<bool, SensorError> {
    let objects = list_objects(store, prefix).await?;
    if objects.is_empty() {
        return Ok(false);
    }
    let newest_allowed = now.checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC);
    Ok(objects.iter().all(|meta| meta.last_modified <= newest_allowed))
}

/// All objects under the prefix, recursively
pub async fn list_objects(
    store: &dyn ObjectStore,
    prefix: &Path,
) -> Result<Vec<ObjectMeta>, SensorError> {
    store
        .list(Some(prefix))
        .try_collect()
        .await
        .map_err(|e| SensorError::store(prefix.as_ref(), e))
}
