//! Remote clients built once per invocation
//!
//! Object stores, the warehouse client and the source catalog are created
//! here from the config and the credentials file, then passed by reference
//! to sensors, sinks and the extraction loop.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use arrival_config::{Credentials, SourceConfig, StorageConfig};
use arrival_connectors::TableFilter;
use arrival_protocol::{DestinationUri, StorageLocation, StoreScheme};
use arrival_sinks::{
    ClickHouseClient, ClickHouseClientConfig, ClickHouseCredentials, SinkClients, WarehouseClient,
};
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use serde::Deserialize;

use crate::cmd::Context;

#[cfg(feature = "postgres")]
use arrival_connectors::{PostgresCatalog, PostgresCredentials};
#[cfg(feature = "salesforce")]
use arrival_connectors::{SalesforceClient, SalesforceCredentials};

/// Access key pair as stored in the credentials file
#[derive(Deserialize)]
struct AwsKeys {
    key: String,
    skey: String,
    #[serde(default)]
    token: Option<String>,
}

/// Object store holding `location`
///
/// S3 and GCS read ambient credentials from the environment unless
/// `[storage] credentials_key` names a secret.
pub fn open_store(
    location: &StorageLocation,
    storage: &StorageConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match location.scheme() {
        StoreScheme::S3 => {
            let mut builder = AmazonS3Builder::from_env()
                .with_bucket_name(location.bucket())
                .with_request_payer(storage.request_payer);
            if let Some(region) = &storage.region {
                builder = builder.with_region(region);
            }
            if let Some(keys) = credentials.optional_as::<AwsKeys>(storage.credentials_key.as_deref())? {
                builder = builder
                    .with_access_key_id(keys.key)
                    .with_secret_access_key(keys.skey);
                if let Some(token) = keys.token {
                    builder = builder.with_token(token);
                }
            }
            Arc::new(builder.build().context("failed to build S3 client")?)
        }
        StoreScheme::Gcs => {
            let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(location.bucket());
            if let Some(key) = storage.credentials_key.as_deref() {
                let secret = match credentials.require(key)? {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                builder = builder.with_service_account_key(secret);
            }
            Arc::new(builder.build().context("failed to build GCS client")?)
        }
        StoreScheme::File => {
            let fs = if location.bucket().is_empty() {
                LocalFileSystem::new()
            } else {
                LocalFileSystem::new_with_prefix(location.bucket())
                    .with_context(|| format!("cannot use '{}' as a local root", location.bucket()))?
            };
            Arc::new(fs)
        }
        StoreScheme::Memory => Arc::new(InMemory::new()),
    };

    tracing::debug!(scheme = location.scheme().as_str(), bucket = location.bucket(), "object store ready");
    Ok(store)
}

/// Clients for the destination named by `uri`
pub fn sink_clients(uri: &str, ctx: &Context) -> Result<SinkClients> {
    let destination = DestinationUri::parse(uri).with_context(|| format!("invalid destination '{uri}'"))?;
    let mut clients = SinkClients {
        store: None,
        warehouse: None,
    };

    match destination {
        DestinationUri::ObjectStore(location) => {
            clients.store = Some(open_store(&location, &ctx.config.storage, &ctx.credentials)?);
        }
        DestinationUri::Warehouse(table) => {
            let warehouse = &ctx.config.warehouse;
            let creds: Option<ClickHouseCredentials> =
                ctx.credentials.optional_as(warehouse.credentials_key.as_deref())?;
            let client: Arc<dyn WarehouseClient> =
                Arc::new(ClickHouseClient::new(ClickHouseClientConfig::for_table(&table, warehouse, creds))?);
            clients.warehouse = Some(client);
        }
    }
    Ok(clients)
}

/// Table selection for the configured source
pub fn table_filter(source: &SourceConfig) -> TableFilter {
    match source {
        SourceConfig::Salesforce(sf) => TableFilter::from_config(sf),
        SourceConfig::Postgres(_) => TableFilter::new(),
    }
}

/// Connected multi-table source
pub enum Catalog {
    #[cfg(feature = "postgres")]
    Postgres(PostgresCatalog),
    #[cfg(feature = "salesforce")]
    Salesforce(SalesforceClient),
}

/// Connect to the `[source]` catalog
///
/// Fails before any remote call when the source's connector was not
/// compiled in or its credential is missing.
pub async fn connect_catalog(ctx: &Context) -> Result<Catalog> {
    let source = ctx.config.require_source()?;
    tracing::info!(source = source.kind(), "connecting to source");

    match source {
        #[cfg(feature = "postgres")]
        SourceConfig::Postgres(pg) => {
            let creds: PostgresCredentials = ctx.credentials.require_as(&pg.credentials_key)?;
            Ok(Catalog::Postgres(PostgresCatalog::connect(pg, &creds)?))
        }
        #[cfg(feature = "salesforce")]
        SourceConfig::Salesforce(sf) => {
            let creds: SalesforceCredentials = ctx.credentials.require_as(&sf.credentials_key)?;
            let client = SalesforceClient::login(sf, &creds)
                .await
                .context("Salesforce login failed")?;
            Ok(Catalog::Salesforce(client))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!(
            "connector '{}' is not available. Available: {:?}",
            other.kind(),
            arrival_connectors::available_connectors()
        ),
    }
}

#[cfg(test)]
#[path = "clients_test.rs"]
mod clients_test;
