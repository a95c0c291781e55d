//! Batch sink contract and destination dispatch

use std::future::Future;
use std::sync::Arc;

use arrival_config::Compression;
use arrival_protocol::{Batch, Column, DestinationUri};
use object_store::ObjectStore;

use crate::error::SinkError;
use crate::store::ObjectStoreSink;
use crate::warehouse::{WarehouseClient, WarehouseSink};

/// Receives the batches of one extraction run
///
/// Call order is `prepare` once, `append` for each batch in sequence, then
/// `finish` once after every `append` succeeded. A failed run leaves no
/// completion marker and may be retried from batch 0.
pub trait BatchSink: Send {
    /// Set up the destination for a column list
    fn prepare(&mut self, columns: &[Column]) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Write one batch
    fn append(&mut self, batch: &Batch) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Mark the destination complete
    fn finish(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Clients a destination may need, built once by the caller
#[derive(Clone)]
pub struct SinkClients {
    pub store: Option<Arc<dyn ObjectStore>>,
    pub warehouse: Option<Arc<dyn WarehouseClient>>,
}

/// Concrete destination, selected by URI scheme
#[derive(Debug)]
pub enum Destination {
    ObjectStore(ObjectStoreSink),
    Warehouse(WarehouseSink),
}

impl Destination {
    /// Parse `uri` and build the matching sink
    ///
    /// Fails before any remote call when the scheme is unknown or the
    /// client for it was not supplied.
    pub fn open(uri: &str, clients: &SinkClients, compression: Compression) -> Result<Self, SinkError> {
        match DestinationUri::parse(uri)? {
            DestinationUri::ObjectStore(location) => {
                let store = clients
                    .store
                    .clone()
                    .ok_or_else(|| SinkError::Connection(format!("no object store client for '{uri}'")))?;
                Ok(Self::ObjectStore(ObjectStoreSink::new(store, location, compression)))
            }
            DestinationUri::Warehouse(table) => {
                let client = clients
                    .warehouse
                    .clone()
                    .ok_or_else(|| SinkError::Connection(format!("no warehouse client for '{uri}'")))?;
                Ok(Self::Warehouse(WarehouseSink::new(client, table)))
            }
        }
    }

    /// Destination kind used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ObjectStore(_) => "object_store",
            Self::Warehouse(_) => "warehouse",
        }
    }
}

impl BatchSink for Destination {
    async fn prepare(&mut self, columns: &[Column]) -> Result<(), SinkError> {
        match self {
            Self::ObjectStore(sink) => sink.prepare(columns).await,
            Self::Warehouse(sink) => sink.prepare(columns).await,
        }
    }

    async fn append(&mut self, batch: &Batch) -> Result<(), SinkError> {
        match self {
            Self::ObjectStore(sink) => sink.append(batch).await,
            Self::Warehouse(sink) => sink.append(batch).await,
        }
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        match self {
            Self::ObjectStore(sink) => sink.finish().await,
            Self::Warehouse(sink) => sink.finish().await,
        }
    }
}

impl std::fmt::Debug for SinkClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkClients")
            .field("store", &self.store.is_some())
            .field("warehouse", &self.warehouse.is_some())
            .finish()
    }
}
