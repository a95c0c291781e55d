//! Object-store sink
//!
//! Writes each batch as one object under the destination prefix:
//!
//! ```text
//! <uri>part-00000.gz
//! <uri>part-00001.gz
//! <uri>_SUCCESS
//! ```
//!
//! The body is NDJSON, optionally gzip-compressed, or a Parquet file with an
//! explicit schema. A retried run starts again at `part-00000` and
//! overwrites earlier parts.
//!
//! The URI always names a folder: `s3://b/out` writes `out/part-00000`.

use std::io::Write;
use std::sync::Arc;

use arrival_config::Compression;
use arrival_protocol::{Batch, Column, SUCCESS_MARKER, StorageLocation};
use arrow::datatypes::SchemaRef;
use bytes::Bytes;
use flate2::write::GzEncoder;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::columnar;
use crate::encode::RowEncoder;
use crate::error::SinkError;
use crate::sink::BatchSink;

/// Encoding state built in `prepare`
enum Format {
    Ndjson(RowEncoder),
    Gzip(RowEncoder),
    Parquet(SchemaRef),
}

/// Object-store destination
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    location: StorageLocation,
    compression: Compression,
    format: Option<Format>,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>, location: StorageLocation, compression: Compression) -> Self {
        Self {
            store,
            location: location.as_folder(),
            compression,
            format: None,
        }
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// File extension for part objects
    pub fn extension(&self) -> &'static str {
        match self.compression {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Parquet => ".parquet",
        }
    }

    fn encode(&self, batch: &Batch) -> Result<Vec<u8>, SinkError> {
        match &self.format {
            None => Err(SinkError::NotPrepared(self.location.uri())),
            Some(Format::Ndjson(encoder)) => encoder.encode_ndjson(batch.rows()),
            Some(Format::Gzip(encoder)) => {
                let body = encoder.encode_ndjson(batch.rows())?;
                let mut gz = GzEncoder::new(Vec::with_capacity(body.len() / 4), flate2::Compression::default());
                gz.write_all(&body)?;
                Ok(gz.finish()?)
            }
            Some(Format::Parquet(schema)) => columnar::write_parquet(Arc::clone(schema), batch.rows()),
        }
    }

    async fn put(&self, name: &str, body: Vec<u8>) -> Result<usize, SinkError> {
        let key = self.location.key(name);
        let size = body.len();
        self.store
            .put(&Path::from(key.as_str()), PutPayload::from_bytes(Bytes::from(body)))
            .await
            .map_err(|e| SinkError::store(format!("{}{}", self.location.uri(), name), e))?;
        Ok(size)
    }
}

impl BatchSink for ObjectStoreSink {
    async fn prepare(&mut self, columns: &[Column]) -> Result<(), SinkError> {
        self.format = Some(match self.compression {
            Compression::None => Format::Ndjson(RowEncoder::new(columns)),
            Compression::Gzip => Format::Gzip(RowEncoder::new(columns)),
            Compression::Parquet => Format::Parquet(columnar::arrow_schema(columns)),
        });
        tracing::debug!(
            destination = %self.location,
            columns = columns.len(),
            compression = ?self.compression,
            "object store sink prepared"
        );
        Ok(())
    }

    async fn append(&mut self, batch: &Batch) -> Result<(), SinkError> {
        let body = self.encode(batch)?;
        let name = batch.part_name(self.extension());
        let bytes = self.put(&name, body).await?;
        tracing::info!(
            destination = %self.location,
            part = %name,
            rows = batch.len(),
            bytes,
            "batch written"
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if self.format.is_none() {
            return Err(SinkError::NotPrepared(self.location.uri()));
        }
        self.put(SUCCESS_MARKER, Vec::new()).await?;
        tracing::info!(destination = %self.location, "success marker written");
        Ok(())
    }
}

impl std::fmt::Debug for ObjectStoreSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreSink")
            .field("location", &self.location)
            .field("compression", &self.compression)
            .field("prepared", &self.format.is_some())
            .finish()
    }
}
