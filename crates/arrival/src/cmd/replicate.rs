//! Replicate command - Copy every selected table of a multi-table source
//!
//! Each table lands at `<destination><table>/`. Tables that fail to read are
//! reported and skipped; the command fails when a destination fails or a
//! mandatory table did not load.

use anyhow::{Context as _, Result};
use arrival_config::{Compression, SourceConfig};
use arrival_connectors::TableCatalog;
use arrival_pipeline::{ExtractOptions, Replication, ReplicationReport, table_uri};
use arrival_sinks::{Destination, SinkClients};
use clap::Args;

use super::Context;
use crate::clients::{self, Catalog};

/// Replicate command arguments
#[derive(Args, Debug)]
pub struct ReplicateArgs {
    /// Base destination URI; each table is written below it
    #[arg(short, long, env = "ARRIVAL_DESTINATION")]
    destination: String,

    /// Replicate only these tables instead of discovering them
    #[arg(short, long, value_delimiter = ',')]
    tables: Vec<String>,
}

/// Run the replicate command
pub async fn run(args: ReplicateArgs, ctx: &Context) -> Result<()> {
    let source = ctx.config.require_source()?;
    let replication = match source {
        SourceConfig::Salesforce(sf) => Replication::from_config(sf, &ctx.config.extract),
        SourceConfig::Postgres(_) => Replication {
            options: ExtractOptions::from_config(&ctx.config.extract),
            ..Default::default()
        },
    };

    let catalog = clients::connect_catalog(ctx).await?;
    let tables = if args.tables.is_empty() {
        super::tables::discover(&catalog, &clients::table_filter(source)).await?
    } else {
        args.tables.clone()
    };
    if tables.is_empty() {
        tracing::warn!(source = source.kind(), "no tables selected, nothing to replicate");
        return Ok(());
    }

    // One set of clients serves every table below the base URI
    let sink_clients = clients::sink_clients(&table_uri(&args.destination, &tables[0]), ctx)?;
    let compression = ctx.config.extract.compression;

    let report = match &catalog {
        #[cfg(feature = "postgres")]
        Catalog::Postgres(pg) => {
            replicate(pg, &replication, &tables, &args.destination, &sink_clients, compression).await?
        }
        #[cfg(feature = "salesforce")]
        Catalog::Salesforce(sf) => {
            replicate(sf, &replication, &tables, &args.destination, &sink_clients, compression).await?
        }
    };

    for (table, outcome) in report.outcomes() {
        tracing::info!(table = %table, outcome = %outcome, "table outcome");
    }
    Ok(())
}

async fn replicate<C: TableCatalog>(
    catalog: &C,
    replication: &Replication,
    tables: &[String],
    base_uri: &str,
    sink_clients: &SinkClients,
    compression: Compression,
) -> Result<ReplicationReport> {
    replication
        .run(catalog, tables, base_uri, |_, uri| {
            Destination::open(uri, sink_clients, compression)
        })
        .await
        .with_context(|| format!("replication into '{base_uri}' failed"))
}
