//! Extract command - Copy one dataset instance into a destination
//!
//! The load descriptor comes from the sensing phase. The destination is
//! either an object-store prefix or a warehouse table.

use anyhow::{Context as _, Result};
use arrival_config::SourceConfig;
use arrival_connectors::RowSource;
use arrival_pipeline::{ExtractOptions, ExtractSummary, extract};
use arrival_protocol::LoadDescriptor;
use arrival_sinks::Destination;
use clap::Args;

use super::Context;
use crate::clients::{self, Catalog};

#[cfg(feature = "salesforce")]
use arrival_connectors::TableCatalog;

/// Extract command arguments
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Load descriptor produced by `sense`, as JSON
    #[arg(long, env = "ARRIVAL_LOAD_INFO", value_parser = parse_load_info)]
    load_info: LoadDescriptor,

    /// Destination URI (s3://, gs://, file://, memory:// or clickhouse://)
    #[arg(short, long, env = "ARRIVAL_DESTINATION")]
    destination: String,

    /// Source table, overriding the load descriptor's table name
    #[arg(short, long)]
    table: Option<String>,
}

/// Run the extract command
pub async fn run(args: ExtractArgs, ctx: &Context) -> Result<()> {
    let source = ctx.config.require_source()?;
    let options = ExtractOptions::from_config(&ctx.config.extract);

    // Destination problems surface before the source is contacted
    let sink_clients = clients::sink_clients(&args.destination, ctx)?;
    let mut sink = Destination::open(&args.destination, &sink_clients, ctx.config.extract.compression)?;

    tracing::info!(
        source = source.kind(),
        destination = %args.destination,
        kind = sink.kind(),
        instance_ts = %args.load_info.instance_ts,
        "extracting"
    );

    let catalog = clients::connect_catalog(ctx).await?;
    let summary = match (&catalog, source) {
        #[cfg(feature = "postgres")]
        (Catalog::Postgres(pg), SourceConfig::Postgres(config)) => {
            let mut rows = pg.open_load(config, &args.load_info).await?;
            copy(&mut rows, &mut sink, options).await?
        }
        #[cfg(feature = "salesforce")]
        (Catalog::Salesforce(sf), SourceConfig::Salesforce(config)) => {
            let table = args
                .table
                .as_deref()
                .or(args.load_info.table_name.as_deref())
                .context("Salesforce extraction needs a table: set --table or load_info.table_name")?;
            let mut rows = sf.open_table(table, config.columns_for(table)).await?;
            copy(&mut rows, &mut sink, options).await?
        }
        #[allow(unreachable_patterns)]
        _ => anyhow::bail!("catalog does not match source '{}'", source.kind()),
    };

    tracing::info!(
        destination = %args.destination,
        rows = summary.rows,
        batches = summary.batches,
        "extract finished"
    );
    Ok(())
}

async fn copy<S: RowSource>(source: &mut S, sink: &mut Destination, options: ExtractOptions) -> Result<ExtractSummary> {
    extract(source, sink, options)
        .await
        .context("extraction failed, destination left without completion marker")
}

fn parse_load_info(value: &str) -> Result<LoadDescriptor, String> {
    serde_json::from_str(value).map_err(|e| format!("invalid load descriptor: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_load_info() {
        let load = parse_load_info(
            r#"{"instance_ts": "2023-01-01 00:00:00", "instance_ts_precision": "D",
                "locking_seconds": 600, "period_end": "2023-01-02 00:00:00", "table_name": "Account"}"#,
        )
        .unwrap();
        assert_eq!(load.table_name.as_deref(), Some("Account"));
        assert!(load.period_end.is_some());
    }

    #[test]
    fn test_parse_load_info_rejects_bad_timestamp() {
        let err = parse_load_info(
            r#"{"instance_ts": "20230101", "instance_ts_precision": "D", "locking_seconds": 0}"#,
        )
        .unwrap_err();
        assert!(err.starts_with("invalid load descriptor"));
    }
}
