//! Tables command - List the tables a multi-table source would replicate

use std::io::Write;

use anyhow::Result;
use arrival_connectors::TableFilter;
use arrival_pipeline::discover_tables;
use clap::Args;

use super::Context;
use crate::clients::{self, Catalog};

/// Tables command arguments
#[derive(Args, Debug)]
pub struct TablesArgs {
    /// List every table, ignoring allowlist, denylist and recommended exclusions
    #[arg(long)]
    all: bool,
}

/// Run the tables command
pub async fn run(args: TablesArgs, ctx: &Context) -> Result<()> {
    let source = ctx.config.require_source()?;
    let filter = if args.all {
        TableFilter::new()
    } else {
        clients::table_filter(source)
    };

    let catalog = clients::connect_catalog(ctx).await?;
    let tables = discover(&catalog, &filter).await?;

    let mut out = std::io::stdout().lock();
    for table in &tables {
        writeln!(out, "{table}")?;
    }
    out.flush()?;
    Ok(())
}

/// Filtered, sorted table names of a connected catalog
pub async fn discover(catalog: &Catalog, filter: &TableFilter) -> Result<Vec<String>> {
    let tables = match catalog {
        #[cfg(feature = "postgres")]
        Catalog::Postgres(pg) => discover_tables(pg, filter).await?,
        #[cfg(feature = "salesforce")]
        Catalog::Salesforce(sf) => discover_tables(sf, filter).await?,
    };
    Ok(tables)
}
