//! Arrival - Connectors
//!
//! Row sources the extraction loop reads from. A source is opened for one
//! table or query and then read forward in bounded fetches.
//!
//! # Available Connectors
//!
//! - **PostgreSQL** - A table, or a query templated with the load parameters
//! - **Salesforce** - Objects over the REST API, one table per object
//!
//! # Feature Flags
//!
//! Connectors can be selectively compiled using feature flags:
//!
//! ```toml
//! [dependencies]
//! arrival-connectors = { version = "0.1", default-features = false, features = ["postgres"] }
//! ```
//!
//! Available features:
//! - `postgres` (default) - PostgreSQL over `sqlx`
//! - `salesforce` (default) - Salesforce REST API over `reqwest`
//!
//! # Example
//!
//! ```ignore
//! use arrival_connectors::{PostgresCatalog, RowSource};
//!
//! let catalog = PostgresCatalog::connect(&config, &credentials)?;
//! let mut source = catalog.open_load(&config, &load).await?;
//! let rows = source.fetch(5000).await?;
//! ```

mod error;
mod filter;
mod traits;

// Conditionally compiled connectors
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "salesforce")]
mod salesforce;

// Re-exports
pub use error::SourceError;
pub use filter::{RECOMMENDED_EXCLUDED_TABLES, TableFilter};
pub use traits::{RowSource, TableCatalog};

#[cfg(feature = "postgres")]
pub use postgres::{
    PgColumn, PostgresCatalog, PostgresCredentials, PostgresSource, render_query,
};

#[cfg(feature = "salesforce")]
pub use salesforce::{
    SObjectDescribe, SalesforceClient, SalesforceCredentials, SalesforceSource, field_source_type,
};

/// List of available connector types (compiled in)
pub fn available_connectors() -> &'static [&'static str] {
    &[
        #[cfg(feature = "postgres")]
        "postgres",
        #[cfg(feature = "salesforce")]
        "salesforce",
    ]
}
