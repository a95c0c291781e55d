//! Source configuration types
//!
//! The `[source]` section names where extraction reads rows from.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Source configuration, selected by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A PostgreSQL table or query
    Postgres(PostgresSourceConfig),
    /// Salesforce objects over the REST API
    Salesforce(SalesforceSourceConfig),
}

impl SourceConfig {
    /// Source type name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Salesforce(_) => "salesforce",
        }
    }

    /// Credentials key naming the source secret
    pub fn credentials_key(&self) -> &str {
        match self {
            Self::Postgres(pg) => &pg.credentials_key,
            Self::Salesforce(sf) => &sf.credentials_key,
        }
    }
}

/// PostgreSQL source configuration
///
/// Connection details come from the credential named by `credentials_key`,
/// a JSON object with `host`, `port`, `username` and `password`.
///
/// # Example
///
/// ```toml
/// [source]
/// type = "postgres"
/// credentials_key = "postgres.orders"
/// database = "shop"
/// table = "orders"
/// custom_sql = "select * from {table} where created_at >= '{instance_ts}' and created_at < '{period_end}'"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresSourceConfig {
    /// Default: postgres
    pub credentials_key: String,

    /// Database name (required)
    pub database: String,

    /// Schema holding the table
    /// Default: public
    pub schema: String,

    /// Table to copy (required)
    pub table: String,

    /// Query template; `{table}`, `{instance_ts}`, `{instance_ts_precision}`
    /// and `{period_end}` are substituted
    /// Default: select * from {table}
    pub custom_sql: Option<String>,

    /// Connect timeout
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for PostgresSourceConfig {
    fn default() -> Self {
        Self {
            credentials_key: "postgres".into(),
            database: String::new(),
            schema: "public".into(),
            table: String::new(),
            custom_sql: None,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-table options for multi-table sources
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableDetails {
    /// Columns to select; all columns when absent
    pub columns: Option<Vec<String>>,
}

/// Salesforce source configuration
///
/// The credential named by `credentials_key` is a JSON object with
/// `username`, `password`, `security_token`, `client_id` and `client_secret`.
///
/// # Example
///
/// ```toml
/// [source]
/// type = "salesforce"
/// table_denylist = ["LoginHistory"]
/// mandatory_tables = ["Account"]
///
/// [source.table_details.Account]
/// columns = ["Id", "Name", "BillingAddress"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SalesforceSourceConfig {
    /// Default: salesforce
    pub credentials_key: String,

    /// OAuth login host
    /// Default: https://login.salesforce.com
    pub login_url: String,

    /// REST API version
    /// Default: v59.0
    pub api_version: String,

    /// Only these tables are loaded, when set
    pub table_allowlist: Option<Vec<String>>,

    /// These tables are never loaded
    pub table_denylist: Vec<String>,

    /// Include tables on the built-in exclusion list
    /// Default: false
    pub ignore_recommended_excluded_tables: bool,

    /// Column selection per table
    pub table_details: HashMap<String, TableDetails>,

    /// Failure of any of these tables fails the run
    pub mandatory_tables: Vec<String>,

    /// HTTP request timeout
    /// Default: 120s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SalesforceSourceConfig {
    fn default() -> Self {
        Self {
            credentials_key: "salesforce".into(),
            login_url: "https://login.salesforce.com".into(),
            api_version: "v59.0".into(),
            table_allowlist: None,
            table_denylist: Vec::new(),
            ignore_recommended_excluded_tables: false,
            table_details: HashMap::new(),
            mandatory_tables: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl SalesforceSourceConfig {
    /// Configured column selection for a table
    pub fn columns_for(&self, table: &str) -> Option<&[String]> {
        self.table_details
            .get(table)
            .and_then(|details| details.columns.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_source() {
        let config: SourceConfig = toml::from_str(
            r#"
type = "postgres"
database = "shop"
table = "orders"
connect_timeout = "5s"
"#,
        )
        .unwrap();
        assert_eq!(config.kind(), "postgres");
        assert_eq!(config.credentials_key(), "postgres");
        let SourceConfig::Postgres(pg) = config else {
            panic!("expected postgres source");
        };
        assert_eq!(pg.schema, "public");
        assert_eq!(pg.connect_timeout, Duration::from_secs(5));
        assert!(pg.custom_sql.is_none());
    }

    #[test]
    fn test_salesforce_table_details() {
        let config: SourceConfig = toml::from_str(
            r#"
type = "salesforce"
table_allowlist = ["Account", "Contact"]
mandatory_tables = ["Account"]

[table_details.Account]
columns = ["Id", "Name"]
"#,
        )
        .unwrap();
        let SourceConfig::Salesforce(sf) = config else {
            panic!("expected salesforce source");
        };
        assert_eq!(sf.api_version, "v59.0");
        assert_eq!(
            sf.columns_for("Account"),
            Some(&["Id".to_string(), "Name".to_string()][..])
        );
        assert_eq!(sf.columns_for("Contact"), None);
        assert_eq!(sf.mandatory_tables, vec!["Account"]);
    }
}
