//! ClickHouse HTTP client
//!
//! Statements go in the request body of a POST to the HTTP interface; for
//! inserts the statement moves to the `query` parameter and the body carries
//! the rows.

use std::time::Duration;

use arrival_config::WarehouseConfig;
use arrival_protocol::WarehouseTable;
use async_trait::async_trait;
use serde::Deserialize;

use super::WarehouseClient;
use crate::error::SinkError;

/// Username and password as stored in the credentials file
#[derive(Clone, Deserialize)]
pub struct ClickHouseCredentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for ClickHouseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct ClickHouseClientConfig {
    /// HTTP endpoint, e.g. `http://localhost:8123`
    pub url: String,

    /// Database used for unqualified names
    pub database: String,

    pub credentials: Option<ClickHouseCredentials>,

    pub timeout: Duration,
}

impl ClickHouseClientConfig {
    /// Settings for the server named by a destination table
    pub fn for_table(
        table: &WarehouseTable,
        config: &WarehouseConfig,
        credentials: Option<ClickHouseCredentials>,
    ) -> Self {
        let scheme = if config.secure { "https" } else { "http" };
        Self {
            url: format!("{scheme}://{}", table.authority()),
            database: table
                .namespace()
                .first()
                .cloned()
                .unwrap_or_else(|| "default".into()),
            credentials,
            timeout: config.timeout,
        }
    }
}

/// ClickHouse client using the HTTP interface
#[derive(Clone)]
pub struct ClickHouseClient {
    client: reqwest::Client,
    config: ClickHouseClientConfig,
}

impl std::fmt::Debug for ClickHouseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseClient")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .finish()
    }
}

impl ClickHouseClient {
    pub fn new(config: ClickHouseClientConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Connection(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Endpoint URL, with the statement as a parameter when given
    fn build_url(&self, query: Option<&str>) -> String {
        let mut url = format!("{}/?database={}", self.config.url, urlencoding::encode(&self.config.database));
        if let Some(query) = query {
            url.push_str("&query=");
            url.push_str(&urlencoding::encode(query));
        }
        url
    }

    async fn post(&self, url: String, body: Vec<u8>, what: &str) -> Result<(), SinkError> {
        let mut request = self.client.post(&url).body(body);
        if let Some(creds) = &self.config.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await.map_err(|e| {
            SinkError::Connection(format!("ClickHouse connection failed: {e}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::warehouse(what, format!("ClickHouse error ({status}): {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl WarehouseClient for ClickHouseClient {
    async fn execute(&self, sql: &str) -> Result<(), SinkError> {
        tracing::debug!(sql, "executing statement");
        self.post(self.build_url(None), sql.as_bytes().to_vec(), sql)
            .await
    }

    async fn insert_json_rows(&self, table: &str, body: Vec<u8>) -> Result<(), SinkError> {
        let statement = format!("INSERT INTO {table} FORMAT JSONEachRow");
        self.post(self.build_url(Some(&statement)), body, table).await
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> WarehouseTable {
        "clickhouse://ch.internal:8123/analytics/orders".parse().unwrap()
    }

    #[test]
    fn test_config_for_table() {
        let config = ClickHouseClientConfig::for_table(&table(), &WarehouseConfig::default(), None);
        assert_eq!(config.url, "http://ch.internal:8123");
        assert_eq!(config.database, "analytics");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_secure_uses_https() {
        let warehouse = WarehouseConfig {
            secure: true,
            ..Default::default()
        };
        let config = ClickHouseClientConfig::for_table(&table(), &warehouse, None);
        assert_eq!(config.url, "https://ch.internal:8123");
    }

    #[test]
    fn test_build_url() {
        let config = ClickHouseClientConfig::for_table(&table(), &WarehouseConfig::default(), None);
        let client = ClickHouseClient::new(config).unwrap();
        assert_eq!(client.build_url(None), "http://ch.internal:8123/?database=analytics");

        let url = client.build_url(Some("INSERT INTO `analytics`.`orders` FORMAT JSONEachRow"));
        assert!(url.contains("&query=INSERT%20INTO%20"));
        assert!(url.ends_with("FORMAT%20JSONEachRow"));
    }

    #[test]
    fn test_credentials_shape() {
        let creds: ClickHouseCredentials =
            serde_json::from_str(r#"{"username": "loader", "password": "pw"}"#).unwrap();
        assert_eq!(creds.username, "loader");
        assert_eq!(creds.password, "pw");
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = ClickHouseClientConfig::for_table(
            &table(),
            &WarehouseConfig::default(),
            Some(ClickHouseCredentials {
                username: "loader".into(),
                password: "secret".into(),
            }),
        );
        let client = ClickHouseClient::new(config).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("ch.internal"));
        assert!(!debug.contains("secret"));
    }
}
