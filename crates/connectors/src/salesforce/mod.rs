//! Salesforce object source
//!
//! Logs in with the OAuth2 username-password flow, lists objects through
//! `sobjects`, and reads one object with a SOQL query that follows
//! `nextRecordsUrl` until the result is done.
//!
//! Field types are taken from `describe`. Every column is nullable; the REST
//! API omits or nulls fields the user cannot see.

use std::collections::VecDeque;
use std::time::Duration;

use arrival_config::SalesforceSourceConfig;
use arrival_protocol::{Column, Row, SourceType, Value};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::traits::{RowSource, TableCatalog};

/// Login secret, stored under the source's `credentials_key`
#[derive(Clone, Deserialize)]
pub struct SalesforceCredentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub security_token: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
struct GlobalDescribe {
    sobjects: Vec<SObjectSummary>,
}

#[derive(Debug, Deserialize)]
struct SObjectSummary {
    name: String,
}

/// Object metadata from `sobjects/<name>/describe`
#[derive(Debug, Clone, Deserialize)]
pub struct SObjectDescribe {
    pub name: String,
    #[serde(default)]
    pub queryable: bool,
    pub fields: Vec<FieldDescribe>,
}

/// One field of an object
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescribe {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub scale: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    #[serde(default)]
    done: bool,
    next_records_url: Option<String>,
    #[serde(default)]
    records: Vec<Map<String, Json>>,
}

/// Source type for a Salesforce field type
pub fn field_source_type(field_type: &str) -> SourceType {
    match field_type {
        "boolean" => SourceType::Boolean,
        "int" | "long" => SourceType::BigInt,
        "double" | "currency" | "percent" => SourceType::Double,
        "date" => SourceType::Date,
        _ => SourceType::String,
    }
}

/// Columns for the requested fields, or all fields in describe order
///
/// Requesting a field the object does not have is an error naming every
/// unknown field.
pub fn select_fields(
    describe: &SObjectDescribe,
    requested: Option<&[String]>,
) -> Result<Vec<Column>, SourceError> {
    let column = |field: &FieldDescribe| Column::new(&field.name, field_source_type(&field.field_type));

    let Some(requested) = requested else {
        return Ok(describe.fields.iter().map(column).collect());
    };

    let missing: Vec<String> = requested
        .iter()
        .filter(|name| !describe.fields.iter().any(|f| &f.name == *name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(SourceError::UnknownColumns {
            table: describe.name.clone(),
            columns: missing,
        });
    }

    Ok(requested
        .iter()
        .filter_map(|name| describe.fields.iter().find(|f| &f.name == name))
        .map(column)
        .collect())
}

/// SOQL selecting `columns` from `object`
pub fn build_soql(object: &str, columns: &[Column]) -> String {
    let names = columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("select {names} from {object}")
}

/// Row for one query record, in column order
///
/// The `attributes` entry is dropped; missing fields read as null.
pub fn record_to_row(mut record: Map<String, Json>, columns: &[Column]) -> Row {
    record.remove("attributes");
    columns
        .iter()
        .map(|column| match record.remove(&column.name) {
            None | Some(Json::Null) => Value::Null,
            Some(Json::Object(mut compound)) => {
                compound.remove("attributes");
                Value::Json(Json::Object(compound))
            }
            Some(other) => Value::from(other),
        })
        .collect()
}

/// Authenticated REST session
#[derive(Clone)]
pub struct SalesforceClient {
    client: reqwest::Client,
    instance_url: String,
    api_version: String,
    access_token: String,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Log in with the username-password flow
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or login is rejected
    pub async fn login(
        config: &SalesforceSourceConfig,
        credentials: &SalesforceCredentials,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent("arrival/0.1")
            .timeout(config.timeout.max(Duration::from_secs(1)))
            .build()
            .map_err(|e| SourceError::Init(format!("Salesforce HTTP client: {e}")))?;

        let password = format!("{}{}", credentials.password, credentials.security_token);
        let url = format!("{}/services/oauth2/token", config.login_url.trim_end_matches('/'));
        let response = client
            .post(&url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("username", credentials.username.as_str()),
                ("password", password.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::AuthFailed(format!("login rejected ({status}): {body}")));
        }

        let token: TokenResponse = response.json().await?;
        info!(instance = %token.instance_url, "salesforce session opened");

        Ok(Self {
            client,
            instance_url: token.instance_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            access_token: token.access_token,
        })
    }

    /// URL of a versioned REST resource
    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            reqwest::StatusCode::NOT_FOUND => Err(SourceError::TableNotFound(context.to_string())),
            reqwest::StatusCode::UNAUTHORIZED => {
                Err(SourceError::AuthFailed("session expired or invalid".into()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SourceError::api(context, status.as_u16(), body))
            }
        }
    }

    /// Names of all objects
    pub async fn list_objects(&self) -> Result<Vec<String>, SourceError> {
        let describe: GlobalDescribe = self.get_json(&self.api_url("sobjects/"), "sobjects").await?;
        Ok(describe.sobjects.into_iter().map(|s| s.name).collect())
    }

    /// Field metadata for one object
    pub async fn describe(&self, object: &str) -> Result<SObjectDescribe, SourceError> {
        let path = format!("sobjects/{}/describe/", urlencoding::encode(object));
        self.get_json(&self.api_url(&path), object).await
    }

    async fn query_page(&self, url: &str, object: &str) -> Result<QueryPage, SourceError> {
        self.get_json(url, object).await
    }
}

/// Paged SOQL read of one object
pub struct SalesforceSource {
    client: SalesforceClient,
    object: String,
    columns: Vec<Column>,
    pending: VecDeque<Row>,
    next_url: Option<String>,
}

impl SalesforceSource {
    fn new(client: SalesforceClient, object: &str, columns: Vec<Column>) -> Self {
        let soql = build_soql(object, &columns);
        let next_url = client.api_url(&format!("query/?q={}", urlencoding::encode(&soql)));
        debug!(object, soql = %soql, "salesforce query");
        Self {
            client,
            object: object.to_string(),
            columns,
            pending: VecDeque::new(),
            next_url: Some(next_url),
        }
    }

    async fn load_page(&mut self) -> Result<(), SourceError> {
        let Some(url) = self.next_url.take() else {
            return Ok(());
        };
        let page = self.client.query_page(&url, &self.object).await?;
        debug!(
            object = %self.object,
            records = page.records.len(),
            done = page.done,
            "query page received"
        );

        self.pending.extend(
            page.records
                .into_iter()
                .map(|record| record_to_row(record, &self.columns)),
        );
        if !page.done {
            self.next_url = page
                .next_records_url
                .map(|path| format!("{}{}", self.client.instance_url, path));
        }
        Ok(())
    }
}

impl RowSource for SalesforceSource {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    async fn fetch(&mut self, max_rows: usize) -> Result<Vec<Row>, SourceError> {
        let max_rows = max_rows.max(1);
        while self.pending.len() < max_rows && self.next_url.is_some() {
            self.load_page().await?;
        }
        let take = self.pending.len().min(max_rows);
        Ok(self.pending.drain(..take).collect())
    }
}

impl std::fmt::Debug for SalesforceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceSource")
            .field("object", &self.object)
            .field("columns", &self.columns.len())
            .field("buffered", &self.pending.len())
            .field("more", &self.next_url.is_some())
            .finish()
    }
}

impl TableCatalog for SalesforceClient {
    type Source = SalesforceSource;

    fn name(&self) -> &'static str {
        "salesforce"
    }

    async fn list_tables(&self) -> Result<Vec<String>, SourceError> {
        self.list_objects().await
    }

    async fn open_table(
        &self,
        table: &str,
        columns: Option<&[String]>,
    ) -> Result<SalesforceSource, SourceError> {
        let describe = self.describe(table).await?;
        if !describe.queryable {
            return Err(SourceError::NotQueryable(table.to_string()));
        }
        let columns = select_fields(&describe, columns)?;
        Ok(SalesforceSource::new(self.clone(), table, columns))
    }
}

#[cfg(test)]
mod tests;
