//! Tests for client wiring

use std::str::FromStr;

use arrival_config::Config;
use object_store::PutPayload;
use object_store::path::Path;

use super::*;

fn context(toml: &str, credentials: &str) -> Context {
    Context {
        config: Config::from_str(toml).unwrap(),
        credentials: Credentials::from_json(credentials).unwrap(),
    }
}

// =============================================================================
// Object stores
// =============================================================================

#[tokio::test]
async fn test_file_store_writes_below_absolute_path() {
    let dir = tempfile::tempdir().unwrap();
    let uri = format!("file://{}/out/", dir.path().display());
    let location: StorageLocation = uri.parse().unwrap();

    let store = open_store(&location, &StorageConfig::default(), &Credentials::default()).unwrap();
    store
        .put(&Path::from(location.key("part-00000")), PutPayload::from_static(b"{}"))
        .await
        .unwrap();

    assert!(dir.path().join("out").join("part-00000").exists());
}

#[test]
fn test_s3_store_with_named_keys() {
    let location: StorageLocation = "s3://bucket/prefix/".parse().unwrap();
    let storage = StorageConfig {
        credentials_key: Some("aws.access_key".into()),
        region: Some("eu-west-1".into()),
        request_payer: true,
    };
    let creds = Credentials::from_json(r#"{"aws.access_key": "{\"key\": \"AKIA\", \"skey\": \"secret\"}"}"#)
        .unwrap();

    assert!(open_store(&location, &storage, &creds).is_ok());
}

#[test]
fn test_s3_store_missing_credential() {
    let location: StorageLocation = "s3://bucket/prefix/".parse().unwrap();
    let storage = StorageConfig {
        credentials_key: Some("aws.access_key".into()),
        ..Default::default()
    };

    let err = open_store(&location, &storage, &Credentials::default()).unwrap_err();
    assert!(err.to_string().contains("aws.access_key"));
}

// =============================================================================
// Sink clients
// =============================================================================

#[test]
fn test_sink_clients_by_scheme() {
    let ctx = Context::default();

    let clients = sink_clients("memory://bucket/out/", &ctx).unwrap();
    assert!(clients.store.is_some());
    assert!(clients.warehouse.is_none());

    let clients = sink_clients("clickhouse://localhost:8123/analytics/accounts", &ctx).unwrap();
    assert!(clients.store.is_none());
    assert!(clients.warehouse.is_some());
}

#[test]
fn test_sink_clients_reject_unknown_scheme() {
    let err = sink_clients("ftp://host/path", &Context::default()).unwrap_err();
    assert!(format!("{err:#}").contains("ftp://host/path"));
}

#[test]
fn test_warehouse_credentials_must_exist() {
    let ctx = context("[warehouse]\ncredentials_key = \"clickhouse\"", "{}");
    let err = sink_clients("clickhouse://localhost:8123/analytics/accounts", &ctx).unwrap_err();
    assert!(err.to_string().contains("clickhouse"));
}

// =============================================================================
// Sources
// =============================================================================

#[test]
fn test_table_filter_per_source() {
    let ctx = context("[source]\ntype = \"salesforce\"\ntable_denylist = [\"Lead\"]", "{}");
    let filter = table_filter(ctx.config.require_source().unwrap());
    assert!(filter.allows("Account"));
    assert!(!filter.allows("Lead"));
    assert!(!filter.allows("Vote"));

    let ctx = context("[source]\ntype = \"postgres\"\ndatabase = \"shop\"\ntable = \"orders\"", "{}");
    let filter = table_filter(ctx.config.require_source().unwrap());
    assert!(filter.allows("Vote"));
}

#[tokio::test]
async fn test_connect_catalog_needs_source() {
    let result = connect_catalog(&Context::default()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_connect_catalog_missing_credential_fails_early() {
    let ctx = context("[source]\ntype = \"salesforce\"", "{}");
    let err = connect_catalog(&ctx).await.err().unwrap();
    assert!(err.to_string().contains("salesforce"));
}
