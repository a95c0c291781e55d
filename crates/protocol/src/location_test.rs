//! Tests for storage and warehouse URIs

use crate::error::ProtocolError;
use crate::location::{DestinationUri, StorageLocation, StoreScheme, WarehouseTable};

// =============================================================================
// StorageLocation
// =============================================================================

#[test]
fn test_parse_bucket_and_prefix() {
    let loc: StorageLocation = "s3://b/p/".parse().unwrap();
    assert_eq!(loc.scheme(), StoreScheme::S3);
    assert_eq!(loc.bucket(), "b");
    assert_eq!(loc.prefix(), "p/");
    assert_eq!(loc.uri(), "s3://b/p/");
}

#[test]
fn test_parse_bucket_without_prefix() {
    let loc: StorageLocation = "gs://bucket".parse().unwrap();
    assert_eq!(loc.bucket(), "bucket");
    assert_eq!(loc.prefix(), "");
}

#[test]
fn test_parse_file_uri_has_empty_bucket() {
    let loc: StorageLocation = "file:///tmp/out/".parse().unwrap();
    assert_eq!(loc.scheme(), StoreScheme::File);
    assert_eq!(loc.bucket(), "");
    assert_eq!(loc.prefix(), "tmp/out/");
    assert_eq!(loc.uri(), "file:///tmp/out/");
}

#[test]
fn test_child_and_key() {
    let loc: StorageLocation = "s3://b/p/".parse().unwrap();
    let child = loc.child("20230101");
    assert_eq!(child.uri(), "s3://b/p/20230101/");
    assert_eq!(child.key("_SUCCESS"), "p/20230101/_SUCCESS");
}

#[test]
fn test_as_folder_adds_trailing_slash() {
    let loc: StorageLocation = "s3://b/out".parse().unwrap();
    assert_eq!(loc.as_folder().prefix(), "out/");
    let loc: StorageLocation = "s3://b/out/".parse().unwrap();
    assert_eq!(loc.as_folder().prefix(), "out/");
}

#[test]
fn test_storage_rejects_unknown_scheme_and_missing_bucket() {
    assert!(matches!(
        "ftp://host/x".parse::<StorageLocation>(),
        Err(ProtocolError::UnknownScheme { .. })
    ));
    assert!(matches!(
        "s3:///p/".parse::<StorageLocation>(),
        Err(ProtocolError::MalformedUri { .. })
    ));
    assert!(matches!(
        "no-scheme".parse::<StorageLocation>(),
        Err(ProtocolError::MalformedUri { .. })
    ));
}

// =============================================================================
// WarehouseTable
// =============================================================================

#[test]
fn test_parse_warehouse_table() {
    let table: WarehouseTable = "clickhouse://ch:8123/analytics/orders".parse().unwrap();
    assert_eq!(table.scheme(), "clickhouse");
    assert_eq!(table.authority(), "ch:8123");
    assert_eq!(table.namespace(), ["analytics".to_string()]);
    assert_eq!(table.table(), "orders");
    assert_eq!(table.to_string(), "clickhouse://ch:8123/analytics/orders");
}

#[test]
fn test_warehouse_requires_namespace_and_table() {
    assert!("clickhouse://ch:8123/orders".parse::<WarehouseTable>().is_err());
    assert!("clickhouse:///db/orders".parse::<WarehouseTable>().is_err());
}

#[test]
fn test_with_table_keeps_namespace() {
    let table: WarehouseTable = "clickhouse://ch/db/orders".parse().unwrap();
    assert_eq!(
        table.with_table("customers").to_string(),
        "clickhouse://ch/db/customers"
    );
}

// =============================================================================
// DestinationUri
// =============================================================================

#[test]
fn test_destination_dispatch_by_scheme() {
    assert!(matches!(
        DestinationUri::parse("s3://b/out/").unwrap(),
        DestinationUri::ObjectStore(_)
    ));
    assert!(matches!(
        DestinationUri::parse("clickhouse://ch/db/t").unwrap(),
        DestinationUri::Warehouse(_)
    ));
}

#[test]
fn test_destination_unknown_scheme_names_uri() {
    let err = DestinationUri::parse("bq://project/dataset/table").unwrap_err();
    assert!(err.to_string().contains("bq://project/dataset/table"));
}
