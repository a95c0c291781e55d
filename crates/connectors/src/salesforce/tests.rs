//! Tests for Salesforce metadata and record handling

use arrival_protocol::{SourceType, Value};
use serde_json::json;

use crate::error::SourceError;
use crate::salesforce::{
    SObjectDescribe, SalesforceCredentials, build_soql, field_source_type, record_to_row,
    select_fields,
};

fn account_describe() -> SObjectDescribe {
    serde_json::from_value(json!({
        "name": "Account",
        "queryable": true,
        "retrieveable": true,
        "fields": [
            {"name": "Id", "type": "id", "length": 18},
            {"name": "Name", "type": "string"},
            {"name": "AnnualRevenue", "type": "currency", "precision": 18, "scale": 0},
            {"name": "NumberOfEmployees", "type": "int"},
            {"name": "IsDeleted", "type": "boolean"},
            {"name": "BillingAddress", "type": "address"},
            {"name": "CreatedDate", "type": "datetime"},
            {"name": "LastActivityDate", "type": "date"}
        ]
    }))
    .unwrap()
}

// =============================================================================
// Type mapping
// =============================================================================

#[test]
fn test_field_types() {
    assert_eq!(field_source_type("boolean"), SourceType::Boolean);
    assert_eq!(field_source_type("int"), SourceType::BigInt);
    assert_eq!(field_source_type("long"), SourceType::BigInt);
    assert_eq!(field_source_type("double"), SourceType::Double);
    assert_eq!(field_source_type("currency"), SourceType::Double);
    assert_eq!(field_source_type("percent"), SourceType::Double);
    assert_eq!(field_source_type("date"), SourceType::Date);
    assert_eq!(field_source_type("datetime"), SourceType::String);
    assert_eq!(field_source_type("reference"), SourceType::String);
    assert_eq!(field_source_type("somethingNew"), SourceType::String);
}

// =============================================================================
// Field selection
// =============================================================================

#[test]
fn test_all_fields_nullable_in_order() {
    let columns = select_fields(&account_describe(), None).unwrap();
    assert_eq!(columns.len(), 8);
    assert_eq!(columns[0].name, "Id");
    assert_eq!(columns[2].source_type, SourceType::Double);
    assert!(columns.iter().all(|c| c.nullable));
}

#[test]
fn test_requested_fields() {
    let requested = vec!["Name".to_string(), "Id".to_string()];
    let columns = select_fields(&account_describe(), Some(&requested)).unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Name", "Id"]);
}

#[test]
fn test_unknown_requested_fields() {
    let requested = vec!["Name".to_string(), "Nope".to_string()];
    let err = select_fields(&account_describe(), Some(&requested)).unwrap_err();
    match err {
        SourceError::UnknownColumns { table, columns } => {
            assert_eq!(table, "Account");
            assert_eq!(columns, vec!["Nope"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_soql() {
    let requested = vec!["Id".to_string(), "Name".to_string()];
    let columns = select_fields(&account_describe(), Some(&requested)).unwrap();
    assert_eq!(build_soql("Account", &columns), "select Id, Name from Account");
}

// =============================================================================
// Records
// =============================================================================

#[test]
fn test_record_to_row() {
    let columns = select_fields(&account_describe(), None).unwrap();
    let record = json!({
        "attributes": {"type": "Account", "url": "/services/data/v59.0/sobjects/Account/001"},
        "Id": "001000000000001",
        "Name": "Acme",
        "AnnualRevenue": 1250000.5,
        "NumberOfEmployees": 42,
        "IsDeleted": false,
        "BillingAddress": {"city": "Paris", "country": "FR"},
        "CreatedDate": "2023-01-01T10:00:00.000+0000",
        "LastActivityDate": null
    });
    let serde_json::Value::Object(record) = record else {
        unreachable!()
    };

    let row = record_to_row(record, &columns);
    assert_eq!(
        row,
        vec![
            Value::Text("001000000000001".into()),
            Value::Text("Acme".into()),
            Value::Float(1250000.5),
            Value::Int(42),
            Value::Bool(false),
            Value::Json(json!({"city": "Paris", "country": "FR"})),
            Value::Text("2023-01-01T10:00:00.000+0000".into()),
            Value::Null,
        ]
    );
}

#[test]
fn test_record_missing_fields_are_null() {
    let requested = vec!["Id".to_string(), "Name".to_string()];
    let columns = select_fields(&account_describe(), Some(&requested)).unwrap();
    let serde_json::Value::Object(record) = json!({"Id": "001"}) else {
        unreachable!()
    };
    assert_eq!(
        record_to_row(record, &columns),
        vec![Value::Text("001".into()), Value::Null]
    );
}

#[test]
fn test_credentials_hide_secrets() {
    let creds: SalesforceCredentials = serde_json::from_value(json!({
        "username": "etl@example.com",
        "password": "pw",
        "security_token": "tok",
        "client_id": "cid",
        "client_secret": "csecret"
    }))
    .unwrap();
    let debug = format!("{creds:?}");
    assert!(debug.contains("etl@example.com"));
    assert!(!debug.contains("csecret"));
    assert!(!debug.contains("tok"));
}
