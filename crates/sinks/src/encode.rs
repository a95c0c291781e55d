//! Row encoding
//!
//! A [`RowEncoder`] is built once per destination from the column list. Each
//! column gets an encoding function chosen from its declared source type, so
//! rows are encoded without re-deciding the representation per value.
//!
//! Encoded rows are JSON objects keyed by column name. Null fields are
//! omitted entirely, which both warehouse `JSONEachRow` loads and NDJSON
//! readers treat as null.

use arrival_protocol::{Column, Row, SourceType, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Number, Value as Json};

use crate::error::SinkError;

/// Encodes one non-null value; `None` means it has no JSON form
pub type Encoder = fn(&Value) -> Option<Json>;

/// Schema-driven row encoder
#[derive(Clone)]
pub struct RowEncoder {
    names: Vec<String>,
    encoders: Vec<Encoder>,
}

impl RowEncoder {
    /// Build the encoder table for a column list
    pub fn new(columns: &[Column]) -> Self {
        Self {
            names: columns.iter().map(|c| c.name.clone()).collect(),
            encoders: columns.iter().map(|c| encoder_for(&c.source_type)).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Encode one row as a JSON object, omitting nulls
    pub fn encode(&self, row: &Row) -> Result<Map<String, Json>, SinkError> {
        if row.len() != self.names.len() {
            return Err(SinkError::RowWidth {
                expected: self.names.len(),
                actual: row.len(),
            });
        }

        let mut object = Map::new();
        for ((name, encode), value) in self.names.iter().zip(&self.encoders).zip(row) {
            if value.is_null() {
                continue;
            }
            let Some(encoded) = encode(value) else {
                return Err(SinkError::encode(name, format!("{value:?} has no JSON form")));
            };
            object.insert(name.clone(), encoded);
        }
        Ok(object)
    }

    /// Encode rows as newline-delimited JSON
    pub fn encode_ndjson(&self, rows: &[Row]) -> Result<Vec<u8>, SinkError> {
        let mut body = Vec::with_capacity(rows.len() * 64);
        for row in rows {
            serde_json::to_writer(&mut body, &self.encode(row)?)?;
            body.push(b'\n');
        }
        Ok(body)
    }
}

impl std::fmt::Debug for RowEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowEncoder").field("columns", &self.names).finish()
    }
}

/// Pick the encoding function for a source type
pub fn encoder_for(source_type: &SourceType) -> Encoder {
    match source_type {
        SourceType::Boolean => encode_bool,
        SourceType::TinyInt | SourceType::SmallInt | SourceType::Integer | SourceType::BigInt => {
            encode_int
        }
        SourceType::Real | SourceType::Double => encode_float,
        SourceType::Binary => encode_binary,
        SourceType::Decimal { .. }
        | SourceType::Date
        | SourceType::Time
        | SourceType::Timestamp
        | SourceType::Interval
        | SourceType::String
        | SourceType::Guid
        | SourceType::Json => encode_text,
    }
}

fn encode_bool(value: &Value) -> Option<Json> {
    match value {
        Value::Bool(b) => Some(Json::Bool(*b)),
        Value::Int(i) => Some(Json::Bool(*i != 0)),
        other => encode_text(other),
    }
}

fn encode_int(value: &Value) -> Option<Json> {
    match value {
        Value::Int(i) => Some(Json::from(*i)),
        Value::Bool(b) => Some(Json::from(i64::from(*b))),
        other => encode_float(other),
    }
}

fn encode_float(value: &Value) -> Option<Json> {
    match value {
        Value::Float(f) => Number::from_f64(*f).map(Json::Number),
        Value::Int(i) => Some(Json::from(*i)),
        other => encode_text(other),
    }
}

fn encode_binary(value: &Value) -> Option<Json> {
    match value {
        Value::Bytes(b) => Some(Json::String(STANDARD.encode(b))),
        other => encode_text(other),
    }
}

fn encode_text(value: &Value) -> Option<Json> {
    render_text(value).map(Json::String)
}

/// Text form of a value
///
/// Temporal values use `YYYY-MM-DD`, `HH:MM:SS[.ffffff]` and
/// `YYYY-MM-DD HH:MM:SS[.ffffff]`; bytes are base64; structured values are
/// JSON text.
pub fn render_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Text(s) => Some(s.clone()),
        Value::Bytes(b) => Some(STANDARD.encode(b)),
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => Some(t.format("%H:%M:%S%.f").to_string()),
        Value::Timestamp(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::Json(j) => Some(j.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", SourceType::BigInt).required(),
            Column::new("name", SourceType::String),
            Column::new("amount", SourceType::Decimal { precision: 12, scale: 2 }),
            Column::new("blob", SourceType::Binary),
            Column::new("day", SourceType::Date),
            Column::new("address", SourceType::Json),
            Column::new("active", SourceType::Boolean),
            Column::new("ratio", SourceType::Double),
        ]
    }

    #[test]
    fn test_encode_full_row() {
        let encoder = RowEncoder::new(&columns());
        let row = vec![
            Value::Int(7),
            Value::Text("Ada".into()),
            Value::Text("12.50".into()),
            Value::Bytes(b"hi".to_vec()),
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()),
            Value::Json(json!({"city": "Oslo"})),
            Value::Bool(true),
            Value::Float(0.5),
        ];

        let encoded = Json::Object(encoder.encode(&row).unwrap());
        assert_eq!(
            encoded,
            json!({
                "id": 7,
                "name": "Ada",
                "amount": "12.50",
                "blob": "aGk=",
                "day": "2023-01-02",
                "address": "{\"city\":\"Oslo\"}",
                "active": true,
                "ratio": 0.5
            })
        );
    }

    #[test]
    fn test_nulls_omitted() {
        let encoder = RowEncoder::new(&columns()[..2]);
        let encoded = encoder.encode(&vec![Value::Int(1), Value::Null]).unwrap();
        assert_eq!(encoded.len(), 1);
        assert!(!encoded.contains_key("name"));
    }

    #[test]
    fn test_row_width_checked() {
        let encoder = RowEncoder::new(&columns());
        let err = encoder.encode(&vec![Value::Int(1)]).unwrap_err();
        assert!(matches!(err, SinkError::RowWidth { expected: 8, actual: 1 }));
    }

    #[test]
    fn test_ndjson_lines() {
        let encoder = RowEncoder::new(&columns()[..1]);
        let body = encoder
            .encode_ndjson(&[vec![Value::Int(1)], vec![Value::Int(2)]])
            .unwrap();
        assert_eq!(body, b"{\"id\":1}\n{\"id\":2}\n");
    }

    #[test]
    fn test_render_temporal() {
        let t = NaiveTime::from_hms_micro_opt(1, 2, 3, 450_000).unwrap();
        assert_eq!(render_text(&Value::Time(t)).unwrap(), "01:02:03.450");
        let ts = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            render_text(&Value::Timestamp(ts)).unwrap(),
            "2023-01-02 03:04:05"
        );
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let encoder = RowEncoder::new(&[Column::new("ratio", SourceType::Double)]);
        for value in [f64::NAN, f64::INFINITY] {
            let err = encoder.encode(&vec![Value::Float(value)]).unwrap_err();
            assert!(matches!(err, SinkError::Encode { ref column, .. } if column == "ratio"));
        }

        let body = encoder.encode_ndjson(&[vec![Value::Float(1.5)], vec![Value::Float(f64::NAN)]]);
        assert!(body.is_err());
    }
}
