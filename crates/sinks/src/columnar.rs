//! Parquet encoding for object-store batches
//!
//! Source types map onto a small set of Arrow types. Everything without a
//! lossless native counterpart (decimals, temporal values, intervals, GUIDs,
//! structured values) is written as UTF-8 text in the same form the NDJSON
//! encoder uses.

use std::sync::Arc;

use arrival_protocol::{Column, Row, SourceType, Value};
use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int8Array, Int16Array,
    Int32Array, Int64Array, RecordBatch, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::encode::render_text;
use crate::error::SinkError;

/// Arrow type for a source type
pub fn arrow_type(source_type: &SourceType) -> DataType {
    match source_type {
        SourceType::Boolean => DataType::Boolean,
        SourceType::TinyInt => DataType::Int8,
        SourceType::SmallInt => DataType::Int16,
        SourceType::Integer => DataType::Int32,
        SourceType::BigInt => DataType::Int64,
        SourceType::Real => DataType::Float32,
        SourceType::Double => DataType::Float64,
        SourceType::Binary => DataType::Binary,
        SourceType::Decimal { .. }
        | SourceType::String
        | SourceType::Guid
        | SourceType::Date
        | SourceType::Time
        | SourceType::Timestamp
        | SourceType::Interval
        | SourceType::Json => DataType::Utf8,
    }
}

/// Arrow schema for a column list
///
/// Every field is nullable; sources do not always report nullability
/// reliably and a stray null must not fail a whole batch.
pub fn arrow_schema(columns: &[Column]) -> SchemaRef {
    Arc::new(Schema::new(
        columns
            .iter()
            .map(|c| Field::new(&c.name, arrow_type(&c.source_type), true))
            .collect::<Vec<_>>(),
    ))
}

/// Convert rows to a record batch matching `schema`
pub fn to_record_batch(schema: SchemaRef, rows: &[Row]) -> Result<RecordBatch, SinkError> {
    let width = schema.fields().len();
    if let Some(row) = rows.iter().find(|r| r.len() != width) {
        return Err(SinkError::RowWidth {
            expected: width,
            actual: row.len(),
        });
    }

    let columns = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| build_array(field, idx, rows))
        .collect::<Result<Vec<ArrayRef>, SinkError>>()?;

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Write one batch as a complete Parquet file in memory
pub fn write_parquet(schema: SchemaRef, rows: &[Row]) -> Result<Vec<u8>, SinkError> {
    let record_batch = to_record_batch(Arc::clone(&schema), rows)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props))?;
    writer.write(&record_batch)?;
    Ok(writer.into_inner()?)
}

fn build_array(field: &Field, idx: usize, rows: &[Row]) -> Result<ArrayRef, SinkError> {
    let name = field.name();
    let values = rows.iter().map(|row| &row[idx]);

    Ok(match field.data_type() {
        DataType::Boolean => Arc::new(BooleanArray::from(
            values.map(|v| as_bool(name, v)).collect::<Result<Vec<_>, _>>()?,
        )),
        DataType::Int8 => Arc::new(Int8Array::from(narrow::<i8>(name, values)?)),
        DataType::Int16 => Arc::new(Int16Array::from(narrow::<i16>(name, values)?)),
        DataType::Int32 => Arc::new(Int32Array::from(narrow::<i32>(name, values)?)),
        DataType::Int64 => Arc::new(Int64Array::from(
            values.map(|v| as_i64(name, v)).collect::<Result<Vec<_>, _>>()?,
        )),
        DataType::Float32 => Arc::new(Float32Array::from(
            values
                .map(|v| as_f64(name, v).map(|f| f.map(|f| f as f32)))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            values.map(|v| as_f64(name, v)).collect::<Result<Vec<_>, _>>()?,
        )),
        DataType::Binary => Arc::new(BinaryArray::from(
            values
                .map(|v| as_bytes(name, v))
                .collect::<Result<Vec<Option<&[u8]>>, _>>()?,
        )),
        _ => Arc::new(StringArray::from(
            values.map(render_text).collect::<Vec<Option<String>>>(),
        )),
    })
}

fn narrow<'a, T>(
    name: &str,
    values: impl Iterator<Item = &'a Value>,
) -> Result<Vec<Option<T>>, SinkError>
where
    T: TryFrom<i64>,
{
    values
        .map(|v| match as_i64(name, v)? {
            Some(i) => T::try_from(i)
                .map(Some)
                .map_err(|_| SinkError::encode(name, format!("{i} out of range"))),
            None => Ok(None),
        })
        .collect()
}

fn as_bool(name: &str, value: &Value) -> Result<Option<bool>, SinkError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::Int(i) => Ok(Some(*i != 0)),
        Value::Text(s) => s
            .parse()
            .map(Some)
            .map_err(|_| SinkError::encode(name, format!("'{s}' is not a boolean"))),
        other => Err(mismatch(name, "boolean", other)),
    }
}

fn as_i64(name: &str, value: &Value) -> Result<Option<i64>, SinkError> {
    match value {
        Value::Null => Ok(None),
        Value::Int(i) => Ok(Some(*i)),
        Value::Bool(b) => Ok(Some(i64::from(*b))),
        Value::Text(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SinkError::encode(name, format!("'{s}' is not an integer"))),
        other => Err(mismatch(name, "integer", other)),
    }
}

fn as_f64(name: &str, value: &Value) -> Result<Option<f64>, SinkError> {
    match value {
        Value::Null => Ok(None),
        Value::Float(f) => Ok(Some(*f)),
        Value::Int(i) => Ok(Some(*i as f64)),
        Value::Text(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SinkError::encode(name, format!("'{s}' is not a number"))),
        other => Err(mismatch(name, "number", other)),
    }
}

fn as_bytes<'a>(name: &str, value: &'a Value) -> Result<Option<&'a [u8]>, SinkError> {
    match value {
        Value::Null => Ok(None),
        Value::Bytes(b) => Ok(Some(b.as_slice())),
        Value::Text(s) => Ok(Some(s.as_bytes())),
        other => Err(mismatch(name, "bytes", other)),
    }
}

fn mismatch(name: &str, expected: &str, value: &Value) -> SinkError {
    SinkError::encode(name, format!("expected {expected}, got {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use bytes::Bytes;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", SourceType::Integer),
            Column::new("name", SourceType::String),
            Column::new("small", SourceType::TinyInt),
            Column::new("payload", SourceType::Binary),
        ]
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(arrow_type(&SourceType::TinyInt), DataType::Int8);
        assert_eq!(arrow_type(&SourceType::SmallInt), DataType::Int16);
        assert_eq!(arrow_type(&SourceType::Integer), DataType::Int32);
        assert_eq!(arrow_type(&SourceType::BigInt), DataType::Int64);
        assert_eq!(arrow_type(&SourceType::Real), DataType::Float32);
        assert_eq!(arrow_type(&SourceType::Double), DataType::Float64);
        assert_eq!(arrow_type(&SourceType::Binary), DataType::Binary);
        assert_eq!(
            arrow_type(&SourceType::Decimal {
                precision: 10,
                scale: 2
            }),
            DataType::Utf8
        );
        assert_eq!(arrow_type(&SourceType::Timestamp), DataType::Utf8);
        assert_eq!(arrow_type(&SourceType::Json), DataType::Utf8);
    }

    #[test]
    fn test_parquet_round_trip() {
        let schema = arrow_schema(&columns());
        let rows = vec![
            vec![
                Value::Int(1),
                Value::Text("a".into()),
                Value::Int(-3),
                Value::Bytes(vec![0, 1]),
            ],
            vec![Value::Int(2), Value::Null, Value::Null, Value::Null],
        ];

        let body = write_parquet(schema, &rows).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(body))
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 1);

        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        let ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        assert_eq!(ids.value(1), 2);
        let names = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "a");
        assert!(names.is_null(1));
    }

    #[test]
    fn test_narrowing_overflow_is_error() {
        let schema = arrow_schema(&columns()[2..3]);
        let err = to_record_batch(schema, &[vec![Value::Int(1000)]]).unwrap_err();
        assert!(err.to_string().contains("small"));
    }

    #[test]
    fn test_wrong_variant_is_error() {
        let schema = arrow_schema(&columns()[3..4]);
        let err = to_record_batch(Arc::clone(&schema), &[vec![Value::Int(5)]]).unwrap_err();
        assert!(matches!(err, SinkError::Encode { ref column, .. } if column == "payload"));

        let batch = to_record_batch(schema, &[vec![Value::Text("raw".into())], vec![Value::Null]]).unwrap();
        assert!(batch.column(0).is_null(1));
    }

    #[test]
    fn test_row_width_mismatch() {
        let schema = arrow_schema(&columns());
        let err = to_record_batch(schema, &[vec![Value::Int(1)]]).unwrap_err();
        assert!(matches!(err, SinkError::RowWidth { expected: 4, actual: 1 }));
    }
}
