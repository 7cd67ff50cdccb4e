use arrow_array::{
    Array, ArrayRef, Date32Array, Float64Array, Int64Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use bytes::Bytes;
use chrono::{Datelike, NaiveDate};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::sync::Arc;

use crate::{
    error::{EtlError, Result},
    types::{Column, ColumnType, Dataset, Value},
};

// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Text => DataType::Utf8,
        ColumnType::Integer => DataType::Int64,
        ColumnType::Date => DataType::Date32,
        ColumnType::Float => DataType::Float64,
    }
}

fn column_type(dataset: &str, field: &Field) -> Result<ColumnType> {
    match field.data_type() {
        DataType::Utf8 => Ok(ColumnType::Text),
        DataType::Int64 => Ok(ColumnType::Integer),
        DataType::Date32 => Ok(ColumnType::Date),
        DataType::Float64 => Ok(ColumnType::Float),
        other => Err(EtlError::schema(
            dataset,
            format!("unsupported column type {} for {}", other, field.name()),
        )),
    }
}

fn to_days(date: &NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

fn build_array(dataset: &Dataset, index: usize) -> ArrayRef {
    let values = dataset.rows().iter().map(|row| &row[index]);
    match dataset.columns[index].ty {
        ColumnType::Text => Arc::new(StringArray::from(
            values
                .map(|v| match v {
                    Value::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Integer => Arc::new(Int64Array::from(
            values
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Date => Arc::new(Date32Array::from(
            values
                .map(|v| match v {
                    Value::Date(d) => Some(to_days(d)),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        ColumnType::Float => Arc::new(Float64Array::from(
            values
                .map(|v| match v {
                    Value::Float(x) => Some(*x),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
    }
}

pub fn to_record_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(
        dataset
            .columns
            .iter()
            .map(|c| Field::new(&c.name, arrow_type(c.ty), true))
            .collect::<Vec<_>>(),
    ));
    let arrays = (0..dataset.columns.len())
        .map(|i| build_array(dataset, i))
        .collect::<Vec<_>>();
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Serializes a dataset into an in-memory Parquet file.
pub fn encode_parquet(dataset: &Dataset) -> Result<Bytes> {
    let batch = to_record_batch(dataset)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(Bytes::from(buffer))
}

fn read_value(dataset: &str, array: &ArrayRef, ty: ColumnType, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    let mismatch = || EtlError::schema(dataset, format!("array does not hold {} values", ty));
    let value = match ty {
        ColumnType::Text => Value::Text(
            array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(mismatch)?
                .value(row)
                .to_string(),
        ),
        ColumnType::Integer => Value::Integer(
            array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(mismatch)?
                .value(row),
        ),
        ColumnType::Date => {
            let days = array
                .as_any()
                .downcast_ref::<Date32Array>()
                .ok_or_else(mismatch)?
                .value(row);
            Value::Date(from_days(days).ok_or_else(|| {
                EtlError::schema(dataset, format!("date out of range: {} days", days))
            })?)
        }
        ColumnType::Float => Value::Float(
            array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(mismatch)?
                .value(row),
        ),
    };
    Ok(value)
}

/// Reads a Parquet file written by [`encode_parquet`] back into a dataset.
pub fn decode_parquet(name: &str, data: Bytes) -> Result<Dataset> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    let columns = builder
        .schema()
        .fields()
        .iter()
        .map(|field| Ok(Column::new(field.name(), column_type(name, field)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut dataset = Dataset::new(name, columns.clone());
    for batch in builder.build()? {
        let batch = batch?;
        for row in 0..batch.num_rows() {
            let values = columns
                .iter()
                .enumerate()
                .map(|(i, column)| read_value(name, batch.column(i), column.ty, row))
                .collect::<Result<Vec<_>>>()?;
            dataset.push_row(values)?;
        }
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn players() -> Dataset {
        let mut dataset = Dataset::new(
            "player_table",
            vec![
                Column::new("player", ColumnType::Text),
                Column::new("goals", ColumnType::Integer),
                Column::new("born", ColumnType::Date),
                Column::new("average", ColumnType::Float),
            ],
        );
        dataset
            .push_row(vec![
                Value::Text("Bukayo Saka".into()),
                Value::Integer(16),
                Value::Date(NaiveDate::from_ymd_opt(2001, 9, 5).unwrap()),
                Value::Float(0.46),
            ])
            .unwrap();
        dataset
            .push_row(vec![
                Value::Text("Cole Palmer".into()),
                Value::Null,
                Value::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()),
                Value::Null,
            ])
            .unwrap();
        dataset
    }

    #[test]
    fn test_parquet_round_trip() {
        let dataset = players();
        let bytes = encode_parquet(&dataset).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");

        let decoded = decode_parquet("player_table", bytes).unwrap();
        assert_eq!(decoded, dataset);
    }

    #[test]
    fn test_record_batch_schema() {
        let batch = to_record_batch(&players()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 4);
        assert_eq!(batch.schema().field(2).data_type(), &DataType::Date32);
        assert_eq!(batch.column(1).null_count(), 1);
    }

    #[test]
    fn test_epoch_conversion() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(to_days(&epoch), 0);
        assert_eq!(from_days(-1), NaiveDate::from_ymd_opt(1969, 12, 31));
    }

    #[test]
    fn test_empty_dataset_round_trip() {
        let dataset = Dataset::new("empty", vec![Column::new("team", ColumnType::Text)]);
        let decoded = decode_parquet("empty", encode_parquet(&dataset).unwrap()).unwrap();
        assert_eq!(decoded, dataset);
    }
}
