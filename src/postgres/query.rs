use std::error::Error;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Row, Statement};
use uuid::Uuid;

use crate::results::ResultSet;
use crate::types::RowValues;

/// The undecoded binary value of a column type without a dedicated mapping.
struct RawBytes(Vec<u8>);

impl<'a> FromSql<'a> for RawBytes {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawBytes(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Build a result set using statement metadata for column names, so empty results keep them.
///
/// # Errors
/// Returns the driver error when a column cannot be decoded.
pub fn build_result_set(stmt: &Statement, rows: &[Row]) -> Result<ResultSet, tokio_postgres::Error> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(Arc::new(column_names), rows.len());
    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}

/// Extract a `RowValues` from a `tokio_postgres` row at the given index.
///
/// Exact decimals (at the column's scale), uuids and dates come back as text; zoned
/// timestamps are normalized to UTC. `NaN`/`Infinity` numerics cannot be decoded.
///
/// # Errors
/// Returns the driver error when the column cannot be decoded.
pub fn extract_value(row: &Row, idx: usize) -> Result<RowValues, tokio_postgres::Error> {
    let ty = row.columns()[idx].type_();
    let value = match *ty {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)?
            .map(|v| RowValues::Text(v.to_string())),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| RowValues::Text(v.format("%Y-%m-%d").to_string())),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|v| RowValues::Text(v.to_string())),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        Type::UUID => row
            .try_get::<_, Option<Uuid>>(idx)?
            .map(|v| RowValues::Text(v.hyphenated().to_string())),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text)
        }
        // enums, citext and friends are sent as their text; anything else stays raw
        _ => row
            .try_get::<_, Option<RawBytes>>(idx)?
            .map(|RawBytes(bytes)| match String::from_utf8(bytes) {
                Ok(text) => RowValues::Text(text),
                Err(e) => RowValues::Blob(e.into_bytes()),
            }),
    };
    Ok(value.unwrap_or(RowValues::Null))
}
