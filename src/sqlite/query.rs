use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Statement, params_from_iter};

use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
/// Returns the rusqlite error if the column cannot be read.
pub fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> Result<RowValues, rusqlite::Error> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run `stmt` with `params` and collect its rows, stopping after `max_rows` when given.
///
/// # Errors
/// Returns the rusqlite error from execution or extraction.
pub fn build_result_set(
    stmt: &mut Statement<'_>,
    params: &[Value],
    max_rows: Option<usize>,
) -> Result<ResultSet, rusqlite::Error> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::new(Arc::new(column_names));
    let mut rows_iter = stmt.query(params_from_iter(params.iter()))?;
    while max_rows.is_none_or(|max| result_set.len() < max) {
        let Some(row) = rows_iter.next()? else {
            break;
        };
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}
