use rusqlite::params_from_iter;
use rusqlite::types::Value;

use super::config::SqliteConnection;
use super::params::Params;
use super::query::build_result_set;
use crate::error::DriverError;
use crate::results::{ResultSet, RunResult};
use crate::types::RowValues;

fn select_sync(
    conn: &rusqlite::Connection,
    query: &str,
    params: &[Value],
    max_rows: Option<usize>,
) -> Result<ResultSet, rusqlite::Error> {
    let mut stmt = conn.prepare_cached(query)?;
    build_result_set(&mut stmt, params, max_rows)
}

fn execute_sync(
    conn: &rusqlite::Connection,
    query: &str,
    params: &[Value],
    wants_rowid: bool,
) -> Result<RunResult, rusqlite::Error> {
    let changes = {
        let mut stmt = conn.prepare_cached(query)?;
        stmt.execute(params_from_iter(params.iter()))?
    };
    let last_inserted_id = (wants_rowid && changes > 0).then(|| RowValues::Int(conn.last_insert_rowid()));
    Ok(RunResult {
        rows_affected: u64::try_from(changes).unwrap_or(u64::MAX),
        last_inserted_id,
    })
}

/// Run a row-returning statement.
///
/// # Errors
/// Returns driver errors from preparation, execution or extraction.
pub async fn select(
    conn: &SqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, DriverError> {
    let query = query.to_owned();
    let params = Params::convert(params);
    conn.run_blocking(move |c| Ok(select_sync(c, &query, params.as_values(), None)?))
        .await
}

/// Run a row-returning statement and read only its first row.
///
/// # Errors
/// Returns driver errors from preparation, execution or extraction.
pub async fn select_first(
    conn: &SqliteConnection,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, DriverError> {
    let query = query.to_owned();
    let params = Params::convert(params);
    conn.run_blocking(move |c| Ok(select_sync(c, &query, params.as_values(), Some(1))?))
        .await
}

/// Run a DML statement. With `wants_rowid`, a statement that changed rows reports
/// `last_insert_rowid()`.
///
/// # Errors
/// Returns driver errors from preparation or execution.
pub async fn execute(
    conn: &SqliteConnection,
    query: &str,
    params: &[RowValues],
    wants_rowid: bool,
) -> Result<RunResult, DriverError> {
    let query = query.to_owned();
    let params = Params::convert(params);
    conn.run_blocking(move |c| Ok(execute_sync(c, &query, params.as_values(), wants_rowid)?))
        .await
}

/// Run one or more `;`-separated statements without parameters.
///
/// # Errors
/// Returns the driver error of the first failing statement.
pub async fn execute_batch(conn: &SqliteConnection, query: &str) -> Result<(), DriverError> {
    let query = query.to_owned();
    conn.run_blocking(move |c| {
        c.execute_batch(&query)?;
        // DDL can invalidate cached plans
        c.flush_prepared_statement_cache();
        Ok(())
    })
    .await
}

/// Write transactions take the database lock up front so two writers cannot deadlock
/// upgrading from a shared lock.
///
/// # Errors
/// Returns the driver error if `BEGIN` fails.
pub async fn begin(conn: &SqliteConnection) -> Result<(), DriverError> {
    execute_batch(conn, "BEGIN IMMEDIATE").await
}

/// # Errors
/// Returns the driver error if `COMMIT`/`ROLLBACK` fails.
pub async fn finish(conn: &SqliteConnection, commit: bool) -> Result<(), DriverError> {
    let sql = if commit { "COMMIT" } else { "ROLLBACK" };
    conn.run_blocking(move |c| Ok(c.execute_batch(sql)?)).await
}

/// Best-effort synchronous rollback, for transactions dropped without being finished.
pub(crate) fn rollback_now(conn: &SqliteConnection) -> Result<(), DriverError> {
    let guard = conn.lock()?;
    if !guard.is_autocommit() {
        guard.execute_batch("ROLLBACK")?;
    }
    Ok(())
}
