use futures_util::{TryStreamExt, pin_mut};
use tracing::debug;

use super::config::PgConnection;
use super::params::Params;
use super::query::build_result_set;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Run a row-returning statement through the connection's statement cache.
///
/// # Errors
/// Returns driver errors from preparation, execution or decoding.
pub async fn select(
    conn: &mut PgConnection,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, tokio_postgres::Error> {
    let stmt = conn.prepare_cached(query).await?;
    let converted = Params::convert(params);
    match conn.client.query(&stmt, converted.as_refs()).await {
        Ok(rows) => build_result_set(&stmt, &rows),
        Err(e) => {
            conn.forget(query);
            Err(e)
        }
    }
}

/// Run a row-returning statement and decode only its first row; the rest of the stream is
/// dropped unread.
///
/// # Errors
/// Returns driver errors from preparation, execution or decoding.
pub async fn select_first(
    conn: &mut PgConnection,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, tokio_postgres::Error> {
    let stmt = conn.prepare_cached(query).await?;
    let converted = Params::convert(params);
    let first = async {
        let rows = conn
            .client
            .query_raw(&stmt, converted.as_refs().iter().copied())
            .await?;
        pin_mut!(rows);
        rows.try_next().await
    }
    .await;
    match first {
        Ok(row) => build_result_set(&stmt, row.as_slice()),
        Err(e) => {
            conn.forget(query);
            Err(e)
        }
    }
}

/// Run a DML statement; returns the affected row count.
///
/// # Errors
/// Returns driver errors from preparation or execution.
pub async fn execute(
    conn: &mut PgConnection,
    query: &str,
    params: &[RowValues],
) -> Result<u64, tokio_postgres::Error> {
    let stmt = conn.prepare_cached(query).await?;
    let converted = Params::convert(params);
    match conn.client.execute(&stmt, converted.as_refs()).await {
        Ok(rows) => Ok(rows),
        Err(e) => {
            conn.forget(query);
            Err(e)
        }
    }
}

/// Run one or more `;`-separated statements without parameters.
///
/// # Errors
/// Returns the driver error of the first failing statement.
pub async fn execute_batch(conn: &mut PgConnection, query: &str) -> Result<(), tokio_postgres::Error> {
    conn.clear_statements();
    conn.client.batch_execute(query).await
}

/// # Errors
/// Returns the driver error if `BEGIN` fails.
pub async fn begin(conn: &mut PgConnection) -> Result<(), tokio_postgres::Error> {
    conn.client.batch_execute("BEGIN").await?;
    conn.in_transaction = true;
    debug!("postgres transaction started");
    Ok(())
}

/// End the open transaction. On failure the flag stays set and the pool discards the connection.
///
/// # Errors
/// Returns the driver error if `COMMIT`/`ROLLBACK` fails.
pub async fn finish(conn: &mut PgConnection, commit: bool) -> Result<(), tokio_postgres::Error> {
    conn.client
        .batch_execute(if commit { "COMMIT" } else { "ROLLBACK" })
        .await?;
    conn.in_transaction = false;
    Ok(())
}
