use tracing::{debug, warn};

use crate::error::SqlShimError;
use crate::pool::PooledConn;
use crate::results::{Row, RunResult};
use crate::shim::Shim;
use crate::statement::Statement;
use crate::types::RowValues;

/// An open transaction pinned to one pooled connection.
///
/// Finish it with [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback).
/// Dropping it unfinished rolls back before the connection returns to the pool.
///
/// ```rust,no_run
/// use sql_shim::prelude::*;
///
/// # async fn demo(shim: &Shim) -> Result<(), SqlShimError> {
/// let mut tx = shim.begin().await?;
/// let debit = tx.prepare("UPDATE ledger SET balance = balance - ? WHERE id = ?");
/// tx.run(&debit, &args![500, "acct-1"]).await?;
/// tx.commit().await?;
/// # Ok(()) }
/// ```
pub struct Transaction {
    shim: Shim,
    conn: Option<PooledConn>,
}

impl Transaction {
    pub(crate) async fn begin(shim: Shim) -> Result<Self, SqlShimError> {
        let mut conn = shim.acquire().await?;
        conn.begin()
            .await
            .map_err(|e| SqlShimError::exec("BEGIN", e))?;
        debug!("transaction started");
        Ok(Self {
            shim,
            conn: Some(conn),
        })
    }

    fn conn(&mut self) -> Result<&mut PooledConn, SqlShimError> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlShimError::ConnectionError("transaction already finished".into()))
    }

    /// Prepare a statement with the pool's translation settings.
    #[must_use]
    pub fn prepare(&self, template: &str) -> Statement {
        self.shim.prepare(template)
    }

    /// # Errors
    /// Same as [`Statement::all`], except no new connection is acquired.
    pub async fn all(&mut self, stmt: &Statement, args: &[RowValues]) -> Result<Vec<Row>, SqlShimError> {
        stmt.check_args(args)?;
        let conn = self.conn()?;
        Ok(stmt.select_on(conn, args).await?.into_rows())
    }

    /// # Errors
    /// Same as [`Statement::get`].
    pub async fn get(&mut self, stmt: &Statement, args: &[RowValues]) -> Result<Option<Row>, SqlShimError> {
        stmt.check_args(args)?;
        let conn = self.conn()?;
        stmt.first_on(conn, args).await
    }

    /// # Errors
    /// Same as [`Statement::run`].
    pub async fn run(&mut self, stmt: &Statement, args: &[RowValues]) -> Result<RunResult, SqlShimError> {
        stmt.check_args(args)?;
        let conn = self.conn()?;
        stmt.run_on(conn, args).await
    }

    /// # Errors
    /// Same as [`Shim::exec`].
    pub async fn exec(&mut self, sql: &str) -> Result<(), SqlShimError> {
        let shim = self.shim.clone();
        let conn = self.conn()?;
        shim.exec_on(conn, sql).await
    }

    /// # Errors
    /// Returns `ExecError` if `COMMIT` fails; the transaction is then rolled back.
    pub async fn commit(mut self) -> Result<(), SqlShimError> {
        self.finish(true).await
    }

    /// # Errors
    /// Returns `ExecError` if `ROLLBACK` fails.
    pub async fn rollback(mut self) -> Result<(), SqlShimError> {
        self.finish(false).await
    }

    async fn finish(&mut self, commit: bool) -> Result<(), SqlShimError> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        let verb = if commit { "COMMIT" } else { "ROLLBACK" };
        match conn.finish(commit).await {
            Ok(()) => {
                debug!(verb, "transaction finished");
                Ok(())
            }
            Err(e) => {
                conn.rollback_abandoned();
                Err(SqlShimError::exec(verb, e))
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("transaction dropped without commit or rollback; rolling back");
            conn.rollback_abandoned();
        }
    }
}
