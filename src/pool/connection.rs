use bb8::PooledConnection;
use tracing::warn;

use crate::error::DriverError;
#[cfg(feature = "postgres")]
use crate::postgres::{self, PgManager};
use crate::results::{ResultSet, RunResult};
#[cfg(feature = "sqlite")]
use crate::sqlite::{self, SqliteManager};
use crate::types::RowValues;

/// A connection checked out of a [`ShimPool`](super::ShimPool); returns to the pool on drop.
#[derive(Debug)]
pub enum PooledConn {
    #[cfg(feature = "postgres")]
    Postgres(PooledConnection<'static, PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(PooledConnection<'static, SqliteManager>),
}

impl PooledConn {
    /// # Errors
    /// Returns the backend's error for the statement.
    pub async fn select(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, DriverError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => Ok(postgres::executor::select(conn, sql, params).await?),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => sqlite::executor::select(conn, sql, params).await,
        }
    }

    /// Like [`select`](Self::select), but only the first row is read.
    ///
    /// # Errors
    /// Returns the backend's error for the statement.
    pub async fn select_first(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, DriverError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => Ok(postgres::executor::select_first(conn, sql, params).await?),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => sqlite::executor::select_first(conn, sql, params).await,
        }
    }

    /// # Errors
    /// Returns the backend's error for the statement.
    #[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
        wants_rowid: bool,
    ) -> Result<RunResult, DriverError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => {
                let rows = postgres::executor::execute(conn, sql, params).await?;
                Ok(RunResult::affected(rows))
            }
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => sqlite::executor::execute(conn, sql, params, wants_rowid).await,
        }
    }

    /// # Errors
    /// Returns the backend's error for the first failing statement.
    pub async fn batch(&mut self, sql: &str) -> Result<(), DriverError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => Ok(postgres::executor::execute_batch(conn, sql).await?),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => sqlite::executor::execute_batch(conn, sql).await,
        }
    }

    pub(crate) async fn begin(&mut self) -> Result<(), DriverError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => Ok(postgres::executor::begin(conn).await?),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => sqlite::executor::begin(conn).await,
        }
    }

    pub(crate) async fn finish(&mut self, commit: bool) -> Result<(), DriverError> {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(conn) => Ok(postgres::executor::finish(conn, commit).await?),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => sqlite::executor::finish(conn, commit).await,
        }
    }

    /// Roll back an abandoned transaction before the connection goes back to the pool.
    ///
    /// `SQLite` rolls back synchronously. PostgreSQL rolls back on a spawned task that owns
    /// the connection; outside a runtime the connection stays marked and the pool discards it.
    pub(crate) fn rollback_abandoned(self) {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(mut conn) => {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(e) = postgres::executor::finish(&mut conn, false).await {
                            warn!(error = %e, "rollback of abandoned transaction failed");
                        }
                    });
                }
            }
            #[cfg(feature = "sqlite")]
            Self::Sqlite(conn) => {
                if let Err(e) = sqlite::executor::rollback_now(&conn) {
                    warn!(error = %e, "rollback of abandoned transaction failed");
                }
            }
        }
    }
}
