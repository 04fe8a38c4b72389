mod connection;

pub use connection::PooledConn;

use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bb8::{ErrorSink, Pool, RunError};
use tracing::{debug, warn};

use crate::config::ShimConfig;
use crate::error::SqlShimError;
#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;
use crate::translation::Dialect;
use crate::types::DatabaseType;

fn describe<E: Display>(err: RunError<E>) -> RunError<String> {
    match err {
        RunError::User(e) => RunError::User(e.to_string()),
        RunError::TimedOut => RunError::TimedOut,
    }
}

/// Bounded connection pool for the configured backend.
#[derive(Clone)]
pub struct ShimPool {
    backend: Backend,
    connect_errors: ConnectErrors,
}

#[derive(Clone)]
enum Backend {
    #[cfg(feature = "postgres")]
    Postgres(Pool<PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(Pool<SqliteManager>),
}

/// Receives the errors of connections bb8 opens in the background. Waiters on the pool only
/// ever see a timeout, so the last failure is kept to explain it.
#[derive(Debug, Clone, Default)]
pub struct ConnectErrors {
    last: Arc<Mutex<Option<String>>>,
}

impl ConnectErrors {
    fn take(&self) -> Option<String> {
        self.last.lock().ok().and_then(|mut last| last.take())
    }
}

impl<E: Display + Send + 'static> ErrorSink<E> for ConnectErrors {
    fn sink(&self, error: E) {
        warn!(error = %error, "opening a pooled connection failed");
        if let Ok(mut last) = self.last.lock() {
            *last = Some(error.to_string());
        }
    }

    fn boxed_clone(&self) -> Box<dyn ErrorSink<E>> {
        Box::new(self.clone())
    }
}

impl std::fmt::Debug for ShimPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
        }
    }
}

impl ShimPool {
    /// Create the pool. No connection is opened yet; see [`ShimPool::verify`].
    ///
    /// # Errors
    /// Returns `SqlShimError::ConfigError` for an unparsable connection string and
    /// `SqlShimError::ConnectionError` if the pool cannot be created.
    pub async fn build(config: &ShimConfig) -> Result<Self, SqlShimError> {
        debug!(
            db_type = ?config.db_type,
            max_connections = config.max_connections,
            acquire_timeout = ?config.acquire_timeout,
            "building connection pool"
        );
        let connect_errors = ConnectErrors::default();
        let backend = match config.db_type {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => {
                let pool = PgManager::from_url(&config.url)?
                    .build_pool(
                        config.max_connections,
                        config.acquire_timeout,
                        Box::new(connect_errors.clone()),
                    )
                    .await?;
                Backend::Postgres(pool)
            }
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                let pool = SqliteManager::new(config.sqlite_path())
                    .build_pool(
                        config.max_connections,
                        config.acquire_timeout,
                        Box::new(connect_errors.clone()),
                    )
                    .await?;
                Backend::Sqlite(pool)
            }
        };
        Ok(Self {
            backend,
            connect_errors,
        })
    }

    /// Open one connection outside the pool and close it again, surfacing the driver's
    /// error when the backend cannot be reached.
    ///
    /// # Errors
    /// Returns `SqlShimError::ConnectionError` with the driver's message.
    pub async fn verify(&self) -> Result<(), SqlShimError> {
        let opened = match &self.backend {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => pool.dedicated_connection().await.map(drop).map_err(|e| e.to_string()),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => pool.dedicated_connection().await.map(drop).map_err(|e| e.to_string()),
        };
        opened.map_err(|e| SqlShimError::ConnectionError(format!("cannot connect: {e}")))
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match &self.backend {
            #[cfg(feature = "postgres")]
            Backend::Postgres(_) => Dialect::Postgres,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Check out a connection, waiting up to the configured acquire timeout.
    ///
    /// # Errors
    /// Returns `SqlShimError::PoolExhaustion` when no connection frees up in time and
    /// `SqlShimError::ConnectionError` when new connections cannot be opened.
    pub async fn acquire(&self) -> Result<PooledConn, SqlShimError> {
        let started = Instant::now();
        let checked_out = match &self.backend {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => pool
                .get_owned()
                .await
                .map(PooledConn::Postgres)
                .map_err(describe),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => pool
                .get_owned()
                .await
                .map(PooledConn::Sqlite)
                .map_err(describe),
        };
        checked_out.map_err(|e| self.checkout_error(e, started))
    }

    /// Connections currently checked out.
    #[must_use]
    pub fn in_use(&self) -> u32 {
        let state = self.state();
        state.connections.saturating_sub(state.idle_connections)
    }

    fn state(&self) -> bb8::State {
        match &self.backend {
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => pool.state(),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => pool.state(),
        }
    }

    /// A timeout on a pool with no live connections means connecting failed, not that
    /// every connection was busy.
    fn checkout_error(&self, err: RunError<String>, started: Instant) -> SqlShimError {
        match err {
            RunError::TimedOut => {
                let waited = started.elapsed();
                let failure = self.connect_errors.take();
                match failure {
                    Some(e) if self.state().connections == 0 => {
                        SqlShimError::ConnectionError(format!("cannot connect: {e}"))
                    }
                    _ => {
                        warn!(?waited, "connection pool exhausted");
                        SqlShimError::PoolExhaustion { waited }
                    }
                }
            }
            RunError::User(e) => SqlShimError::ConnectionError(format!("checkout failed: {e}")),
        }
    }
}
