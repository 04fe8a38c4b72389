use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bb8::{ErrorSink, ManageConnection, Pool};
use tracing::debug;

use crate::error::{DriverError, SqlShimError};

/// How long a writer waits on a locked database file before reporting `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const STATEMENT_CACHE_CAPACITY: usize = 256;

pub const MEMORY_PATH: &str = ":memory:";

/// Shared handle to one rusqlite connection. Work runs on the blocking pool while holding
/// the lock; rusqlite connections are `Send` but not `Sync`.
#[derive(Clone, Debug)]
pub struct SqliteConnection(Arc<Mutex<rusqlite::Connection>>);

impl SqliteConnection {
    fn new(conn: rusqlite::Connection) -> Self {
        Self(Arc::new(Mutex::new(conn)))
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, DriverError> {
        self.0
            .lock()
            .map_err(|_| DriverError::Other("sqlite connection lock poisoned".into()))
    }

    /// Run `func` on the blocking pool with exclusive access to the connection.
    ///
    /// # Errors
    /// Returns what `func` returns, or `DriverError::Other` if the blocking task fails.
    pub(crate) async fn run_blocking<F, R>(&self, func: F) -> Result<R, DriverError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, DriverError> + Send + 'static,
        R: Send + 'static,
    {
        let handle = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = handle.lock()?;
            func(&mut guard)
        })
        .await
        .map_err(|e| DriverError::Other(format!("sqlite blocking task failed: {e}")))?
    }
}

/// bb8 manager for `SQLite` connections to one database file.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: String,
}

impl SqliteManager {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Every `:memory:` connection is its own database, so such pools hold exactly one.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.path.is_empty() || self.path == MEMORY_PATH
    }

    /// Build a pool from this manager. Background connect failures go to `error_sink`.
    ///
    /// # Errors
    /// Returns `SqlShimError::ConnectionError` if pool creation fails.
    pub async fn build_pool(
        self,
        max_size: u32,
        acquire_timeout: Duration,
        error_sink: Box<dyn ErrorSink<DriverError>>,
    ) -> Result<Pool<SqliteManager>, SqlShimError> {
        let mut builder = Pool::builder()
            .max_size(max_size)
            .connection_timeout(acquire_timeout)
            .retry_connection(false)
            .error_sink(error_sink);
        if self.is_memory() {
            builder = builder.max_size(1).idle_timeout(None).max_lifetime(None);
        }
        builder
            .build(self)
            .await
            .map_err(|e| SqlShimError::ConnectionError(format!("sqlite pool error: {e}")))
    }

    fn open(&self) -> Result<rusqlite::Connection, rusqlite::Error> {
        let conn = if self.is_memory() {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(&self.path)?
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if !self.is_memory() {
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!(path = %self.path, journal_mode = %mode, "sqlite connect");
        }
        Ok(conn)
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SqliteConnection;
    type Error = DriverError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let manager = self.clone();
        async move {
            let conn = tokio::task::spawn_blocking(move || manager.open())
                .await
                .map_err(|e| DriverError::Other(format!("sqlite open task failed: {e}")))??;
            Ok(SqliteConnection::new(conn))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let checked = conn
            .lock()
            .and_then(|c| Ok(c.query_row("SELECT 1", [], |_| Ok(()))?));
        async move { checked }
    }

    /// A connection still inside a transaction, or one whose lock is held by an abandoned
    /// blocking task, is not fit to hand out again.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        match conn.0.try_lock() {
            Ok(c) => !c.is_autocommit(),
            Err(_) => true,
        }
    }
}
