use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::ShimConfig;
use crate::error::SqlShimError;
use crate::pool::{PooledConn, ShimPool};
use crate::statement::Statement;
use crate::transaction::Transaction;
use crate::translation::{Dialect, TranslateOptions, TranslationMode, translate};

const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Handle to a connection pool plus the translation settings statements are prepared with.
///
/// Created once at startup and cloned into whatever needs database access; clones share the
/// pool.
///
/// ```rust,no_run
/// use sql_shim::prelude::*;
///
/// # async fn demo() -> Result<(), SqlShimError> {
/// let shim = Shim::connect(ShimConfig::new("postgres://erp@localhost/erp")?).await?;
/// let vendor = shim
///     .prepare("SELECT * FROM vendors WHERE id = ? AND company_id = ?")
///     .get(&args!["v-7", "c-1"])
///     .await?;
/// shim.close(std::time::Duration::from_secs(5)).await;
/// # let _ = vendor;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct Shim {
    inner: Arc<ShimInner>,
}

#[derive(Debug)]
struct ShimInner {
    pool: ShimPool,
    config: ShimConfig,
    closed: AtomicBool,
}

impl Shim {
    /// Build the pool and open one connection, so a bad URL or an unreachable backend fails
    /// here rather than on the first statement.
    ///
    /// # Errors
    /// Returns `ConfigError` for an invalid URL or `ConnectionError` with the driver's message
    /// if the backend cannot be reached.
    pub async fn connect(config: ShimConfig) -> Result<Self, SqlShimError> {
        let pool = ShimPool::build(&config).await?;
        pool.verify().await?;
        info!(
            db_type = ?config.db_type,
            max_connections = config.max_connections,
            translate = config.translate,
            now = ?config.now,
            "shim connected"
        );
        Ok(Self {
            inner: Arc::new(ShimInner {
                pool,
                config,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Connect using [`ShimConfig::from_env`].
    ///
    /// # Errors
    /// Returns configuration errors and everything [`Shim::connect`] returns.
    pub async fn from_env() -> Result<Self, SqlShimError> {
        Self::connect(ShimConfig::from_env()?).await
    }

    #[must_use]
    pub fn config(&self) -> &ShimConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.inner.pool.dialect()
    }

    /// Translation options for statements prepared under `mode`.
    #[must_use]
    pub fn translate_options(&self, mode: TranslationMode) -> TranslateOptions {
        let on = mode.resolve(self.inner.config.translate);
        TranslateOptions {
            placeholders: on,
            helpers: on,
            now: self.inner.config.now,
        }
    }

    /// Prepare `template` with the pool's translation default. Pure: no I/O, no validation.
    #[must_use]
    pub fn prepare(&self, template: &str) -> Statement {
        self.prepare_with(template, TranslationMode::PoolDefault)
    }

    #[must_use]
    pub fn prepare_with(&self, template: &str, mode: TranslationMode) -> Statement {
        Statement::new(self.clone(), template, &self.translate_options(mode))
    }

    /// Run parameterless SQL (DDL, migration scripts with several `;`-separated statements).
    ///
    /// Helper calls are rewritten; `?` is left alone since nothing is bound.
    ///
    /// # Errors
    /// Returns `ExecError` if the backend rejects the script, or a pool error.
    pub async fn exec(&self, sql: &str) -> Result<(), SqlShimError> {
        let mut conn = self.acquire().await?;
        self.exec_on(&mut conn, sql).await
    }

    pub(crate) async fn exec_on(&self, conn: &mut PooledConn, sql: &str) -> Result<(), SqlShimError> {
        let options = self
            .translate_options(TranslationMode::PoolDefault)
            .with_placeholders(false);
        let translated = translate(sql, &options);
        debug!(template = sql, "exec");
        conn.batch(&translated.sql)
            .await
            .map_err(|e| SqlShimError::exec(sql, e))
    }

    /// Start a transaction pinned to one pooled connection.
    ///
    /// # Errors
    /// Returns pool errors, or `ExecError` if `BEGIN` fails.
    pub async fn begin(&self) -> Result<Transaction, SqlShimError> {
        Transaction::begin(self.clone()).await
    }

    /// Stop handing out connections and wait up to `timeout` for checked-out ones to return.
    ///
    /// Returns how many connections were still checked out when waiting stopped. Later
    /// statements on any clone of this handle fail with `PoolClosed`.
    ///
    /// Idle connections are not closed here; they are released when the last clone of the
    /// handle (and every `Statement` or `Transaction` holding one) is dropped.
    pub async fn close(&self, timeout: Duration) -> u32 {
        self.inner.closed.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + timeout;
        loop {
            let in_use = self.inner.pool.in_use();
            if in_use == 0 {
                info!("connection pool drained");
                return 0;
            }
            if Instant::now() >= deadline {
                warn!(in_use, "closing with connections still checked out");
                return in_use;
            }
            tokio::time::sleep(CLOSE_POLL_INTERVAL).await;
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub(crate) async fn acquire(&self) -> Result<PooledConn, SqlShimError> {
        if self.is_closed() {
            return Err(SqlShimError::PoolClosed);
        }
        self.inner.pool.acquire().await
    }
}
