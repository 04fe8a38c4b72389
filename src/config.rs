use std::time::Duration;

use crate::error::SqlShimError;
use crate::translation::NowSemantics;
use crate::types::DatabaseType;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const POOL_MAX_ENV: &str = "SQL_SHIM_POOL_MAX";
pub const ACQUIRE_TIMEOUT_ENV: &str = "SQL_SHIM_ACQUIRE_TIMEOUT_MS";
pub const NOW_SEMANTICS_ENV: &str = "SQL_SHIM_NOW";
pub const TRANSLATE_ENV: &str = "SQL_SHIM_TRANSLATE";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Connection and translation settings for a [`Shim`](crate::Shim).
///
/// Usually read from the environment once at startup:
/// ```rust,no_run
/// use sql_shim::prelude::*;
///
/// # async fn demo() -> Result<(), SqlShimError> {
/// let shim = Shim::connect(ShimConfig::from_env()?).await?;
/// # let _ = shim;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ShimConfig {
    /// Connection string as given (`postgres://…`, `sqlite:…`, or a file path).
    pub url: String,
    pub db_type: DatabaseType,
    /// Upper bound on concurrently checked-out connections.
    pub max_connections: u32,
    /// How long a caller waits for a free connection before `PoolExhaustion`.
    pub acquire_timeout: Duration,
    /// Pool-wide translation default; individual statements may override it.
    pub translate: bool,
    pub now: NowSemantics,
}

impl ShimConfig {
    /// Build a config for `url`, inferring the backend from its scheme.
    ///
    /// # Errors
    /// Returns `SqlShimError::ConfigError` when the URL is empty or names an unsupported backend.
    pub fn new(url: impl Into<String>) -> Result<Self, SqlShimError> {
        let url = url.into();
        let db_type = detect_database_type(&url)?;
        Ok(Self {
            translate: default_translation(db_type),
            url,
            db_type,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            now: NowSemantics::default(),
        })
    }

    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `SqlShimError::ConfigError` when `DATABASE_URL` is missing or a setting is invalid.
    pub fn from_env() -> Result<Self, SqlShimError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    /// Returns `SqlShimError::ConfigError` when `DATABASE_URL` is missing or a setting is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SqlShimError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(DATABASE_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SqlShimError::ConfigError(format!("{DATABASE_URL_ENV} is not set")))?;
        let mut config = Self::new(url)?;

        if let Some(raw) = lookup(POOL_MAX_ENV) {
            let max = raw.trim().parse::<u32>().map_err(|e| {
                SqlShimError::ConfigError(format!("{POOL_MAX_ENV}={raw:?} is not a count: {e}"))
            })?;
            config = config.with_max_connections(max);
        }
        if let Some(raw) = lookup(ACQUIRE_TIMEOUT_ENV) {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                SqlShimError::ConfigError(format!(
                    "{ACQUIRE_TIMEOUT_ENV}={raw:?} is not a millisecond count: {e}"
                ))
            })?;
            config = config.with_acquire_timeout(Duration::from_millis(ms));
        }
        if let Some(raw) = lookup(NOW_SEMANTICS_ENV) {
            let now = match raw.trim().to_ascii_lowercase().as_str() {
                "legacy" => NowSemantics::Legacy,
                "exact" => NowSemantics::Exact,
                other => {
                    return Err(SqlShimError::ConfigError(format!(
                        "{NOW_SEMANTICS_ENV} must be `legacy` or `exact`, got {other:?}"
                    )));
                }
            };
            config = config.with_now(now);
        }
        if let Some(raw) = lookup(TRANSLATE_ENV) {
            let translate = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "on" | "true" | "yes" => true,
                "0" | "off" | "false" | "no" => false,
                other => {
                    return Err(SqlShimError::ConfigError(format!(
                        "{TRANSLATE_ENV} must be on/off, got {other:?}"
                    )));
                }
            };
            config = config.with_translation(translate);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_translation(mut self, translate: bool) -> Self {
        self.translate = translate;
        self
    }

    #[must_use]
    pub fn with_now(mut self, now: NowSemantics) -> Self {
        self.now = now;
        self
    }

    /// Filesystem path (or `:memory:`) for `SQLite` URLs.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite_path(&self) -> String {
        let url = self.url.trim();
        if let Some(rest) = url.strip_prefix("sqlite://") {
            rest.to_string()
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            rest.to_string()
        } else {
            url.to_string()
        }
    }
}

fn default_translation(db_type: DatabaseType) -> bool {
    match db_type {
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => true,
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn detect_database_type(url: &str) -> Result<DatabaseType, SqlShimError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(SqlShimError::ConfigError("database url is empty".into()));
    }
    let lower = url.to_ascii_lowercase();

    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        #[cfg(feature = "postgres")]
        return Ok(DatabaseType::Postgres);
        #[cfg(not(feature = "postgres"))]
        return Err(SqlShimError::ConfigError(
            "postgres support is not enabled in this build".into(),
        ));
    }

    let looks_sqlite = lower.starts_with("sqlite:")
        || lower.starts_with("file:")
        || lower == ":memory:"
        || [".db", ".sqlite", ".sqlite3"]
            .iter()
            .any(|ext| lower.ends_with(ext));
    if looks_sqlite {
        #[cfg(feature = "sqlite")]
        return Ok(DatabaseType::Sqlite);
        #[cfg(not(feature = "sqlite"))]
        return Err(SqlShimError::ConfigError(
            "sqlite support is not enabled in this build".into(),
        ));
    }

    Err(SqlShimError::ConfigError(format!(
        "cannot tell which database `{url}` points at; use a postgres:// or sqlite: url"
    )))
}
