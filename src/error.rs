use std::time::Duration;

use thiserror::Error;

/// Error raised by the database driver underneath the shim.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced to shim callers.
///
/// Backend rejections keep the original (untranslated) template so the call site that issued
/// the statement can be found from a log line.
#[derive(Debug, Error)]
pub enum SqlShimError {
    #[error("query failed: {source} [sql: {template}]")]
    QueryError {
        template: String,
        #[source]
        source: DriverError,
    },

    #[error("exec failed: {source} [sql: {template}]")]
    ExecError {
        template: String,
        #[source]
        source: DriverError,
    },

    #[error("timed out after {waited:?} waiting for a pooled connection")]
    PoolExhaustion { waited: Duration },

    #[error("pool is closed")]
    PoolClosed,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SqlShimError {
    pub(crate) fn query(template: &str, source: DriverError) -> Self {
        SqlShimError::QueryError {
            template: template.to_owned(),
            source,
        }
    }

    pub(crate) fn exec(template: &str, source: DriverError) -> Self {
        SqlShimError::ExecError {
            template: template.to_owned(),
            source,
        }
    }

    /// Template text attached to a backend rejection, if any.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        match self {
            SqlShimError::QueryError { template, .. } | SqlShimError::ExecError { template, .. } => {
                Some(template)
            }
            _ => None,
        }
    }
}
