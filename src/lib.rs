//! Statement shim for code written against `SQLite`.
//!
//! Call sites keep writing `?` placeholders and `datetime('now')` helpers; a [`Shim`]
//! translates each statement once at [`Shim::prepare`], runs it through a bounded pool, and
//! returns rows that serialize straight to JSON.
//!
//! ```rust,no_run
//! use sql_shim::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlShimError> {
//! let shim = Shim::from_env().await?;
//! let projects = shim
//!     .prepare("SELECT id, name FROM projects WHERE company_id = ? ORDER BY name")
//!     .all(&args!["c-1"])
//!     .await?;
//! let body = serde_json::to_string(&projects).unwrap_or_default();
//! # let _ = body;
//! # Ok(()) }
//! ```

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("enable at least one of the `postgres` or `sqlite` features");

pub mod config;
pub mod error;
pub mod pool;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod prelude;
pub mod results;
pub mod shim;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod statement;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod transaction;
pub mod translation;
pub mod types;

pub use config::ShimConfig;
pub use error::{DriverError, SqlShimError};
pub use results::{ResultSet, Row, RunResult};
pub use shim::Shim;
pub use statement::Statement;
pub use transaction::Transaction;
pub use translation::{
    Dialect, NowSemantics, StatementShape, TranslateOptions, Translated, TranslationMode, Verb,
    translate,
};
pub use types::{DatabaseType, RowValues};
