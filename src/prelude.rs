//! Convenient imports for call sites.

pub use crate::args;
pub use crate::config::ShimConfig;
pub use crate::error::{DriverError, SqlShimError};
pub use crate::results::{ResultSet, Row, RunResult};
pub use crate::shim::Shim;
pub use crate::statement::Statement;
pub use crate::transaction::Transaction;
pub use crate::translation::{Dialect, NowSemantics, TranslateOptions, TranslationMode, translate};
pub use crate::types::{DatabaseType, RowValues};
