// SQLite backend - the dialect call sites are written in.
//
// - config: bb8 manager and the mutex-guarded connection handle
// - params: `RowValues` to rusqlite values
// - query: result extraction and building
// - executor: blocking statement execution, driven from async callers

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{SqliteConnection, SqliteManager};
pub use params::Params;
pub use query::build_result_set;
