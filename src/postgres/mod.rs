// PostgreSQL backend - the translated dialect.
//
// - config: bb8 connection manager, per-connection statement cache, pool setup
// - params: binding `RowValues` to server-inferred parameter types
// - query: result extraction and building
// - executor: statement execution on a checked-out connection

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{PgConnection, PgManager};
pub use params::Params;
pub use query::build_result_set;
