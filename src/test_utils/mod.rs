//! Helpers for tests that need a real database server.

/// Throwaway `PostgreSQL` servers for integration tests
pub mod postgres;

pub use postgres::EmbeddedPostgres;
