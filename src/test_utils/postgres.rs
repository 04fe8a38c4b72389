use postgresql_embedded::PostgreSQL;
use tracing::info;

/// A `PostgreSQL` server started from the bundled binaries on a free local port.
///
/// ```rust,no_run
/// use sql_shim::prelude::*;
/// use sql_shim::test_utils::EmbeddedPostgres;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let server = EmbeddedPostgres::start("shim_test").await?;
/// let shim = Shim::connect(ShimConfig::new(server.database_url())?).await?;
/// # drop(shim);
/// server.stop().await?;
/// # Ok(()) }
/// ```
pub struct EmbeddedPostgres {
    postgresql: PostgreSQL,
    database_url: String,
}

impl EmbeddedPostgres {
    /// Install (if needed) and start a server, then create `database` on it.
    ///
    /// # Errors
    /// Returns the embedded server's error if setup, start or database creation fails.
    pub async fn start(database: &str) -> Result<Self, postgresql_embedded::Error> {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(database).await?;

        let settings = postgresql.settings();
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{database}",
            settings.username, settings.password, settings.host, settings.port
        );
        info!(port = settings.port, database, "embedded postgres started");
        Ok(Self {
            postgresql,
            database_url,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// # Errors
    /// Returns the embedded server's error if it does not shut down cleanly.
    pub async fn stop(self) -> Result<(), postgresql_embedded::Error> {
        self.postgresql.stop().await
    }
}
