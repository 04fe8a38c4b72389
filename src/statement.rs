use tracing::debug;

use crate::error::SqlShimError;
use crate::pool::PooledConn;
use crate::results::{ResultSet, Row, RunResult};
use crate::shim::Shim;
use crate::translation::{StatementShape, TranslateOptions, translate};
use crate::types::RowValues;

/// A prepared statement handle: the call site's template plus its translation.
///
/// Translation happens once, in [`Shim::prepare`]; executing the handle any number of times
/// reuses the stored text. Arguments bind positionally and their count must match the
/// statement's placeholder slots.
#[derive(Debug, Clone)]
pub struct Statement {
    shim: Shim,
    template: String,
    sql: String,
    shape: StatementShape,
}

impl Statement {
    pub(crate) fn new(shim: Shim, template: &str, options: &TranslateOptions) -> Self {
        let translated = translate(template, options);
        Self {
            shim,
            template: template.to_owned(),
            sql: translated.sql.into_owned(),
            shape: translated.shape,
        }
    }

    /// SQL as written at the call site.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// SQL as sent to the backend.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn shape(&self) -> StatementShape {
        self.shape
    }

    #[must_use]
    pub fn slots(&self) -> usize {
        self.shape.slots
    }

    pub(crate) fn check_args(&self, args: &[RowValues]) -> Result<(), SqlShimError> {
        if args.len() == self.shape.slots {
            Ok(())
        } else {
            Err(SqlShimError::ParameterError(format!(
                "statement expects {} argument(s), got {} [sql: {}]",
                self.shape.slots,
                args.len(),
                self.template
            )))
        }
    }

    /// Every row, in backend order. No rows is an empty vec.
    ///
    /// # Errors
    /// `ParameterError` on an argument count mismatch (before any I/O), pool errors, or
    /// `QueryError` when the backend rejects the statement.
    pub async fn all(&self, args: &[RowValues]) -> Result<Vec<Row>, SqlShimError> {
        self.check_args(args)?;
        let mut conn = self.shim.acquire().await?;
        Ok(self.select_on(&mut conn, args).await?.into_rows())
    }

    /// The first row, or `None` when nothing matched. Later rows are never decoded.
    ///
    /// # Errors
    /// Same as [`Statement::all`].
    pub async fn get(&self, args: &[RowValues]) -> Result<Option<Row>, SqlShimError> {
        self.check_args(args)?;
        let mut conn = self.shim.acquire().await?;
        self.first_on(&mut conn, args).await
    }

    /// Execute a mutation and report what it did.
    ///
    /// # Errors
    /// `ParameterError` on an argument count mismatch, pool errors, or `ExecError` when the
    /// backend rejects the statement.
    pub async fn run(&self, args: &[RowValues]) -> Result<RunResult, SqlShimError> {
        self.check_args(args)?;
        let mut conn = self.shim.acquire().await?;
        self.run_on(&mut conn, args).await
    }

    pub(crate) async fn select_on(
        &self,
        conn: &mut PooledConn,
        args: &[RowValues],
    ) -> Result<ResultSet, SqlShimError> {
        debug!(template = %self.template, slots = self.shape.slots, "query");
        conn.select(&self.sql, args)
            .await
            .map_err(|e| SqlShimError::query(&self.template, e))
    }

    pub(crate) async fn first_on(
        &self,
        conn: &mut PooledConn,
        args: &[RowValues],
    ) -> Result<Option<Row>, SqlShimError> {
        debug!(template = %self.template, slots = self.shape.slots, "query first");
        let result_set = conn
            .select_first(&self.sql, args)
            .await
            .map_err(|e| SqlShimError::query(&self.template, e))?;
        Ok(result_set.into_rows().into_iter().next())
    }

    /// Statements with `RETURNING` run as queries so the mutated rows come back in the same
    /// round trip.
    pub(crate) async fn run_on(
        &self,
        conn: &mut PooledConn,
        args: &[RowValues],
    ) -> Result<RunResult, SqlShimError> {
        debug!(template = %self.template, returning = self.shape.returning, "run");
        if self.shape.returning {
            let returned = conn
                .select(&self.sql, args)
                .await
                .map_err(|e| SqlShimError::exec(&self.template, e))?;
            return Ok(RunResult::from_returning(&returned));
        }
        conn.execute(&self.sql, args, self.shape.verb.inserts())
            .await
            .map_err(|e| SqlShimError::exec(&self.template, e))
    }
}
