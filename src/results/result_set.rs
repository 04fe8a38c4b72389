use std::collections::HashMap;
use std::sync::Arc;

use super::row::{Row, index_columns};
use crate::types::RowValues;

/// Rows returned by one statement, sharing a single column list.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<Row>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>) -> Self {
        Self::with_capacity(column_names, 0)
    }

    /// Create a result set with preallocated room for `capacity` rows.
    #[must_use]
    pub fn with_capacity(column_names: Arc<Vec<String>>, capacity: usize) -> Self {
        let column_index = index_columns(&column_names);
        Self {
            results: Vec::with_capacity(capacity),
            column_names,
            column_index,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    /// Append a row; values are positional against the shared column names.
    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        self.results.push(Row::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            values,
        ));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.results
    }
}
