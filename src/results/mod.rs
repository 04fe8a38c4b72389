mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::Row;

use crate::types::RowValues;

/// Metadata returned by [`Statement::run`](crate::Statement::run).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    /// Rows the backend reports as inserted, updated or deleted.
    pub rows_affected: u64,
    /// Identifier of the last inserted row, when the backend can report one.
    ///
    /// PostgreSQL only fills this for statements with a `RETURNING` clause; `SQLite` reports its
    /// rowid for inserts. Callers that generate their own identifiers should not read it.
    pub last_inserted_id: Option<RowValues>,
}

impl RunResult {
    #[must_use]
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_inserted_id: None,
        }
    }

    /// Build the mutation result for a statement that returned its mutated rows.
    ///
    /// The identifier is taken from an `id` column when present, else from the first column
    /// of the last returned row.
    #[must_use]
    pub fn from_returning(result_set: &ResultSet) -> Self {
        let last_inserted_id = result_set.results.last().and_then(|row| {
            row.get("id")
                .or_else(|| row.get_by_index(0))
                .filter(|value| !value.is_null())
                .cloned()
        });
        Self {
            rows_affected: result_set.results.len() as u64,
            last_inserted_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn result_set(columns: &[&str], rows: Vec<Vec<RowValues>>) -> ResultSet {
        let mut rs = ResultSet::new(Arc::new(columns.iter().map(|c| (*c).to_string()).collect()));
        for row in rows {
            rs.add_row_values(row);
        }
        rs
    }

    #[test]
    fn returning_prefers_id_column() {
        let rs = result_set(
            &["name", "id"],
            vec![
                vec![RowValues::Text("a".into()), RowValues::Text("v-1".into())],
                vec![RowValues::Text("b".into()), RowValues::Text("v-2".into())],
            ],
        );
        let res = RunResult::from_returning(&rs);
        assert_eq!(res.rows_affected, 2);
        assert_eq!(res.last_inserted_id, Some(RowValues::Text("v-2".into())));
    }

    #[test]
    fn returning_falls_back_to_first_column() {
        let rs = result_set(&["vendor_id"], vec![vec![RowValues::Int(9)]]);
        assert_eq!(
            RunResult::from_returning(&rs).last_inserted_id,
            Some(RowValues::Int(9))
        );
    }

    #[test]
    fn returning_nothing_reports_zero() {
        let rs = result_set(&["id"], vec![]);
        assert_eq!(RunResult::from_returning(&rs), RunResult::affected(0));
    }
}
