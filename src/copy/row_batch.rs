//! Row Batches
//!
//! One unit of bulk-copy work. An insert batch carries a contiguous
//! pagination-key range of rows for one table and renders itself as a
//! parameterised INSERT; an init batch is a one-off initialisation
//! statement with no row-range semantics.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::{QualifiedTableName, TableSchema};
use crate::value::Value;

/// One unit of bulk-copy work
#[derive(Debug, Clone)]
pub enum RowBatch {
    Insert(InsertRowBatch),
    Init(InitRowBatch),
}

/// An ordered run of rows for one table
#[derive(Debug, Clone)]
pub struct InsertRowBatch {
    /// Source table definition the rows were read under
    pub table: Arc<TableSchema>,
    /// Row values, in pagination-key order
    pub rows: Vec<Vec<Value>>,
    /// Position of the pagination-key column within each row, when the
    /// table is paginated
    pub pagination_key_index: Option<usize>,
}

impl InsertRowBatch {
    /// Endpoints of the batch's contiguous pagination-key range
    pub fn pagination_key_range(&self) -> Option<(u64, u64)> {
        let index = self.pagination_key_index?;
        let first = self.rows.first()?.get(index)?.as_pagination_key()?;
        let last = self.rows.last()?.get(index)?.as_pagination_key()?;
        Some((first, last))
    }

    /// Render the parameterised INSERT and its bind values. INSERT
    /// IGNORE keeps a re-applied batch a no-op against rows that
    /// already arrived through binlog replay.
    pub fn as_sql(&self, target: &QualifiedTableName) -> Result<(String, Vec<Value>)> {
        if self.rows.is_empty() {
            return Err(Error::Internal(
                "cannot render an empty row batch".to_string(),
            ));
        }

        let columns: Vec<String> = self
            .table
            .columns
            .iter()
            .map(|c| format!("`{}`", c.name))
            .collect();

        let width = self.table.columns.len();
        for row in &self.rows {
            if row.len() != width {
                return Err(Error::Internal(format!(
                    "row batch for {} carries {} values but the table has {} columns",
                    self.table.name,
                    row.len(),
                    width
                )));
            }
        }

        let row_placeholders = format!("({})", vec!["?"; width].join(", "));
        let placeholders = vec![row_placeholders; self.rows.len()].join(", ");

        let sql = format!(
            "INSERT IGNORE INTO {} ({}) VALUES {}",
            target.quoted(),
            columns.join(", "),
            placeholders
        );
        let args = self.rows.iter().flatten().cloned().collect();
        Ok((sql, args))
    }
}

/// One-off initialisation statement (e.g. creating a newly-discovered
/// table on the target)
#[derive(Debug, Clone)]
pub struct InitRowBatch {
    pub table: QualifiedTableName,
    pub statement: String,
}
