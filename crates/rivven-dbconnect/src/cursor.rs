//! Batched result cursor
//!
//! A [`ResultCursor`] pulls rows from a native statement in bounded batches and
//! coerces every value through the connection's dialect. An empty batch means the
//! result set is exhausted; after that every fetch returns an empty batch again.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::connection::Shared;
use crate::dialect::{native_to_value, Dbms};
use crate::error::{Error, Result};
use crate::native::{NativeResult, NativeStatement, NativeValue};
use crate::types::{ColumnInfo, Row, RowBatch, Value, ValueKind};

/// Batch size used by [`ResultCursor::fetch_all`]
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Cursor over the result of one statement
pub struct ResultCursor {
    sql: String,
    dbms: Option<Dbms>,
    shared: Arc<Shared>,
    statement: Option<Box<dyn NativeStatement>>,
    columns: Vec<ColumnInfo>,
    names: Arc<[String]>,
    row_count: u64,
    rows_affected: u64,
    completed: bool,
}

impl ResultCursor {
    pub(crate) fn new(
        sql: &str,
        dbms: Option<Dbms>,
        shared: Arc<Shared>,
        result: NativeResult,
    ) -> Self {
        let (statement, rows_affected) = match result {
            NativeResult::Rows(statement) => (Some(statement), 0),
            NativeResult::Affected(n) => (None, n),
        };

        let columns: Vec<ColumnInfo> = statement
            .as_ref()
            .map(|s| {
                s.columns()
                    .iter()
                    .map(|c| {
                        let kind = dbms.map_or(ValueKind::Unknown, |d| d.value_kind(&c.type_name));
                        ColumnInfo::new(c.name.clone(), c.type_name.clone(), kind)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();

        Self {
            sql: sql.to_string(),
            dbms,
            shared,
            completed: statement.is_none(),
            statement,
            columns,
            names,
            row_count: 0,
            rows_affected,
        }
    }

    /// SQL this cursor was opened for
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Result columns; empty for statements that return no rows
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Rows affected by a data-modifying statement; zero for queries
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Rows delivered so far
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Whether the result set is exhausted
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Fetch up to `batch_size` rows.
    ///
    /// Returns an empty batch exactly when the result set is exhausted. Fails
    /// with [`Error::ConnectionClosed`] if the owning connection was closed
    /// before the cursor completed.
    pub fn fetch(&mut self, batch_size: usize) -> Result<RowBatch> {
        if self.completed {
            return Ok(RowBatch::empty());
        }
        if batch_size == 0 {
            return Err(Error::config("batch size must be greater than zero"));
        }
        let Some(statement) = self.statement.as_mut() else {
            self.completed = true;
            return Ok(RowBatch::empty());
        };

        let raw = self
            .shared
            .with_native(|_| statement.fetch(batch_size))
            .map_err(|e| e.with_sql(&self.sql))?;

        if raw.is_empty() {
            self.completed = true;
            debug!(rows = self.row_count, "Result set exhausted");
            self.release()?;
            return Ok(RowBatch::empty());
        }

        let mut rows = Vec::with_capacity(raw.len());
        for values in raw {
            rows.push(self.convert(values)?);
        }
        self.row_count += rows.len() as u64;
        Ok(RowBatch::new(rows))
    }

    /// Fetch every remaining row
    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        loop {
            let batch = self.fetch(DEFAULT_BATCH_SIZE)?;
            if batch.is_empty() {
                return Ok(rows);
            }
            rows.extend(batch);
        }
    }

    /// Release the native statement. Safe to call more than once.
    pub fn release(&mut self) -> Result<()> {
        match self.statement.take() {
            Some(mut statement) => statement.close().map_err(|e| e.with_sql(&self.sql)),
            None => Ok(()),
        }
    }

    fn convert(&self, values: Vec<NativeValue>) -> Result<Row> {
        if values.len() != self.columns.len() {
            return Err(Error::query_with_sql(
                format!(
                    "driver returned {} values for {} columns",
                    values.len(),
                    self.columns.len()
                ),
                self.sql.clone(),
            ));
        }

        let values = values
            .into_iter()
            .zip(&self.columns)
            .map(|(value, column)| self.coerce(column, value))
            .collect::<Result<Vec<Value>>>()?;
        Ok(Row::new(Arc::clone(&self.names), values))
    }

    fn coerce(&self, column: &ColumnInfo, value: NativeValue) -> Result<Value> {
        match self.dbms {
            Some(dbms) => dbms.coerce(column.kind, value).map_err(|e| match e {
                Error::TypeConversion { message } => {
                    Error::type_conversion(format!("column '{}': {}", column.name, message))
                }
                other => other,
            }),
            None => Ok(native_to_value(value)),
        }
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "Failed to release cursor");
        }
    }
}

impl fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCursor")
            .field("sql", &self.sql)
            .field("dbms", &self.dbms)
            .field("columns", &self.columns)
            .field("row_count", &self.row_count)
            .field("rows_affected", &self.rows_affected)
            .field("completed", &self.completed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionHandle;
    use crate::native::{BufferedStatement, NativeColumn, NativeConnection};

    struct Numbers;

    impl NativeConnection for Numbers {
        fn class_name(&self) -> &str {
            "numbers"
        }

        fn execute(&mut self, sql: &str) -> Result<NativeResult> {
            match sql {
                "SELECT n" => Ok(NativeResult::Rows(Box::new(BufferedStatement::new(
                    vec![NativeColumn::new("n", "")],
                    (1..=4).map(|n| vec![NativeValue::Integer(n)]).collect(),
                )))),
                "BROKEN" => Ok(NativeResult::Rows(Box::new(BufferedStatement::new(
                    vec![NativeColumn::new("a", ""), NativeColumn::new("b", "")],
                    vec![vec![NativeValue::Null]],
                )))),
                _ => Ok(NativeResult::Affected(7)),
            }
        }

        fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn handle() -> ConnectionHandle {
        ConnectionHandle::from_native(Box::new(Numbers))
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let conn = handle();
        let mut cursor = conn.query("SELECT n").unwrap();
        assert!(matches!(cursor.fetch(0), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_columns_before_fetch_and_counts() {
        let conn = handle();
        let mut cursor = conn.query("SELECT n").unwrap();
        assert_eq!(cursor.columns()[0].name, "n");
        assert_eq!(cursor.columns()[0].kind, ValueKind::Unknown);

        let rows = cursor.fetch_all().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].get_by_name("n"), Some(&Value::Integer(4)));
        assert_eq!(cursor.row_count(), 4);
        assert_eq!(cursor.rows_affected(), 0);
        assert!(cursor.is_complete());
    }

    #[test]
    fn test_non_query_is_complete_immediately() {
        let conn = handle();
        let mut cursor = conn.query("UPDATE t SET a = 1").unwrap();
        assert!(cursor.is_complete());
        assert_eq!(cursor.rows_affected(), 7);
        assert!(cursor.columns().is_empty());
        assert!(cursor.fetch(10).unwrap().is_empty());
    }

    #[test]
    fn test_value_count_mismatch() {
        let conn = handle();
        let mut cursor = conn.query("BROKEN").unwrap();
        let err = cursor.fetch(10).unwrap_err();
        assert!(err.to_string().contains("1 values for 2 columns"));
    }

    #[test]
    fn test_release_is_idempotent() {
        let conn = handle();
        let mut cursor = conn.query("SELECT n").unwrap();
        cursor.release().unwrap();
        cursor.release().unwrap();
        assert!(cursor.fetch(2).unwrap().is_empty());
        assert!(cursor.is_complete());
    }
}
