//! Unit tests for rivven-dbconnect result cursor

use rivven_dbconnect::connection::ConnectionHandle;
use rivven_dbconnect::error::{Error, Result};
use rivven_dbconnect::native::{
    BufferedStatement, NativeColumn, NativeConnection, NativeResult, NativeStatement, NativeValue,
};
use rivven_dbconnect::types::{Value, ValueKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves `SELECT` from a fixed ten-row table and counts closed statements
struct TenRows {
    class: &'static str,
    closed_statements: Arc<AtomicUsize>,
}

struct CountingStatement {
    inner: BufferedStatement,
    closed: Arc<AtomicUsize>,
}

impl NativeStatement for CountingStatement {
    fn columns(&self) -> &[NativeColumn] {
        self.inner.columns()
    }

    fn fetch(&mut self, max_rows: usize) -> Result<Vec<Vec<NativeValue>>> {
        self.inner.fetch(max_rows)
    }

    fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

impl NativeConnection for TenRows {
    fn class_name(&self) -> &str {
        self.class
    }

    fn execute(&mut self, sql: &str) -> Result<NativeResult> {
        if !sql.starts_with("SELECT") {
            return Err(Error::query("only SELECT is supported"));
        }
        let rows = (1..=10)
            .map(|n| {
                vec![
                    NativeValue::Integer(n),
                    NativeValue::Text(format!("2024-01-{:02}", n)),
                ]
            })
            .collect();
        Ok(NativeResult::Rows(Box::new(CountingStatement {
            inner: BufferedStatement::new(
                vec![NativeColumn::new("id", "INT8"), NativeColumn::new("day", "DATE")],
                rows,
            ),
            closed: Arc::clone(&self.closed_statements),
        })))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn open(class: &'static str) -> (ConnectionHandle, Arc<AtomicUsize>) {
    let closed = Arc::new(AtomicUsize::new(0));
    let handle = ConnectionHandle::from_native(Box::new(TenRows {
        class,
        closed_statements: Arc::clone(&closed),
    }));
    (handle, closed)
}

#[test]
fn test_batches_of_three_over_ten_rows() {
    let (conn, _) = open("postgres::Client");
    let mut cursor = conn.query("SELECT id, day FROM t").unwrap();

    let sizes: Vec<usize> = (0..4).map(|_| cursor.fetch(3).unwrap().len()).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    assert!(!cursor.is_complete());

    for _ in 0..3 {
        assert!(cursor.fetch(3).unwrap().is_empty());
        assert!(cursor.is_complete());
    }
    assert_eq!(cursor.row_count(), 10);
}

#[test]
fn test_values_coerced_by_dialect() {
    let (conn, _) = open("postgres::Client");
    let mut cursor = conn.query("SELECT id, day FROM t").unwrap();
    assert_eq!(cursor.columns()[1].kind, ValueKind::Date);

    let batch = cursor.fetch(1).unwrap();
    let row = &batch.rows()[0];
    assert_eq!(row.get(0), Some(&Value::Integer(1)));
    assert_eq!(
        row.get_by_name("day").and_then(Value::as_date),
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
    );
}

#[test]
fn test_unknown_dialect_passes_values_through() {
    let (conn, _) = open("vendor::Connection");
    let rows = conn.query_all("SELECT id, day FROM t").unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].get(1), Some(&Value::Text("2024-01-01".into())));
}

#[test]
fn test_fetch_after_connection_close() {
    let (conn, _) = open("postgres::Client");
    let mut cursor = conn.query("SELECT id FROM t").unwrap();
    assert_eq!(cursor.fetch(3).unwrap().len(), 3);

    conn.close().unwrap();
    assert!(matches!(cursor.fetch(3), Err(Error::ConnectionClosed)));
}

#[test]
fn test_completed_cursor_survives_connection_close() {
    let (conn, _) = open("postgres::Client");
    let mut cursor = conn.query("SELECT id FROM t").unwrap();
    cursor.fetch_all().unwrap();

    conn.close().unwrap();
    assert!(cursor.fetch(3).unwrap().is_empty());
}

#[test]
fn test_release_closes_statement_once() {
    let (conn, closed) = open("postgres::Client");
    let mut cursor = conn.query("SELECT id FROM t").unwrap();
    cursor.release().unwrap();
    cursor.release().unwrap();
    drop(cursor);
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    // exhausting the cursor releases the statement as well
    let mut cursor = conn.query("SELECT id FROM t").unwrap();
    cursor.fetch_all().unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 2);
    drop(cursor);
    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_execute_error_carries_sql() {
    let (conn, _) = open("postgres::Client");
    let err = conn.query("DELETE FROM t").unwrap_err();
    assert!(matches!(err, Error::Query { sql: Some(ref s), .. } if s == "DELETE FROM t"));
}

#[test]
fn test_zero_batch_after_exhaustion_is_empty() {
    let (conn, _) = open("postgres::Client");
    let mut cursor = conn.query("SELECT id FROM t").unwrap();
    assert!(matches!(cursor.fetch(0), Err(Error::Configuration { .. })));

    cursor.fetch_all().unwrap();
    assert!(cursor.is_complete());
    assert!(cursor.fetch(0).unwrap().is_empty());
}
