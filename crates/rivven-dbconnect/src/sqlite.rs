//! Bundled SQLite driver
//!
//! Backs the `sqlite` and `sqlite extended` dialects with rusqlite. Connection
//! strings have the form `sqlite:<path>`; `sqlite::memory:` (or an empty path)
//! opens a private in-memory database.

use rusqlite::types::ValueRef;
use tracing::debug;

use crate::error::{Error, Result};
use crate::native::{
    BufferedStatement, Driver, NativeColumn, NativeConnection, NativeResult, NativeValue,
    Properties,
};

/// Class name the SQLite driver is registered under
pub const CLASS_NAME: &str = "rusqlite";

/// SQLite driver
#[derive(Debug, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create the driver
    pub fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    fn class_name(&self) -> &str {
        CLASS_NAME
    }

    fn connect(&self, url: &str, _properties: &Properties) -> Result<Box<dyn NativeConnection>> {
        let path = url.strip_prefix("sqlite:").ok_or_else(|| {
            Error::connection("SQLite connection strings must start with 'sqlite:'", url)
        })?;

        let conn = match path {
            "" | ":memory:" => rusqlite::Connection::open_in_memory(),
            file => rusqlite::Connection::open(file),
        }
        .map_err(|e| Error::connection_with_source("failed to open SQLite database", url, e))?;

        debug!(path, "Opened SQLite database");
        Ok(Box::new(SqliteConnection { conn }))
    }
}

/// SQLite connection
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    fn total_changes(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT total_changes()", [], |row| row.get(0))
    }

    fn run(&mut self, sql: &str) -> rusqlite::Result<NativeResult> {
        let mut stmt = self.conn.prepare(sql)?;

        if stmt.column_count() == 0 {
            // sqlite3_changes() keeps the last DML count across DDL statements
            let before = self.total_changes()?;
            let affected = stmt.execute([])?;
            let changed = self.total_changes()? != before;
            return Ok(NativeResult::Affected(if changed { affected as u64 } else { 0 }));
        }

        let columns: Vec<NativeColumn> = stmt
            .columns()
            .iter()
            .map(|c| NativeColumn::new(c.name(), c.decl_type().unwrap_or_default()))
            .collect();

        // rusqlite statements borrow the connection, so rows are materialized here
        let mut buffered = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(native_value(row.get_ref(idx)?));
            }
            buffered.push(values);
        }

        Ok(NativeResult::Rows(Box::new(BufferedStatement::new(
            columns, buffered,
        ))))
    }
}

impl NativeConnection for SqliteConnection {
    fn class_name(&self) -> &str {
        "rusqlite::Connection"
    }

    fn execute(&mut self, sql: &str) -> Result<NativeResult> {
        self.run(sql)
            .map_err(|e| Error::query_with_source(e.to_string(), sql, e))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::query_with_source("failed to close SQLite database", "", e))
    }
}

fn native_value(value: ValueRef<'_>) -> NativeValue {
    match value {
        ValueRef::Null => NativeValue::Null,
        ValueRef::Integer(n) => NativeValue::Integer(n),
        ValueRef::Real(f) => NativeValue::Real(f),
        ValueRef::Text(bytes) => NativeValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => NativeValue::Blob(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Box<dyn NativeConnection> {
        SqliteDriver::new()
            .connect("sqlite::memory:", &Properties::new())
            .unwrap()
    }

    #[test]
    fn test_rejects_foreign_scheme() {
        let err = match SqliteDriver::new().connect("postgresql://h:1/d", &Properties::new()) {
            Err(e) => e,
            Ok(_) => panic!("expected failure"),
        };
        assert!(err.to_string().contains("sqlite:"));
    }

    #[test]
    fn test_affected_rows_and_rows() {
        let mut conn = open();
        assert!(matches!(
            conn.execute("CREATE TABLE t (a INTEGER, b TEXT)").unwrap(),
            NativeResult::Affected(0)
        ));
        assert!(matches!(
            conn.execute("INSERT INTO t VALUES (1, 'x'), (2, NULL)").unwrap(),
            NativeResult::Affected(2)
        ));
        assert!(matches!(
            conn.execute("CREATE TABLE u (c INTEGER)").unwrap(),
            NativeResult::Affected(0)
        ));

        match conn.execute("SELECT a, b FROM t ORDER BY a").unwrap() {
            NativeResult::Rows(mut stmt) => {
                assert_eq!(stmt.columns()[0], NativeColumn::new("a", "INTEGER"));
                let rows = stmt.fetch(10).unwrap();
                assert_eq!(rows[0], vec![NativeValue::Integer(1), NativeValue::Text("x".into())]);
                assert_eq!(rows[1][1], NativeValue::Null);
            }
            NativeResult::Affected(_) => panic!("expected rows"),
        }
        conn.close().unwrap();
    }

    #[test]
    fn test_syntax_error_carries_sql() {
        let mut conn = open();
        let err = conn.execute("SELEC 1").unwrap_err();
        assert!(matches!(err, Error::Query { sql: Some(ref s), .. } if s == "SELEC 1"));
    }
}
