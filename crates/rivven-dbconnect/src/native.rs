//! Native driver capability
//!
//! The wire protocol of each database lives behind these traits. A driver only needs
//! to open a connection from a connection string plus properties; the connection
//! executes statements and hands back either an affected-row count or a statement
//! whose rows are fetched in batches.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// Connection properties passed to [`Driver::connect`] (e.g. `user`, `password`)
pub type Properties = BTreeMap<String, String>;

/// A loaded native driver, shared by every connection opened through it
pub trait Driver: Send + Sync {
    /// Driver class name this instance was loaded as
    fn class_name(&self) -> &str;

    /// Open a native connection
    fn connect(&self, url: &str, properties: &Properties) -> Result<Box<dyn NativeConnection>>;

    /// Register a native authentication library (integrated security).
    ///
    /// Drivers without integrated security ignore the call.
    fn register_auth_library(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Outcome of executing one statement
pub enum NativeResult {
    /// Statement produced a result set
    Rows(Box<dyn NativeStatement>),
    /// Statement modified data; number of affected rows
    Affected(u64),
}

impl std::fmt::Debug for NativeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rows(_) => f.write_str("NativeResult::Rows(..)"),
            Self::Affected(n) => write!(f, "NativeResult::Affected({})", n),
        }
    }
}

/// A live native connection
pub trait NativeConnection: Send {
    /// Type name of the native connection, used to recover the dialect of
    /// connections that were not opened by the dispatcher
    fn class_name(&self) -> &str;

    /// Execute a statement
    fn execute(&mut self, sql: &str) -> Result<NativeResult>;

    /// Whether the native side considers the connection closed
    fn is_closed(&self) -> bool {
        false
    }

    /// Release the native connection
    fn close(self: Box<Self>) -> Result<()>;
}

/// A native statement with a pending result set
pub trait NativeStatement: Send {
    /// Column name and native type name, known before the first fetch
    fn columns(&self) -> &[NativeColumn];

    /// Fetch up to `max_rows` rows; an empty vector means the result set is exhausted
    fn fetch(&mut self, max_rows: usize) -> Result<Vec<Vec<NativeValue>>>;

    /// Release the statement
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Column metadata reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeColumn {
    /// Column name
    pub name: String,
    /// Declared type name, empty if the driver does not know it
    pub type_name: String,
}

impl NativeColumn {
    /// Create column metadata
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Value as produced by a driver, before dialect coercion
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// NULL
    Null,
    /// Integral value
    Integer(i64),
    /// Floating point value
    Real(f64),
    /// Character data
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// Boolean
    Boolean(bool),
    /// Date
    Date(NaiveDate),
    /// Timestamp
    Timestamp(NaiveDateTime),
}

/// Result set already held in memory, yielded in batches.
///
/// Drivers whose protocol hands over whole result sets use this instead of a
/// server-side cursor.
pub struct BufferedStatement {
    columns: Vec<NativeColumn>,
    rows: std::vec::IntoIter<Vec<NativeValue>>,
}

impl BufferedStatement {
    /// Wrap a materialized result
    pub fn new(columns: Vec<NativeColumn>, rows: Vec<Vec<NativeValue>>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }
}

impl NativeStatement for BufferedStatement {
    fn columns(&self) -> &[NativeColumn] {
        &self.columns
    }

    fn fetch(&mut self, max_rows: usize) -> Result<Vec<Vec<NativeValue>>> {
        Ok(self.rows.by_ref().take(max_rows).collect())
    }

    fn close(&mut self) -> Result<()> {
        self.rows = Vec::new().into_iter();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_statement_batches() {
        let rows = (0..5).map(|i| vec![NativeValue::Integer(i)]).collect();
        let mut stmt = BufferedStatement::new(vec![NativeColumn::new("a", "INT")], rows);

        assert_eq!(stmt.columns().len(), 1);
        assert_eq!(stmt.fetch(2).unwrap().len(), 2);
        assert_eq!(stmt.fetch(2).unwrap().len(), 2);
        assert_eq!(stmt.fetch(2).unwrap().len(), 1);
        assert!(stmt.fetch(2).unwrap().is_empty());
    }

    #[test]
    fn test_close_drops_pending_rows() {
        let rows = vec![vec![NativeValue::Null]];
        let mut stmt = BufferedStatement::new(vec![NativeColumn::new("a", "")], rows);
        stmt.close().unwrap();
        assert!(stmt.fetch(10).unwrap().is_empty());
    }
}
