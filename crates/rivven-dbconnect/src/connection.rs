//! Dialect-tagged connection handle
//!
//! A [`ConnectionHandle`] owns exactly one native connection and knows which
//! dialect it speaks, so callers can quote identifiers and literals without
//! caring about the backend. Lifecycle is `Open -> Closed`; closing twice is a
//! warning, not an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use rivven_dbconnect::prelude::*;
//!
//! let details = ConnectionDetails::builder("sqlite")
//!     .credentials(Credentials::new().with_server(":memory:"))
//!     .build()?;
//! let conn = connect(&details)?;
//! conn.execute("CREATE TABLE t (id INTEGER)")?;
//! assert_eq!(conn.quote_identifier("my col"), "\"my col\"");
//! conn.close()?;
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cursor::ResultCursor;
use crate::dialect::{dbms_for_class_name, quote_with, Dbms};
use crate::error::{Error, Result};
use crate::native::NativeConnection;
use crate::script::split_statements;
use crate::types::{Row, Value};

/// Quote used for generic connections whose dialect is unknown
pub const DEFAULT_QUOTE: char = '\'';

/// Hooks invoked around a connection's lifecycle.
///
/// `on_open` runs once after a successful connect, `on_close` once when the
/// handle transitions to closed.
pub trait ConnectionObserver: Send + Sync {
    /// Connection opened
    fn on_open(&self, _handle: &ConnectionHandle) {}

    /// Connection closed
    fn on_close(&self, _handle: &ConnectionHandle) {}
}

/// Outcome of [`ConnectionHandle::close`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStatus {
    /// The native connection was released by this call
    Closed,
    /// The handle was already closed; nothing happened
    AlreadyClosed,
}

/// Native connection shared between a handle and its cursors
pub(crate) struct Shared {
    native: Mutex<Option<Box<dyn NativeConnection>>>,
}

impl Shared {
    fn new(native: Box<dyn NativeConnection>) -> Self {
        Self {
            native: Mutex::new(Some(native)),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.native
            .lock()
            .as_ref()
            .map_or(true, |native| native.is_closed())
    }

    /// Run `f` against the open native connection
    pub(crate) fn with_native<T>(
        &self,
        f: impl FnOnce(&mut dyn NativeConnection) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.native.lock();
        match guard.as_mut() {
            Some(native) if !native.is_closed() => f(&mut **native),
            _ => Err(Error::ConnectionClosed),
        }
    }

    fn take(&self) -> Option<Box<dyn NativeConnection>> {
        self.native.lock().take()
    }
}

/// An open (or closed) connection to one database
pub struct ConnectionHandle {
    id: Uuid,
    dbms: Option<Dbms>,
    identifier_quote: char,
    string_quote: char,
    url: String,
    shared: Arc<Shared>,
    observer: Option<Arc<dyn ConnectionObserver>>,
}

impl ConnectionHandle {
    /// Wrap a freshly connected native handle and notify the observer
    pub(crate) fn open(
        native: Box<dyn NativeConnection>,
        dbms: Dbms,
        url: String,
        observer: Option<Arc<dyn ConnectionObserver>>,
    ) -> Self {
        let rule = dbms.rule();
        let handle = Self {
            id: Uuid::new_v4(),
            dbms: Some(dbms),
            identifier_quote: rule.identifier_quote,
            string_quote: rule.string_quote,
            url,
            shared: Arc::new(Shared::new(native)),
            observer,
        };
        if let Some(observer) = &handle.observer {
            observer.on_open(&handle);
        }
        info!(id = %handle.id, dbms = %dbms, url = %handle.url, "Connected");
        handle
    }

    /// Wrap a native connection that was opened outside the dispatcher.
    ///
    /// The dialect is recovered from the native class name; unknown classes give
    /// a generic handle with `'` quoting and no dialect.
    pub fn from_native(native: Box<dyn NativeConnection>) -> Self {
        let dbms = dbms_for_class_name(native.class_name());
        if dbms.is_none() {
            debug!(class = native.class_name(), "Unknown native connection class");
        }
        let (identifier_quote, string_quote) = dbms
            .map(|d| (d.rule().identifier_quote, d.rule().string_quote))
            .unwrap_or((DEFAULT_QUOTE, DEFAULT_QUOTE));
        Self {
            id: Uuid::new_v4(),
            dbms,
            identifier_quote,
            string_quote,
            url: String::new(),
            shared: Arc::new(Shared::new(native)),
            observer: None,
        }
    }

    /// Connection id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Dialect, if known
    pub fn dbms(&self) -> Option<Dbms> {
        self.dbms
    }

    /// Identifier quote character (opening)
    pub fn identifier_quote(&self) -> char {
        self.identifier_quote
    }

    /// String literal quote character
    pub fn string_quote(&self) -> char {
        self.string_quote
    }

    /// Connection string used to connect, with any password masked
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the handle is closed
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Quote an identifier for this dialect
    pub fn quote_identifier(&self, name: &str) -> String {
        quote_with(self.identifier_quote, name)
    }

    /// Quote a string literal for this dialect
    pub fn quote_literal(&self, value: &str) -> String {
        quote_with(self.string_quote, value)
    }

    /// Execute any statement and return a cursor over its result
    pub fn query(&self, sql: &str) -> Result<ResultCursor> {
        let result = self
            .shared
            .with_native(|native| native.execute(sql))
            .map_err(|e| e.with_sql(sql))?;
        Ok(ResultCursor::new(
            sql,
            self.dbms,
            Arc::clone(&self.shared),
            result,
        ))
    }

    /// Execute a statement, returning the number of affected rows
    pub fn execute(&self, sql: &str) -> Result<u64> {
        let mut cursor = self.query(sql)?;
        let affected = cursor.rows_affected();
        cursor.release()?;
        Ok(affected)
    }

    /// Execute a query and collect every row
    pub fn query_all(&self, sql: &str) -> Result<Vec<Row>> {
        self.query(sql)?.fetch_all()
    }

    /// Execute a multi-statement script in order, returning per-statement
    /// affected-row counts. Stops at the first failing statement.
    pub fn execute_script(&self, sql: &str) -> Result<Vec<u64>> {
        let statements = split_statements(sql)?;
        let total = statements.len();
        let mut affected = Vec::with_capacity(total);
        for (idx, statement) in statements.iter().enumerate() {
            debug!(id = %self.id, statement = idx + 1, total, "Executing script statement");
            affected.push(self.execute(statement)?);
        }
        Ok(affected)
    }

    /// Table names in `schema` (dialect default schema when `None`)
    pub fn table_names(&self, schema: Option<&str>) -> Result<Vec<String>> {
        let dbms = self
            .dbms
            .ok_or_else(|| Error::unsupported("listing tables requires a known dialect"))?;
        let mut cursor = self.query(&dbms.table_names_sql(schema)?)?;

        let column = cursor
            .columns()
            .iter()
            .position(|c| {
                ["table_name", "tablename", "name"]
                    .iter()
                    .any(|n| c.name.eq_ignore_ascii_case(n))
            })
            .unwrap_or(0);

        let names = cursor
            .fetch_all()?
            .into_iter()
            .filter_map(|row| match row.into_values().into_iter().nth(column) {
                Some(Value::Text(name)) => Some(name),
                _ => None,
            })
            .collect();
        Ok(names)
    }

    /// Whether `table` exists in `schema` (case-insensitive)
    pub fn exists_table(&self, schema: Option<&str>, table: &str) -> Result<bool> {
        Ok(self
            .table_names(schema)?
            .iter()
            .any(|name| name.eq_ignore_ascii_case(table)))
    }

    /// Close the connection.
    ///
    /// Closing an already closed handle logs a warning and returns
    /// [`CloseStatus::AlreadyClosed`].
    pub fn close(&self) -> Result<CloseStatus> {
        let Some(native) = self.shared.take() else {
            warn!(id = %self.id, "Connection is already closed");
            return Ok(CloseStatus::AlreadyClosed);
        };

        let result = native.close();
        if let Some(observer) = &self.observer {
            observer.on_close(self);
        }
        result?;
        info!(id = %self.id, "Connection closed");
        Ok(CloseStatus::Closed)
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if self.shared.native.lock().is_none() {
            return;
        }
        if let Err(e) = self.close() {
            warn!(id = %self.id, error = %e, "Failed to close connection on drop");
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("dbms", &self.dbms)
            .field("url", &self.url)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Close a connection; see [`ConnectionHandle::close`]
pub fn disconnect(handle: &ConnectionHandle) -> Result<CloseStatus> {
    handle.close()
}

/// Dialect of a connection, if known
pub fn dbms(handle: &ConnectionHandle) -> Option<Dbms> {
    handle.dbms()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{BufferedStatement, NativeColumn, NativeResult, NativeValue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeConnection {
        class: &'static str,
    }

    impl NativeConnection for FakeConnection {
        fn class_name(&self) -> &str {
            self.class
        }

        fn execute(&mut self, sql: &str) -> Result<NativeResult> {
            if sql.starts_with("SELECT") {
                Ok(NativeResult::Rows(Box::new(BufferedStatement::new(
                    vec![NativeColumn::new("name", "TEXT")],
                    vec![vec![NativeValue::Text("people".into())]],
                ))))
            } else {
                Ok(NativeResult::Affected(1))
            }
        }

        fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Counting {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    impl ConnectionObserver for Counting {
        fn on_open(&self, _: &ConnectionHandle) {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }

        fn on_close(&self, _: &ConnectionHandle) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_generic_connection_defaults() {
        let handle = ConnectionHandle::from_native(Box::new(FakeConnection { class: "odd" }));
        assert_eq!(handle.dbms(), None);
        assert_eq!(handle.identifier_quote(), '\'');
        assert_eq!(handle.quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_generic_connection_recovers_dialect() {
        let handle = ConnectionHandle::from_native(Box::new(FakeConnection {
            class: "tiberius::Client",
        }));
        assert_eq!(dbms(&handle), Some(Dbms::SqlServer));
        assert_eq!(handle.quote_identifier("a]b"), "[a]]b]");
    }

    #[test]
    fn test_observer_sees_one_open_and_one_close() {
        let observer = Arc::new(Counting::default());
        let handle = ConnectionHandle::open(
            Box::new(FakeConnection { class: "fake" }),
            Dbms::PostgreSql,
            "postgresql://h:5432/d".into(),
            Some(observer.clone() as Arc<dyn ConnectionObserver>),
        );
        assert_eq!(handle.close().unwrap(), CloseStatus::Closed);
        assert_eq!(disconnect(&handle).unwrap(), CloseStatus::AlreadyClosed);
        drop(handle);

        assert_eq!(observer.opened.load(Ordering::SeqCst), 1);
        assert_eq!(observer.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes_open_handle() {
        let observer = Arc::new(Counting::default());
        let handle = ConnectionHandle::open(
            Box::new(FakeConnection { class: "fake" }),
            Dbms::PostgreSql,
            String::new(),
            Some(observer.clone() as Arc<dyn ConnectionObserver>),
        );
        drop(handle);
        assert_eq!(observer.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_operations_after_close_fail() {
        let handle = ConnectionHandle::from_native(Box::new(FakeConnection { class: "fake" }));
        handle.close().unwrap();
        assert!(handle.is_closed());
        assert!(matches!(
            handle.execute("DELETE FROM t"),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_table_names_picks_name_column() {
        let handle = ConnectionHandle::open(
            Box::new(FakeConnection { class: "fake" }),
            Dbms::Sqlite,
            String::new(),
            None,
        );
        assert_eq!(handle.table_names(None).unwrap(), vec!["people"]);
        assert!(handle.exists_table(None, "PEOPLE").unwrap());
        assert!(!handle.exists_table(None, "cars").unwrap());
    }
}
