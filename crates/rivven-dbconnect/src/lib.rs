//! # rivven-dbconnect
//!
//! Unified database connectivity for the Rivven platform.
//!
//! One entry point opens connections to many relational backends. Each backend is a
//! dialect with its own connection-string shape, quoting rules, driver and value
//! coercion; callers only see a dialect-tagged handle and a batched result cursor.
//!
//! ## Features
//!
//! - **Dialect Registry**: SQLite, DuckDB, PostgreSQL, Redshift, SQL Server, PDW, Synapse,
//!   Oracle, Impala, Netezza, Hive, Spark, BigQuery, Snowflake and IRIS
//! - **Driver Cache**: every driver is loaded at most once per process
//! - **Deferred Credentials**: user, password and server resolved at connect time
//! - **Batched Cursors**: bounded fetches with uniform completion semantics
//! - **Uniform Values**: native values coerced into one fixed value set per dialect
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rivven_dbconnect::prelude::*;
//!
//! let details = ConnectionDetails::builder("sqlite")
//!     .credentials(Credentials::new().with_server(":memory:"))
//!     .build()?;
//!
//! let conn = connect(&details)?;
//! conn.execute("CREATE TABLE person (id INTEGER, name TEXT)")?;
//! conn.execute("INSERT INTO person VALUES (1, 'Ann'), (2, 'Bob')")?;
//!
//! let mut cursor = conn.query("SELECT id, name FROM person ORDER BY id")?;
//! loop {
//!     let batch = cursor.fetch(1000)?;
//!     if batch.is_empty() {
//!         break;
//!     }
//!     for row in batch {
//!         println!("{:?}", row.get_by_name("name"));
//!     }
//! }
//! cursor.release()?;
//! disconnect(&conn)?;
//! ```
//!
//! ## Environment
//!
//! - `RIVVEN_DRIVER_PATH` - folder searched for driver binaries
//! - `RIVVEN_AUTH_LIBRARY_PATH` - native library used for integrated authentication
//!
//! ## Feature Flags
//!
//! - `sqlite` (default) - bundled SQLite driver via rusqlite

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cache;
pub mod config;
pub mod connection;
pub mod connection_string;
pub mod credentials;
pub mod cursor;
pub mod details;
pub mod dialect;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod native;
pub mod script;
pub mod security;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{ColumnInfo, Row, RowBatch, Value, ValueKind};

    // Dialects
    pub use crate::dialect::{Dbms, OracleDriver};

    // Connection setup
    pub use crate::config::{ConnectionSettings, EnvConfig};
    pub use crate::credentials::{CredentialProvider, Credentials, EnvCredentials, SensitiveString};
    pub use crate::details::{ConnectionDetails, ConnectionDetailsBuilder};
    pub use crate::dispatcher::{connect, connect_settings, Dispatcher, DispatcherBuilder};

    // Connections and cursors
    pub use crate::connection::{
        dbms, disconnect, CloseStatus, ConnectionHandle, ConnectionObserver,
    };
    pub use crate::cursor::ResultCursor;
}

// Re-export commonly used items at crate root
pub use connection::{dbms, disconnect, CloseStatus, ConnectionHandle};
pub use details::ConnectionDetails;
pub use dialect::Dbms;
pub use dispatcher::{connect, connect_settings, Dispatcher};
pub use error::{Error, Result};
pub use types::Value;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _value = Value::Integer(42);
        let _creds = Credentials::new().with_server("db/cdm");
        let _settings = ConnectionSettings::new("postgresql");
        let _env = EnvConfig::default();
    }

    #[test]
    fn test_error_types() {
        let err = Error::connection("refused", "postgresql://db:5432/cdm");
        assert!(err.is_retriable());
        assert_eq!(err.category(), ErrorCategory::Connection);
    }

    #[test]
    fn test_dialect_lookup() {
        let dbms: Dbms = "Sql Server".parse().unwrap();
        assert_eq!(dbms, Dbms::SqlServer);
        assert_eq!(dbms.quote_identifier("order"), "[order]");
    }
}
