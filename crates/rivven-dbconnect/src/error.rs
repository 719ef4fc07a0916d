//! Error types for rivven-dbconnect
//!
//! Errors are classified by the connect stage that produced them:
//! - Configuration errors (unsupported dialect, missing server/database) fail fast
//! - Driver resolution errors (binary not found, class not loadable) fail fast
//! - Connection errors carry the attempted URL and the native message
//! - Query and type conversion errors come out of statements and cursors

use std::fmt;
use thiserror::Error;

/// Result type for rivven-dbconnect operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid or incomplete connection settings
    Configuration,
    /// Driver binary or class could not be resolved
    DriverResolution,
    /// Native connect failed (retriable at the caller's discretion)
    Connection,
    /// Operation attempted on a closed connection
    Closed,
    /// Statement execution or fetch failed
    Query,
    /// Native value could not be coerced
    TypeConversion,
    /// Unknown/other errors
    Other,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection)
    }
}

/// Main error type for rivven-dbconnect
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Settings are invalid or incomplete
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Driver binary or driver class could not be resolved
    #[error("driver resolution error: {message}")]
    DriverResolution {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Native connect failed
    #[error("connection error: {message} (url: {url})")]
    Connection {
        message: String,
        url: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection was already closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Statement execution failed
    #[error("query error: {message}")]
    Query {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Type conversion failed
    #[error("type conversion error: {message}")]
    TypeConversion { message: String },

    /// Unsupported operation for this dialect or driver
    #[error("unsupported: {message}")]
    Unsupported { message: String },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::DriverResolution { .. } => ErrorCategory::DriverResolution,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::ConnectionClosed => ErrorCategory::Closed,
            Self::Query { .. } => ErrorCategory::Query,
            Self::TypeConversion { .. } => ErrorCategory::TypeConversion,
            Self::Unsupported { .. } => ErrorCategory::Other,
        }
    }

    /// Whether this error is retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a driver resolution error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::DriverResolution {
            message: message.into(),
            source: None,
        }
    }

    /// Create a driver resolution error with source
    pub fn driver_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::DriverResolution {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection error for the attempted URL
    pub fn connection(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            url: url.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            url: url.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error with SQL
    pub fn query_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a query error with SQL and source
    pub fn query_with_source(
        message: impl Into<String>,
        sql: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Create a type conversion error
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Attach SQL text to a query error; other variants pass through.
    pub fn with_sql(self, text: impl Into<String>) -> Self {
        match self {
            Self::Query {
                message, source, ..
            } => Self::Query {
                message,
                sql: Some(text.into()),
                source,
            },
            other => other,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::config(format!("invalid connection settings: {}", err))
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::DriverResolution => write!(f, "driver_resolution"),
            Self::Connection => write!(f, "connection"),
            Self::Closed => write!(f, "closed"),
            Self::Query => write!(f, "query"),
            Self::TypeConversion => write!(f, "type_conversion"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retriable() {
        assert!(ErrorCategory::Connection.is_retriable());

        assert!(!ErrorCategory::Configuration.is_retriable());
        assert!(!ErrorCategory::DriverResolution.is_retriable());
        assert!(!ErrorCategory::Closed.is_retriable());
        assert!(!ErrorCategory::Query.is_retriable());
    }

    #[test]
    fn test_connection_error_mentions_url() {
        let err = Error::connection("refused", "postgresql://db:5432/cdm");
        let text = err.to_string();
        assert!(text.contains("refused"));
        assert!(text.contains("postgresql://db:5432/cdm"));
    }

    #[test]
    fn test_with_sql_only_touches_query_errors() {
        let err = Error::query("no such table").with_sql("SELECT * FROM t");
        assert!(matches!(err, Error::Query { sql: Some(ref s), .. } if s == "SELECT * FROM t"));

        let err = Error::config("bad").with_sql("SELECT 1");
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
