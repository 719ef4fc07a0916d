//! Unit tests for rivven-dbconnect error module

use rivven_dbconnect::error::{Error, ErrorCategory};
use std::error::Error as _;

#[test]
fn test_error_connection() {
    let err = Error::connection("Failed to connect", "postgresql://db:5432/cdm");

    assert_eq!(err.category(), ErrorCategory::Connection);
    assert!(err.to_string().contains("Failed to connect"));
    assert!(err.to_string().contains("postgresql://db:5432/cdm"));
    assert!(err.is_retriable());
}

#[test]
fn test_error_config() {
    let err = Error::config("server must be specified");

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("server must be specified"));
    assert!(!err.is_retriable());
}

#[test]
fn test_error_driver() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err = Error::driver_with_source("cannot list driver folder '/opt'", io);

    assert_eq!(err.category(), ErrorCategory::DriverResolution);
    assert!(err.source().is_some());
    assert!(!err.is_retriable());
}

#[test]
fn test_error_query() {
    let err = Error::query_with_sql("no such table: t", "SELECT * FROM t");

    assert_eq!(err.category(), ErrorCategory::Query);
    assert!(matches!(err, Error::Query { sql: Some(ref s), .. } if s == "SELECT * FROM t"));
    assert!(!err.is_retriable());
}

#[test]
fn test_error_closed() {
    let err = Error::ConnectionClosed;

    assert_eq!(err.category(), ErrorCategory::Closed);
    assert_eq!(err.to_string(), "connection closed");
}

#[test]
fn test_error_type_conversion() {
    let err = Error::type_conversion("'abc' is not an integer");

    assert_eq!(err.category(), ErrorCategory::TypeConversion);
    assert!(err.to_string().contains("'abc'"));
}

#[test]
fn test_error_unsupported() {
    let err = Error::unsupported("listing tables requires a known dialect");
    assert_eq!(err.category(), ErrorCategory::Other);
}

#[test]
fn test_category_display() {
    assert_eq!(ErrorCategory::Configuration.to_string(), "configuration");
    assert_eq!(ErrorCategory::DriverResolution.to_string(), "driver_resolution");
    assert_eq!(ErrorCategory::Connection.to_string(), "connection");
    assert_eq!(ErrorCategory::Closed.to_string(), "closed");
    assert_eq!(ErrorCategory::Query.to_string(), "query");
    assert_eq!(ErrorCategory::TypeConversion.to_string(), "type_conversion");
    assert_eq!(ErrorCategory::Other.to_string(), "other");
}
