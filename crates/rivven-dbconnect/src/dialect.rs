//! Dialect registry for rivven-dbconnect
//!
//! One [`Dbms`] variant per supported backend, each owning a static [`DialectRule`]:
//! - Default port and the shape the `server` setting must have
//! - Extra-settings separator used by the connection-string builder
//! - Identifier and string quote characters
//! - Driver descriptor (class name and binary file pattern, or bundled)
//! - Type coercion from native values to [`Value`]

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::native::NativeValue;
use crate::security::{escape_string_literal, validate_sql_identifier};
use crate::types::{Value, ValueKind};

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dbms {
    /// SQLite (bundled driver)
    Sqlite,
    /// SQLite with extended date/time types (bundled driver)
    SqliteExtended,
    /// DuckDB
    DuckDb,
    /// PostgreSQL
    PostgreSql,
    /// Amazon Redshift
    Redshift,
    /// Microsoft SQL Server
    SqlServer,
    /// Microsoft Parallel Data Warehouse
    Pdw,
    /// Azure Synapse Analytics
    Synapse,
    /// Oracle
    Oracle,
    /// Apache Impala
    Impala,
    /// IBM Netezza
    Netezza,
    /// Apache Hive
    Hive,
    /// Apache Spark / Databricks
    Spark,
    /// Google BigQuery
    BigQuery,
    /// Snowflake
    Snowflake,
    /// InterSystems IRIS
    Iris,
}

/// Shape of the `server` setting a dialect expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerForm {
    /// `server` is a database file path (or `:memory:`)
    FilePath,
    /// `server` must be `<host>/<database>`
    HostDatabase,
    /// `server` is `<host>` or `<host>/<database>`
    HostOptionalDatabase,
    /// Only an explicit connection string is accepted
    ConnectionStringOnly,
}

/// Where a dialect's driver comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverDescriptor {
    /// Driver class name handed to the loader
    pub class_name: &'static str,
    /// Regex matched against file names in the driver folder; `None` for bundled drivers
    pub file_pattern: Option<&'static str>,
}

impl DriverDescriptor {
    /// Whether the driver ships inside this crate
    #[inline]
    pub const fn is_bundled(&self) -> bool {
        self.file_pattern.is_none()
    }
}

/// Oracle driver variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleDriver {
    /// Pure network client, addressed by host/port/sid
    #[default]
    Thin,
    /// Client-library based, addressed by a TNS name
    Oci,
}

/// Static rules for one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectRule {
    /// Dialect this rule belongs to
    pub dbms: Dbms,
    /// Dialect id as accepted by [`lookup`]
    pub id: &'static str,
    /// Port used when none is configured
    pub default_port: Option<u16>,
    /// Expected shape of the server setting
    pub server_form: ServerForm,
    /// Separator placed before extra settings
    pub extra_separator: Option<char>,
    /// Identifier quote (opening character)
    pub identifier_quote: char,
    /// String literal quote
    pub string_quote: char,
    /// Driver descriptor
    pub driver: DriverDescriptor,
    /// Whether a missing user selects integrated (trusted) authentication
    pub integrated_auth: bool,
}

const fn file_driver(class_name: &'static str, file_pattern: &'static str) -> DriverDescriptor {
    DriverDescriptor {
        class_name,
        file_pattern: Some(file_pattern),
    }
}

const SQLITE_DRIVER: DriverDescriptor = DriverDescriptor {
    class_name: "rusqlite",
    file_pattern: None,
};

const MSSQL_DRIVER: DriverDescriptor = file_driver("mssql", r"^(lib)?mssql.*\.(so|dylib|dll)$");

const ORACLE_PATTERN: &str = r"^(lib)?oracle.*\.(so|dylib|dll)$";

// Indexed by `Dbms as usize`; keep in declaration order.
static RULES: [DialectRule; 16] = [
    DialectRule {
        dbms: Dbms::Sqlite,
        id: "sqlite",
        default_port: None,
        server_form: ServerForm::FilePath,
        extra_separator: None,
        identifier_quote: '"',
        string_quote: '\'',
        driver: SQLITE_DRIVER,
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::SqliteExtended,
        id: "sqlite extended",
        default_port: None,
        server_form: ServerForm::FilePath,
        extra_separator: None,
        identifier_quote: '"',
        string_quote: '\'',
        driver: SQLITE_DRIVER,
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::DuckDb,
        id: "duckdb",
        default_port: None,
        server_form: ServerForm::FilePath,
        extra_separator: None,
        identifier_quote: '"',
        string_quote: '\'',
        driver: file_driver("duckdb", r"^(lib)?duckdb.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::PostgreSql,
        id: "postgresql",
        default_port: Some(5432),
        server_form: ServerForm::HostDatabase,
        extra_separator: Some('?'),
        identifier_quote: '"',
        string_quote: '\'',
        driver: file_driver("postgresql", r"^(lib)?postgresql.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::Redshift,
        id: "redshift",
        default_port: Some(5439),
        server_form: ServerForm::HostDatabase,
        extra_separator: Some('?'),
        identifier_quote: '"',
        string_quote: '\'',
        driver: file_driver("redshift", r"^(lib)?redshift.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::SqlServer,
        id: "sql server",
        default_port: Some(1433),
        server_form: ServerForm::HostOptionalDatabase,
        extra_separator: Some(';'),
        identifier_quote: '[',
        string_quote: '\'',
        driver: MSSQL_DRIVER,
        integrated_auth: true,
    },
    DialectRule {
        dbms: Dbms::Pdw,
        id: "pdw",
        default_port: Some(17001),
        server_form: ServerForm::HostOptionalDatabase,
        extra_separator: Some(';'),
        identifier_quote: '[',
        string_quote: '\'',
        driver: MSSQL_DRIVER,
        integrated_auth: true,
    },
    DialectRule {
        dbms: Dbms::Synapse,
        id: "synapse",
        default_port: Some(1433),
        server_form: ServerForm::HostOptionalDatabase,
        extra_separator: Some(';'),
        identifier_quote: '[',
        string_quote: '\'',
        driver: MSSQL_DRIVER,
        integrated_auth: true,
    },
    DialectRule {
        dbms: Dbms::Oracle,
        id: "oracle",
        default_port: Some(1521),
        server_form: ServerForm::HostDatabase,
        extra_separator: Some('?'),
        identifier_quote: '"',
        string_quote: '\'',
        driver: file_driver("oracle.thin", ORACLE_PATTERN),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::Impala,
        id: "impala",
        default_port: Some(21050),
        server_form: ServerForm::HostOptionalDatabase,
        extra_separator: Some(';'),
        identifier_quote: '`',
        string_quote: '\'',
        driver: file_driver("impala", r"^(lib)?impala.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::Netezza,
        id: "netezza",
        default_port: Some(5480),
        server_form: ServerForm::HostDatabase,
        extra_separator: Some(';'),
        identifier_quote: '"',
        string_quote: '\'',
        driver: file_driver("netezza", r"^(lib)?netezza.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::Hive,
        id: "hive",
        default_port: Some(10000),
        server_form: ServerForm::HostOptionalDatabase,
        extra_separator: Some(';'),
        identifier_quote: '`',
        string_quote: '\'',
        driver: file_driver("hive", r"^(lib)?hive.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::Spark,
        id: "spark",
        default_port: None,
        server_form: ServerForm::ConnectionStringOnly,
        extra_separator: None,
        identifier_quote: '`',
        string_quote: '\'',
        driver: file_driver("spark", r"^(lib)?(spark|databricks).*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::BigQuery,
        id: "bigquery",
        default_port: None,
        server_form: ServerForm::ConnectionStringOnly,
        extra_separator: None,
        identifier_quote: '`',
        string_quote: '\'',
        driver: file_driver("bigquery", r"^(lib)?bigquery.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::Snowflake,
        id: "snowflake",
        default_port: None,
        server_form: ServerForm::ConnectionStringOnly,
        extra_separator: None,
        identifier_quote: '"',
        string_quote: '\'',
        driver: file_driver("snowflake", r"^(lib)?snowflake.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
    DialectRule {
        dbms: Dbms::Iris,
        id: "iris",
        default_port: Some(1972),
        server_form: ServerForm::HostDatabase,
        extra_separator: Some(';'),
        identifier_quote: '"',
        string_quote: '\'',
        driver: file_driver("iris", r"^(lib)?iris.*\.(so|dylib|dll)$"),
        integrated_auth: false,
    },
];

/// Look up the rule for a dialect id (case-insensitive)
pub fn lookup(id: &str) -> Result<&'static DialectRule> {
    id.parse::<Dbms>().map(Dbms::rule)
}

/// Comma-separated list of every supported dialect id
pub fn supported_ids() -> String {
    Dbms::ALL
        .iter()
        .map(|d| format!("'{}'", d.id()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a native connection type name to a dialect.
///
/// Used for connections that were not opened through the dispatcher.
pub fn dbms_for_class_name(class_name: &str) -> Option<Dbms> {
    match class_name {
        "rusqlite::Connection" => Some(Dbms::Sqlite),
        "duckdb::Connection" => Some(Dbms::DuckDb),
        "postgres::Client" | "tokio_postgres::Client" => Some(Dbms::PostgreSql),
        "tiberius::Client" => Some(Dbms::SqlServer),
        "oracle::Connection" => Some(Dbms::Oracle),
        "snowflake_api::SnowflakeApi" => Some(Dbms::Snowflake),
        _ => None,
    }
}

/// Closing counterpart of a quote character
#[inline]
pub const fn closing_quote(open: char) -> char {
    match open {
        '[' => ']',
        other => other,
    }
}

impl Dbms {
    /// Every supported dialect, in registry order
    pub const ALL: [Dbms; 16] = [
        Dbms::Sqlite,
        Dbms::SqliteExtended,
        Dbms::DuckDb,
        Dbms::PostgreSql,
        Dbms::Redshift,
        Dbms::SqlServer,
        Dbms::Pdw,
        Dbms::Synapse,
        Dbms::Oracle,
        Dbms::Impala,
        Dbms::Netezza,
        Dbms::Hive,
        Dbms::Spark,
        Dbms::BigQuery,
        Dbms::Snowflake,
        Dbms::Iris,
    ];

    /// Static rule for this dialect
    #[inline]
    pub fn rule(self) -> &'static DialectRule {
        &RULES[self as usize]
    }

    /// Dialect id
    #[inline]
    pub fn id(self) -> &'static str {
        self.rule().id
    }

    /// Driver descriptor, honoring the Oracle variant
    pub fn driver(self, oracle_driver: OracleDriver) -> DriverDescriptor {
        match (self, oracle_driver) {
            (Dbms::Oracle, OracleDriver::Oci) => file_driver("oracle.oci", ORACLE_PATTERN),
            _ => self.rule().driver,
        }
    }

    /// Whether the dialect stores data in a local file
    #[inline]
    pub fn is_file_based(self) -> bool {
        self.rule().server_form == ServerForm::FilePath
    }

    /// Semantic kind of a column given its native type name
    pub fn value_kind(self, type_name: &str) -> ValueKind {
        let upper = type_name.trim().to_ascii_uppercase();
        let (base, args) = match upper.find('(') {
            Some(idx) => (upper[..idx].trim(), Some(&upper[idx..])),
            None => (upper.as_str(), None),
        };

        match base {
            "" => ValueKind::Unknown,
            "BOOL" | "BOOLEAN" | "BIT" => ValueKind::Bool,
            "INT" | "INTEGER" | "INT2" | "INT4" | "INT8" | "SMALLINT" | "TINYINT"
            | "MEDIUMINT" | "BIGINT" | "HUGEINT" | "BYTEINT" | "SERIAL" | "SMALLSERIAL"
            | "BIGSERIAL" => ValueKind::Integer,
            "NUMBER" if self == Dbms::Oracle && numeric_scale(args) == Some(0) => {
                ValueKind::Integer
            }
            "NUMBER" | "NUMERIC" | "DECIMAL" | "REAL" | "FLOAT" | "FLOAT4" | "FLOAT8"
            | "FLOAT64" | "DOUBLE" | "DOUBLE PRECISION" | "MONEY" | "BINARY_DOUBLE"
            | "BINARY_FLOAT" => ValueKind::Float,
            // Oracle DATE carries a time part
            "DATE" if self == Dbms::Oracle => ValueKind::Timestamp,
            "DATE" => ValueKind::Date,
            "DATETIME" | "DATETIME2" | "SMALLDATETIME" => ValueKind::Timestamp,
            b if b.starts_with("TIMESTAMP") => ValueKind::Timestamp,
            "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" | "RAW" | "LONG RAW" | "IMAGE"
            | "BYTES" => ValueKind::Binary,
            b if matches!(self, Dbms::Sqlite | Dbms::SqliteExtended) => sqlite_affinity(b),
            _ => ValueKind::Text,
        }
    }

    /// Coerce a native value into the semantic value set.
    ///
    /// SQLite column affinity is advisory, so a stored value whose class does not
    /// fit the declared kind is passed through as stored instead of failing.
    pub fn coerce(self, kind: ValueKind, value: NativeValue) -> Result<Value> {
        if matches!(self, Dbms::Sqlite | Dbms::SqliteExtended) {
            let stored = value.clone();
            return Ok(self
                .coerce_declared(kind, value)
                .unwrap_or_else(|_| native_to_value(stored)));
        }
        self.coerce_declared(kind, value)
    }

    fn coerce_declared(self, kind: ValueKind, value: NativeValue) -> Result<Value> {
        use NativeValue as N;

        let coerced = match (kind, value) {
            (_, N::Null) => Value::Null,

            (ValueKind::Unknown, N::Date(d)) if self == Dbms::Oracle => {
                Value::Timestamp(midnight(d)?)
            }
            (ValueKind::Unknown, native) => native_to_value(native),

            (ValueKind::Integer, N::Integer(n)) => Value::Integer(n),
            (ValueKind::Integer, N::Real(f)) if f.fract() == 0.0 && f.is_finite() => {
                Value::Integer(f as i64)
            }
            (ValueKind::Integer, N::Real(f)) => Value::Float(f),
            (ValueKind::Integer, N::Boolean(b)) => Value::Integer(i64::from(b)),
            (ValueKind::Integer, N::Text(s)) => Value::Integer(
                s.trim()
                    .parse()
                    .map_err(|_| Error::type_conversion(format!("'{}' is not an integer", s)))?,
            ),

            (ValueKind::Float, N::Integer(n)) => Value::Float(n as f64),
            (ValueKind::Float, N::Real(f)) => Value::Float(f),
            (ValueKind::Float, N::Text(s)) => Value::Float(
                s.trim()
                    .parse()
                    .map_err(|_| Error::type_conversion(format!("'{}' is not a number", s)))?,
            ),

            (ValueKind::Bool, N::Boolean(b)) => Value::Bool(b),
            (ValueKind::Bool, N::Integer(n)) => Value::Bool(n != 0),
            (ValueKind::Bool, N::Text(s)) => Value::Text(s.clone())
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| Error::type_conversion(format!("'{}' is not a boolean", s)))?,

            (ValueKind::Date, N::Date(d)) => Value::Date(d),
            (ValueKind::Date, N::Timestamp(ts)) => Value::Date(ts.date()),
            (ValueKind::Date, N::Text(s)) => Value::Date(parse_date(&s)?),
            (ValueKind::Date, N::Integer(secs)) => Value::Date(from_epoch(secs as f64)?.date()),
            (ValueKind::Date, N::Real(secs)) => Value::Date(from_epoch(secs)?.date()),

            (ValueKind::Timestamp, N::Timestamp(ts)) => Value::Timestamp(ts),
            (ValueKind::Timestamp, N::Date(d)) => Value::Timestamp(midnight(d)?),
            (ValueKind::Timestamp, N::Text(s)) => Value::Timestamp(parse_timestamp(&s)?),
            (ValueKind::Timestamp, N::Integer(secs)) => Value::Timestamp(from_epoch(secs as f64)?),
            (ValueKind::Timestamp, N::Real(secs)) => Value::Timestamp(from_epoch(secs)?),

            (ValueKind::Binary, N::Blob(b)) => Value::Binary(b),
            (ValueKind::Binary, N::Text(s)) => Value::Binary(s.into_bytes()),

            (ValueKind::Text, N::Text(s)) => Value::Text(s),
            (ValueKind::Text, N::Blob(b)) => Value::Text(String::from_utf8(b).map_err(|e| {
                Error::type_conversion(format!("binary value is not valid UTF-8: {}", e))
            })?),
            (ValueKind::Text, native) => match native_to_value(native) {
                Value::Integer(n) => Value::Text(n.to_string()),
                Value::Float(f) => Value::Text(f.to_string()),
                Value::Bool(b) => Value::Text(b.to_string()),
                Value::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
                Value::Timestamp(ts) => Value::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                other => other,
            },

            (kind, native) => {
                return Err(Error::type_conversion(format!(
                    "cannot convert {:?} to {:?} for {}",
                    native, kind, self
                )))
            }
        };
        Ok(coerced)
    }

    /// Quote an identifier, doubling embedded closing quotes
    pub fn quote_identifier(self, name: &str) -> String {
        quote_with(self.rule().identifier_quote, name)
    }

    /// Quote a string literal, doubling embedded quotes
    pub fn quote_literal(self, value: &str) -> String {
        quote_with(self.rule().string_quote, value)
    }

    /// Catalog query listing the tables of a schema.
    ///
    /// File-based dialects ignore the schema. Dialects without a sensible default
    /// schema require one.
    pub fn table_names_sql(self, schema: Option<&str>) -> Result<String> {
        if matches!(self, Dbms::Sqlite | Dbms::SqliteExtended) {
            return Ok("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name".into());
        }

        let schema = match (schema, self.default_schema()) {
            (Some(s), _) => s,
            (None, Some(default)) => default,
            (None, None) => {
                return Err(Error::config(format!(
                    "a database schema is required to list tables on {}",
                    self
                )))
            }
        };
        for part in schema.split('.') {
            validate_sql_identifier(part)?;
        }

        let sql = match self {
            Dbms::Oracle => format!(
                "SELECT table_name FROM all_tables WHERE owner = UPPER('{}') ORDER BY table_name",
                escape_string_literal(schema)
            ),
            Dbms::Netezza => format!(
                "SELECT tablename FROM _v_table WHERE schema = UPPER('{}') ORDER BY tablename",
                escape_string_literal(schema)
            ),
            Dbms::Hive | Dbms::Spark | Dbms::Impala => {
                format!("SHOW TABLES IN {}", self.quote_identifier(schema))
            }
            Dbms::BigQuery => format!(
                "SELECT table_name FROM {}.INFORMATION_SCHEMA.TABLES ORDER BY table_name",
                self.quote_identifier(schema)
            ),
            Dbms::SqlServer | Dbms::Pdw | Dbms::Synapse => match schema.split_once('.') {
                Some((database, owner)) => format!(
                    "SELECT table_name FROM {}.information_schema.tables WHERE table_schema = '{}' ORDER BY table_name",
                    self.quote_identifier(database),
                    escape_string_literal(owner)
                ),
                None => format!(
                    "SELECT table_name FROM information_schema.tables WHERE table_schema = '{}' ORDER BY table_name",
                    escape_string_literal(schema)
                ),
            },
            _ => format!(
                "SELECT table_name FROM information_schema.tables WHERE table_schema = '{}' ORDER BY table_name",
                escape_string_literal(schema)
            ),
        };
        Ok(sql)
    }

    fn default_schema(self) -> Option<&'static str> {
        match self {
            Dbms::PostgreSql | Dbms::Redshift => Some("public"),
            Dbms::SqlServer | Dbms::Pdw | Dbms::Synapse => Some("dbo"),
            Dbms::DuckDb => Some("main"),
            _ => None,
        }
    }
}

impl fmt::Display for Dbms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Dbms {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Dbms::ALL
            .iter()
            .copied()
            .find(|d| d.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                Error::config(format!(
                    "unsupported dbms '{}'; valid values are: {}",
                    s,
                    supported_ids()
                ))
            })
    }
}

impl TryFrom<String> for Dbms {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Dbms> for String {
    fn from(value: Dbms) -> Self {
        value.id().to_string()
    }
}

pub(crate) fn quote_with(open: char, text: &str) -> String {
    let close = closing_quote(open);
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(open);
    for c in text.chars() {
        if c == close {
            quoted.push(close);
        }
        quoted.push(c);
    }
    quoted.push(close);
    quoted
}

fn sqlite_affinity(type_name: &str) -> ValueKind {
    if type_name.contains("INT") {
        ValueKind::Integer
    } else if type_name.contains("CHAR") || type_name.contains("CLOB") || type_name.contains("TEXT")
    {
        ValueKind::Text
    } else if type_name.contains("REAL") || type_name.contains("FLOA") || type_name.contains("DOUB")
    {
        ValueKind::Float
    } else {
        ValueKind::Unknown
    }
}

fn numeric_scale(args: Option<&str>) -> Option<u32> {
    let inner = args?.trim_start_matches('(').trim_end_matches(')');
    match inner.split_once(',') {
        Some((_, scale)) => scale.trim().parse().ok(),
        None => inner.trim().parse::<u32>().ok().map(|_| 0),
    }
}

/// Map a native value to the value set without any dialect-specific coercion
pub fn native_to_value(value: NativeValue) -> Value {
    match value {
        NativeValue::Null => Value::Null,
        NativeValue::Integer(n) => Value::Integer(n),
        NativeValue::Real(f) => Value::Float(f),
        NativeValue::Text(s) => Value::Text(s),
        NativeValue::Blob(b) => Value::Binary(b),
        NativeValue::Boolean(b) => Value::Bool(b),
        NativeValue::Date(d) => Value::Date(d),
        NativeValue::Timestamp(ts) => Value::Timestamp(ts),
    }
}

fn midnight(date: NaiveDate) -> Result<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::type_conversion(format!("invalid date {}", date)))
}

fn from_epoch(secs: f64) -> Result<NaiveDateTime> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| Error::type_conversion(format!("epoch seconds {} out of range", secs)))
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| Error::type_conversion(format!("'{}' is not a timestamp", text)))
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| parse_timestamp(text).map(|ts| ts.date()))
        .map_err(|_| Error::type_conversion(format!("'{}' is not a date", text)))
}
