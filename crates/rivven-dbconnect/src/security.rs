//! SQL and credential hygiene helpers.
//!
//! - Identifier validation for schema names interpolated into catalog queries
//! - String literal escaping for the same queries
//! - Password redaction for connection strings before they reach logs or errors

use crate::error::Error;

/// Validate a SQL identifier (schema, database, table names).
///
/// Rules:
/// - Must not be empty, at most 255 characters
/// - Must start with an ASCII letter or underscore
/// - May only contain ASCII alphanumeric characters and underscores
///
/// # Examples
///
/// ```
/// use rivven_dbconnect::security::validate_sql_identifier;
///
/// assert!(validate_sql_identifier("cdm_synpuf").is_ok());
/// assert!(validate_sql_identifier("_scratch").is_ok());
///
/// assert!(validate_sql_identifier("x; DROP TABLE person--").is_err());
/// assert!(validate_sql_identifier("").is_err());
/// assert!(validate_sql_identifier("1abc").is_err());
/// ```
pub fn validate_sql_identifier(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(Error::config("SQL identifier cannot be empty"));
    }

    if name.len() > 255 {
        return Err(Error::config(format!(
            "SQL identifier too long: {} chars (max 255)",
            name.len()
        )));
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => {
            return Err(Error::config(format!(
                "Invalid SQL identifier '{}': must start with a letter or underscore",
                name
            )));
        }
    }

    if let Some(c) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(Error::config(format!(
            "Invalid SQL identifier '{}': contains invalid character '{}'",
            name, c
        )));
    }

    Ok(())
}

/// Escape a value for a single-quoted SQL string literal (`'` becomes `''`).
///
/// ```
/// use rivven_dbconnect::security::escape_string_literal;
///
/// assert_eq!(escape_string_literal("dbo"), "dbo");
/// assert_eq!(escape_string_literal("o'brien"), "o''brien");
/// ```
pub fn escape_string_literal(value: &str) -> String {
    if !value.contains('\'') {
        return value.to_string();
    }
    value.replace('\'', "''")
}

/// Mask credentials embedded in a connection string.
///
/// URL-shaped strings get their password replaced with `***`; `password=` and
/// `pwd=` key/value pairs in semicolon or ampersand separated strings are masked
/// as well.
///
/// ```
/// use rivven_dbconnect::security::redact_connection_string;
///
/// assert_eq!(
///     redact_connection_string("postgresql://joe:secret@db:5432/cdm"),
///     "postgresql://joe:***@db:5432/cdm"
/// );
/// assert_eq!(
///     redact_connection_string("sqlserver://db:1433;user=joe;password=secret"),
///     "sqlserver://db:1433;user=joe;password=***"
/// );
/// ```
pub fn redact_connection_string(connection_string: &str) -> String {
    let masked = match url::Url::parse(connection_string) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => connection_string.to_string(),
    };
    mask_password_pairs(&masked)
}

fn mask_password_pairs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = find_password_key(rest) {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        let eq = tail.find('=').map(|i| i + 1).unwrap_or(tail.len());
        out.push_str(&tail[..eq]);
        out.push_str("***");
        let end = tail[eq..]
            .find([';', '&'])
            .map(|i| eq + i)
            .unwrap_or(tail.len());
        rest = &tail[end..];
    }
    out.push_str(rest);
    out
}

fn find_password_key(text: &str) -> Option<usize> {
    let lower = text.to_ascii_lowercase();
    ["password=", "pwd="]
        .iter()
        .filter_map(|key| {
            lower.match_indices(key).map(|(i, _)| i).find(|&i| {
                i == 0 || matches!(lower.as_bytes()[i - 1], b';' | b'&' | b'?')
            })
        })
        .min()
}
