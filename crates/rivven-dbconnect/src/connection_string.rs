//! Connection-string builder
//!
//! Pure functions turning a dialect plus server/port/extra settings into the native
//! connection string handed to the driver. An explicit connection string supplied by
//! the caller bypasses all of this.

use crate::dialect::{Dbms, OracleDriver, ServerForm};
use crate::error::{Error, Result};

/// Addressing inputs for one connect attempt
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionTarget<'a> {
    /// Server specification
    pub server: Option<&'a str>,
    /// Port; `None` selects the dialect default
    pub port: Option<u16>,
    /// Extra settings appended after the dialect's separator
    pub extra_settings: Option<&'a str>,
    /// Oracle driver variant
    pub oracle_driver: OracleDriver,
    /// Request integrated (trusted) authentication
    pub integrated_security: bool,
}

/// Use `explicit` verbatim when present, otherwise build from the target
pub fn resolve_connection_string(
    dbms: Dbms,
    explicit: Option<&str>,
    target: &ConnectionTarget<'_>,
) -> Result<String> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(connection_string) => Ok(connection_string.to_string()),
        None => build(dbms, target),
    }
}

/// Build the native connection string for a dialect
pub fn build(dbms: Dbms, target: &ConnectionTarget<'_>) -> Result<String> {
    let rule = dbms.rule();

    if rule.server_form == ServerForm::ConnectionStringOnly {
        return Err(Error::config(format!(
            "connection string required: {} cannot be addressed by server and port",
            dbms
        )));
    }

    let server = target
        .server
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::config(format!("server must be specified for {}", dbms)))?;

    if dbms == Dbms::Oracle && target.oracle_driver == OracleDriver::Oci {
        return Ok(with_extra(dbms, format!("oracle+oci://{}", server), target));
    }

    if rule.server_form == ServerForm::FilePath {
        let scheme = match dbms {
            Dbms::DuckDb => "duckdb",
            _ => "sqlite",
        };
        return Ok(format!("{}:{}", scheme, server));
    }

    let (host, database) = split_server(dbms, server)?;
    let port = port_for(dbms, target)?;
    let db = database.unwrap_or_default();

    let base = match dbms {
        Dbms::PostgreSql => format!("postgresql://{}:{}/{}", host, port, db),
        Dbms::Redshift => format!("redshift://{}:{}/{}", host, port, db),
        Dbms::Netezza => format!("netezza://{}:{}/{}", host, port, db),
        Dbms::Iris => format!("iris://{}:{}/{}", host, port, db),
        Dbms::Oracle => format!("oracle://{}:{}/{}", host, port, db),
        Dbms::Impala => match database {
            Some(db) => format!("impala://{}:{}/{}", host, port, db),
            None => format!("impala://{}:{}", host, port),
        },
        Dbms::Hive => format!("hive2://{}:{}/{}", host, port, db),
        Dbms::SqlServer | Dbms::Pdw | Dbms::Synapse => {
            let mut s = format!("sqlserver://{}:{}", host, port);
            if let Some(db) = database {
                s.push_str(";database=");
                s.push_str(db);
            }
            if target.integrated_security {
                s.push_str(";integratedSecurity=true");
            }
            s
        }
        other => {
            return Err(Error::unsupported(format!(
                "no connection string rule for {}",
                other
            )))
        }
    };

    Ok(with_extra(dbms, base, target))
}

/// Oracle name-service (TNS descriptor) form, used when direct addressing fails
pub fn oracle_name_service(target: &ConnectionTarget<'_>) -> Result<String> {
    let server = target
        .server
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::config("server must be specified for oracle"))?;
    let (host, sid) = split_server(Dbms::Oracle, server)?;
    let port = port_for(Dbms::Oracle, target)?;
    let base = format!(
        "oracle://(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={}))(CONNECT_DATA=(SID={})))",
        host,
        port,
        sid.unwrap_or_default()
    );
    Ok(with_extra(Dbms::Oracle, base, target))
}

/// Split `host/database` according to the dialect's server form
fn split_server(dbms: Dbms, server: &str) -> Result<(&str, Option<&str>)> {
    match (dbms.rule().server_form, server.split_once('/')) {
        (_, Some((host, database))) if !host.is_empty() && !database.is_empty() => {
            Ok((host, Some(database)))
        }
        (ServerForm::HostDatabase, _) => Err(Error::config(format!(
            "database name required: {} expects server as '<host>/<database>', got '{}'",
            dbms, server
        ))),
        (_, Some((host, _))) if !host.is_empty() => Ok((host, None)),
        (_, Some(_)) => Err(Error::config(format!(
            "host name missing in server '{}' for {}",
            server, dbms
        ))),
        (_, None) => Ok((server, None)),
    }
}

fn port_for(dbms: Dbms, target: &ConnectionTarget<'_>) -> Result<u16> {
    target
        .port
        .or(dbms.rule().default_port)
        .ok_or_else(|| Error::config(format!("port must be specified for {}", dbms)))
}

fn with_extra(dbms: Dbms, mut base: String, target: &ConnectionTarget<'_>) -> String {
    let Some(separator) = dbms.rule().extra_separator else {
        return base;
    };
    let extra = target
        .extra_settings
        .map(|s| s.trim().trim_start_matches(separator).trim())
        .filter(|s| !s.is_empty());
    if let Some(extra) = extra {
        base.push(separator);
        base.push_str(extra);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(server: &str) -> ConnectionTarget<'_> {
        ConnectionTarget {
            server: Some(server),
            ..Default::default()
        }
    }

    #[test]
    fn test_postgres_defaults_port() {
        let url = build(Dbms::PostgreSql, &target("h/d")).unwrap();
        assert_eq!(url, "postgresql://h:5432/d");
    }

    #[test]
    fn test_missing_separator_is_rejected() {
        let err = build(Dbms::Redshift, &target("h")).unwrap_err();
        assert!(err.to_string().contains("database name required"));
    }

    #[test]
    fn test_extra_settings_have_no_separator_artifacts() {
        let mut t = target("h/d");
        t.extra_settings = Some("?ssl=true");
        assert_eq!(
            build(Dbms::PostgreSql, &t).unwrap(),
            "postgresql://h:5432/d?ssl=true"
        );

        t.extra_settings = Some("   ");
        assert_eq!(build(Dbms::PostgreSql, &t).unwrap(), "postgresql://h:5432/d");
    }

    #[test]
    fn test_explicit_connection_string_wins() {
        let url = resolve_connection_string(
            Dbms::PostgreSql,
            Some("postgresql://other:1/x"),
            &ConnectionTarget::default(),
        )
        .unwrap();
        assert_eq!(url, "postgresql://other:1/x");
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(build(Dbms::SqlServer, &target("/db")).is_err());
    }
}
