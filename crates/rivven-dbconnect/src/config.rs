//! Configuration sources
//!
//! - [`EnvConfig`]: process environment (driver folder, native auth library)
//! - [`ConnectionSettings`]: inline connection parameters, e.g. loaded from JSON

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::credentials::{Credentials, SensitiveString};
use crate::details::ConnectionDetails;
use crate::dialect::OracleDriver;
use crate::error::{Error, Result};

/// Environment variable naming the default driver folder
pub const DRIVER_PATH_ENV: &str = "RIVVEN_DRIVER_PATH";

/// Environment variable naming the native authentication library
pub const AUTH_LIBRARY_PATH_ENV: &str = "RIVVEN_AUTH_LIBRARY_PATH";

/// Settings taken from the process environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Folder searched for driver binaries when details name none
    pub driver_path: Option<PathBuf>,
    /// Native library registered before integrated-security connects
    pub auth_library_path: Option<PathBuf>,
}

impl EnvConfig {
    /// Read [`DRIVER_PATH_ENV`] and [`AUTH_LIBRARY_PATH_ENV`]; empty values count as unset
    pub fn from_env() -> Self {
        Self {
            driver_path: path_var(DRIVER_PATH_ENV),
            auth_library_path: path_var(AUTH_LIBRARY_PATH_ENV),
        }
    }

    /// Set the driver folder
    pub fn with_driver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver_path = Some(path.into());
        self
    }

    /// Set the auth library
    pub fn with_auth_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.auth_library_path = Some(path.into());
        self
    }
}

fn path_var(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Inline connection parameters
///
/// # Example
///
/// ```rust
/// use rivven_dbconnect::config::ConnectionSettings;
///
/// let settings = ConnectionSettings::from_json(
///     r#"{"dbms": "sqlite", "server": ":memory:"}"#,
/// ).unwrap();
/// assert_eq!(settings.dbms, "sqlite");
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ConnectionSettings {
    /// Dialect id, e.g. `postgresql` or `sql server`
    #[validate(length(min = 1))]
    pub dbms: String,

    /// User name
    #[serde(default)]
    pub user: Option<String>,

    /// Password (redacted when serialized)
    #[serde(default)]
    pub password: Option<SensitiveString>,

    /// Server specification
    #[serde(default)]
    pub server: Option<String>,

    /// Port override
    #[serde(default)]
    #[validate(range(min = 1))]
    pub port: Option<u16>,

    /// Explicit connection string
    #[serde(default)]
    pub connection_string: Option<String>,

    /// Extra settings appended to the built connection string
    #[serde(default)]
    pub extra_settings: Option<String>,

    /// Driver folder
    #[serde(default)]
    pub path_to_driver: Option<PathBuf>,

    /// Oracle driver variant
    #[serde(default)]
    pub oracle_driver: OracleDriver,
}

impl ConnectionSettings {
    /// Settings for a dialect id
    pub fn new(dbms: impl Into<String>) -> Self {
        Self {
            dbms: dbms.into(),
            ..Default::default()
        }
    }

    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid connection settings JSON: {}", e)))
    }

    /// Validate and turn into connection details
    pub fn to_details(&self) -> Result<ConnectionDetails> {
        self.to_details_with_env(&EnvConfig::from_env())
    }

    /// Validate and turn into connection details, resolving defaults from `env`
    pub fn to_details_with_env(&self, env: &EnvConfig) -> Result<ConnectionDetails> {
        self.validate()?;

        let credentials = Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
            server: self.server.clone(),
            port: self.port,
            connection_string: self.connection_string.clone(),
        };

        let mut builder = ConnectionDetails::builder(self.dbms.as_str())
            .credentials(credentials)
            .oracle_driver(self.oracle_driver);
        if let Some(extra) = &self.extra_settings {
            builder = builder.extra_settings(extra.as_str());
        }
        if let Some(path) = &self.path_to_driver {
            builder = builder.path_to_driver(path.clone());
        }
        builder.build_with_env(env)
    }
}
