//! Connection details
//!
//! Immutable description of where and how to connect. The dialect and driver
//! folder are checked when the details are built; credentials stay deferred
//! until a connect call resolves them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{EnvConfig, DRIVER_PATH_ENV};
use crate::credentials::{CredentialProvider, Credentials};
use crate::dialect::{Dbms, DriverDescriptor, OracleDriver};
use crate::error::{Error, Result};
use crate::security::redact_connection_string;

/// Validated connection details
#[derive(Clone)]
pub struct ConnectionDetails {
    dbms: Dbms,
    credentials: Arc<dyn CredentialProvider>,
    extra_settings: Option<String>,
    path_to_driver: Option<PathBuf>,
    oracle_driver: OracleDriver,
}

impl ConnectionDetails {
    /// Start building details for a dialect id
    pub fn builder(dbms: impl Into<String>) -> ConnectionDetailsBuilder {
        ConnectionDetailsBuilder {
            dbms: dbms.into(),
            credentials: None,
            extra_settings: None,
            path_to_driver: None,
            oracle_driver: OracleDriver::default(),
        }
    }

    /// Dialect
    pub fn dbms(&self) -> Dbms {
        self.dbms
    }

    /// Credential provider; resolved once per connect
    pub fn credentials(&self) -> &dyn CredentialProvider {
        self.credentials.as_ref()
    }

    /// Extra connection-string settings
    pub fn extra_settings(&self) -> Option<&str> {
        self.extra_settings.as_deref()
    }

    /// Driver folder; `None` for bundled drivers without a configured folder
    pub fn path_to_driver(&self) -> Option<&Path> {
        self.path_to_driver.as_deref()
    }

    /// Oracle driver variant
    pub fn oracle_driver(&self) -> OracleDriver {
        self.oracle_driver
    }

    /// Driver descriptor for this dialect and variant
    pub fn driver(&self) -> DriverDescriptor {
        self.dbms.driver(self.oracle_driver)
    }
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("dbms", &self.dbms)
            .field(
                "extra_settings",
                &self.extra_settings.as_deref().map(redact_connection_string),
            )
            .field("path_to_driver", &self.path_to_driver)
            .field("oracle_driver", &self.oracle_driver)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConnectionDetails`]
pub struct ConnectionDetailsBuilder {
    dbms: String,
    credentials: Option<Arc<dyn CredentialProvider>>,
    extra_settings: Option<String>,
    path_to_driver: Option<PathBuf>,
    oracle_driver: OracleDriver,
}

impl ConnectionDetailsBuilder {
    /// Credential provider (static [`Credentials`], env, or a closure)
    pub fn credentials(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credentials = Some(Arc::new(provider));
        self
    }

    /// Shared credential provider
    pub fn credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Extra settings appended to the built connection string
    pub fn extra_settings(mut self, extra: impl Into<String>) -> Self {
        self.extra_settings = Some(extra.into());
        self
    }

    /// Folder holding the driver binary
    pub fn path_to_driver(mut self, path: impl Into<PathBuf>) -> Self {
        self.path_to_driver = Some(path.into());
        self
    }

    /// Oracle driver variant
    pub fn oracle_driver(mut self, driver: OracleDriver) -> Self {
        self.oracle_driver = driver;
        self
    }

    /// Validate against the process environment
    pub fn build(self) -> Result<ConnectionDetails> {
        self.build_with_env(&EnvConfig::from_env())
    }

    /// Validate the dialect and the driver folder.
    ///
    /// Without an explicit folder the environment's driver path is used. Dialects
    /// with a file-based driver need an existing folder.
    pub fn build_with_env(self, env: &EnvConfig) -> Result<ConnectionDetails> {
        let dbms: Dbms = self.dbms.parse()?;
        let path_to_driver = self.path_to_driver.or_else(|| env.driver_path.clone());

        let descriptor = dbms.driver(self.oracle_driver);
        if !descriptor.is_bundled() {
            let folder = path_to_driver.as_deref().ok_or_else(|| {
                Error::driver(format!(
                    "no driver folder for {}: set path_to_driver or {}",
                    dbms, DRIVER_PATH_ENV
                ))
            })?;
            if !folder.is_dir() {
                return Err(Error::driver(format!(
                    "driver folder '{}' does not exist or is not a directory",
                    folder.display()
                )));
            }
        }

        Ok(ConnectionDetails {
            dbms,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(Credentials::new())),
            extra_settings: self.extra_settings,
            path_to_driver,
            oracle_driver: self.oracle_driver,
        })
    }
}
