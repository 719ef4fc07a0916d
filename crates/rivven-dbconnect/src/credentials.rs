//! Deferred credentials
//!
//! Connection details do not capture user, password, server, port or connection
//! string eagerly. They hold a [`CredentialProvider`] that the dispatcher resolves
//! exactly once, when a connect call consumes the details. Values read from the
//! environment or a secret store therefore reflect the state at connect time.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Wrapper for sensitive configuration values
#[derive(Debug, Clone)]
pub struct SensitiveString(SecretString);

impl SensitiveString {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Access the secret value
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for SensitiveString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SensitiveString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Serialize for SensitiveString {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("***REDACTED***")
    }
}

impl<'de> Deserialize<'de> for SensitiveString {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

/// Credentials as resolved at connect time
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// User name; absent selects integrated authentication where supported
    pub user: Option<String>,
    /// Password
    pub password: Option<SensitiveString>,
    /// Server specification (`host`, `host/database`, or a file path)
    pub server: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Full connection string, bypassing the builder
    pub connection_string: Option<String>,
}

impl Credentials {
    /// Empty credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<SensitiveString>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the server
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set an explicit connection string
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }
}

/// Source of credentials, resolved once per connect call
pub trait CredentialProvider: Send + Sync {
    /// Produce the credentials for one connection attempt
    fn resolve(&self) -> Result<Credentials>;
}

impl CredentialProvider for Credentials {
    fn resolve(&self) -> Result<Credentials> {
        Ok(self.clone())
    }
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Result<Credentials> + Send + Sync,
{
    fn resolve(&self) -> Result<Credentials> {
        self()
    }
}

/// Credentials read from environment variables at resolve time.
///
/// Unset variables leave the field empty. The port variable must parse as a port
/// number when set.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    user_var: Option<String>,
    password_var: Option<String>,
    server_var: Option<String>,
    port_var: Option<String>,
    connection_string_var: Option<String>,
}

impl EnvCredentials {
    /// No variables configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the user from `var`
    pub fn user(mut self, var: impl Into<String>) -> Self {
        self.user_var = Some(var.into());
        self
    }

    /// Read the password from `var`
    pub fn password(mut self, var: impl Into<String>) -> Self {
        self.password_var = Some(var.into());
        self
    }

    /// Read the server from `var`
    pub fn server(mut self, var: impl Into<String>) -> Self {
        self.server_var = Some(var.into());
        self
    }

    /// Read the port from `var`
    pub fn port(mut self, var: impl Into<String>) -> Self {
        self.port_var = Some(var.into());
        self
    }

    /// Read the connection string from `var`
    pub fn connection_string(mut self, var: impl Into<String>) -> Self {
        self.connection_string_var = Some(var.into());
        self
    }
}

fn read_var(var: &Option<String>) -> Option<String> {
    var.as_deref()
        .and_then(|name| std::env::var(name).ok())
        .filter(|value| !value.is_empty())
}

impl CredentialProvider for EnvCredentials {
    fn resolve(&self) -> Result<Credentials> {
        let port = match read_var(&self.port_var) {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| {
                Error::config(format!(
                    "environment variable {} is not a valid port: '{}'",
                    self.port_var.as_deref().unwrap_or_default(),
                    raw
                ))
            })?),
            None => None,
        };

        Ok(Credentials {
            user: read_var(&self.user_var),
            password: read_var(&self.password_var).map(SensitiveString::new),
            server: read_var(&self.server_var),
            port,
            connection_string: read_var(&self.connection_string_var),
        })
    }
}
