//! Connect dispatcher
//!
//! Turns [`ConnectionDetails`] into an open [`ConnectionHandle`]:
//!
//! 1. Resolve credentials (once)
//! 2. Resolve the driver binary and load the driver through the cache
//! 3. Build the native connection string, or take the explicit one
//! 4. Pick the authentication mode and open the native connection
//! 5. Wrap it in a dialect-tagged handle
//!
//! # Example
//!
//! ```rust,ignore
//! use rivven_dbconnect::prelude::*;
//!
//! let details = ConnectionDetails::builder("postgresql")
//!     .credentials(EnvCredentials::new().user("PG_USER").password("PG_PASSWORD").server("PG_SERVER"))
//!     .path_to_driver("/opt/drivers")
//!     .build()?;
//! let conn = Dispatcher::global().connect(&details)?;
//! ```

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::DriverCache;
use crate::config::{ConnectionSettings, EnvConfig};
use crate::connection::{ConnectionHandle, ConnectionObserver};
use crate::connection_string::{oracle_name_service, resolve_connection_string, ConnectionTarget};
use crate::details::ConnectionDetails;
use crate::dialect::{Dbms, OracleDriver};
use crate::driver::{resolve_key, DriverLoader, StaticDriverLoader};
use crate::error::{Error, Result};
use crate::native::{Driver, NativeConnection, Properties};
use crate::security::redact_connection_string;

static GLOBAL: Lazy<Dispatcher> = Lazy::new(Dispatcher::new);

/// Opens connections and owns the driver cache
pub struct Dispatcher {
    cache: DriverCache,
    loader: Arc<dyn DriverLoader>,
    observer: Option<Arc<dyn ConnectionObserver>>,
    env: Option<EnvConfig>,
}

impl Dispatcher {
    /// Dispatcher with the bundled drivers, reading the environment on each connect
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Process-wide dispatcher used by [`connect`] and [`connect_settings`]
    pub fn global() -> &'static Dispatcher {
        &GLOBAL
    }

    /// Loaded drivers
    pub fn drivers(&self) -> &DriverCache {
        &self.cache
    }

    /// Open a connection
    pub fn connect(&self, details: &ConnectionDetails) -> Result<ConnectionHandle> {
        let dbms = details.dbms();
        let env = self.env.clone().unwrap_or_else(EnvConfig::from_env);

        debug!(dbms = %dbms, "Resolving credentials");
        let credentials = details.credentials().resolve()?;

        let integrated = dbms.rule().integrated_auth && credentials.user.is_none();
        let target = ConnectionTarget {
            server: credentials.server.as_deref(),
            port: credentials.port,
            extra_settings: details.extra_settings(),
            oracle_driver: details.oracle_driver(),
            integrated_security: integrated,
        };
        let explicit = credentials
            .connection_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let url = resolve_connection_string(dbms, explicit, &target)?;
        debug!(dbms = %dbms, url = %redact_connection_string(&url), "Connection string ready");

        let folder = details
            .path_to_driver()
            .map(|p| p.to_path_buf())
            .or_else(|| env.driver_path.clone());
        let key = resolve_key(&details.driver(), folder.as_deref())?;
        debug!(dbms = %dbms, driver = %key, "Resolved driver");
        let driver = self.cache.get_or_load(&key, || {
            self.loader.load(&key.class_name, key.binary.as_deref())
        })?;

        let mut properties = Properties::new();
        if integrated {
            debug!(dbms = %dbms, "Using integrated authentication");
            if let Some(library) = &env.auth_library_path {
                debug!(library = %library.display(), "Registering native auth library");
                driver.register_auth_library(library)?;
            }
        } else {
            if let Some(user) = &credentials.user {
                properties.insert("user".to_string(), user.clone());
            }
            if let Some(password) = &credentials.password {
                properties.insert("password".to_string(), password.expose_secret().to_string());
            }
        }

        let (native, url) = match open_native(driver.as_ref(), &url, &properties) {
            Ok(native) => (native, url),
            Err(first)
                if dbms == Dbms::Oracle
                    && details.oracle_driver() == OracleDriver::Thin
                    && explicit.is_none() =>
            {
                warn!(error = %first, "Direct Oracle connect failed, retrying with name-service form");
                let fallback = oracle_name_service(&target)?;
                (open_native(driver.as_ref(), &fallback, &properties)?, fallback)
            }
            Err(e) => return Err(e),
        };

        Ok(ConnectionHandle::open(
            native,
            dbms,
            redact_connection_string(&url),
            self.observer.clone(),
        ))
    }

    /// Open a connection from inline settings
    pub fn connect_settings(&self, settings: &ConnectionSettings) -> Result<ConnectionHandle> {
        let env = self.env.clone().unwrap_or_else(EnvConfig::from_env);
        self.connect(&settings.to_details_with_env(&env)?)
    }
}

fn open_native(
    driver: &dyn Driver,
    url: &str,
    properties: &Properties,
) -> Result<Box<dyn NativeConnection>> {
    let redacted = redact_connection_string(url);
    debug!(driver = driver.class_name(), url = %redacted, "Opening native connection");

    let native = driver.connect(url, properties).map_err(|e| match e {
        Error::Connection {
            message, source, ..
        } => Error::Connection {
            message,
            url: redacted.clone(),
            source,
        },
        other => Error::Connection {
            message: other.to_string(),
            url: redacted.clone(),
            source: Some(Box::new(other)),
        },
    })?;

    if native.is_closed() {
        if let Err(e) = native.close() {
            debug!(error = %e, "Failed to release closed native connection");
        }
        return Err(Error::connection(
            "native connection was closed right after connecting",
            redacted,
        ));
    }
    Ok(native)
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("cache", &self.cache)
            .field("observer", &self.observer.is_some())
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`]
#[derive(Default)]
pub struct DispatcherBuilder {
    loader: Option<Arc<dyn DriverLoader>>,
    observer: Option<Arc<dyn ConnectionObserver>>,
    env: Option<EnvConfig>,
}

impl DispatcherBuilder {
    /// Driver loader (defaults to the bundled drivers)
    pub fn loader(mut self, loader: Arc<dyn DriverLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Observer notified when connections open and close
    pub fn observer(mut self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Fixed environment settings instead of reading the process environment
    pub fn env(mut self, env: EnvConfig) -> Self {
        self.env = Some(env);
        self
    }

    /// Build the dispatcher with an empty driver cache
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            cache: DriverCache::new(),
            loader: self
                .loader
                .unwrap_or_else(|| Arc::new(StaticDriverLoader::with_builtins())),
            observer: self.observer,
            env: self.env,
        }
    }
}

/// Open a connection through the process-wide dispatcher
pub fn connect(details: &ConnectionDetails) -> Result<ConnectionHandle> {
    Dispatcher::global().connect(details)
}

/// Open a connection from inline settings through the process-wide dispatcher
pub fn connect_settings(settings: &ConnectionSettings) -> Result<ConnectionHandle> {
    Dispatcher::global().connect_settings(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;

    fn sqlite_details(server: &str) -> ConnectionDetails {
        ConnectionDetails::builder("sqlite")
            .credentials(Credentials::new().with_server(server))
            .build_with_env(&EnvConfig::default())
            .unwrap()
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_bundled_driver_loaded_once() {
        let dispatcher = Dispatcher::builder().env(EnvConfig::default()).build();
        assert!(dispatcher.drivers().is_empty());

        let a = dispatcher.connect(&sqlite_details(":memory:")).unwrap();
        let b = dispatcher.connect(&sqlite_details(":memory:")).unwrap();
        assert_eq!(dispatcher.drivers().len(), 1);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.dbms(), Some(Dbms::Sqlite));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_missing_server_fails_before_connect() {
        let dispatcher = Dispatcher::builder().env(EnvConfig::default()).build();
        let err = dispatcher.connect(&sqlite_details("")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_empty_loader_reports_class() {
        let dispatcher = Dispatcher::builder()
            .loader(Arc::new(StaticDriverLoader::new()))
            .env(EnvConfig::default())
            .build();
        let err = dispatcher.connect(&sqlite_details(":memory:")).unwrap_err();
        assert!(err.to_string().contains("driver class 'rusqlite' not found"));
        assert!(dispatcher.drivers().is_empty());
    }
}
