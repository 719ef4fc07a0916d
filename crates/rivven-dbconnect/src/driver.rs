//! Driver resolution and loading
//!
//! - [`resolve_binary`] finds a driver binary in a folder by file-name pattern
//! - [`DriverLoader`] turns a class name plus binary into a [`Driver`]
//! - [`StaticDriverLoader`] maps class names to registered driver factories
//!
//! # Example
//!
//! ```rust,ignore
//! use rivven_dbconnect::driver::StaticDriverLoader;
//!
//! let loader = StaticDriverLoader::with_builtins()
//!     .register("postgresql", |binary| MyPgDriver::open(binary));
//! ```

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::dialect::DriverDescriptor;
use crate::error::{Error, Result};
use crate::native::Driver;

/// Cache key: one loaded driver per (class name, binary)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DriverKey {
    /// Driver class name
    pub class_name: String,
    /// Resolved binary; `None` for bundled drivers
    pub binary: Option<PathBuf>,
}

impl DriverKey {
    /// Key for a driver loaded from `binary`
    pub fn new(class_name: impl Into<String>, binary: Option<PathBuf>) -> Self {
        Self {
            class_name: class_name.into(),
            binary,
        }
    }
}

impl fmt::Display for DriverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binary {
            Some(path) => write!(f, "{} ({})", self.class_name, path.display()),
            None => write!(f, "{} (bundled)", self.class_name),
        }
    }
}

/// Find the driver binary in `folder` whose file name matches `pattern`.
///
/// When several files match, the lexically first file name wins so that the
/// choice does not depend on directory listing order; the candidates are logged.
pub fn resolve_binary(folder: &Path, pattern: &str) -> Result<PathBuf> {
    let regex = Regex::new(pattern)
        .map_err(|e| Error::driver_with_source(format!("invalid driver pattern '{}'", pattern), e))?;

    if !folder.is_dir() {
        return Err(Error::driver(format!(
            "driver folder '{}' does not exist or is not a directory",
            folder.display()
        )));
    }

    let entries = std::fs::read_dir(folder).map_err(|e| {
        Error::driver_with_source(format!("cannot list driver folder '{}'", folder.display()), e)
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| regex.is_match(n))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(Error::driver(format!(
            "no driver binary matching '{}' found in '{}'",
            pattern,
            folder.display()
        ))),
        1 => Ok(candidates.remove(0)),
        n => {
            warn!(
                pattern,
                folder = %folder.display(),
                candidates = ?candidates,
                "{} driver binaries match, using the lexically first",
                n
            );
            Ok(candidates.remove(0))
        }
    }
}

/// Resolve the cache key for a descriptor; bundled drivers skip the folder lookup
pub fn resolve_key(descriptor: &DriverDescriptor, folder: Option<&Path>) -> Result<DriverKey> {
    match descriptor.file_pattern {
        None => Ok(DriverKey::new(descriptor.class_name, None)),
        Some(pattern) => {
            let folder = folder.ok_or_else(|| {
                Error::driver(format!(
                    "no driver folder configured for driver '{}'",
                    descriptor.class_name
                ))
            })?;
            let binary = resolve_binary(folder, pattern)?;
            debug!(class = descriptor.class_name, binary = %binary.display(), "Resolved driver binary");
            Ok(DriverKey::new(descriptor.class_name, Some(binary)))
        }
    }
}

/// Loads driver instances
pub trait DriverLoader: Send + Sync {
    /// Load the driver class from the given binary (`None` for bundled drivers)
    fn load(&self, class_name: &str, binary: Option<&Path>) -> Result<Arc<dyn Driver>>;
}

/// Factory producing a driver from its binary
pub type DriverFactory = Arc<dyn Fn(Option<&Path>) -> Result<Arc<dyn Driver>> + Send + Sync>;

/// Loader backed by a table of registered driver factories
#[derive(Clone, Default)]
pub struct StaticDriverLoader {
    factories: HashMap<String, DriverFactory>,
}

impl StaticDriverLoader {
    /// Loader with no drivers
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader with the drivers bundled in this crate
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut loader = Self::new();
        #[cfg(feature = "sqlite")]
        {
            loader = loader.register(crate::sqlite::CLASS_NAME, |_| {
                Ok(Arc::new(crate::sqlite::SqliteDriver::new()) as Arc<dyn Driver>)
            });
        }
        loader
    }

    /// Register a driver factory under a class name
    pub fn register<F>(mut self, class_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Option<&Path>) -> Result<Arc<dyn Driver>> + Send + Sync + 'static,
    {
        self.factories.insert(class_name.into(), Arc::new(factory));
        self
    }

    /// Registered class names, sorted
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for StaticDriverLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticDriverLoader")
            .field("classes", &self.class_names())
            .finish()
    }
}

impl DriverLoader for StaticDriverLoader {
    fn load(&self, class_name: &str, binary: Option<&Path>) -> Result<Arc<dyn Driver>> {
        let location = binary
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "bundled drivers".to_string());
        let factory = self.factories.get(class_name).ok_or_else(|| {
            Error::driver(format!(
                "driver class '{}' not found in {}",
                class_name, location
            ))
        })?;
        factory(binary)
    }
}
