//! Driver singleton cache
//!
//! Loading a driver is expensive, so each (class name, binary) pair is loaded at
//! most once per cache and the instance is shared by every connection using it.
//! The map lock is only held long enough to fetch or insert the per-key cell;
//! the load itself runs under that cell's initialization guard, so callers for
//! different keys never wait on each other.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::driver::DriverKey;
use crate::error::Result;
use crate::native::Driver;

type Slot = Arc<OnceCell<Arc<dyn Driver>>>;

/// Keyed store of loaded drivers; entries are never evicted
#[derive(Default)]
pub struct DriverCache {
    slots: Mutex<HashMap<DriverKey, Slot>>,
}

impl DriverCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached driver for `key`, running `load` if none is cached yet.
    ///
    /// Concurrent callers for the same key observe a single load. A failed load
    /// leaves the key empty.
    pub fn get_or_load<F>(&self, key: &DriverKey, load: F) -> Result<Arc<dyn Driver>>
    where
        F: FnOnce() -> Result<Arc<dyn Driver>>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(key.clone()).or_default().clone()
        };

        if let Some(driver) = slot.get() {
            debug!(driver = %key, "Driver cache hit");
            return Ok(driver.clone());
        }

        slot.get_or_try_init(|| {
            info!(driver = %key, "Loading driver");
            load()
        })
        .cloned()
    }

    /// Whether a driver is loaded for `key`
    pub fn contains(&self, key: &DriverKey) -> bool {
        self.slots
            .lock()
            .get(key)
            .map(|slot| slot.get().is_some())
            .unwrap_or(false)
    }

    /// Number of loaded drivers
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Whether no driver has been loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DriverCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCache")
            .field("loaded", &self.len())
            .finish()
    }
}
