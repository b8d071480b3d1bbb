//! Ownership of the current dataset handle.
//!
//! The manager holds exactly one current [`DatasetHandle`] behind an
//! `Arc`. Readers clone the `Arc` and drop the lock straight away, so a swap
//! only waits for other lock holders for the duration of a pointer clone, and
//! a replaced handle is released when the last in-flight query drops its
//! clone.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error_handling::QueryError;
use crate::geoip::dataset::DatasetHandle;
use crate::geoip::types::DatasetKind;

/// Holds the current dataset handle.
#[derive(Debug)]
pub struct DatasetManager {
    current: RwLock<Arc<DatasetHandle>>,
}

impl DatasetManager {
    /// Creates a manager serving `handle`.
    pub fn new(handle: DatasetHandle) -> Self {
        log::info!(
            "Serving GeoIP database {} (type: {})",
            handle.source().display(),
            handle.kind()
        );
        Self {
            current: RwLock::new(Arc::new(handle)),
        }
    }

    /// Returns the current handle.
    ///
    /// The returned `Arc` keeps the handle alive for as long as the caller
    /// holds it, even if a swap happens meanwhile.
    pub fn acquire(&self) -> Result<Arc<DatasetHandle>, QueryError> {
        let current = self.current.read().map_err(|e| {
            log::error!("GeoIP handle lock poisoned: {}", e);
            QueryError::Unavailable
        })?;
        Ok(Arc::clone(&current))
    }

    /// Installs `handle` as current and returns the previous one.
    ///
    /// Every `acquire` that starts after this returns sees the new handle.
    /// The previous handle is released once the returned `Arc` and every
    /// reader's clone are dropped.
    pub fn swap(&self, handle: DatasetHandle) -> Arc<DatasetHandle> {
        let (kind, generation) = (handle.kind(), handle.generation());
        let incoming = Arc::new(handle);

        // The slot always holds a complete Arc, so a poisoned lock is safe to reuse.
        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, incoming)
        };
        self.current.clear_poison();

        log::info!(
            "Swapped GeoIP database (type: {}, generation {} -> {})",
            kind,
            previous.generation(),
            generation
        );
        previous
    }

    /// Kind of the current handle.
    pub fn kind(&self) -> Option<DatasetKind> {
        self.acquire().ok().map(|h| h.kind())
    }
}
