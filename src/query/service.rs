//! One lookup per call, through the dataset manager and optional cache.

use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::config::PROBE_IP;
use crate::error_handling::{DatasetError, QueryError};
use crate::geoip::{DatasetHandle, DatasetKind, DatasetManager, GeoRecord};
use crate::query::cache::{CacheStats, QueryCache};

/// Answer to one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(GeoRecord),
    NotFound,
}

/// Answers lookups against whatever handle is current.
#[derive(Debug)]
pub struct QueryService {
    manager: Arc<DatasetManager>,
    cache: Option<QueryCache>,
}

impl QueryService {
    /// Builds the service. A capacity of 0 disables caching.
    pub fn new(manager: Arc<DatasetManager>, cache_enabled: bool, cache_capacity: usize) -> Self {
        let cache = match NonZeroUsize::new(cache_capacity) {
            Some(capacity) if cache_enabled => {
                log::info!("Query cache enabled (capacity: {})", capacity);
                Some(QueryCache::new(capacity))
            }
            None if cache_enabled => {
                log::info!("Query cache disabled (CACHE_SIZE=0)");
                None
            }
            _ => None,
        };
        Self { manager, cache }
    }

    pub fn manager(&self) -> &Arc<DatasetManager> {
        &self.manager
    }

    /// Resolves `address`.
    ///
    /// # Errors
    ///
    /// - `QueryError::InvalidAddress` if `address` is not an IP address
    /// - `QueryError::Unavailable` if no handle can be acquired
    pub fn locate(&self, address: &str) -> Result<Lookup, QueryError> {
        let ip: IpAddr = address.parse().map_err(|_| {
            log::debug!("Invalid IP address requested: {}", address);
            QueryError::InvalidAddress(address.to_string())
        })?;
        let handle = self.manager.acquire()?;

        let Some(cache) = &self.cache else {
            return Ok(resolve(&handle, ip).unwrap_or(Lookup::NotFound));
        };

        let key = ip.to_string();
        if let Some(cached) = cache.lookup(&key, handle.generation()) {
            log::debug!("Cache hit for {}", key);
            return Ok(cached);
        }
        // Failed lookups are answered but never cached.
        match resolve(&handle, ip) {
            Ok(lookup) => {
                cache.insert(key, handle.generation(), lookup.clone());
                Ok(lookup)
            }
            Err(_) => Ok(Lookup::NotFound),
        }
    }

    /// Runs one live lookup against the current handle.
    pub fn health(&self) -> Result<(), QueryError> {
        let handle = self.manager.acquire()?;
        handle.country(PROBE_IP).map(|_| ()).map_err(|e| {
            log::error!("Health check lookup failed: {}", e);
            QueryError::Unavailable
        })
    }

    pub fn dataset_kind(&self) -> Option<DatasetKind> {
        self.manager.kind()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map(QueryCache::stats)
            .unwrap_or_else(CacheStats::disabled)
    }
}

/// Looks `ip` up in `handle`. Callers answer a dataset error as not-found.
fn resolve(handle: &DatasetHandle, ip: IpAddr) -> Result<Lookup, DatasetError> {
    match handle.locate(ip) {
        Ok(Some(record)) => {
            log::debug!(
                "IP lookup: {} -> Country: {}, City: {}, Region: {}",
                ip,
                record.country,
                record.city,
                record.region
            );
            Ok(Lookup::Found(record))
        }
        Ok(None) => Ok(Lookup::NotFound),
        Err(e) => {
            log::debug!("IP lookup failed for {}: {}", ip, e);
            Err(e)
        }
    }
}
