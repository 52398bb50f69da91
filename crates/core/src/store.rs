use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::rules::Configuration;

/// Injectable clock so cache TTL behavior is testable without real delays.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read config document `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse config document `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("could not write config document `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not serialize config document: {0}")]
    Serialize(#[source] serde_json::Error),
}

struct CacheEntry {
    value: Configuration,
    loaded_at: Instant,
}

/// File-backed configuration store with a time-bounded read cache.
///
/// `get` serves the cached value while `now - loaded_at < ttl`; `save`
/// replaces the whole document on disk and refreshes the cache. Those are
/// the only two paths that touch the cache entry. The cache is guarded by a
/// mutex, but read-modify-write cycles are only serialized by the single
/// event loop driving the dispatcher; the backing document itself is
/// last-write-wins.
pub struct ConfigStore {
    path: PathBuf,
    ttl: Duration,
    clock: Box<dyn Clock>,
    cache: Mutex<Option<CacheEntry>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::with_clock(path, ttl, Box::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self { path: path.into(), ttl, clock, cache: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current configuration.
    ///
    /// A fresh cache entry is returned without touching the backing file.
    /// A missing file initializes and persists an empty document. A read or
    /// parse failure is logged and falls back to an empty in-memory
    /// configuration for this access only; the fallback is not persisted
    /// and not cached, so a later healthy read is unaffected.
    pub fn get(&self) -> Configuration {
        let now = self.clock.now();
        {
            let cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(entry) = cache.as_ref() {
                if now.duration_since(entry.loaded_at) < self.ttl {
                    return entry.value.clone();
                }
            }
        }

        if !self.path.exists() {
            let initial = Configuration::default();
            if let Err(error) = self.save(&initial) {
                warn!(
                    event_name = "store.config.init_failed",
                    path = %self.path.display(),
                    error = %error,
                    "could not persist initial config document"
                );
            }
            return initial;
        }

        match self.read_document() {
            Ok(value) => {
                let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                *cache = Some(CacheEntry { value: value.clone(), loaded_at: now });
                value
            }
            Err(error) => {
                warn!(
                    event_name = "store.config.read_failed",
                    path = %self.path.display(),
                    error = %error,
                    "falling back to empty in-memory configuration"
                );
                Configuration::default()
            }
        }
    }

    /// Persists the full configuration as a whole-document replacement and
    /// refreshes the cache with the written value.
    pub fn save(&self, config: &Configuration) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(config).map_err(StoreError::Serialize)?;
        fs::write(&self.path, raw)
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })?;

        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *cache = Some(CacheEntry { value: config.clone(), loaded_at: self.clock.now() });
        debug!(
            event_name = "store.config.saved",
            path = %self.path.display(),
            rules = config.reaction_rules.len(),
            channels = config.enabled_channels.len(),
            "config document persisted"
        );
        Ok(())
    }

    /// Health probe: verifies the backing document is readable and parses.
    /// A missing document is healthy; it is initialized on first access.
    pub fn probe(&self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.read_document().map(|_| ())
    }

    fn read_document(&self) -> Result<Configuration, StoreError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|source| StoreError::Read { path: self.path.clone(), source })?;
        serde_json::from_str(&raw)
            .map_err(|source| StoreError::Parse { path: self.path.clone(), source })
    }
}
