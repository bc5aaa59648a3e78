//! Backend registry
//!
//! Maps a backend kind to a pool constructor. The registry is built once
//! at startup; selecting a backend is a lookup, and adding one is a
//! `register` call with a new [`Backend`](crate::backend::Backend)
//! implementation behind it.

use crate::backend::{BackendError, BackendResult, ConnectionPool, MemoryBackend};
use crate::config::BackendConfig;
use std::collections::HashMap;

/// Constructor building a ready connection pool from configuration
pub type PoolBuilder = Box<dyn Fn(&BackendConfig) -> BackendResult<ConnectionPool> + Send + Sync>;

/// Kind-to-constructor registry for backend pools
#[derive(Default)]
pub struct BackendRegistry {
    builders: HashMap<String, PoolBuilder>,
}

impl BackendRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("memory", |config| MemoryBackend::pool(config.pool_size));
        registry
    }

    /// Register a constructor for a backend kind
    pub fn register<F>(&mut self, kind: &str, builder: F)
    where
        F: Fn(&BackendConfig) -> BackendResult<ConnectionPool> + Send + Sync + 'static,
    {
        self.builders.insert(kind.to_string(), Box::new(builder));
    }

    /// Build the pool for the configured backend kind
    pub fn build_pool(&self, config: &BackendConfig) -> BackendResult<ConnectionPool> {
        let builder = self
            .builders
            .get(&config.kind)
            .ok_or_else(|| BackendError::UnknownKind(config.kind.clone()))?;
        builder(config)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.builders.keys().collect();
        kinds.sort();
        f.debug_struct("BackendRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_builds_memory_pool() {
        let registry = BackendRegistry::with_defaults();
        let config = BackendConfig {
            kind: "memory".to_string(),
            pool_size: 4,
            split_enabled: true,
        };
        let pool = registry.build_pool(&config).unwrap();
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let registry = BackendRegistry::with_defaults();
        let config = BackendConfig {
            kind: "mongo".to_string(),
            pool_size: 4,
            split_enabled: false,
        };
        let err = registry.build_pool(&config).unwrap_err();
        assert!(matches!(err, BackendError::UnknownKind(kind) if kind == "mongo"));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = BackendRegistry::new();
        registry.register("memory", |config| MemoryBackend::pool(config.pool_size));
        let config = BackendConfig {
            kind: "memory".to_string(),
            pool_size: 1,
            split_enabled: false,
        };
        assert_eq!(registry.build_pool(&config).unwrap().len(), 1);
    }
}
