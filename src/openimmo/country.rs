use crate::store::CountryStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Caching lookup from ISO-3166 alpha-3 country codes to internal
/// identifiers.
///
/// The cache is scoped to one import run: the orchestrator creates a fresh
/// resolver per invocation, so reference data changed between runs is
/// picked up without any invalidation logic. A lookup miss returns 0
/// ("no country"); only a failing store is an error, since that indicates
/// a broken environment rather than bad input.
pub struct CountryResolver {
    store: Arc<dyn CountryStore>,
    cache: HashMap<String, u32>,
}

impl CountryResolver {
    pub fn new(store: Arc<dyn CountryStore>) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Resolve an uppercased ISO code to the internal identifier, querying
    /// the store at most once per code and run.
    pub fn resolve(&mut self, code: &str) -> Result<u32> {
        if let Some(id) = self.cache.get(code) {
            return Ok(*id);
        }

        let id = self.store.find_by_iso_code(code)?.unwrap_or(0);
        debug!("Resolved country code {} to {}", code, id);
        self.cache.insert(code.to_string(), id);
        Ok(id)
    }
}
