use std::collections::HashMap;
use std::sync::Arc;

use econ_ingest_core::SourceAdapter;

/// Maps an origin name ("fred", "polygon", "csv") to the adapter that
/// serves it. Built once at startup from the configured sources.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registers an adapter under its own origin name. A second adapter
    /// with the same origin replaces the first.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.origin().to_string(), adapter);
    }

    #[must_use]
    pub fn get(&self, origin: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(origin).cloned()
    }

    /// Registered origin names, sorted for stable display.
    #[must_use]
    pub fn origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = self.adapters.keys().cloned().collect();
        origins.sort();
        origins
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeAdapter;
    use econ_ingest_core::SeriesKind;

    #[test]
    fn register_and_lookup_by_origin() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(FakeAdapter::new("fred", SeriesKind::Economic)));
        registry.register(Arc::new(FakeAdapter::new("polygon", SeriesKind::Financial)));

        assert!(registry.get("fred").is_some());
        assert!(registry.get("polygon").is_some());
        assert!(registry.get("quandl").is_none());
        assert_eq!(registry.origins(), vec!["fred", "polygon"]);
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(FakeAdapter::new("csv", SeriesKind::Economic)));
        registry.register(Arc::new(FakeAdapter::new("csv", SeriesKind::Financial)));

        let adapter = registry.get("csv").unwrap();
        assert_eq!(adapter.kind(), SeriesKind::Financial);
        assert_eq!(registry.origins().len(), 1);
    }
}
