//! Quota Registry
//!
//! Most recently discovered quota per scope. Entries appear on first discovery
//! and live as long as the owning governor.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::quota::QuotaDescriptor;
use super::scope::ScopeKey;

/// Shared scope → descriptor map
#[derive(Debug, Clone, Default)]
pub struct QuotaRegistry {
    quotas: Arc<RwLock<HashMap<ScopeKey, QuotaDescriptor>>>,
}

impl QuotaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &ScopeKey) -> Option<QuotaDescriptor> {
        let quotas = self.quotas.read().unwrap_or_else(PoisonError::into_inner);
        quotas.get(key).copied()
    }

    /// Store a descriptor; the last writer wins
    pub fn register(&self, key: ScopeKey, descriptor: QuotaDescriptor) {
        let mut quotas = self.quotas.write().unwrap_or_else(PoisonError::into_inner);
        quotas.insert(key, descriptor);
    }

    pub fn len(&self) -> usize {
        self.quotas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All known quotas, sorted by scope
    pub fn snapshot(&self) -> Vec<(ScopeKey, QuotaDescriptor)> {
        let quotas = self.quotas.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<_> = quotas.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ScopeKey {
        ScopeKey::new(["ASIA", name])
    }

    #[test]
    fn test_registry_creation() {
        let registry = QuotaRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup(&key("route_long")).is_none());
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = QuotaRegistry::new();
        let d = QuotaDescriptor::new(99, 120).unwrap();

        registry.register(key("route_long"), d);
        assert_eq!(registry.lookup(&key("route_long")), Some(d));
        assert!(registry.lookup(&key("route_short")).is_none());
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = QuotaRegistry::new();
        let d = QuotaDescriptor::new(19, 1).unwrap();

        registry.register(key("route_short"), d);
        let once = registry.snapshot();
        registry.register(key("route_short"), d);

        assert_eq!(registry.snapshot(), once);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = QuotaRegistry::new();
        registry.register(key("m"), QuotaDescriptor::new(10, 10).unwrap());
        registry.register(key("m"), QuotaDescriptor::new(20, 10).unwrap());
        assert_eq!(registry.lookup(&key("m")).unwrap().capacity(), 20);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = QuotaRegistry::new();
        let other = registry.clone();
        other.register(key("m"), QuotaDescriptor::new(1, 1).unwrap());
        assert_eq!(registry.len(), 1);
    }
}
