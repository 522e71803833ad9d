//! Usage Snapshot
//!
//! Serializable view of every known scope for dashboards and debugging.

use serde::{Deserialize, Serialize};

use super::discovery::DiscoveryCoordinator;
use super::registry::QuotaRegistry;
use super::store::WindowCounterStore;

/// Usage of a single scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeUsage {
    /// Scope key joined by `:`
    pub scope: String,

    pub capacity: u32,

    pub window_secs: u64,

    /// Units counted in the open window
    pub count: u32,

    pub remaining: u32,

    /// Seconds until the open window closes; zero when none is open
    pub resets_in_secs: f64,
}

impl ScopeUsage {
    /// Share of the capacity used, in percent
    pub fn utilization_percent(&self) -> f64 {
        f64::from(self.count) / f64::from(self.capacity) * 100.0
    }
}

/// State of a governor at one point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorSnapshot {
    /// Timestamp of data generation
    pub generated_at: chrono::DateTime<chrono::Utc>,

    /// Known scopes, sorted by key
    pub scopes: Vec<ScopeUsage>,

    /// Probes currently in flight
    pub pending_probes: usize,
}

impl GovernorSnapshot {
    pub fn collect(
        registry: &QuotaRegistry,
        store: &WindowCounterStore,
        discovery: &DiscoveryCoordinator,
    ) -> Self {
        let scopes = registry
            .snapshot()
            .into_iter()
            .map(|(key, descriptor)| {
                let stats = store.window_stats(&key, &descriptor);
                ScopeUsage {
                    scope: key.to_string(),
                    capacity: descriptor.capacity(),
                    window_secs: descriptor.window_secs(),
                    count: stats.count,
                    remaining: stats.remaining,
                    resets_in_secs: stats.resets_in.as_secs_f64(),
                }
            })
            .collect();

        Self {
            generated_at: chrono::Utc::now(),
            scopes,
            pending_probes: discovery.pending_count(),
        }
    }

    pub fn scope(&self, key: &str) -> Option<&ScopeUsage> {
        self.scopes.iter().find(|usage| usage.scope == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::{QuotaDescriptor, ScopeKey};

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_reports_usage() {
        let registry = QuotaRegistry::new();
        let store = WindowCounterStore::new();
        let discovery = DiscoveryCoordinator::new(registry.clone());

        let short = ScopeKey::new(["ASIA", "route_short"]);
        let long = ScopeKey::new(["ASIA", "route_long"]);
        let short_quota = QuotaDescriptor::new(4, 1).unwrap();
        registry.register(short.clone(), short_quota);
        registry.register(long, QuotaDescriptor::new(99, 120).unwrap());
        store.hit(&short, &short_quota, 1);

        let _probe = discovery.claim(&ScopeKey::new(["ASIA", "get_match_timeline"]));
        let snapshot = GovernorSnapshot::collect(&registry, &store, &discovery);

        assert_eq!(snapshot.scopes.len(), 2);
        assert_eq!(snapshot.scopes[0].scope, "ASIA:route_long", "sorted by key");
        assert_eq!(snapshot.pending_probes, 1);

        let usage = snapshot.scope("ASIA:route_short").unwrap();
        assert_eq!(usage.count, 1);
        assert_eq!(usage.remaining, 3);
        assert_eq!(usage.resets_in_secs, 1.0);
        assert_eq!(usage.utilization_percent(), 25.0);

        let untouched = snapshot.scope("ASIA:route_long").unwrap();
        assert_eq!(untouched.count, 0);
        assert_eq!(untouched.resets_in_secs, 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = QuotaRegistry::new();
        let snapshot = GovernorSnapshot::collect(
            &registry,
            &WindowCounterStore::new(),
            &DiscoveryCoordinator::new(registry.clone()),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["scopes"].as_array().unwrap().is_empty());
        assert_eq!(json["pending_probes"], 0);
    }
}
