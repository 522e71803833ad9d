//! Request Governor
//!
//! Per-call admission control. A governed call is admitted only if every scope
//! it touches has room, in resolver order; unknown quotas are discovered by
//! letting exactly one call through as a probe.

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::GovernorConfig;
use super::discovery::{Claim, DiscoveryCoordinator, ProbeGuard, ProbeWaiter};
use super::error::GovernorError;
use super::quota::{HeaderConventions, QuotaDescriptor};
use super::registry::QuotaRegistry;
use super::scope::{Scope, ScopeKey, ScopeResolver};
use super::snapshot::GovernorSnapshot;
use super::store::{WindowCounterStore, WindowHit};
use crate::endpoints::ApiCall;
use crate::metrics;
use crate::transport::{ApiResponse, Transport};

/// Scopes consumed by one invocation, in consumption order
///
/// Dropping an uncommitted ledger reverts every entry, so a call abandoned
/// before reaching the transport leaves no trace in the counters.
struct Ledger<'a> {
    store: &'a WindowCounterStore,
    cost: u32,
    entries: Vec<(ScopeKey, WindowHit)>,
    committed: bool,
}

impl<'a> Ledger<'a> {
    fn new(store: &'a WindowCounterStore, cost: u32) -> Self {
        Self {
            store,
            cost,
            entries: Vec::new(),
            committed: false,
        }
    }

    /// Hit `key`; on rejection undo everything consumed so far
    fn admit(&mut self, key: &ScopeKey, descriptor: &QuotaDescriptor) -> Result<(), GovernorError> {
        let hit = self.store.hit(key, descriptor, self.cost);

        if hit.allowed {
            debug!(scope = %key, remaining = hit.remaining, "Admitted");
            self.entries.push((key.clone(), hit));
            return Ok(());
        }

        let retry_after = hit.retry_after();
        warn!(
            scope = %key,
            retry_after_secs = retry_after.as_secs_f64(),
            "Quota exhausted, rejecting call"
        );
        metrics::QUOTA_REJECTIONS_TOTAL
            .with_label_values(&[key.class()])
            .inc();
        self.rollback();

        Err(GovernorError::QuotaRejected {
            scope: key.clone(),
            retry_after,
            remaining: hit.remaining,
            reset_at: Utc::now()
                + chrono::Duration::from_std(retry_after).unwrap_or_else(|_| chrono::Duration::zero()),
        })
    }

    /// Mark the call as sent; from here on only explicit rollbacks apply
    fn commit(&mut self) {
        self.committed = true;
    }

    fn rollback(&mut self) {
        for (key, hit) in self.entries.drain(..).rev() {
            self.store.revert(&key, &hit, self.cost);
            metrics::ROLLBACKS_TOTAL.inc();
            debug!(scope = %key, "Rolled back consumption");
        }
    }
}

impl Drop for Ledger<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

/// Admission-control gate in front of a [`Transport`]
///
/// Owns its registry, counters and discovery state; share it through an
/// `Arc` to govern calls from many tasks.
pub struct Governor<T> {
    transport: T,
    config: GovernorConfig,
    conventions: HeaderConventions,
    resolver: ScopeResolver,
    registry: QuotaRegistry,
    store: WindowCounterStore,
    discovery: DiscoveryCoordinator,
}

impl<T: Transport> Governor<T> {
    /// Governor over the built-in endpoint catalogue
    pub fn new(transport: T, config: GovernorConfig) -> Self {
        let resolver = ScopeResolver::with_default_operations(config.app_windows.clone());
        Self::with_resolver(transport, config, resolver)
    }

    /// Governor over a custom operation table
    pub fn with_resolver(transport: T, config: GovernorConfig, resolver: ScopeResolver) -> Self {
        let registry = QuotaRegistry::new();
        Self {
            transport,
            conventions: HeaderConventions::from_config(&config),
            config,
            resolver,
            discovery: DiscoveryCoordinator::new(registry.clone()),
            registry,
            store: WindowCounterStore::new(),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &QuotaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &WindowCounterStore {
        &self.store
    }

    pub fn discovery(&self) -> &DiscoveryCoordinator {
        &self.discovery
    }

    /// Current view of every known scope
    pub fn snapshot(&self) -> GovernorSnapshot {
        GovernorSnapshot::collect(&self.registry, &self.store, &self.discovery)
    }

    /// Perform `call` if every scope it touches has room
    ///
    /// # Errors
    ///
    /// - [`GovernorError::QuotaRejected`] when a scope is exhausted; nothing is consumed
    /// - [`GovernorError::DiscoveryFailed`] when an unknown quota could not be learned
    /// - [`GovernorError::TransportFailed`] when the admitted call failed; consumption is undone
    /// - [`GovernorError::UnresolvableScope`] when the operation is not declared for the route
    pub async fn govern(&self, call: &ApiCall) -> Result<ApiResponse, GovernorError> {
        let result = self.run(call).await;

        let outcome = match &result {
            Ok(_) => "admitted",
            Err(e) => e.kind(),
        };
        metrics::GOVERNED_CALLS_TOTAL
            .with_label_values(&[outcome])
            .inc();

        result
    }

    async fn run(&self, call: &ApiCall) -> Result<ApiResponse, GovernorError> {
        if !self.config.enabled {
            return Ok(self.transport.perform(&call.to_request()).await?);
        }

        let resolved = self.resolver.resolve(&call.route, &call.operation)?;
        let mut ledger = Ledger::new(&self.store, resolved.cost);

        let mut unknown = Vec::new();
        for scope in resolved.scopes {
            match self.registry.lookup(&scope.key) {
                Some(descriptor) => ledger.admit(&scope.key, &descriptor)?,
                None => unknown.push(scope),
            }
        }

        let mut known_late = Vec::new();
        let mut probes = Vec::new();
        let mut waiters = Vec::new();
        for scope in unknown {
            match self.discovery.claim(&scope.key) {
                Claim::Resolved(descriptor) => known_late.push((scope.key, descriptor)),
                Claim::Prober(guard) => probes.push((scope, guard)),
                Claim::Waiter(waiter) => waiters.push(waiter),
            }
        }

        if !probes.is_empty() {
            for (key, descriptor) in &known_late {
                if let Err(e) = ledger.admit(key, descriptor) {
                    let reason = format!("call rejected on {} before probing", key);
                    for (_, guard) in probes {
                        guard.fail(reason.clone());
                    }
                    return Err(e);
                }
            }
            return self.probe(call, ledger, probes, waiters).await;
        }

        // No claims are held while waiting, so waiters cannot deadlock
        for waiter in waiters {
            let key = waiter.key().clone();
            let descriptor = waiter.wait().await?;
            known_late.push((key, descriptor));
        }
        for (key, descriptor) in &known_late {
            ledger.admit(key, descriptor)?;
        }

        ledger.commit();
        match self.transport.perform(&call.to_request()).await {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_rate_limited() {
                    warn!(
                        operation = %call.operation,
                        route = %call.route,
                        "Remote enforcer rejected an admitted call: {}",
                        e
                    );
                }
                ledger.rollback();
                Err(e.into())
            }
        }
    }

    /// Make the call as a probe, learn the claimed quotas and account for it
    async fn probe(
        &self,
        call: &ApiCall,
        mut ledger: Ledger<'_>,
        probes: Vec<(Scope, ProbeGuard)>,
        waiters: Vec<ProbeWaiter>,
    ) -> Result<ApiResponse, GovernorError> {
        let cost = ledger.cost;
        let first = probes[0].0.key.clone();
        metrics::PROBES_TOTAL.inc();
        debug!(scope = %first, claimed = probes.len(), "Probing for unknown quotas");

        ledger.commit();
        let started = Instant::now();
        let outcome = self.transport.perform(&call.to_request()).await;
        metrics::PROBE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                ledger.rollback();
                let reason = format!("probe call failed: {}", e);
                warn!(scope = %first, "{}", reason);
                metrics::DISCOVERY_FAILURES_TOTAL.inc();
                for (_, guard) in probes {
                    guard.fail(reason.clone());
                }
                return Err(GovernorError::DiscoveryFailed {
                    scope: first,
                    reason,
                });
            }
        };

        let mut discovered = Vec::with_capacity(probes.len());
        let mut failure: Option<(ScopeKey, String)> = None;
        for (scope, guard) in probes {
            match self.conventions.descriptor_for(scope.source, response.headers()) {
                Ok(descriptor) => discovered.push((scope.key, guard, descriptor)),
                Err(e) => {
                    let reason = e.to_string();
                    warn!(scope = %scope.key, "Quota disclosure unusable: {}", reason);
                    guard.fail(reason.clone());
                    failure.get_or_insert((scope.key, reason));
                }
            }
        }

        for (key, _, descriptor) in &discovered {
            info!(
                scope = %key,
                capacity = descriptor.capacity(),
                window_secs = descriptor.window_secs(),
                "Discovered quota"
            );
        }

        if let Some((scope, reason)) = failure {
            for (_, guard, descriptor) in discovered {
                guard.resolve(descriptor);
            }
            ledger.rollback();
            metrics::DISCOVERY_FAILURES_TOTAL.inc();
            return Err(GovernorError::DiscoveryFailed { scope, reason });
        }

        for (key, guard, descriptor) in discovered {
            guard.resolve(descriptor);
            self.store.consume(&key, &descriptor, cost);
        }

        for waiter in waiters {
            let key = waiter.key().clone();
            match waiter.wait().await {
                Ok(descriptor) => {
                    self.store.consume(&key, &descriptor, cost);
                }
                Err(e) => warn!(scope = %key, "Probe call not counted against scope: {}", e),
            }
        }

        Ok(response)
    }
}

impl<T> std::fmt::Debug for Governor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governor")
            .field("config", &self.config)
            .field("known_scopes", &self.registry.len())
            .finish_non_exhaustive()
    }
}
