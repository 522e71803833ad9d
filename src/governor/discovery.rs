//! Discovery Coordinator
//!
//! At most one probe per unknown scope. The first caller to claim a scope
//! becomes its prober and holds a [`ProbeGuard`]; every later caller gets a
//! [`ProbeWaiter`] that completes when the guard resolves or fails.
//!
//! ```text
//! UNKNOWN --claim--> CLAIMED --resolve--> RESOLVED (registry)
//!                       |
//!                       +--fail / drop--> UNKNOWN (waiters get DiscoveryFailed)
//! ```
//!
//! The latch is a `tokio::sync::watch` channel per claimed scope. Dropping a
//! waiter does nothing to the probe; dropping an unresolved guard fails it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::error::GovernorError;
use super::quota::QuotaDescriptor;
use super::registry::QuotaRegistry;
use super::scope::ScopeKey;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ProbeStatus {
    Pending,
    Resolved(QuotaDescriptor),
    Failed(String),
}

#[derive(Debug)]
struct Inner {
    registry: QuotaRegistry,
    pending: Mutex<HashMap<ScopeKey, watch::Receiver<ProbeStatus>>>,
}

/// Result of claiming a scope
#[derive(Debug)]
pub enum Claim {
    /// The quota is already known
    Resolved(QuotaDescriptor),
    /// The caller owns the probe for this scope
    Prober(ProbeGuard),
    /// Another caller is probing; wait for its outcome
    Waiter(ProbeWaiter),
}

/// Serializes quota discovery per scope
#[derive(Debug, Clone)]
pub struct DiscoveryCoordinator {
    inner: Arc<Inner>,
}

impl DiscoveryCoordinator {
    pub fn new(registry: QuotaRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Claim `key` without waiting
    pub fn claim(&self, key: &ScopeKey) -> Claim {
        let mut pending = self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner);

        // Registration happens under this lock, so a miss here means no probe
        // has resolved since.
        if let Some(descriptor) = self.inner.registry.lookup(key) {
            return Claim::Resolved(descriptor);
        }

        if let Some(rx) = pending.get(key) {
            debug!("Waiting on in-flight probe for {}", key);
            return Claim::Waiter(ProbeWaiter {
                key: key.clone(),
                rx: rx.clone(),
            });
        }

        let (tx, rx) = watch::channel(ProbeStatus::Pending);
        pending.insert(key.clone(), rx);
        debug!("Claimed probe for {}", key);

        Claim::Prober(ProbeGuard {
            key: key.clone(),
            tx: Some(tx),
            inner: Arc::clone(&self.inner),
        })
    }

    /// Whether a probe for `key` is in flight
    pub fn is_claimed(&self, key: &ScopeKey) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of probes in flight
    pub fn pending_count(&self) -> usize {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Ownership of the probe for one scope
#[derive(Debug)]
pub struct ProbeGuard {
    key: ScopeKey,
    tx: Option<watch::Sender<ProbeStatus>>,
    inner: Arc<Inner>,
}

impl ProbeGuard {
    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    /// Register the discovered quota and wake every waiter with it
    pub fn resolve(mut self, descriptor: QuotaDescriptor) {
        self.finish(ProbeStatus::Resolved(descriptor));
    }

    /// Return the scope to UNKNOWN and wake every waiter with `reason`
    pub fn fail(mut self, reason: impl Into<String>) {
        self.finish(ProbeStatus::Failed(reason.into()));
    }

    fn finish(&mut self, status: ProbeStatus) {
        let Some(tx) = self.tx.take() else {
            return;
        };

        {
            let mut pending = self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if let ProbeStatus::Resolved(descriptor) = &status {
                self.inner.registry.register(self.key.clone(), *descriptor);
            }
            pending.remove(&self.key);
        }

        tx.send_replace(status);
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!("Probe for {} dropped before its quota was disclosed", self.key);
            self.finish(ProbeStatus::Failed(
                "probe abandoned before the quota was disclosed".to_string(),
            ));
        }
    }
}

/// Pending result of another caller's probe
#[derive(Debug)]
pub struct ProbeWaiter {
    key: ScopeKey,
    rx: watch::Receiver<ProbeStatus>,
}

impl ProbeWaiter {
    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    /// Wait for the probe's outcome
    ///
    /// # Errors
    ///
    /// [`GovernorError::DiscoveryFailed`] if the probe failed or was abandoned.
    pub async fn wait(mut self) -> Result<QuotaDescriptor, GovernorError> {
        let outcome = self
            .rx
            .wait_for(|status| *status != ProbeStatus::Pending)
            .await
            .map(|status| status.clone());

        match outcome {
            Ok(ProbeStatus::Resolved(descriptor)) => Ok(descriptor),
            Ok(ProbeStatus::Failed(reason)) => Err(GovernorError::DiscoveryFailed {
                scope: self.key,
                reason,
            }),
            Ok(ProbeStatus::Pending) | Err(_) => Err(GovernorError::DiscoveryFailed {
                scope: self.key,
                reason: "probe ended without an outcome".to_string(),
            }),
        }
    }
}
