//! Governor Error Types
//!
//! Errors a governed call can end with. None of them are retried internally.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::scope::ScopeKey;
use crate::transport::TransportError;

/// Error types for governed calls
#[derive(Debug, Clone, thiserror::Error)]
pub enum GovernorError {
    /// A scope has no room left in its current window; nothing was consumed
    #[error("quota exhausted for {scope}, retry in {:.3}s", .retry_after.as_secs_f64())]
    QuotaRejected {
        scope: ScopeKey,
        retry_after: Duration,
        remaining: u32,
        reset_at: DateTime<Utc>,
    },

    /// The quota of a scope could not be learned; the scope stays unknown
    #[error("quota discovery failed for {scope}: {reason}")]
    DiscoveryFailed { scope: ScopeKey, reason: String },

    /// The call was admitted but failed; its consumption was rolled back
    #[error("transport failed: {0}")]
    TransportFailed(#[from] TransportError),

    /// The operation is not declared for this routing target
    #[error("no quota scopes for operation '{operation}' on route {route}")]
    UnresolvableScope { operation: String, route: String },
}

impl GovernorError {
    /// Advised wait before trying again, if the error carries one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GovernorError::QuotaRejected { retry_after, .. } => Some(*retry_after),
            GovernorError::TransportFailed(TransportError::RateLimited { retry_after, .. }) => {
                *retry_after
            }
            _ => None,
        }
    }

    /// Whether the same call may succeed later without any change
    pub fn is_retryable(&self) -> bool {
        match self {
            GovernorError::QuotaRejected { .. } | GovernorError::DiscoveryFailed { .. } => true,
            GovernorError::TransportFailed(e) => matches!(
                e,
                TransportError::RateLimited { .. }
                    | TransportError::Server { .. }
                    | TransportError::Network(_)
                    | TransportError::Timeout(_)
            ),
            GovernorError::UnresolvableScope { .. } => false,
        }
    }

    /// Scope the error is about, if any
    pub fn scope(&self) -> Option<&ScopeKey> {
        match self {
            GovernorError::QuotaRejected { scope, .. }
            | GovernorError::DiscoveryFailed { scope, .. } => Some(scope),
            _ => None,
        }
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GovernorError::QuotaRejected { .. } => "rejected",
            GovernorError::DiscoveryFailed { .. } => "discovery_failed",
            GovernorError::TransportFailed(_) => "transport_failed",
            GovernorError::UnresolvableScope { .. } => "unresolvable",
        }
    }
}
