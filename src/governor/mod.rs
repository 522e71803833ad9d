//! Adaptive Multi-Scope Request Governor
//!
//! Admission control for calls against an API whose rate limits are only
//! disclosed in the headers of successful responses.
//!
//! # Features
//!
//! - Quota discovery with at most one in-flight probe per scope
//! - Several independently windowed quotas checked per call
//! - Rollback of partial consumption when one scope rejects
//! - Per-operation cost and a configurable safety headroom
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Governor                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │   Scope     │  │   Quota     │  │     Discovery       │  │
//! │  │  Resolver   │  │  Registry   │  │    Coordinator      │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │            Window Counter Store (in-memory)            │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                          Transport
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod quota;
pub mod registry;
pub mod scope;
pub mod snapshot;
pub mod store;

pub use config::GovernorConfig;
pub use discovery::{Claim, DiscoveryCoordinator, ProbeGuard, ProbeWaiter};
pub use error::GovernorError;
pub use manager::Governor;
pub use quota::{HeaderConventions, QuotaDescriptor, QuotaParseError, MAX_WINDOW_SECS};
pub use registry::QuotaRegistry;
pub use scope::{OperationSpec, QuotaSource, ResolvedScopes, Scope, ScopeKey, ScopeResolver};
pub use snapshot::{GovernorSnapshot, ScopeUsage};
pub use store::{WindowCounterStore, WindowHit, WindowStats};

// Property-based tests module
#[cfg(test)]
mod proptests;
