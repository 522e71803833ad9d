//! Scope Keys and Resolution
//!
//! A scope is one independently enforced quota dimension. Every call touches
//! the app-wide windows of its routing target plus its own operation scope:
//!
//! ```text
//! (ASIA, route_long) -> (ASIA, route_short) -> (ASIA, get_account_by_puuid)
//! ```
//!
//! The resolver always returns scopes in this order; consumption and rollback
//! both follow it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::error::GovernorError;
use crate::routes::{RouteKind, RoutingTarget};

/// Ordered tuple identifying one rate-limit dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey(Vec<String>);

impl ScopeKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Scope `(route, name)`
    pub fn scoped(route: &RoutingTarget, name: &str) -> Self {
        Self::new([route.name(), name])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Last element, used as a low-cardinality label
    pub fn class(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(":"))
    }
}

/// Where a scope's quota is disclosed in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaSource {
    /// Entry `index` of the app (routing-target-wide) header
    App { index: usize },
    /// The method (per-operation) header
    Method,
}

/// A scope key together with the place its quota is learned from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub key: ScopeKey,
    pub source: QuotaSource,
}

/// Declared operation: name, accepted routing targets and cost per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    pub route_kind: RouteKind,
    pub cost: u32,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, route_kind: RouteKind) -> Self {
        Self {
            name: name.into(),
            route_kind,
            cost: 1,
        }
    }

    /// Set the units one call consumes. Zero is raised to one.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost.max(1);
        self
    }
}

/// Scopes of one call, in consumption order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScopes {
    pub scopes: Vec<Scope>,
    pub cost: u32,
}

/// Maps `(routing target, operation)` to ordered scopes
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    app_windows: Vec<String>,
    operations: HashMap<String, OperationSpec>,
}

impl ScopeResolver {
    pub fn new<I>(app_windows: Vec<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = OperationSpec>,
    {
        Self {
            app_windows,
            operations: operations
                .into_iter()
                .map(|op| (op.name.clone(), op))
                .collect(),
        }
    }

    /// Resolver over the built-in endpoint catalogue
    pub fn with_default_operations(app_windows: Vec<String>) -> Self {
        Self::new(app_windows, crate::endpoints::default_operations())
    }

    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.get(name)
    }

    pub fn app_windows(&self) -> &[String] {
        &self.app_windows
    }

    /// Resolve the ordered scopes for a call
    ///
    /// # Errors
    ///
    /// [`GovernorError::UnresolvableScope`] if the operation is not declared or
    /// does not accept this kind of routing target.
    pub fn resolve(
        &self,
        route: &RoutingTarget,
        operation: &str,
    ) -> Result<ResolvedScopes, GovernorError> {
        let spec = self
            .operations
            .get(operation)
            .filter(|spec| spec.route_kind.accepts(route))
            .ok_or_else(|| GovernorError::UnresolvableScope {
                operation: operation.to_string(),
                route: route.to_string(),
            })?;

        let mut scopes: Vec<Scope> = self
            .app_windows
            .iter()
            .enumerate()
            .map(|(index, window)| Scope {
                key: ScopeKey::scoped(route, window),
                source: QuotaSource::App { index },
            })
            .collect();

        scopes.push(Scope {
            key: ScopeKey::scoped(route, &spec.name),
            source: QuotaSource::Method,
        });

        Ok(ResolvedScopes {
            scopes,
            cost: spec.cost,
        })
    }
}
