// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{Registry, ScopeKind};

/// Shared configuration for wrapped functions.
///
/// Pass one `MeterContext` to every wrapper that should report to the same [`Registry`] with the
/// same conventions. Wrappers created without a context use [`MeterContext::global`].
///
/// ```rust
/// use autometer::{MeterContext, Registry, ScopeKind};
///
/// let registry = Registry::new();
/// let context = MeterContext::new(&registry).scope_kind(ScopeKind::Namespace);
///
/// assert_eq!(context.get_scope_kind(), ScopeKind::Namespace);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct MeterContext {
    registry: Registry,
    scope_kind: ScopeKind,
    logs_enabled: bool,
}

impl MeterContext {
    /// Creates a context reading the client from `registry`.
    #[must_use]
    pub fn new(registry: &Registry) -> Self {
        Self {
            registry: registry.clone(),
            scope_kind: ScopeKind::default(),
            logs_enabled: false,
        }
    }

    /// Creates a context reading the client from the [global registry](Registry::global).
    #[must_use]
    pub fn global() -> Self {
        Self::new(Registry::global())
    }

    /// Sets the kind of scope action counters are rooted at. Defaults to [`ScopeKind::Service`].
    #[must_use]
    pub fn scope_kind(self, scope_kind: ScopeKind) -> Self {
        Self { scope_kind, ..self }
    }

    /// Enables `tracing` events for every lifecycle transition.
    ///
    /// Has no effect unless the `logs` feature is enabled.
    #[must_use]
    pub fn use_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Applies a deserialized [`MeterConfig`].
    #[must_use]
    pub fn configure(self, config: &MeterConfig) -> Self {
        Self {
            scope_kind: config.scope_kind,
            logs_enabled: config.logs,
            ..self
        }
    }

    /// Returns the registry the client is read from.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the configured scope kind.
    #[must_use]
    pub fn get_scope_kind(&self) -> ScopeKind {
        self.scope_kind
    }

    /// Returns `true` when lifecycle transitions are logged.
    #[must_use]
    pub fn logs_enabled(&self) -> bool {
        self.logs_enabled
    }
}

impl Default for MeterContext {
    fn default() -> Self {
        Self::global()
    }
}

/// Declarative form of the [`MeterContext`] settings, e.g. loaded from an application config file.
///
/// Deserializable with the `serde` feature; missing fields keep their defaults.
///
/// ```rust
/// # #[cfg(feature = "serde")]
/// # {
/// use autometer::{MeterConfig, MeterContext, Registry, ScopeKind};
///
/// let config: MeterConfig = serde_json::from_str(r#"{ "scope_kind": "namespace" }"#).unwrap();
/// let context = MeterContext::new(&Registry::new()).configure(&config);
///
/// assert_eq!(context.get_scope_kind(), ScopeKind::Namespace);
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct MeterConfig {
    /// The kind of scope action counters are rooted at.
    pub scope_kind: ScopeKind,
    /// Whether lifecycle transitions are logged.
    pub logs: bool,
}

impl MeterConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
