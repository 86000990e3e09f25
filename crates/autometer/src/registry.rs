// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::MetricsClient;

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Holds the metrics client wrapped functions report to.
///
/// A registry is a cheaply cloneable handle: clones share the same client slot, so a client
/// registered through one clone is seen by all of them. Wrappers read the slot on every call,
/// never when they are created, which means a client registered (or replaced, or cleared) after a
/// function was wrapped is observed by that function's next invocation.
///
/// Applications that do not need dependency injection can use the process-wide
/// [`Registry::global`] through [`init_metrics`] and [`metrics_instance`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use autometer::{RecordingClient, Registry};
///
/// let registry = Registry::new();
/// assert!(!registry.is_initialized());
///
/// registry.init(Some(Arc::new(RecordingClient::new())));
/// assert!(registry.is_initialized());
///
/// registry.init(None);
/// assert!(registry.get().is_none());
/// ```
///
/// # Thread safety
///
/// The slot is guarded by a read-write lock. Reads happen on every wrapped call; writes are
/// expected to be rare, typically once at start-up.
#[derive(Clone, Default)]
pub struct Registry {
    slot: Arc<RwLock<Option<Arc<dyn MetricsClient>>>>,
}

impl Registry {
    /// Creates a registry with no client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Stores `client`, replacing any previously registered one. `None` clears the slot.
    pub fn init(&self, client: Option<Arc<dyn MetricsClient>>) {
        *self.slot.write() = client;
    }

    /// Returns the registered client, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn MetricsClient>> {
        self.slot.read().clone()
    }

    /// Removes the registered client.
    pub fn clear(&self) {
        self.init(None);
    }

    /// Returns `true` when a client is registered.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Returns `true` when both handles share the same slot.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("initialized", &self.is_initialized()).finish()
    }
}

/// Stores `client` in the [global registry](Registry::global). `None` clears it.
pub fn init_metrics(client: Option<Arc<dyn MetricsClient>>) {
    Registry::global().init(client);
}

/// Returns the client stored in the [global registry](Registry::global), if any.
#[must_use]
pub fn metrics_instance() -> Option<Arc<dyn MetricsClient>> {
    Registry::global().get()
}
