// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use parking_lot::Mutex;

/// A metrics backend that can increment a named counter.
///
/// This is the only capability the wrappers need from the host application's metrics client.
/// Implementations are expected to return quickly; the wrappers call [`count`][Self::count]
/// inline, on the caller's task, and do not catch panics raised by it.
///
/// Any `Fn(&str, u64)` closure is a client:
///
/// ```rust
/// use std::sync::Arc;
///
/// use autometer::{MetricsClient, Registry};
///
/// let registry = Registry::new();
/// registry.init(Some(Arc::new(|key: &str, value: u64| println!("{key} += {value}"))));
/// ```
pub trait MetricsClient: Send + Sync {
    /// Increments the counter identified by `key` by `value`.
    fn count(&self, key: &str, value: u64);
}

impl<F> MetricsClient for F
where
    F: Fn(&str, u64) + Send + Sync,
{
    fn count(&self, key: &str, value: u64) {
        self(key, value);
    }
}

/// A [`MetricsClient`] that records every increment in memory.
///
/// Intended for tests: register it, invoke wrapped functions, then assert on the recorded keys.
///
/// ```rust
/// use std::sync::Arc;
///
/// use autometer::{MetricsClient, RecordingClient};
///
/// let client = Arc::new(RecordingClient::new());
/// client.count("operation.checkout.segment.undefined.state.start", 1);
///
/// assert_eq!(client.keys(), ["operation.checkout.segment.undefined.state.start"]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<(String, u64)>>,
}

impl RecordingClient {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded `(key, value)` pair in emission order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().clone()
    }

    /// Returns every recorded key in emission order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Returns the sum of all increments recorded for `key`.
    #[must_use]
    pub fn total(&self, key: &str) -> u64 {
        self.calls.lock().iter().filter(|(k, _)| k == key).map(|(_, value)| value).sum()
    }

    /// Returns the number of recorded keys ending with `suffix`.
    #[must_use]
    pub fn count_suffix(&self, suffix: &str) -> usize {
        self.calls.lock().iter().filter(|(k, _)| k.ends_with(suffix)).count()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl MetricsClient for RecordingClient {
    fn count(&self, key: &str, value: u64) {
        self.calls.lock().push((key.to_owned(), value));
    }
}
