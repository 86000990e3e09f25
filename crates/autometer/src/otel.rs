// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt::Debug;

use opentelemetry::InstrumentationScope;
use opentelemetry::metrics::{Counter, Meter, MeterProvider};
use parking_lot::Mutex;

use crate::MetricsClient;

const METER_NAME: &str = "autometer";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

pub(crate) fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

/// A [`MetricsClient`] that reports every key as an OpenTelemetry `u64` counter of that name.
///
/// Counters are created on first use and reused afterwards.
///
/// ```rust
/// # #[cfg(feature = "metrics")]
/// # {
/// use std::sync::Arc;
///
/// use autometer::{OpenTelemetryClient, Registry};
///
/// let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder().build();
/// let registry = Registry::new();
/// registry.init(Some(Arc::new(OpenTelemetryClient::new(&provider))));
/// # }
/// ```
pub struct OpenTelemetryClient {
    meter: Meter,
    counters: Mutex<HashMap<String, Counter<u64>>>,
}

impl OpenTelemetryClient {
    /// Creates a client recording through a meter obtained from `provider`.
    #[must_use]
    pub fn new(provider: &dyn MeterProvider) -> Self {
        Self::from_meter(create_meter(provider))
    }

    /// Creates a client recording through `meter`.
    #[must_use]
    pub fn from_meter(meter: Meter) -> Self {
        Self {
            meter,
            counters: Mutex::new(HashMap::new()),
        }
    }

    fn counter(&self, key: &str) -> Counter<u64> {
        let mut counters = self.counters.lock();
        if let Some(counter) = counters.get(key) {
            return counter.clone();
        }

        let counter = self
            .meter
            .u64_counter(key.to_owned())
            .with_description("Lifecycle transitions of an instrumented action or operation.")
            .build();
        counters.insert(key.to_owned(), counter.clone());
        counter
    }
}

impl MetricsClient for OpenTelemetryClient {
    fn count(&self, key: &str, value: u64) {
        self.counter(key).add(value, &[]);
    }
}

impl Debug for OpenTelemetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenTelemetryClient")
            .field("counters", &self.counters.lock().len())
            .finish_non_exhaustive()
    }
}
