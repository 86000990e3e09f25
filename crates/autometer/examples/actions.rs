// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Action example that counts calls to a small user store.
//!
//! The example:
//!
//! 1. Registers an OpenTelemetry-backed client in the global registry
//! 2. Wraps the store functions in an `ActionBundle` scoped to `user_service`
//! 3. Calls them, once failing, and prints the resulting counters to stdout

use std::sync::Arc;

use autometer::{ActionBundle, CallError, Categorized, Meta, MeterContext, NameSource, OpenTelemetryClient, init_metrics};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_stdout::MetricExporter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
struct UserQuery {
    id: u32,
}

impl NameSource for UserQuery {}

#[derive(Debug)]
struct StoreError {
    id: u32,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user {} not found", self.id)
    }
}

impl Categorized for StoreError {
    fn category(&self) -> Option<std::borrow::Cow<'_, str>> {
        Some("STORE".into())
    }

    fn status(&self) -> Option<std::borrow::Cow<'_, str>> {
        Some("404".into())
    }

    fn kind(&self) -> Option<std::borrow::Cow<'_, str>> {
        Some("NOT_FOUND".into())
    }
}

async fn get_user(query: UserQuery, _meta: Option<Meta>) -> Result<String, StoreError> {
    if query.id == 0 {
        return Err(StoreError { id: query.id });
    }

    Ok(format!("user-{}", query.id))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CallError<StoreError>> {
    let meter_provider = configure_telemetry();
    init_metrics(Some(Arc::new(OpenTelemetryClient::new(&meter_provider))));

    let context = MeterContext::global().use_logs();
    let bundle = ActionBundle::with_context("user_service", &context)?;
    let get_user = bundle.action("get_user", get_user);

    let meta = Meta::new().operation("show_profile");
    let user = get_user.call_async(UserQuery { id: 7 }, Some(meta.clone())).await?;
    println!("loaded {user}");

    match get_user.call_async(UserQuery { id: 0 }, Some(meta)).await {
        Ok(user) => println!("unexpectedly loaded {user}"),
        Err(error) => println!("lookup failed: {error}"),
    }

    // Flush so the exporter prints the counters before exit.
    if let Err(error) = meter_provider.shutdown() {
        println!("failed to flush metrics: {error}");
    }

    Ok(())
}

fn configure_telemetry() -> SdkMeterProvider {
    // Set up tracing subscriber for logs to console
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).init();

    SdkMeterProvider::builder()
        .with_periodic_exporter(MetricExporter::default())
        .build()
}
