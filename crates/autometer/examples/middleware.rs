// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Middleware example that tags requests with a segment and counts the handlers they pass through.
//!
//! `AddMeta` layers attach meta to each request; the operations wrapped as middleware read it
//! and count every request under `operation.<name>.segment.<segment>`. A recording client is
//! used so the counters can be printed at the end.

use std::sync::Arc;

use autometer::operation::{AddMeta, Reply, RequestContext};
use autometer::{Fault, Flow, Meta, MeterContext, OperationBundle, RecordingClient, Registry};
use layered::{Execute, Layer, Service};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type Handler = fn(Meta, http::Request<()>, Reply<String>) -> Result<(), Fault>;

fn authorize(meta: Meta, request: http::Request<()>, _reply: Reply<String>) -> Result<(), Fault> {
    println!("authorizing {} for {:?}", request.uri(), meta.get_field("transaction_id"));

    if request.headers().contains_key(http::header::AUTHORIZATION) {
        Ok(())
    } else {
        Err(Fault::new().with_category("AUTH").with_status(401).with_kind("MISSING_TOKEN"))
    }
}

fn render(_meta: Meta, request: http::Request<()>, reply: Reply<String>) -> Result<(), Fault> {
    reply.send(http::Response::new(format!("hello from {}", request.uri())));
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).init();

    let client = Arc::new(RecordingClient::new());
    let registry = Registry::new();
    registry.init(Some(client.clone()));

    let context = MeterContext::new(&registry).use_logs();
    let middlewares = OperationBundle::with_context(&context).middlewares([("authorize", authorize as Handler), ("render", render as Handler)]);

    // Run the handlers in order until one sends a response or fails.
    let pipeline = Execute::new(move |request: http::Request<()>| {
        let middlewares = middlewares.clone();
        async move {
            let reply = Reply::new();
            for name in ["authorize", "render"] {
                let request = clone_request(&request);
                match middlewares[name].handle(request, reply.clone()) {
                    Flow::Next => {}
                    Flow::Sent => return reply.take().map(http::Response::into_body),
                    Flow::Fail(error) => return Some(format!("rejected: {error}")),
                }
            }

            None
        }
    });

    let service = AddMeta::layer(Meta::new().field("transaction_id", "42"))
        .layer(AddMeta::metrics_layer(Meta::new().segment("premium")).layer(pipeline));

    let authorized = http::Request::builder()
        .uri("/profile")
        .header(http::header::AUTHORIZATION, "Bearer token")
        .body(())
        .unwrap_or_default();
    println!("{:?}", service.execute(authorized).await);
    println!("{:?}", service.execute(http::Request::new(())).await);

    for (key, value) in client.calls() {
        println!("{key} += {value}");
    }
}

fn clone_request(request: &http::Request<()>) -> http::Request<()> {
    let mut clone = http::Request::new(());
    *clone.uri_mut() = request.uri().clone();
    *clone.headers_mut() = request.headers().clone();
    if let Some(meta) = request.meta() {
        clone.extensions_mut().insert(meta.clone());
    }
    if let Some(metrics) = request.metrics() {
        clone.extensions_mut().insert(autometer::operation::MetricsMeta(metrics.clone()));
    }
    clone
}
