// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for operations, bundles and middleware using only public API.

use std::sync::Arc;

use autometer::operation::{AddMeta, Reply, RequestContext, RequestMetaExt, ResponseState};
use autometer::{CallError, Error, Fault, Flow, Meta, MeterContext, Operation, OperationBundle, RecordingClient, Registry};
use layered::{Execute, Layer, Service};

fn setup() -> (Arc<RecordingClient>, MeterContext) {
    let client = Arc::new(RecordingClient::new());
    let registry = Registry::new();
    registry.init(Some(client.clone()));
    (client, MeterContext::new(&registry))
}

fn tagged_request() -> http::Request<()> {
    let mut request = http::Request::new(());
    request.add_metrics_meta(&Meta::new().segment("S1"));
    request.add_meta(&Meta::new().segment("S2").field("transaction_id", "xxxx"));
    request
}

fn checkout(meta: Meta, _request: http::Request<()>, _response: ()) -> Result<Meta, Fault> {
    Ok(meta)
}

async fn render(_meta: Meta, request: http::Request<()>, reply: Reply<String>) -> Result<(), Fault> {
    match request.uri().path() {
        "/missing" => Err(Fault::new().with_category("RENDER").with_kind("NOT_FOUND")),
        "/html" => {
            reply.send(http::Response::new("<p>hi</p>".to_string()));
            Ok(())
        }
        _ => Ok(()),
    }
}

fn request_to(path: &str) -> http::Request<()> {
    let mut request = http::Request::builder().uri(path).body(()).unwrap();
    request.add_metrics_meta(&Meta::new().segment("web"));
    request
}

#[test]
fn metrics_segment_wins_and_meta_is_enriched() {
    let (client, context) = setup();
    let operation = Operation::from_fn(checkout).context(&context);

    let meta = operation.call(Meta::new().segment("S3"), tagged_request(), ()).unwrap();

    assert_eq!(
        client.keys(),
        [
            "operation.checkout.segment.S1.state.start",
            "operation.checkout.segment.S1.state.success"
        ]
    );
    assert_eq!(meta.get_operation(), Some("checkout"));
    assert_eq!(meta.get_field("transaction_id"), Some("xxxx"));
    assert_eq!(meta.get_segment(), Some("S2"));
}

#[test]
fn missing_segment_is_undefined() {
    let (client, context) = setup();
    let operation = Operation::from_fn(checkout).context(&context);

    operation.call(Meta::new(), http::Request::new(()), ()).unwrap();

    assert_eq!(client.total("operation.checkout.segment.undefined.state.start"), 1);
}

#[test]
fn uninitialized_registry_skips_handler() {
    let operation = Operation::from_fn(checkout).context(&MeterContext::new(&Registry::new()));

    let error = operation.call(Meta::new(), tagged_request(), ()).unwrap_err();

    assert!(matches!(error, CallError::Metrics(Error::Uninitialized)));
}

#[tokio::test]
async fn middleware_reports_flow() {
    let (client, context) = setup();
    let middleware = Operation::from_fn(render).context(&context).into_middleware();

    let reply = Reply::new();
    let flow = middleware.handle_async(request_to("/plain"), reply.clone()).await;
    assert!(flow.is_next());
    assert!(!reply.is_sent());

    let reply = Reply::new();
    let flow = middleware.handle_async(request_to("/html"), reply.clone()).await;
    assert!(flow.is_sent());
    assert_eq!(reply.status(), Some(http::StatusCode::OK));

    let flow = middleware.handle_async(request_to("/missing"), Reply::new()).await;
    let error = flow.into_error().unwrap();
    assert!(matches!(error, CallError::Delegate(_)));

    assert_eq!(client.total("operation.render.segment.web.state.start"), 3);
    assert_eq!(client.total("operation.render.segment.web.state.success"), 2);
    assert_eq!(client.total("operation.render.segment.web.state.failure.category.RENDER.type.NOT_FOUND"), 1);
}

#[tokio::test]
async fn middleware_behind_add_meta_layers() {
    let (client, context) = setup();
    let middleware = Operation::from_fn(render).context(&context).into_middleware();

    let pipeline = AddMeta::metrics_layer(Meta::new().segment("premium")).layer(Execute::new(move |request: http::Request<()>| {
        let middleware = middleware.clone();
        async move { middleware.execute((request, Reply::new())).await }
    }));

    let flow = pipeline.execute(http::Request::new(())).await;

    assert!(matches!(flow, Flow::Next));
    assert_eq!(client.total("operation.render.segment.premium.state.success"), 1);
}

#[test]
fn bundle_operations_and_middlewares() {
    type Handler = fn(Meta, http::Request<()>, ()) -> Result<Meta, Fault>;

    let (client, context) = setup();
    let bundle = OperationBundle::with_context(&context);

    let operations = bundle.wrap_all([("pay", checkout as Handler), ("refund", checkout as Handler)]);
    let meta = operations["pay"].call(Meta::new(), tagged_request(), ()).unwrap();
    assert_eq!(meta.get_operation(), Some("pay"));

    let middlewares = bundle.middlewares([("refund", checkout as Handler)]);
    assert!(middlewares["refund"].handle(tagged_request(), ()).is_next());

    assert_eq!(client.total("operation.pay.segment.S1.state.success"), 1);
    assert_eq!(client.total("operation.refund.segment.S1.state.success"), 1);
}

#[test]
fn request_context_reads_extensions() {
    let request = tagged_request();

    assert_eq!(request.metrics().and_then(Meta::get_segment), Some("S1"));
    assert_eq!(request.meta().and_then(Meta::get_segment), Some("S2"));
}
