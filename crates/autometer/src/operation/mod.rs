// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lifecycle counters for request handlers.
//!
//! An operation is the coarse instrumented unit: one inbound request handled by one handler. The
//! primary types are [`Operation`], [`OperationBundle`] and [`Middleware`]:
//!
//! - [`Operation`] wraps a handler `f(meta, request, response)` and counts every call under the
//!   operation name and the request's `segment`
//! - [`OperationBundle`] wraps a set of handlers, naming each after its key
//! - [`Middleware`] adapts an operation to a request-first handler that reports a [`Flow`]
//!
//! # Request Context
//!
//! Handlers further up the pipeline describe the request through two [`Meta`][crate::Meta]
//! records, read through [`RequestContext`]:
//!
//! | Record | Attached with | Used for |
//! |--------|---------------|----------|
//! | `meta` | [`RequestMetaExt::add_meta`], [`AddMeta::layer`] | merged into the meta handed to the handler; its `segment` is the fallback tag |
//! | `metrics` | [`RequestMetaExt::add_metrics_meta`], [`AddMeta::metrics_layer`] | its `segment` takes precedence |
//!
//! Both are stored as `http::Request` extensions.
//!
//! # Outcome
//!
//! The handler's error is counted as a failure and returned unchanged in
//! [`CallError::Delegate`][crate::CallError::Delegate]. Only the failure category and type are
//! part of operation keys.

mod add_meta;
mod bundle;
mod middleware;
mod request;
mod wrapper;

pub use add_meta::{AddMeta, AddMetaLayer};
pub use bundle::OperationBundle;
pub use middleware::{Flow, Middleware, to_middlewares};
pub use request::{MetricsMeta, Reply, RequestContext, RequestMetaExt, ResponseState};
pub use wrapper::Operation;
