// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Automatic lifecycle counters for actions and operations.
//!
//! This crate wraps application functions so that every invocation emits `start`, `success`,
//! and `failure` counters to an injected [`MetricsClient`], without the function body knowing
//! about metrics at all. It does not store or aggregate anything itself: counters go straight
//! to whatever client the host application registers.
//!
//! # Core Types
//!
//! - [`Action`]: wraps a single business function. Counters are rooted both at the caller's
//!   scope (a service or namespace name) and at the operation the call belongs to.
//! - [`ActionBundle`]: wraps a named set of functions under one fixed scope.
//! - [`Operation`]: wraps a request handler. Counters are keyed by operation name and the
//!   `segment` tag an upstream handler attached to the request.
//! - [`Middleware`]: adapts an [`Operation`] to a request-first handler that reports whether the
//!   chain should continue.
//! - [`Registry`] and [`MeterContext`]: where the metrics client lives and how wrappers find it.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use autometer::{CallError, Meta, MeterContext, NameSource, Registry};
//!
//! struct UserQuery {
//!     id: u32,
//! }
//!
//! // Params may carry naming fields of their own; this one does not.
//! impl NameSource for UserQuery {}
//!
//! fn get_user(query: UserQuery, _meta: Option<Meta>) -> Result<String, String> {
//!     Ok(format!("user-{}", query.id))
//! }
//!
//! let registry = Registry::new();
//! registry.init(Some(Arc::new(|key: &str, value: u64| println!("{key} += {value}"))));
//!
//! let context = MeterContext::new(&registry);
//! let action = autometer::action!(get_user).context(&context);
//!
//! let meta = Meta::new().scope("user_service").operation("show_profile");
//! let user = action.call(UserQuery { id: 7 }, Some(meta))?;
//! assert_eq!(user, "user-7");
//! # Ok::<(), CallError<String>>(())
//! ```
//!
//! The call above increments:
//!
//! ```text
//! service.user_service.action.get_user.state.start
//! operation.show_profile.action.get_user.state.start
//! service.user_service.action.get_user.state.success
//! operation.show_profile.action.get_user.state.success
//! ```
//!
//! # Counter Keys
//!
//! | Level | Root | States |
//! |-------|------|--------|
//! | Action | `<kind>.<scope>.action.<action>` and `operation.<operation>.action.<action>` | `state.start`, `state.success`, `state.failure.category.<category>.status.<status>`, `state.failure.category.<category>.type.<type>` |
//! | Operation | `operation.<operation>.segment.<segment>` | `state.start`, `state.success`, `state.failure.category.<category>.type.<type>` |
//!
//! `<kind>` is `service` or `namespace` (see [`ScopeKind`]). Missing names and failure details
//! are rendered as the literal `undefined`. Failure details come from the [`Categorized`] trait.
//!
//! # Synchronous and Asynchronous Functions
//!
//! Whether a function is asynchronous is decided by the method used to call it:
//! [`Action::call`] takes a function returning `Result<T, E>`, [`Action::call_async`] takes one
//! returning a future of `Result<T, E>`. The settle counter is only emitted after the future
//! resolves.
//!
//! # Features
//!
//! - `logs`: emits `tracing` events for every lifecycle transition when enabled with
//!   [`MeterContext::use_logs`].
//! - `metrics`: enables `OpenTelemetryClient`, a [`MetricsClient`] backed by an OpenTelemetry
//!   meter.
//! - `serde`: serialization for [`Meta`] and [`MeterConfig`], and [`NameSource`] for
//!   `serde_json::Value`.
//!
//! [`RecordingClient`] is always available for asserting on emitted counters in tests.

mod client;
pub use client::{MetricsClient, RecordingClient};

mod context;
pub use context::{MeterConfig, MeterContext};

mod error;
pub use error::{CallError, Error};

mod failure;
pub use failure::{Categorized, Fault};

mod naming;
pub use naming::{Meta, NameSource, NameSources, Scope, ScopeKind, Source, UNDEFINED};

mod registry;
pub use registry::{Registry, init_metrics, metrics_instance};

pub mod event;

pub mod action;
#[doc(inline)]
pub use action::{Action, ActionBundle};

pub mod operation;
#[doc(inline)]
pub use operation::{Flow, Middleware, Operation, OperationBundle, to_middlewares};

#[cfg(any(feature = "metrics", test))]
mod otel;
#[cfg(any(feature = "metrics", test))]
pub use otel::OpenTelemetryClient;

mod macros;

mod unwind;

#[doc(inline)]
pub use layered::{Layer, Service};

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;
