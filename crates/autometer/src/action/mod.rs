// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lifecycle counters for business functions.
//!
//! An action is the smallest instrumented unit: one call to one business function, typically a
//! call to a downstream API. The primary types are [`Action`] and [`ActionBundle`]:
//!
//! - [`Action`] wraps a single function and counts every call under the caller's scope and
//!   operation
//! - [`ActionBundle`] wraps a set of functions under one fixed scope, naming each after its key
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use autometer::{Action, Fault, Meta, MeterContext, RecordingClient, Registry};
//!
//! async fn get_session(_session_id: String, _meta: Option<Meta>) -> Result<String, Fault> {
//!     Err(Fault::new().with_category("FETCH_RESPONSE_ERROR").with_status(404).with_kind("SESSION_NOT_FOUND"))
//! }
//!
//! # futures::executor::block_on(async {
//! let client = Arc::new(RecordingClient::new());
//! let registry = Registry::new();
//! registry.init(Some(client.clone()));
//!
//! let action = Action::new("get_session", get_session).context(&MeterContext::new(&registry));
//! let meta = Meta::new().scope("session_api").operation("login");
//!
//! let result = action.call_async(String::from("abc"), Some(meta)).await;
//! assert!(result.is_err());
//! assert_eq!(client.count_suffix("status.404"), 2);
//! # });
//! ```
//!
//! `String` params carry no names of their own, see [`NameSource`][crate::NameSource].
//!
//! # Naming
//!
//! Each call resolves two names before the function runs:
//!
//! | Name | Looked up in | Default |
//! |------|--------------|---------|
//! | Scope | explicit `meta`, then `meta` nested in params, then params | `undefined` for [`ScopeKind::Service`][crate::ScopeKind::Service], `action` for [`ScopeKind::Namespace`][crate::ScopeKind::Namespace] |
//! | Operation | same order | `undefined` |
//!
//! A scope that is empty or contains whitespace fails the call with
//! [`Error::InvalidScope`][crate::Error::InvalidScope] before the function is invoked. Inside an
//! [`ActionBundle`] the scope is fixed and validated when the bundle is created instead.
//!
//! # Outcome
//!
//! The function's own result is returned unchanged: `Ok` values as they are, errors moved into
//! [`CallError::Delegate`][crate::CallError::Delegate]. Failures are labelled through
//! [`Categorized`][crate::Categorized].

mod bundle;
mod wrapper;

pub use bundle::ActionBundle;
pub use wrapper::Action;
