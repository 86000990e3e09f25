// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lifecycle counters and the keys they are emitted under.
//!
//! Wrappers use these handles internally; they are public for code that wants to report the
//! lifecycle of a unit of work by hand, using the same key scheme.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use autometer::event::ActionEvent;
//! use autometer::{Fault, MeterContext, RecordingClient, Registry, Scope};
//!
//! let client = Arc::new(RecordingClient::new());
//! let registry = Registry::new();
//! registry.init(Some(client.clone()));
//!
//! let scope = Scope::new("user_service", "get_user")?;
//! let event = ActionEvent::begin(&MeterContext::new(&registry), &scope, Some("show_profile"), "get_user")?;
//! event.failure(&Fault::new().with_category("FETCH").with_status(404).with_kind("NOT_FOUND"));
//!
//! assert_eq!(
//!     client.keys(),
//!     [
//!         "service.user_service.action.get_user.state.start",
//!         "operation.show_profile.action.get_user.state.start",
//!         "service.user_service.action.get_user.state.failure.category.FETCH.status.404",
//!         "operation.show_profile.action.get_user.state.failure.category.FETCH.status.404",
//!         "service.user_service.action.get_user.state.failure.category.FETCH.type.NOT_FOUND",
//!         "operation.show_profile.action.get_user.state.failure.category.FETCH.type.NOT_FOUND",
//!     ]
//! );
//! # Ok::<(), autometer::Error>(())
//! ```

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

use crate::{Categorized, Error, Fault, MeterContext, MetricsClient, Scope, UNDEFINED};

const STATE_START: &str = "state.start";
const STATE_SUCCESS: &str = "state.success";

/// Category a panicking wrapped function is counted under.
pub const PANIC_CATEGORY: &str = "PANIC";

fn panic_fault() -> Fault {
    Fault::new().with_category(PANIC_CATEGORY)
}

fn label(value: Option<Cow<'_, str>>) -> Cow<'_, str> {
    value.unwrap_or(Cow::Borrowed(UNDEFINED))
}

fn failure_status_suffix(error: &(impl Categorized + ?Sized)) -> String {
    format!(
        "state.failure.category.{}.status.{}",
        label(error.category()),
        label(error.status())
    )
}

fn failure_type_suffix(error: &(impl Categorized + ?Sized)) -> String {
    format!("state.failure.category.{}.type.{}", label(error.category()), label(error.kind()))
}

/// Counters for one invocation of an action.
///
/// Every state is counted twice: under the scope root `<kind>.<scope>.action.<action>` and under
/// the operation root `operation.<operation>.action.<action>`.
pub struct ActionEvent {
    client: Arc<dyn MetricsClient>,
    scope_root: String,
    operation_root: String,
    #[cfg(any(feature = "logs", test))]
    log: Option<ActionLog>,
}

#[cfg(any(feature = "logs", test))]
struct ActionLog {
    scope: String,
    operation: String,
    action: String,
}

impl ActionEvent {
    /// Prepares the counters for one invocation. Nothing is emitted yet.
    ///
    /// A missing `operation` is rendered as `undefined`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Uninitialized`] when the context's registry holds no client.
    pub fn build(context: &MeterContext, scope: &Scope, operation: Option<&str>, action: &str) -> Result<Self, Error> {
        let client = context.registry().get().ok_or(Error::Uninitialized)?;
        let operation = operation.unwrap_or(UNDEFINED);

        Ok(Self {
            client,
            scope_root: format!("{}.{scope}.action.{action}", context.get_scope_kind()),
            operation_root: format!("operation.{operation}.action.{action}"),
            #[cfg(any(feature = "logs", test))]
            log: context.logs_enabled().then(|| ActionLog {
                scope: scope.to_string(),
                operation: operation.to_owned(),
                action: action.to_owned(),
            }),
        })
    }

    /// Like [`build`][Self::build], and emits `start` right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Uninitialized`] when the context's registry holds no client.
    pub fn begin(context: &MeterContext, scope: &Scope, operation: Option<&str>, action: &str) -> Result<Self, Error> {
        let event = Self::build(context, scope, operation, action)?;
        event.start();
        Ok(event)
    }

    /// Emits `state.start` under both roots.
    pub fn start(&self) {
        self.count_both(STATE_START);
        self.log_transition(STATE_START);
    }

    /// Emits `state.success` under both roots.
    pub fn success(&self) {
        self.count_both(STATE_SUCCESS);
        self.log_transition(STATE_SUCCESS);
    }

    /// Emits the failure-by-status and failure-by-type counters under both roots.
    pub fn failure(&self, error: &(impl Categorized + ?Sized)) {
        let by_status = failure_status_suffix(error);
        let by_type = failure_type_suffix(error);

        self.count_both(&by_status);
        self.count_both(&by_type);

        #[cfg(any(feature = "logs", test))]
        if let Some(log) = &self.log {
            tracing::event!(
                name: "autometer.action",
                tracing::Level::WARN,
                scope = %log.scope,
                operation = %log.operation,
                action = %log.action,
                state = "failure",
                failure.category = %label(error.category()),
                failure.status = %label(error.status()),
                failure.kind = %label(error.kind()),
            );
        }
    }

    /// Emits the failure counters for a wrapped function that panicked.
    pub(crate) fn panicked(&self) {
        self.failure(&panic_fault());
    }

    /// Returns the scope-rooted key prefix.
    #[must_use]
    pub fn scope_root(&self) -> &str {
        &self.scope_root
    }

    /// Returns the operation-rooted key prefix.
    #[must_use]
    pub fn operation_root(&self) -> &str {
        &self.operation_root
    }

    fn count_both(&self, suffix: &str) {
        self.client.count(&format!("{}.{suffix}", self.scope_root), 1);
        self.client.count(&format!("{}.{suffix}", self.operation_root), 1);
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused when logs are compiled out"))]
    fn log_transition(&self, state: &'static str) {
        #[cfg(any(feature = "logs", test))]
        if let Some(log) = &self.log {
            tracing::event!(
                name: "autometer.action",
                tracing::Level::DEBUG,
                scope = %log.scope,
                operation = %log.operation,
                action = %log.action,
                state,
            );
        }
    }
}

impl Debug for ActionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionEvent")
            .field("scope_root", &self.scope_root)
            .field("operation_root", &self.operation_root)
            .finish_non_exhaustive()
    }
}

/// Counters for one invocation of an operation, rooted at `operation.<operation>.segment.<segment>`.
pub struct OperationEvent {
    client: Arc<dyn MetricsClient>,
    root: String,
    logs_enabled: bool,
}

impl OperationEvent {
    /// Prepares the counters for one invocation. Nothing is emitted yet.
    ///
    /// A missing `segment` is rendered as `undefined`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Uninitialized`] when the context's registry holds no client.
    pub fn build(context: &MeterContext, operation: &str, segment: Option<&str>) -> Result<Self, Error> {
        let client = context.registry().get().ok_or(Error::Uninitialized)?;
        let segment = segment.unwrap_or(UNDEFINED);

        Ok(Self {
            client,
            root: format!("operation.{operation}.segment.{segment}"),
            logs_enabled: context.logs_enabled(),
        })
    }

    /// Emits `state.start`.
    pub fn start(&self) {
        self.count(STATE_START);
        self.log_transition(STATE_START);
    }

    /// Emits `state.success`.
    pub fn success(&self) {
        self.count(STATE_SUCCESS);
        self.log_transition(STATE_SUCCESS);
    }

    /// Emits the failure-by-type counter.
    pub fn failure(&self, error: &(impl Categorized + ?Sized)) {
        self.count(&failure_type_suffix(error));

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "autometer.operation",
                tracing::Level::WARN,
                root = %self.root,
                state = "failure",
                failure.category = %label(error.category()),
                failure.kind = %label(error.kind()),
            );
        }
    }

    /// Emits the failure counter for a handler that panicked.
    pub(crate) fn panicked(&self) {
        self.failure(&panic_fault());
    }

    /// Returns the key prefix.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    fn count(&self, suffix: &str) {
        self.client.count(&format!("{}.{suffix}", self.root), 1);
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused when logs are compiled out"))]
    fn log_transition(&self, state: &'static str) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "autometer.operation",
                tracing::Level::DEBUG,
                root = %self.root,
                state,
            );
        }
    }
}

impl Debug for OperationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationEvent")
            .field("root", &self.root)
            .field("logs_enabled", &self.logs_enabled)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use tracing_subscriber::util::SubscriberInitExt;

    use super::*;
    use crate::testing::LogCapture;
    use crate::{Fault, RecordingClient, Registry, ScopeKind};

    fn setup() -> (Arc<RecordingClient>, MeterContext) {
        let client = Arc::new(RecordingClient::new());
        let registry = Registry::new();
        registry.init(Some(client.clone()));
        (client, MeterContext::new(&registry))
    }

    fn scope(name: &'static str) -> Scope {
        Scope::new(name, "test").unwrap()
    }

    #[test]
    fn build_requires_client() {
        let context = MeterContext::new(&Registry::new());

        assert_eq!(
            ActionEvent::build(&context, &scope("svc"), None, "act").unwrap_err(),
            Error::Uninitialized
        );
        assert_eq!(OperationEvent::build(&context, "op", None).unwrap_err(), Error::Uninitialized);
    }

    #[test]
    fn build_emits_nothing() {
        let (client, context) = setup();

        let _event = ActionEvent::build(&context, &scope("svc"), Some("op"), "act").unwrap();
        let _event = OperationEvent::build(&context, "op", None).unwrap();

        assert!(client.calls().is_empty());
    }

    #[test]
    fn action_start_and_success() {
        let (client, context) = setup();

        let event = ActionEvent::begin(&context, &scope("svc"), Some("op"), "act").unwrap();
        event.success();

        assert_eq!(
            client.calls(),
            [
                ("service.svc.action.act.state.start".to_string(), 1),
                ("operation.op.action.act.state.start".to_string(), 1),
                ("service.svc.action.act.state.success".to_string(), 1),
                ("operation.op.action.act.state.success".to_string(), 1),
            ]
        );
    }

    #[test]
    fn action_missing_labels_render_undefined() {
        let (client, context) = setup();

        let event = ActionEvent::build(&context, &scope("svc"), None, "act").unwrap();
        event.failure(&Fault::new());

        assert_eq!(
            client.keys(),
            [
                "service.svc.action.act.state.failure.category.undefined.status.undefined",
                "operation.undefined.action.act.state.failure.category.undefined.status.undefined",
                "service.svc.action.act.state.failure.category.undefined.type.undefined",
                "operation.undefined.action.act.state.failure.category.undefined.type.undefined",
            ]
        );
    }

    #[test]
    fn namespace_kind_changes_root() {
        let (client, context) = setup();
        let context = context.scope_kind(ScopeKind::Namespace);

        let event = ActionEvent::build(&context, &scope("ns"), Some("op"), "act").unwrap();
        event.start();

        assert_eq!(event.scope_root(), "namespace.ns.action.act");
        assert_eq!(event.operation_root(), "operation.op.action.act");
        assert_eq!(client.keys()[0], "namespace.ns.action.act.state.start");
    }

    #[test]
    fn operation_keys() {
        let (client, context) = setup();

        let event = OperationEvent::build(&context, "checkout", Some("premium")).unwrap();
        event.start();
        event.failure(&Fault::new().with_category("X").with_status(500).with_kind("Y"));

        assert_eq!(event.root(), "operation.checkout.segment.premium");
        assert_eq!(
            client.keys(),
            [
                "operation.checkout.segment.premium.state.start",
                "operation.checkout.segment.premium.state.failure.category.X.type.Y",
            ]
        );
    }

    #[test]
    fn panicked_counts_a_panic_failure() {
        let (client, context) = setup();

        ActionEvent::build(&context, &scope("svc"), Some("op"), "act").unwrap().panicked();
        OperationEvent::build(&context, "checkout", None).unwrap().panicked();

        assert_eq!(
            client.keys(),
            [
                "service.svc.action.act.state.failure.category.PANIC.status.undefined",
                "operation.op.action.act.state.failure.category.PANIC.status.undefined",
                "service.svc.action.act.state.failure.category.PANIC.type.undefined",
                "operation.op.action.act.state.failure.category.PANIC.type.undefined",
                "operation.checkout.segment.undefined.state.failure.category.PANIC.type.undefined",
            ]
        );
    }

    #[test]
    fn operation_missing_segment_renders_undefined() {
        let (client, context) = setup();

        OperationEvent::build(&context, "checkout", None).unwrap().success();

        assert_eq!(client.keys(), ["operation.checkout.segment.undefined.state.success"]);
    }

    #[test]
    fn logs_when_enabled() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();
        let (_client, context) = setup();
        let context = context.use_logs();

        let event = ActionEvent::begin(&context, &scope("svc"), Some("op"), "act").unwrap();
        event.failure(&Fault::new().with_category("X"));
        OperationEvent::build(&context, "checkout", None).unwrap().start();

        log_capture.assert_contains("scope=svc");
        log_capture.assert_contains("action=act");
        log_capture.assert_contains("state=\"state.start\"");
        log_capture.assert_contains("failure.category=X");
        log_capture.assert_contains("WARN");
        log_capture.assert_contains("root=operation.checkout.segment.undefined");
    }

    #[test]
    fn no_logs_by_default() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();
        let (_client, context) = setup();

        ActionEvent::begin(&context, &scope("svc"), Some("op"), "act").unwrap().success();

        assert!(log_capture.output().is_empty());
    }

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(ActionEvent: Send, Sync, Debug);
        static_assertions::assert_impl_all!(OperationEvent: Send, Sync, Debug);
    }
}
