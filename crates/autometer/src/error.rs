// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use thiserror::Error;

use crate::Categorized;

/// A precondition required to emit counters was not met.
///
/// Both variants are raised before the wrapped function runs, so a call that fails with this
/// error has not executed any business logic.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// No metrics client is registered in the registry the wrapper reads from.
    ///
    /// Register one with [`Registry::init`][crate::Registry::init] or
    /// [`init_metrics`][crate::init_metrics] before invoking wrapped functions.
    #[error("auto metrics instance needs to be initialised first")]
    Uninitialized,

    /// The resolved scope is not a non-empty string free of whitespace.
    ///
    /// `function` names the wrapped function (or the bundle constructor) that rejected it.
    #[error("scope `{scope}` needs to be a non-empty string without spaces, at function {function}")]
    InvalidScope {
        /// The rejected scope value; non-string values are rendered as JSON.
        scope: String,
        /// The function the scope was resolved for.
        function: Cow<'static, str>,
    },
}

/// The outcome of a failed call to a wrapped function.
///
/// Either the wrapper could not emit counters ([`CallError::Metrics`]) and the function was never
/// invoked, or the function itself failed ([`CallError::Delegate`]). The delegate's error value is
/// moved into the variant untouched: it is the exact value the function returned.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// A precondition failed; the wrapped function did not run.
    #[error(transparent)]
    Metrics(#[from] Error),

    /// The wrapped function returned this error. It was counted as a failure.
    #[error("{0}")]
    Delegate(E),
}

impl<E> CallError<E> {
    /// Returns the delegate's error, if the wrapped function produced one.
    #[must_use]
    pub fn delegate(&self) -> Option<&E> {
        match self {
            Self::Delegate(error) => Some(error),
            Self::Metrics(_) => None,
        }
    }

    /// Converts into the delegate's error, if the wrapped function produced one.
    #[must_use]
    pub fn into_delegate(self) -> Option<E> {
        match self {
            Self::Delegate(error) => Some(error),
            Self::Metrics(_) => None,
        }
    }

    /// Returns the precondition error, if the wrapped function never ran.
    #[must_use]
    pub fn metrics(&self) -> Option<&Error> {
        match self {
            Self::Metrics(error) => Some(error),
            Self::Delegate(_) => None,
        }
    }
}

// Nested wrappers label a failure the same way the innermost one did.
impl<E: Categorized> Categorized for CallError<E> {
    fn category(&self) -> Option<Cow<'_, str>> {
        self.delegate().and_then(Categorized::category)
    }

    fn status(&self) -> Option<Cow<'_, str>> {
        self.delegate().and_then(Categorized::status)
    }

    fn kind(&self) -> Option<Cow<'_, str>> {
        self.delegate().and_then(Categorized::kind)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fault;

    #[test]
    fn uninitialized_message() {
        assert_eq!(Error::Uninitialized.to_string(), "auto metrics instance needs to be initialised first");
    }

    #[test]
    fn invalid_scope_message_names_function() {
        let error = Error::InvalidScope {
            scope: "foo bar".to_string(),
            function: "get_user".into(),
        };

        let message = error.to_string();
        assert!(message.contains("`foo bar`"));
        assert!(message.ends_with("at function get_user"));
    }

    #[test]
    fn delegate_accessors() {
        let error: CallError<String> = CallError::Delegate("boom".to_string());

        assert_eq!(error.to_string(), "boom");
        assert_eq!(error.delegate().map(String::as_str), Some("boom"));
        assert!(error.metrics().is_none());
        assert_eq!(error.into_delegate().as_deref(), Some("boom"));
    }

    #[test]
    fn metrics_accessors() {
        let error: CallError<String> = Error::Uninitialized.into();

        assert_eq!(error.metrics(), Some(&Error::Uninitialized));
        assert!(error.delegate().is_none());
        assert!(error.into_delegate().is_none());
    }

    #[test]
    fn categorized_forwards_to_delegate() {
        let error = CallError::Delegate(Fault::new().with_category("FETCH").with_status(404).with_kind("NOT_FOUND"));

        assert_eq!(error.category().as_deref(), Some("FETCH"));
        assert_eq!(error.status().as_deref(), Some("404"));
        assert_eq!(error.kind().as_deref(), Some("NOT_FOUND"));

        let error: CallError<Fault> = Error::Uninitialized.into();
        assert!(error.category().is_none());
    }

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(Error: std::error::Error, Send, Sync, Clone);
        static_assertions::assert_impl_all!(CallError<Fault>: std::error::Error, Send, Sync);
    }
}
