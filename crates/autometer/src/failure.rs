// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Labels that describe why a wrapped function failed.
///
/// Failure counters embed these labels in their keys. Every method defaults to `None`, which is
/// rendered as the literal `undefined`, so an error type only needs to override the labels it
/// actually knows about:
///
/// ```rust
/// use std::borrow::Cow;
///
/// use autometer::Categorized;
///
/// #[derive(Debug)]
/// enum StoreError {
///     NotFound,
///     Timeout,
/// }
///
/// impl Categorized for StoreError {
///     fn category(&self) -> Option<Cow<'_, str>> {
///         Some("STORE".into())
///     }
///
///     fn kind(&self) -> Option<Cow<'_, str>> {
///         Some(match self {
///             Self::NotFound => "NOT_FOUND".into(),
///             Self::Timeout => "TIMEOUT".into(),
///         })
///     }
/// }
///
/// assert_eq!(StoreError::Timeout.kind().as_deref(), Some("TIMEOUT"));
/// assert!(StoreError::NotFound.status().is_none());
/// ```
pub trait Categorized {
    /// The broad failure category, e.g. `FETCH_RESPONSE_ERROR`.
    fn category(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// The status associated with the failure, e.g. an HTTP status code.
    fn status(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// The specific failure type within the category, e.g. `SESSION_NOT_FOUND`.
    fn kind(&self) -> Option<Cow<'_, str>> {
        None
    }
}

impl<T: Categorized + ?Sized> Categorized for &T {
    fn category(&self) -> Option<Cow<'_, str>> {
        (**self).category()
    }

    fn status(&self) -> Option<Cow<'_, str>> {
        (**self).status()
    }

    fn kind(&self) -> Option<Cow<'_, str>> {
        (**self).kind()
    }
}

impl<T: Categorized + ?Sized> Categorized for Box<T> {
    fn category(&self) -> Option<Cow<'_, str>> {
        (**self).category()
    }

    fn status(&self) -> Option<Cow<'_, str>> {
        (**self).status()
    }

    fn kind(&self) -> Option<Cow<'_, str>> {
        (**self).kind()
    }
}

impl<T: Categorized + ?Sized> Categorized for Arc<T> {
    fn category(&self) -> Option<Cow<'_, str>> {
        (**self).category()
    }

    fn status(&self) -> Option<Cow<'_, str>> {
        (**self).status()
    }

    fn kind(&self) -> Option<Cow<'_, str>> {
        (**self).kind()
    }
}

impl Categorized for String {}

impl Categorized for str {}

impl Categorized for () {}

impl Categorized for std::io::Error {}

impl Categorized for http::StatusCode {
    fn status(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(self.as_u16().to_string()))
    }
}

/// A general-purpose error carrying failure labels.
///
/// Useful when a function has no dedicated error type, and in tests.
///
/// ```rust
/// use autometer::{Categorized, Fault};
///
/// let fault = Fault::new()
///     .with_category("FETCH_RESPONSE_ERROR")
///     .with_status(404)
///     .with_kind("SESSION_NOT_FOUND")
///     .with_message("session expired");
///
/// assert_eq!(fault.status().as_deref(), Some("404"));
/// assert_eq!(fault.to_string(), "session expired");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fault {
    category: Option<Cow<'static, str>>,
    status: Option<u16>,
    kind: Option<Cow<'static, str>>,
    message: Option<Cow<'static, str>>,
}

impl Fault {
    /// Creates a fault with no labels and no message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<Cow<'static, str>>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the failure status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the failure type.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<Cow<'static, str>>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => write!(
                f,
                "fault (category: {}, status: {}, type: {})",
                self.category.as_deref().unwrap_or(crate::UNDEFINED),
                self.status.map_or_else(|| crate::UNDEFINED.to_string(), |status| status.to_string()),
                self.kind.as_deref().unwrap_or(crate::UNDEFINED),
            ),
        }
    }
}

impl std::error::Error for Fault {}

impl Categorized for Fault {
    fn category(&self) -> Option<Cow<'_, str>> {
        self.category.as_deref().map(Cow::Borrowed)
    }

    fn status(&self) -> Option<Cow<'_, str>> {
        self.status.map(|status| Cow::Owned(status.to_string()))
    }

    fn kind(&self) -> Option<Cow<'_, str>> {
        self.kind.as_deref().map(Cow::Borrowed)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_defaults_to_no_labels() {
        let fault = Fault::new();

        assert!(Categorized::category(&fault).is_none());
        assert!(Categorized::status(&fault).is_none());
        assert!(Categorized::kind(&fault).is_none());
        assert_eq!(fault.to_string(), "fault (category: undefined, status: undefined, type: undefined)");
    }

    #[test]
    fn fault_labels_are_exposed() {
        let fault = Fault::new().with_category("X").with_status(500).with_kind("Y");

        assert_eq!(Categorized::category(&fault).as_deref(), Some("X"));
        assert_eq!(Categorized::status(&fault).as_deref(), Some("500"));
        assert_eq!(Categorized::kind(&fault).as_deref(), Some("Y"));
    }

    #[test]
    fn smart_pointers_forward() {
        let fault = Fault::new().with_category("X");

        assert_eq!(Categorized::category(&Box::new(fault.clone())).as_deref(), Some("X"));
        assert_eq!(Categorized::category(&Arc::new(fault.clone())).as_deref(), Some("X"));
        assert_eq!(Categorized::category(&&fault).as_deref(), Some("X"));
    }

    #[test]
    fn plain_errors_have_no_labels() {
        assert!("boom".to_string().category().is_none());
        assert!(Categorized::kind(&std::io::Error::other("boom")).is_none());
    }

    #[test]
    fn status_code_reports_status() {
        assert_eq!(http::StatusCode::NOT_FOUND.status().as_deref(), Some("404"));
        assert!(http::StatusCode::NOT_FOUND.category().is_none());
    }
}
