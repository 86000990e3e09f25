// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Meta;

/// Context attached to a request by upstream handlers.
///
/// Operations read the `segment` tag and the meta to forward from here. Nothing in this crate
/// originates this context apart from [`RequestMetaExt`] and [`AddMeta`][super::AddMeta].
pub trait RequestContext {
    /// General request meta, e.g. a transaction id.
    fn meta(&self) -> Option<&Meta> {
        None
    }

    /// Meta addressed to metrics only. Its `segment` wins over the one in [`meta`][Self::meta].
    fn metrics(&self) -> Option<&Meta> {
        None
    }
}

impl RequestContext for () {}

impl<T: RequestContext + ?Sized> RequestContext for &T {
    fn meta(&self) -> Option<&Meta> {
        (**self).meta()
    }

    fn metrics(&self) -> Option<&Meta> {
        (**self).metrics()
    }
}

impl<T: RequestContext> RequestContext for Option<T> {
    fn meta(&self) -> Option<&Meta> {
        self.as_ref().and_then(RequestContext::meta)
    }

    fn metrics(&self) -> Option<&Meta> {
        self.as_ref().and_then(RequestContext::metrics)
    }
}

/// Request extension holding meta addressed to metrics only.
///
/// [`Meta`] itself is stored as a separate extension; see [`RequestMetaExt`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsMeta(pub Meta);

impl<B> RequestContext for http::Request<B> {
    fn meta(&self) -> Option<&Meta> {
        self.extensions().get::<Meta>()
    }

    fn metrics(&self) -> Option<&Meta> {
        self.extensions().get::<MetricsMeta>().map(|metrics| &metrics.0)
    }
}

/// Attaches [`Meta`] to a request for downstream operations to read.
///
/// ```rust
/// use autometer::Meta;
/// use autometer::operation::{RequestContext, RequestMetaExt};
///
/// let mut request = http::Request::new(());
/// request.add_meta(&Meta::new().field("transaction_id", "xxxx"));
/// request.add_metrics_meta(&Meta::new().segment("premium"));
///
/// assert_eq!(request.meta().and_then(|meta| meta.get_field("transaction_id")), Some("xxxx"));
/// assert_eq!(request.metrics().and_then(Meta::get_segment), Some("premium"));
/// ```
pub trait RequestMetaExt {
    /// Merges `meta` into the request's general meta.
    fn add_meta(&mut self, meta: &Meta);

    /// Merges `meta` into the request's metrics-only meta.
    fn add_metrics_meta(&mut self, meta: &Meta);
}

impl<B> RequestMetaExt for http::Request<B> {
    fn add_meta(&mut self, meta: &Meta) {
        let extensions = self.extensions_mut();
        match extensions.get_mut::<Meta>() {
            Some(existing) => existing.merge(meta),
            None => {
                extensions.insert(meta.clone());
            }
        }
    }

    fn add_metrics_meta(&mut self, meta: &Meta) {
        let extensions = self.extensions_mut();
        match extensions.get_mut::<MetricsMeta>() {
            Some(existing) => existing.0.merge(meta),
            None => {
                extensions.insert(MetricsMeta(meta.clone()));
            }
        }
    }
}

/// Whether a response has already been sent to the client.
pub trait ResponseState {
    /// Returns `true` once the response has been sent.
    fn is_sent(&self) -> bool;
}

impl ResponseState for () {
    fn is_sent(&self) -> bool {
        false
    }
}

impl<T: ResponseState + ?Sized> ResponseState for &T {
    fn is_sent(&self) -> bool {
        (**self).is_sent()
    }
}

/// A shared slot an operation writes its `http::Response` into.
///
/// Clones share the slot, so the handler can keep one clone while the operation owns another.
///
/// ```rust
/// use autometer::operation::{Reply, ResponseState};
///
/// let reply = Reply::new();
/// let handle = reply.clone();
/// handle.send(http::Response::new("hello"));
///
/// assert!(reply.is_sent());
/// assert_eq!(reply.take().map(http::Response::into_body), Some("hello"));
/// ```
pub struct Reply<B> {
    slot: Arc<Mutex<Option<http::Response<B>>>>,
}

impl<B> Reply<B> {
    /// Creates an empty reply.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Stores `response`, replacing any previously sent one.
    pub fn send(&self, response: http::Response<B>) {
        *self.slot.lock() = Some(response);
    }

    /// Removes and returns the sent response.
    #[must_use]
    pub fn take(&self) -> Option<http::Response<B>> {
        self.slot.lock().take()
    }

    /// Returns the status of the sent response.
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        self.slot.lock().as_ref().map(http::Response::status)
    }
}

impl<B> ResponseState for Reply<B> {
    fn is_sent(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<B> Clone for Reply<B> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<B> Default for Reply<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Debug for Reply<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply").field("status", &self.status()).finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_has_no_context() {
        let request = http::Request::new(());

        assert!(request.meta().is_none());
        assert!(request.metrics().is_none());
        assert!(().meta().is_none());
        assert!(None::<http::Request<()>>.meta().is_none());
    }

    #[test]
    fn add_meta_merges() {
        let mut request = http::Request::new(());
        request.add_meta(&Meta::new().segment("a").field("transaction_id", "xxxx"));
        request.add_meta(&Meta::new().segment("b"));

        let meta = request.meta().unwrap();
        assert_eq!(meta.get_segment(), Some("b"));
        assert_eq!(meta.get_field("transaction_id"), Some("xxxx"));
        assert!(request.metrics().is_none());
    }

    #[test]
    fn add_metrics_meta_is_separate() {
        let mut request = http::Request::new(());
        request.add_metrics_meta(&Meta::new().segment("m1"));
        request.add_metrics_meta(&Meta::new().field("k", "v"));

        let metrics = (&request).metrics().unwrap();
        assert_eq!(metrics.get_segment(), Some("m1"));
        assert_eq!(metrics.get_field("k"), Some("v"));
        assert!(request.meta().is_none());
    }

    #[test]
    fn reply_tracks_state() {
        let reply = Reply::<&str>::new();
        assert!(!reply.is_sent());
        assert!(reply.status().is_none());

        let mut response = http::Response::new("gone");
        *response.status_mut() = http::StatusCode::GONE;
        reply.clone().send(response);

        assert!((&reply).is_sent());
        assert_eq!(reply.status(), Some(http::StatusCode::GONE));
        assert_eq!(format!("{reply:?}"), "Reply { status: Some(410) }");
        assert!(reply.take().is_some());
        assert!(!reply.is_sent());
    }

    #[test]
    fn static_assertions() {
        static_assertions::assert_impl_all!(Reply<String>: Send, Sync, Clone);
        static_assertions::assert_impl_all!(MetricsMeta: Send, Sync, Clone);
    }
}
