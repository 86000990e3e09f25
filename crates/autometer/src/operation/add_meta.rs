// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use layered::{Layer, Service};

use super::RequestMetaExt;
use crate::Meta;

/// Middleware that attaches [`Meta`] to every request before passing it on.
///
/// Place it in front of the operations that should see the meta, e.g. to tag requests with a
/// `segment` for operation counters.
///
/// ```rust
/// use autometer::operation::{AddMeta, RequestContext};
/// use autometer::Meta;
/// use layered::{Execute, Layer, Service};
///
/// # futures::executor::block_on(async {
/// let service = AddMeta::metrics_layer(Meta::new().segment("premium")).layer(Execute::new(
///     |request: http::Request<()>| async move { request.metrics().and_then(Meta::get_segment).map(str::to_owned) },
/// ));
///
/// let segment = service.execute(http::Request::new(())).await;
/// assert_eq!(segment.as_deref(), Some("premium"));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct AddMeta<S> {
    inner: S,
    meta: Meta,
    target: Target,
}

/// Builds [`AddMeta`] middleware.
#[derive(Debug, Clone)]
pub struct AddMetaLayer {
    meta: Meta,
    target: Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Meta,
    Metrics,
}

impl AddMeta<()> {
    /// Creates a layer merging `meta` into each request's general meta.
    #[must_use]
    pub fn layer(meta: Meta) -> AddMetaLayer {
        AddMetaLayer { meta, target: Target::Meta }
    }

    /// Creates a layer merging `meta` into each request's metrics-only meta.
    #[must_use]
    pub fn metrics_layer(meta: Meta) -> AddMetaLayer {
        AddMetaLayer {
            meta,
            target: Target::Metrics,
        }
    }
}

impl<S> Layer<S> for AddMetaLayer {
    type Service = AddMeta<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AddMeta {
            inner,
            meta: self.meta.clone(),
            target: self.target,
        }
    }
}

impl<S, B> Service<http::Request<B>> for AddMeta<S>
where
    S: Service<http::Request<B>>,
    B: Send,
{
    type Out = S::Out;

    async fn execute(&self, mut request: http::Request<B>) -> Self::Out {
        match self.target {
            Target::Meta => request.add_meta(&self.meta),
            Target::Metrics => request.add_metrics_meta(&self.meta),
        }

        self.inner.execute(request).await
    }
}
