// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::fmt::Debug;

use layered::Service;

use super::{Operation, RequestContext, ResponseState};
use crate::{CallError, Categorized, Meta};

/// What the request pipeline should do after a [`Middleware`] ran.
#[derive(Debug)]
#[must_use]
pub enum Flow<E> {
    /// The operation succeeded without sending a response; continue with the next handler.
    Next,
    /// The operation failed without sending a response; hand the error to the error handler.
    Fail(CallError<E>),
    /// The operation already sent a response; the pipeline is done.
    Sent,
}

impl<E> Flow<E> {
    /// Returns `true` for [`Flow::Next`].
    #[must_use]
    pub fn is_next(&self) -> bool {
        matches!(self, Self::Next)
    }

    /// Returns `true` for [`Flow::Sent`].
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    /// Returns the error carried by [`Flow::Fail`].
    #[must_use]
    pub fn into_error(self) -> Option<CallError<E>> {
        match self {
            Self::Fail(error) => Some(error),
            Self::Next | Self::Sent => None,
        }
    }

    fn after<T>(result: Result<T, CallError<E>>, response: &impl ResponseState) -> Self {
        match result {
            _ if response.is_sent() => Self::Sent,
            Ok(_) => Self::Next,
            Err(error) => Self::Fail(error),
        }
    }
}

/// An [`Operation`] adapted to a request-first handler.
///
/// The middleware calls the operation with an empty [`Meta`]; everything the handler needs comes
/// from the request. The operation's return value is discarded; whether the pipeline continues is
/// reported as a [`Flow`].
///
/// ```rust
/// use std::sync::Arc;
///
/// use autometer::operation::{Reply, ResponseState};
/// use autometer::{Meta, MeterContext, Operation, RecordingClient, Registry};
///
/// fn render(_meta: Meta, _request: http::Request<()>, reply: Reply<&'static str>) -> Result<(), String> {
///     reply.send(http::Response::new("hello"));
///     Ok(())
/// }
///
/// let registry = Registry::new();
/// registry.init(Some(Arc::new(RecordingClient::new())));
///
/// let middleware = Operation::from_fn(render).context(&MeterContext::new(&registry)).into_middleware();
/// let reply = Reply::new();
///
/// assert!(middleware.handle(http::Request::new(()), reply.clone()).is_sent());
/// assert!(reply.is_sent());
/// ```
pub struct Middleware<F> {
    operation: Operation<F>,
}

impl<F> Middleware<F> {
    /// Adapts `operation`.
    #[must_use]
    pub fn new(operation: Operation<F>) -> Self {
        Self { operation }
    }

    /// Returns the adapted operation.
    #[must_use]
    pub fn operation(&self) -> &Operation<F> {
        &self.operation
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.operation.name()
    }

    /// Runs a synchronous operation.
    ///
    /// `response` is cloned before the call so that its state can be inspected afterwards; use a
    /// shared handle such as [`Reply`][super::Reply].
    pub fn handle<Req, Res, T, E>(&self, request: Req, response: Res) -> Flow<E>
    where
        F: Fn(Meta, Req, Res) -> Result<T, E>,
        Req: RequestContext,
        Res: ResponseState + Clone,
        E: Categorized,
    {
        let result = self.operation.call(Meta::new(), request, response.clone());
        Flow::after(result, &response)
    }

    /// Runs an asynchronous operation.
    ///
    /// See [`handle`][Self::handle].
    pub async fn handle_async<Req, Res, T, E, Fut>(&self, request: Req, response: Res) -> Flow<E>
    where
        F: Fn(Meta, Req, Res) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Req: RequestContext,
        Res: ResponseState + Clone,
        E: Categorized,
    {
        let result = self.operation.call_async(Meta::new(), request, response.clone()).await;
        Flow::after(result, &response)
    }
}

impl<F, Req, Res, T, E, Fut> Service<(Req, Res)> for Middleware<F>
where
    F: Fn(Meta, Req, Res) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    Req: RequestContext + Send,
    Res: ResponseState + Clone + Send,
    T: Send,
    E: Categorized + Send,
{
    type Out = Flow<E>;

    async fn execute(&self, (request, response): (Req, Res)) -> Self::Out {
        self.handle_async(request, response).await
    }
}

impl<F: Clone> Clone for Middleware<F> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
        }
    }
}

impl<F> Debug for Middleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware").field("operation", &self.operation).finish()
    }
}

impl<F> From<Operation<F>> for Middleware<F> {
    fn from(operation: Operation<F>) -> Self {
        Self::new(operation)
    }
}

/// Adapts every operation in `operations`, keeping the keys.
pub fn to_middlewares<K, F, I>(operations: I) -> BTreeMap<String, Middleware<F>>
where
    I: IntoIterator<Item = (K, Operation<F>)>,
    K: Into<String>,
{
    operations
        .into_iter()
        .map(|(key, operation)| (key.into(), operation.into_middleware()))
        .collect()
}
