// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Debug;

use layered::Service;

use super::{Middleware, RequestContext};
use crate::event::OperationEvent;
use crate::naming::function_name;
use crate::unwind::{guard, guard_async};
use crate::{CallError, Categorized, Error, Meta, MeterContext};

/// Wraps a request handler so that every call emits operation lifecycle counters.
///
/// The handler takes the call's [`Meta`], the request and the response, and returns either a
/// `Result<T, E>` (invoke it with [`call`][Self::call]) or a future of one (invoke it with
/// [`call_async`][Self::call_async], or through [`Service::execute`]).
///
/// The operation's name is its counter key root and is also handed to the handler as
/// `meta.operation`, so that actions called from the handler are counted under it.
///
/// ```rust
/// use std::sync::Arc;
///
/// use autometer::operation::RequestMetaExt;
/// use autometer::{Meta, MeterContext, Operation, RecordingClient, Registry};
///
/// fn checkout(meta: Meta, _request: http::Request<()>, _response: ()) -> Result<String, String> {
///     Ok(meta.get_operation().unwrap_or_default().to_string())
/// }
///
/// let client = Arc::new(RecordingClient::new());
/// let registry = Registry::new();
/// registry.init(Some(client.clone()));
///
/// let operation = Operation::from_fn(checkout).context(&MeterContext::new(&registry));
///
/// let mut request = http::Request::new(());
/// request.add_meta(&Meta::new().segment("premium"));
///
/// assert_eq!(operation.call(Meta::new(), request, ()).unwrap(), "checkout");
/// assert_eq!(
///     client.keys(),
///     [
///         "operation.checkout.segment.premium.state.start",
///         "operation.checkout.segment.premium.state.success",
///     ]
/// );
/// ```
pub struct Operation<F> {
    name: Cow<'static, str>,
    function: F,
    context: MeterContext,
}

impl<F> Operation<F> {
    /// Wraps `function` under `name`, reporting to the [global registry](crate::Registry::global).
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, function: F) -> Self {
        Self {
            name: name.into(),
            function,
            context: MeterContext::global(),
        }
    }

    /// Wraps `function`, naming the operation after the function item.
    ///
    /// Closures have no name and are reported as `anonymous`; prefer [`new`][Self::new] for them.
    #[must_use]
    pub fn from_fn(function: F) -> Self {
        Self::new(function_name::<F>(), function)
    }

    /// Reports through `context` instead of the global registry.
    #[must_use]
    pub fn context(self, context: &MeterContext) -> Self {
        Self {
            context: context.clone(),
            ..self
        }
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the operation name.
    pub fn set_name(&mut self, name: impl Into<Cow<'static, str>>) {
        self.name = name.into();
    }

    /// Returns the operation with a different name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.set_name(name);
        self
    }

    /// Adapts the operation to a request-first middleware.
    #[must_use]
    pub fn into_middleware(self) -> Middleware<F> {
        Middleware::new(self)
    }

    /// Invokes a synchronous handler.
    ///
    /// A panic in the handler is counted as a failure in the
    /// [`PANIC`](crate::event::PANIC_CATEGORY) category and then resumed.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Metrics`] without invoking the handler when no client is registered,
    /// and [`CallError::Delegate`] with the handler's own error when it fails.
    pub fn call<Req, Res, T, E>(&self, meta: Meta, request: Req, response: Res) -> Result<T, CallError<E>>
    where
        F: Fn(Meta, Req, Res) -> Result<T, E>,
        Req: RequestContext,
        E: Categorized,
    {
        let (event, meta) = self.prepare(&meta, &request)?;
        event.start();

        let result = guard(|| (self.function)(meta, request, response), || event.panicked());
        settle(&event, result)
    }

    /// Invokes an asynchronous handler.
    ///
    /// Same as [`call`][Self::call], except that `success` or `failure` is emitted once the
    /// returned future resolves. Dropping the future before then emits no settle counter.
    ///
    /// # Errors
    ///
    /// Same as [`call`][Self::call].
    pub async fn call_async<Req, Res, T, E, Fut>(&self, meta: Meta, request: Req, response: Res) -> Result<T, CallError<E>>
    where
        F: Fn(Meta, Req, Res) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Req: RequestContext,
        E: Categorized,
    {
        let (event, meta) = self.prepare(&meta, &request)?;
        event.start();

        let future = guard(|| (self.function)(meta, request, response), || event.panicked());
        let result = guard_async(future, || event.panicked()).await;
        settle(&event, result)
    }

    fn prepare(&self, meta: &Meta, request: &impl RequestContext) -> Result<(OperationEvent, Meta), Error> {
        let upstream = request.meta();
        let segment = request
            .metrics()
            .and_then(Meta::get_segment)
            .or_else(|| upstream.and_then(Meta::get_segment))
            .or_else(|| meta.get_segment());

        let event = OperationEvent::build(&self.context, &self.name, segment)?;

        // Upstream meta wins over the passed meta; the operation's own name wins over both.
        let mut enriched = meta.clone();
        if let Some(upstream) = upstream {
            enriched.merge(upstream);
        }

        Ok((event, enriched.operation(&*self.name)))
    }
}

fn settle<T, E: Categorized>(event: &OperationEvent, result: Result<T, E>) -> Result<T, CallError<E>> {
    match result {
        Ok(value) => {
            event.success();
            Ok(value)
        }
        Err(error) => {
            event.failure(&error);
            Err(CallError::Delegate(error))
        }
    }
}

impl<F, Req, Res, T, E, Fut> Service<(Meta, Req, Res)> for Operation<F>
where
    F: Fn(Meta, Req, Res) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    Req: RequestContext + Send,
    Res: Send,
    T: Send,
    E: Categorized + Send,
{
    type Out = Result<T, CallError<E>>;

    async fn execute(&self, (meta, request, response): (Meta, Req, Res)) -> Self::Out {
        self.call_async(meta, request, response).await
    }
}

impl<F: Clone> Clone for Operation<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            function: self.function.clone(),
            context: self.context.clone(),
        }
    }
}

impl<F> Debug for Operation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
