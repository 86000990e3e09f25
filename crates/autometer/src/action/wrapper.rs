// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Debug;

use layered::Service;

use crate::event::ActionEvent;
use crate::naming::function_name;
use crate::unwind::{guard, guard_async};
use crate::{CallError, Categorized, Error, MeterContext, NameSource, NameSources, Scope};

/// Wraps a business function so that every call emits action lifecycle counters.
///
/// The wrapped function takes its params and an optional meta, and returns either a
/// `Result<T, E>` (invoke it with [`call`][Self::call]) or a future of one (invoke it with
/// [`call_async`][Self::call_async], or through [`Service::execute`]).
///
/// The action's name is captured when it is created: explicitly with [`new`][Self::new], from
/// the function item's path with [`from_fn`][Self::from_fn], or from the identifier with the
/// [`action!`][crate::action!] macro. It can be changed afterwards.
///
/// ```rust
/// use std::sync::Arc;
///
/// use autometer::{Action, Meta, MeterContext, RecordingClient, Registry};
///
/// fn add_to_cart(item: u32, _meta: Option<Meta>) -> Result<u32, String> {
///     Ok(item)
/// }
///
/// let client = Arc::new(RecordingClient::new());
/// let registry = Registry::new();
/// registry.init(Some(client.clone()));
///
/// let action = Action::from_fn(add_to_cart).context(&MeterContext::new(&registry));
/// assert_eq!(action.name(), "add_to_cart");
///
/// action.call(3, Some(Meta::new().scope("cart").operation("checkout"))).unwrap();
/// assert_eq!(client.keys()[0], "service.cart.action.add_to_cart.state.start");
/// ```
pub struct Action<F> {
    name: Cow<'static, str>,
    function: F,
    scope: Option<Scope>,
    context: MeterContext,
}

impl<F> Action<F> {
    /// Wraps `function` under `name`, reporting to the [global registry](crate::Registry::global).
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, function: F) -> Self {
        Self {
            name: name.into(),
            function,
            scope: None,
            context: MeterContext::global(),
        }
    }

    /// Wraps `function`, naming the action after the function item.
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

    /// Returns the action name used in counter keys.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the action name used in counter keys.
    pub fn set_name(&mut self, name: impl Into<Cow<'static, str>>) {
        self.name = name.into();
    }

    /// Returns the action with a different name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.set_name(name);
        self
    }

    /// Returns the fixed scope, when the action belongs to a bundle.
    #[must_use]
    pub fn fixed_scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Returns the wrapped function.
    #[must_use]
    pub fn inner(&self) -> &F {
        &self.function
    }

    pub(crate) fn with_scope(self, scope: Scope) -> Self {
        Self {
            scope: Some(scope),
            ..self
        }
    }

    /// Invokes a synchronous function.
    ///
    /// Emits `start`, calls the function with `params` and `meta` exactly as given, then emits
    /// `success` or `failure` depending on its result. A panic in the function is counted as a
    /// failure in the [`PANIC`](crate::event::PANIC_CATEGORY) category and then resumed.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Metrics`] without invoking the function when the resolved scope is
    /// invalid or no client is registered, and [`CallError::Delegate`] with the function's own
    /// error when it fails.
    pub fn call<P, M, T, E>(&self, params: P, meta: Option<M>) -> Result<T, CallError<E>>
    where
        F: Fn(P, Option<M>) -> Result<T, E>,
        P: NameSource,
        M: NameSource,
        E: Categorized,
    {
        let event = self.prepare(&params, meta.as_ref())?;
        event.start();

        let result = guard(|| (self.function)(params, meta), || event.panicked());
        settle(&event, result)
    }

    /// Invokes an asynchronous function.
    ///
    /// Same as [`call`][Self::call], except that `success` or `failure` is emitted once the
    /// returned future resolves. Dropping the future before then emits no settle counter.
    ///
    /// # Errors
    ///
    /// Same as [`call`][Self::call].
    pub async fn call_async<P, M, T, E, Fut>(&self, params: P, meta: Option<M>) -> Result<T, CallError<E>>
    where
        F: Fn(P, Option<M>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: NameSource,
        M: NameSource,
        E: Categorized,
    {
        let event = self.prepare(&params, meta.as_ref())?;
        event.start();

        let future = guard(|| (self.function)(params, meta), || event.panicked());
        let result = guard_async(future, || event.panicked()).await;
        settle(&event, result)
    }

    fn prepare<P: NameSource, M: NameSource>(&self, params: &P, meta: Option<&M>) -> Result<ActionEvent, Error> {
        let sources = NameSources::new(params, meta.map(|meta| meta as &dyn NameSource));

        let scope = match (&self.scope, sources.invalid_scope(), sources.scope()) {
            (Some(fixed), _, _) => fixed.clone(),
            (None, Some((_, raw)), _) => {
                return Err(Error::InvalidScope {
                    scope: raw,
                    function: self.name.clone(),
                });
            }
            (None, None, Some((_, name))) => Scope::new(name.to_owned(), self.name.clone())?,
            (None, None, None) => self.context.get_scope_kind().default_scope(),
        };
        let operation = sources.operation().map(|(_, name)| name);

        ActionEvent::build(&self.context, &scope, operation, &self.name)
    }
}

fn settle<T, E: Categorized>(event: &ActionEvent, result: Result<T, E>) -> Result<T, CallError<E>> {
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

impl<F, P, M, T, E, Fut> Service<(P, Option<M>)> for Action<F>
where
    F: Fn(P, Option<M>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    P: NameSource + Send,
    M: NameSource + Send,
    T: Send,
    E: Categorized + Send,
{
    type Out = Result<T, CallError<E>>;

    async fn execute(&self, (params, meta): (P, Option<M>)) -> Self::Out {
        self.call_async(params, meta).await
    }
}

impl<F: Clone> Clone for Action<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            function: self.function.clone(),
            scope: self.scope.clone(),
            context: self.context.clone(),
        }
    }
}

impl<F> Debug for Action<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
