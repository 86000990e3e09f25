// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::collections::BTreeMap;

use super::{Middleware, Operation};
use crate::MeterContext;

/// Wraps a set of request handlers, naming each operation after its key.
///
/// ```rust
/// use autometer::{Meta, OperationBundle};
///
/// fn home(_meta: Meta, _request: (), _response: ()) -> Result<(), String> {
///     Ok(())
/// }
///
/// fn about(_meta: Meta, _request: (), _response: ()) -> Result<(), String> {
///     Ok(())
/// }
///
/// let operations = OperationBundle::new().wrap_all([
///     ("home_page", home as fn(_, _, _) -> _),
///     ("about_page", about as fn(_, _, _) -> _),
/// ]);
///
/// assert_eq!(operations["home_page"].name(), "home_page");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationBundle {
    context: MeterContext,
}

impl OperationBundle {
    /// Creates a bundle reporting to the [global registry](crate::Registry::global).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bundle reporting through `context`.
    #[must_use]
    pub fn with_context(context: &MeterContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Wraps a single handler, naming the operation `key`.
    #[must_use]
    pub fn operation<F>(&self, key: impl Into<Cow<'static, str>>, function: F) -> Operation<F> {
        Operation::new(key, function).context(&self.context)
    }

    /// Wraps every `(key, handler)` pair, keyed by name.
    ///
    /// Later entries replace earlier ones with the same key.
    pub fn wrap_all<K, F, I>(&self, functions: I) -> BTreeMap<String, Operation<F>>
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
    {
        functions
            .into_iter()
            .map(|(key, function)| {
                let key = key.into();
                let operation = self.operation(key.clone(), function);
                (key, operation)
            })
            .collect()
    }

    /// Wraps every `(key, handler)` pair and adapts each to a [`Middleware`].
    pub fn middlewares<K, F, I>(&self, functions: I) -> BTreeMap<String, Middleware<F>>
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
    {
        super::to_middlewares(self.wrap_all(functions))
    }
}
