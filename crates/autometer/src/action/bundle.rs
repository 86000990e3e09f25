// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::{Action, Error, MeterContext, Scope};

const BUNDLE_FUNCTION: &str = "ActionBundle::new";

/// Wraps a set of functions under one scope.
///
/// The scope is validated once, when the bundle is created, and every action produced by the
/// bundle uses it regardless of what the call's meta or params say. Each action is named after
/// its key rather than after the function. The operation name is still resolved per call.
///
/// ```rust
/// use std::sync::Arc;
///
/// use autometer::{ActionBundle, Meta, MeterContext, RecordingClient, Registry};
///
/// fn get(id: u32, _meta: Option<Meta>) -> Result<u32, String> {
///     Ok(id)
/// }
///
/// fn delete(_id: u32, _meta: Option<Meta>) -> Result<u32, String> {
///     Err("forbidden".to_string())
/// }
///
/// let client = Arc::new(RecordingClient::new());
/// let registry = Registry::new();
/// registry.init(Some(client.clone()));
///
/// let bundle = ActionBundle::with_context("user_api", &MeterContext::new(&registry))?;
/// let actions = bundle.wrap_all([("get_user", get as fn(u32, Option<Meta>) -> Result<u32, String>), ("delete_user", delete)]);
///
/// actions["get_user"].call(1, Some(Meta::new().scope("ignored")))?;
/// assert_eq!(client.keys()[0], "service.user_api.action.get_user.state.start");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ActionBundle {
    scope: Scope,
    context: MeterContext,
}

impl ActionBundle {
    /// Creates a bundle reporting to the [global registry](crate::Registry::global).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] when `scope` is empty or contains whitespace.
    pub fn new(scope: impl Into<Cow<'static, str>>) -> Result<Self, Error> {
        Self::with_context(scope, &MeterContext::global())
    }

    /// Creates a bundle reporting through `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] when `scope` is empty or contains whitespace.
    pub fn with_context(scope: impl Into<Cow<'static, str>>, context: &MeterContext) -> Result<Self, Error> {
        Ok(Self {
            scope: Scope::new(scope, BUNDLE_FUNCTION)?,
            context: context.clone(),
        })
    }

    /// Returns the bundle's scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Wraps a single function, naming the action `key`.
    #[must_use]
    pub fn action<F>(&self, key: impl Into<Cow<'static, str>>, function: F) -> Action<F> {
        Action::new(key, function).context(&self.context).with_scope(self.scope.clone())
    }

    /// Wraps every `(key, function)` pair, keyed by name.
    ///
    /// Later entries replace earlier ones with the same key.
    pub fn wrap_all<K, F, I>(&self, functions: I) -> BTreeMap<String, Action<F>>
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
    {
        functions
            .into_iter()
            .map(|(key, function)| {
                let key = key.into();
                let action = self.action(key.clone(), function);
                (key, action)
            })
            .collect()
    }
}
