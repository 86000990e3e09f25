// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::Error;

/// Placeholder rendered into counter keys for any name or failure label that is missing.
pub const UNDEFINED: &str = "undefined";

/// The kind of scope action counters are rooted at.
///
/// The kind is the first segment of scope-rooted keys and decides the scope used when a call
/// does not provide one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum ScopeKind {
    /// Keys start with `service.<scope>`; the default scope is `undefined`.
    #[default]
    Service,

    /// Keys start with `namespace.<scope>`; the default scope is `action`.
    Namespace,
}

impl ScopeKind {
    /// The key segment naming this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Namespace => "namespace",
        }
    }

    /// The scope used when none of the call's sources provides one.
    #[must_use]
    pub fn default_scope(self) -> Scope {
        match self {
            Self::Service => Scope(Cow::Borrowed(UNDEFINED)),
            Self::Namespace => Scope(Cow::Borrowed("action")),
        }
    }
}

impl Display for ScopeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated scope name: non-empty and free of whitespace.
///
/// ```rust
/// use autometer::Scope;
///
/// assert!(Scope::new("user_service", "get_user").is_ok());
/// assert!(Scope::new("user service", "get_user").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(Cow<'static, str>);

impl Scope {
    /// Validates `scope` on behalf of `function`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScope`] naming `function` when `scope` is empty or contains
    /// whitespace.
    pub fn new(scope: impl Into<Cow<'static, str>>, function: impl Into<Cow<'static, str>>) -> Result<Self, Error> {
        let scope = scope.into();

        if scope.is_empty() || scope.chars().any(char::is_whitespace) {
            return Err(Error::InvalidScope {
                scope: scope.into_owned(),
                function: function.into(),
            });
        }

        Ok(Self(scope))
    }

    /// Returns the scope as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Scope {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Call and request context carried alongside business arguments.
///
/// `Meta` is what upstream handlers attach to a request and what operations hand to the actions
/// they call. Besides the well-known naming fields it carries arbitrary string `fields`, such as a
/// transaction id set by an earlier middleware.
///
/// ```rust
/// use autometer::Meta;
///
/// let upstream = Meta::new().field("transaction_id", "xxxx-xxxx").segment("premium");
/// let mut meta = Meta::new().operation("checkout");
/// meta.merge(&upstream);
///
/// assert_eq!(meta.get_operation(), Some("checkout"));
/// assert_eq!(meta.get_field("transaction_id"), Some("xxxx-xxxx"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
pub struct Meta {
    #[cfg_attr(any(feature = "serde", test), serde(skip_serializing_if = "Option::is_none"))]
    scope: Option<String>,
    #[cfg_attr(any(feature = "serde", test), serde(skip_serializing_if = "Option::is_none"))]
    operation: Option<String>,
    #[cfg_attr(any(feature = "serde", test), serde(skip_serializing_if = "Option::is_none"))]
    segment: Option<String>,
    #[cfg_attr(any(feature = "serde", test), serde(flatten))]
    fields: BTreeMap<String, String>,
}

impl Meta {
    /// Creates an empty `Meta`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scope (service or namespace) name.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the segment tag.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Sets an arbitrary field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the scope name, if set.
    #[must_use]
    pub fn get_scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Returns the operation name, if set.
    #[must_use]
    pub fn get_operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    /// Returns the segment tag, if set.
    #[must_use]
    pub fn get_segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    /// Returns an arbitrary field, if set.
    #[must_use]
    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns all arbitrary fields.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Overlays every field present in `other` onto `self`.
    ///
    /// Fields missing from `other` keep their current value.
    pub fn merge(&mut self, other: &Self) {
        if other.scope.is_some() {
            self.scope.clone_from(&other.scope);
        }
        if other.operation.is_some() {
            self.operation.clone_from(&other.operation);
        }
        if other.segment.is_some() {
            self.segment.clone_from(&other.segment);
        }
        self.fields.extend(other.fields.iter().map(|(key, value)| (key.clone(), value.clone())));
    }

    /// Returns `true` when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scope.is_none() && self.operation.is_none() && self.segment.is_none() && self.fields.is_empty()
    }
}

/// A value that can name the scope and operation of a call.
///
/// Wrapped actions look for these names in the explicit `meta` argument, in a `meta` object nested
/// in the params, and in the params themselves, in that order (see [`NameSources`]). Params types
/// implement this trait to take part in the lookup; every method defaults to "not provided", so
/// `impl NameSource for MyParams {}` opts a type in without contributing any names.
pub trait NameSource {
    /// The scope (service or namespace) name this value provides.
    fn scope(&self) -> Option<&str> {
        None
    }

    /// The operation name this value provides.
    fn operation(&self) -> Option<&str> {
        None
    }

    /// A `meta` object nested inside this value.
    fn nested_meta(&self) -> Option<&dyn NameSource> {
        None
    }

    /// A scope entry that is present but is not a string, rendered for error messages.
    ///
    /// Only dynamically typed values can hold one.
    fn invalid_scope(&self) -> Option<String> {
        None
    }
}

impl NameSource for Meta {
    fn scope(&self) -> Option<&str> {
        self.get_scope()
    }

    fn operation(&self) -> Option<&str> {
        self.get_operation()
    }
}

impl NameSource for () {}

macro_rules! impl_nameless {
    ($($ty:ty),* $(,)?) => {
        $(impl NameSource for $ty {})*
    };
}

// Scalar params carry no names.
impl_nameless!(String, str, bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl<T: NameSource + ?Sized> NameSource for &T {
    fn scope(&self) -> Option<&str> {
        (**self).scope()
    }

    fn operation(&self) -> Option<&str> {
        (**self).operation()
    }

    fn nested_meta(&self) -> Option<&dyn NameSource> {
        (**self).nested_meta()
    }

    fn invalid_scope(&self) -> Option<String> {
        (**self).invalid_scope()
    }
}

impl<T: NameSource> NameSource for Option<T> {
    fn scope(&self) -> Option<&str> {
        self.as_ref().and_then(NameSource::scope)
    }

    fn operation(&self) -> Option<&str> {
        self.as_ref().and_then(NameSource::operation)
    }

    fn nested_meta(&self) -> Option<&dyn NameSource> {
        self.as_ref().and_then(NameSource::nested_meta)
    }

    fn invalid_scope(&self) -> Option<String> {
        self.as_ref().and_then(NameSource::invalid_scope)
    }
}

#[cfg(any(feature = "serde", test))]
const SCOPE_KEYS: [&str; 3] = ["scope", "service", "namespace"];

#[cfg(any(feature = "serde", test))]
fn json_scope(value: &serde_json::Value) -> Option<&serde_json::Value> {
    SCOPE_KEYS
        .iter()
        .find_map(|key| value.get(key).filter(|scope| !scope.is_null()))
}

/// Reads `scope` (or `service`, or `namespace`), `operation`, and a nested `meta` object.
///
/// `null` counts as absent. A scope holding any other non-string value is reported through
/// [`NameSource::invalid_scope`]; a non-string operation is ignored.
#[cfg(any(feature = "serde", test))]
impl NameSource for serde_json::Value {
    fn scope(&self) -> Option<&str> {
        json_scope(self).and_then(serde_json::Value::as_str)
    }

    fn invalid_scope(&self) -> Option<String> {
        json_scope(self).filter(|scope| !scope.is_string()).map(ToString::to_string)
    }

    fn operation(&self) -> Option<&str> {
        self.get("operation").and_then(serde_json::Value::as_str)
    }

    fn nested_meta(&self) -> Option<&dyn NameSource> {
        self.get("meta")
            .filter(|meta| meta.is_object())
            .map(|meta| meta as &dyn NameSource)
    }
}

/// One of the places a call's names are looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The `meta` argument passed explicitly to the wrapped function.
    ExplicitMeta,
    /// A `meta` object nested inside the params.
    NestedMeta,
    /// Top-level fields of the params.
    Params,
}

impl Source {
    /// Lookup order, first match wins.
    pub const ORDER: [Self; 3] = [Self::ExplicitMeta, Self::NestedMeta, Self::Params];
}

/// Ordered lookup of a call's scope and operation over its [`Source`]s.
///
/// ```rust
/// use autometer::{Meta, NameSources, Source};
///
/// let params = Meta::new().scope("B");
/// let meta = Meta::new().scope("A");
/// let sources = NameSources::new(&params, Some(&meta));
///
/// assert_eq!(sources.scope(), Some((Source::ExplicitMeta, "A")));
/// assert_eq!(sources.operation(), None);
/// ```
#[derive(Clone, Copy)]
pub struct NameSources<'a> {
    explicit_meta: Option<&'a dyn NameSource>,
    params: &'a dyn NameSource,
}

impl<'a> NameSources<'a> {
    /// Creates the lookup for one call.
    #[must_use]
    pub fn new(params: &'a dyn NameSource, explicit_meta: Option<&'a dyn NameSource>) -> Self {
        Self { explicit_meta, params }
    }

    /// Returns the value behind `source`, if the call has one.
    #[must_use]
    pub fn get(&self, source: Source) -> Option<&'a dyn NameSource> {
        match source {
            Source::ExplicitMeta => self.explicit_meta,
            Source::NestedMeta => self.params.nested_meta(),
            Source::Params => Some(self.params),
        }
    }

    /// Returns the first scope found, together with the source that provided it.
    ///
    /// The lookup stops at the first source holding any scope entry, so a valid scope behind an
    /// invalid one is not returned; see [`invalid_scope`][Self::invalid_scope].
    #[must_use]
    pub fn scope(&self) -> Option<(Source, &'a str)> {
        self.scope_entry().and_then(|(source, entry)| entry.ok().map(|name| (source, name)))
    }

    /// Returns the first scope entry found when it is not a string, rendered for error messages.
    #[must_use]
    pub fn invalid_scope(&self) -> Option<(Source, String)> {
        self.scope_entry().and_then(|(source, entry)| entry.err().map(|raw| (source, raw)))
    }

    fn scope_entry(&self) -> Option<(Source, Result<&'a str, String>)> {
        Source::ORDER.into_iter().find_map(|source| {
            let value = self.get(source)?;
            let entry = value.scope().map(Ok).or_else(|| value.invalid_scope().map(Err))?;
            Some((source, entry))
        })
    }

    /// Returns the first operation found, together with the source that provided it.
    #[must_use]
    pub fn operation(&self) -> Option<(Source, &'a str)> {
        self.find(|source| source.operation())
    }

    fn find(&self, pick: impl Fn(&'a dyn NameSource) -> Option<&'a str>) -> Option<(Source, &'a str)> {
        Source::ORDER
            .into_iter()
            .find_map(|source| self.get(source).and_then(&pick).map(|name| (source, name)))
    }
}

impl std::fmt::Debug for NameSources<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameSources")
            .field("scope", &self.scope())
            .field("operation", &self.operation())
            .finish()
    }
}

const ANONYMOUS: &str = "anonymous";

/// Derives a function's name from its type, e.g. `get_user` for `my_crate::users::get_user` and
/// `get` for `my_crate::Store<u8>::get`.
///
/// Closures and function pointers have no name of their own and are reported as `anonymous`.
pub(crate) fn function_name<F>() -> &'static str {
    let full = std::any::type_name::<F>();

    // Last `::` segment outside of generic arguments, without its own generic arguments.
    let mut depth = 0_usize;
    let mut start = 0;
    let mut end = full.len();
    let mut chars = full.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            '<' => {
                if depth == 0 {
                    end = index;
                }
                depth += 1;
            }
            '>' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && chars.next_if(|&(_, next)| next == ':').is_some() => {
                start = index + 2;
                end = full.len();
            }
            '(' | ' ' if depth == 0 => return ANONYMOUS,
            _ => {}
        }
    }

    match full.get(start..end) {
        Some(name) if !name.is_empty() && !name.starts_with('{') => name,
        _ => ANONYMOUS,
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Params {
        scope: Option<&'static str>,
        meta: Option<Meta>,
    }

    impl NameSource for Params {
        fn scope(&self) -> Option<&str> {
            self.scope
        }

        fn nested_meta(&self) -> Option<&dyn NameSource> {
            self.meta.as_ref().map(|meta| meta as &dyn NameSource)
        }
    }

    #[test]
    fn scope_rejects_whitespace_and_empty() {
        assert!(Scope::new("foo bar", "f").is_err());
        assert!(Scope::new("foo\tbar", "f").is_err());
        assert!(Scope::new("", "f").is_err());
        assert_eq!(Scope::new("foo-bar", "f").unwrap().as_str(), "foo-bar");
    }

    #[test]
    fn scope_error_names_function() {
        let error = Scope::new("a b", "get_user").unwrap_err();

        assert_eq!(
            error,
            Error::InvalidScope {
                scope: "a b".to_string(),
                function: "get_user".into(),
            }
        );
    }

    #[test]
    fn scope_kind_defaults() {
        assert_eq!(ScopeKind::default(), ScopeKind::Service);
        assert_eq!(ScopeKind::Service.default_scope().as_str(), "undefined");
        assert_eq!(ScopeKind::Namespace.default_scope().as_str(), "action");
        assert_eq!(ScopeKind::Namespace.to_string(), "namespace");
    }

    #[test]
    fn explicit_meta_wins_over_params() {
        let params = Meta::new().scope("B").operation("op_b");
        let meta = Meta::new().scope("A");
        let sources = NameSources::new(&params, Some(&meta));

        assert_eq!(sources.scope(), Some((Source::ExplicitMeta, "A")));
        assert_eq!(sources.operation(), Some((Source::Params, "op_b")));
    }

    #[test]
    fn nested_meta_wins_over_params() {
        let params = Params {
            scope: Some("top"),
            meta: Some(Meta::new().scope("nested")),
        };
        let sources = NameSources::new(&params, None);

        assert_eq!(sources.scope(), Some((Source::NestedMeta, "nested")));
    }

    #[test]
    fn params_used_when_no_meta() {
        let params = Params {
            scope: Some("top"),
            meta: Some(Meta::new()),
        };
        let sources = NameSources::new(&params, Some(&()));

        assert_eq!(sources.scope(), Some((Source::Params, "top")));
        assert_eq!(sources.operation(), None);
    }

    #[test]
    fn json_params_are_a_source() {
        let params = json!({ "service": "foo", "meta": { "operation": "bar" }, "scope": null, "operation": 1 });
        let sources = NameSources::new(&params, None);

        assert_eq!(sources.scope(), Some((Source::Params, "foo")));
        assert_eq!(sources.invalid_scope(), None);
        assert_eq!(sources.operation(), Some((Source::NestedMeta, "bar")));
    }

    #[test]
    fn json_non_string_scope_is_invalid() {
        let params = json!({ "service": 1 });
        let sources = NameSources::new(&params, None);

        assert_eq!(params.invalid_scope(), Some("1".to_string()));
        assert_eq!(sources.scope(), None);
        assert_eq!(sources.invalid_scope(), Some((Source::Params, "1".to_string())));
    }

    #[test]
    fn invalid_scope_shadows_later_sources() {
        let params = json!({ "service": "foo", "meta": { "scope": ["a"] } });
        let sources = NameSources::new(&params, None);

        assert_eq!(sources.scope(), None);
        assert_eq!(sources.invalid_scope(), Some((Source::NestedMeta, r#"["a"]"#.to_string())));

        let meta = Meta::new().scope("explicit");
        let sources = NameSources::new(&params, Some(&meta));
        assert_eq!(sources.scope(), Some((Source::ExplicitMeta, "explicit")));
        assert_eq!(sources.invalid_scope(), None);
    }

    #[test]
    fn json_meta_must_be_an_object() {
        let params = json!({ "meta": "not an object" });

        assert!(params.nested_meta().is_none());
    }

    #[test]
    fn option_forwards() {
        let some = Some(Meta::new().scope("a"));
        let none: Option<Meta> = None;

        assert_eq!(NameSource::scope(&some), Some("a"));
        assert_eq!(NameSource::scope(&none), None);
    }

    #[test]
    fn merge_overlays_present_fields() {
        let mut meta = Meta::new().operation("a").field("x", "1");
        meta.merge(&Meta::new().segment("s").field("y", "2"));

        assert_eq!(meta.get_operation(), Some("a"));
        assert_eq!(meta.get_segment(), Some("s"));
        assert_eq!(meta.get_field("x"), Some("1"));
        assert_eq!(meta.get_field("y"), Some("2"));

        meta.merge(&Meta::new().operation("b"));
        assert_eq!(meta.get_operation(), Some("b"));
        assert!(!meta.is_empty());
        assert!(Meta::new().is_empty());
    }

    #[test]
    fn meta_serializes_flat() {
        let meta = Meta::new().operation("checkout").field("transaction_id", "xxxx");
        let value = serde_json::to_value(&meta).unwrap();

        assert_eq!(value, json!({ "operation": "checkout", "transaction_id": "xxxx" }));

        let back: Meta = serde_json::from_value(value).unwrap();
        assert_eq!(back, meta);
    }

    fn get_user(_id: u32, _meta: Option<Meta>) -> Result<String, String> {
        Ok(String::new())
    }

    struct Store<T>(T);

    impl<T> Store<T> {
        fn get(_id: u32) -> Option<T> {
            None
        }
    }

    fn generic<T>() {}

    #[test]
    fn function_name_strips_path() {
        assert_eq!(function_name_of(&get_user), "get_user");
        assert_eq!(function_name_of(&generic::<Store<u8>>), "generic");
        assert_eq!(function_name_of(&Store::<u8>::get), "get");
        assert_eq!(function_name_of(&Store::<Option<Meta>>::get), "get");
        let _ = Store(0_u8).0;
    }

    #[test]
    fn function_name_of_unnamed_callables() {
        assert_eq!(function_name_of(&|| ()), "anonymous");
        assert_eq!(function_name::<fn()>(), "anonymous");
        assert_eq!(function_name_of(&(get_user as fn(u32, Option<Meta>) -> Result<String, String>)), "anonymous");
    }

    fn function_name_of<F>(_: &F) -> &'static str {
        function_name::<F>()
    }
}
