// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Wraps a function in an [`Action`](crate::Action) named after its identifier.
///
/// `action!(get_user)` is `Action::new("get_user", get_user)`. An explicit name can be given as
/// the first argument: `action!("fetch_user", get_user)`.
///
/// ```rust
/// use autometer::Meta;
///
/// fn get_user(id: u32, _meta: Option<Meta>) -> Result<u32, String> {
///     Ok(id)
/// }
///
/// assert_eq!(autometer::action!(get_user).name(), "get_user");
/// assert_eq!(autometer::action!("fetch_user", get_user).name(), "fetch_user");
/// ```
#[macro_export]
macro_rules! action {
    ($function:ident) => {
        $crate::Action::new(::core::stringify!($function), $function)
    };
    ($name:expr, $function:expr $(,)?) => {
        $crate::Action::new($name, $function)
    };
}

/// Wraps a handler in an [`Operation`](crate::Operation) named after its identifier.
///
/// `operation!(checkout)` is `Operation::new("checkout", checkout)`. An explicit name can be given
/// as the first argument: `operation!("pay", checkout)`.
///
/// ```rust
/// use autometer::Meta;
///
/// fn checkout(_meta: Meta, _request: (), _response: ()) -> Result<(), String> {
///     Ok(())
/// }
///
/// assert_eq!(autometer::operation!(checkout).name(), "checkout");
/// assert_eq!(autometer::operation!("pay", checkout).name(), "pay");
/// ```
#[macro_export]
macro_rules! operation {
    ($function:ident) => {
        $crate::Operation::new(::core::stringify!($function), $function)
    };
    ($name:expr, $function:expr $(,)?) => {
        $crate::Operation::new($name, $function)
    };
}
