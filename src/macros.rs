//! Call-expression sugar over the explicit query functions.

/// Build an argument list: `args![1i64, "two"]` is
/// `vec![Value::from(1i64), Value::from("two")]`.
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        ::std::vec![$($crate::Value::from($arg)),*]
    };
}

/// Build a [`Pattern`](crate::Pattern) from comma-separated terms, where a
/// bare `_` is [`Term::Any`](crate::Term::Any) and anything else is a
/// literal converted with `Value::from`.
#[macro_export]
macro_rules! pattern {
    () => {
        $crate::Pattern::new(::std::vec::Vec::new())
    };
    ($($terms:tt)+) => {{
        let mut terms = ::std::vec::Vec::new();
        $crate::__pattern_terms!(terms; $($terms)+);
        $crate::Pattern::new(terms)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __pattern_terms {
    ($terms:ident;) => {};
    ($terms:ident; _ $(, $($rest:tt)*)?) => {
        $terms.push($crate::Term::Any);
        $($crate::__pattern_terms!($terms; $($rest)*);)?
    };
    ($terms:ident; $term:expr $(, $($rest:tt)*)?) => {
        $terms.push($crate::Term::from($term));
        $($crate::__pattern_terms!($terms; $($rest)*);)?
    };
}

/// Panic unless `session` recorded a call matching the call expression.
///
/// ```ignore
/// assert_called!(session, math, add(1i64, _));
/// ```
#[macro_export]
macro_rules! assert_called {
    ($session:expr, $target:expr, $function:ident ( $($args:tt)* )) => {
        if let ::std::result::Result::Err(e) = $session.assert_called(
            &$target,
            ::std::stringify!($function),
            &$crate::pattern!($($args)*),
        ) {
            ::std::panic!("{}", e);
        }
    };
}

/// Panic if `session` recorded a call matching the call expression.
#[macro_export]
macro_rules! refute_called {
    ($session:expr, $target:expr, $function:ident ( $($args:tt)* )) => {
        if let ::std::result::Result::Err(e) = $session.refute_called(
            &$target,
            ::std::stringify!($function),
            &$crate::pattern!($($args)*),
        ) {
            ::std::panic!("{}", e);
        }
    };
}

/// Panic unless exactly one recorded call matches the call expression.
#[macro_export]
macro_rules! assert_called_once {
    ($session:expr, $target:expr, $function:ident ( $($args:tt)* )) => {
        if let ::std::result::Result::Err(e) = $session.assert_called_once(
            &$target,
            ::std::stringify!($function),
            &$crate::pattern!($($args)*),
        ) {
            ::std::panic!("{}", e);
        }
    };
}
