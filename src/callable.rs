//! Callables: the function bodies stored in units and installed as overrides.
//!
//! A [`Callable`] has a fixed arity and works on dynamic [`Value`]s. Typed
//! Rust closures of up to [`MAX_ARITY`] parameters convert into callables
//! through [`IntoCallable`]; arguments are converted with
//! [`FromValue`] and results with `Into<Value>`.
//!
//! ```
//! use intercept::callable::{Callable, IntoCallable};
//! use intercept::Value;
//!
//! let add = (|a: i64, b: i64| a + b).into_callable();
//! assert_eq!(add.arity(), 2);
//! assert_eq!(add.call(&[Value::S64(2), Value::S64(3)]).unwrap(), Value::S64(5));
//!
//! let fixed = Callable::constant(3, Value::sym("stub"));
//! assert_eq!(fixed.call(&[Value::Unit, Value::Unit, Value::Unit]).unwrap(), Value::sym("stub"));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::InvocationErrorKind;
use intercept_value::{FromValue, Value};

/// Highest arity that can be intercepted, overridden or built as a typed
/// callable. Functions of higher arity still dispatch, but are never
/// recorded or replaced.
pub const MAX_ARITY: usize = 10;

type Body = dyn Fn(&[Value]) -> Result<Value, InvocationErrorKind> + Send + Sync;

/// A function of fixed arity over dynamic values.
#[derive(Clone)]
pub struct Callable {
    arity: usize,
    body: Arc<Body>,
}

impl Callable {
    fn from_body<F>(arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, InvocationErrorKind> + Send + Sync + 'static,
    {
        Self {
            arity,
            body: Arc::new(body),
        }
    }

    /// Wrap a function that works directly on the argument slice.
    ///
    /// The slice is guaranteed to hold exactly `arity` values. Unlike typed
    /// callables, raw callables may exceed [`MAX_ARITY`]; such functions can
    /// be defined on a unit but are never intercepted.
    pub fn raw<F>(arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self::from_body(arity, move |args| Ok(func(args)))
    }

    /// Build a callable that ignores its `arity` arguments and always
    /// returns `value`.
    pub fn constant(arity: usize, value: Value) -> Self {
        Self::from_body(arity, move |_| Ok(value.clone()))
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invoke with `args`, which must match the callable's arity exactly.
    pub fn call(&self, args: &[Value]) -> Result<Value, InvocationErrorKind> {
        if args.len() != self.arity {
            return Err(InvocationErrorKind::ArityMismatch {
                expected: self.arity,
                got: args.len(),
            });
        }
        (self.body)(args)
    }

    /// True if both handles refer to the same function body.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Conversion of a typed Rust function into a [`Callable`].
///
/// Implemented for every `Fn(A1, .., An) -> R` with `n <= MAX_ARITY`,
/// where each `Ai: FromValue` and `R: Into<Value>`. The `Args` parameter
/// only disambiguates the impls; closures need annotated parameter types.
pub trait IntoCallable<Args> {
    fn into_callable(self) -> Callable;
}

impl IntoCallable<Callable> for Callable {
    fn into_callable(self) -> Callable {
        self
    }
}

fn convert<T: FromValue>(args: &[Value], index: usize) -> Result<T, InvocationErrorKind> {
    T::from_value(args[index].clone())
        .map_err(|source| InvocationErrorKind::ArgumentConversion { index, source })
}

macro_rules! impl_into_callable {
    ($arity:literal $(, $arg:ident : $idx:tt)*) => {
        impl<F, R $(, $arg)*> IntoCallable<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Into<Value>,
            $($arg: FromValue,)*
        {
            fn into_callable(self) -> Callable {
                Callable::from_body($arity, move |args: &[Value]| {
                    let _ = args;
                    Ok(self($(convert::<$arg>(args, $idx)?),*).into())
                })
            }
        }
    };
}

impl_into_callable!(0);
impl_into_callable!(1, A0: 0);
impl_into_callable!(2, A0: 0, A1: 1);
impl_into_callable!(3, A0: 0, A1: 1, A2: 2);
impl_into_callable!(4, A0: 0, A1: 1, A2: 2, A3: 3);
impl_into_callable!(5, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);
impl_into_callable!(6, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5);
impl_into_callable!(7, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6);
impl_into_callable!(8, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7);
impl_into_callable!(9, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8);
impl_into_callable!(10, A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7, A8: 8, A9: 9);

/// What `patch` installs: a fixed value or custom logic.
#[derive(Debug, Clone)]
pub enum Mock {
    /// Returned for every call, at every arity the function is defined at.
    Value(Value),
    /// Installed at its own arity only.
    Callable(Callable),
}

/// Types accepted by `Session::patch`.
///
/// `patch` hands the mock back to the caller unchanged, so implementors
/// must be `Clone`.
pub trait IntoMock: Clone {
    fn to_mock(&self) -> Mock;
}

impl<T: Into<Value> + Clone> IntoMock for T {
    fn to_mock(&self) -> Mock {
        Mock::Value(self.clone().into())
    }
}

impl IntoMock for Callable {
    fn to_mock(&self) -> Mock {
        Mock::Callable(self.clone())
    }
}

impl IntoMock for Mock {
    fn to_mock(&self) -> Mock {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_ignores_arguments() {
        for arity in 0..=MAX_ARITY {
            let callable = Callable::constant(arity, Value::sym("fixed"));
            let args = vec![Value::S64(7); arity];
            assert_eq!(callable.call(&args).unwrap(), Value::sym("fixed"));
        }
    }

    #[test]
    fn test_arity_mismatch() {
        let callable = Callable::constant(2, Value::Unit);
        let err = callable.call(&[Value::Unit]).unwrap_err();
        assert_eq!(err, InvocationErrorKind::ArityMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_typed_arities() {
        let zero = (|| "none").into_callable();
        assert_eq!(zero.arity(), 0);
        assert_eq!(zero.call(&[]).unwrap(), Value::from("none"));

        let ten = (|a: i64, b: i64, c: i64, d: i64, e: i64, f: i64, g: i64, h: i64, i: i64, j: i64| {
            a + b + c + d + e + f + g + h + i + j
        })
        .into_callable();
        assert_eq!(ten.arity(), 10);
        let args: Vec<Value> = (1..=10i64).map(Value::from).collect();
        assert_eq!(ten.call(&args).unwrap(), Value::S64(55));
    }

    #[test]
    fn test_argument_conversion_error() {
        let callable = (|s: String, n: i64| format!("{s}{n}")).into_callable();
        let err = callable
            .call(&[Value::from("x"), Value::from("not a number")])
            .unwrap_err();
        assert!(matches!(
            err,
            InvocationErrorKind::ArgumentConversion { index: 1, .. }
        ));
    }

    #[test]
    fn test_raw_beyond_max_arity() {
        let wide = Callable::raw(12, |args| Value::U64(args.len() as u64));
        let args = vec![Value::Unit; 12];
        assert_eq!(wide.call(&args).unwrap(), Value::U64(12));
    }

    #[test]
    fn test_into_mock() {
        assert!(matches!(42i64.to_mock(), Mock::Value(Value::S64(42))));
        let callable = Callable::constant(0, Value::Unit);
        match callable.to_mock() {
            Mock::Callable(c) => assert!(c.ptr_eq(&callable)),
            other => panic!("unexpected mock: {other:?}"),
        }
    }
}
