//! Dynamic values for intercepted calls.
//!
//! Every argument passed to an intercepted function and every result it
//! produces is carried as a [`Value`]. Values compare structurally, which is
//! what call-pattern matching relies on.
//!
//! Rust types move in and out of `Value` through `From<T> for Value` and
//! [`FromValue`] (or `TryFrom<Value>` for primitives).
//!
//! ```
//! use intercept_value::{FromValue, Value};
//!
//! let v: Value = (1i64, "two").into();
//! let (a, b): (i64, String) = FromValue::from_value(v).unwrap();
//! assert_eq!((a, b.as_str()), (1, "two"));
//! ```

mod value;

pub use value::{FromValue, Value};

use thiserror::Error;

/// Error converting a [`Value`] into a Rust type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("expected list, got {0}")]
    ExpectedList(String),

    #[error("expected option, got {0}")]
    ExpectedOption(String),

    #[error("expected result, got {0}")]
    ExpectedResult(String),

    #[error("expected tuple of {expected}, got {got}")]
    ExpectedTuple { expected: usize, got: String },

    #[error("at index {0}: {1}")]
    IndexError(usize, Box<ConversionError>),

    #[error("in payload: {0}")]
    PayloadError(Box<ConversionError>),
}
