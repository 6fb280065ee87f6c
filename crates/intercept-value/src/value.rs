//! Runtime values

use std::fmt;

use crate::ConversionError;

/// A dynamic value passed to, or returned from, an intercepted function.
///
/// Equality is structural: two values are equal when they have the same
/// case and equal contents, recursively. Floats compare by bit pattern, so
/// `NaN` equals itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Unit,

    // Primitives
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    S8(i8),
    S16(i16),
    S32(i32),
    S64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),

    /// A bare marker name, rendered as `:name`.
    Symbol(String),

    // Compound
    List(Vec<Value>),
    Option(Option<Box<Value>>),
    Result(std::result::Result<Box<Value>, Box<Value>>),
    Tuple(Vec<Value>),
    Record { type_name: String, fields: Vec<(String, Value)> },
    Variant { type_name: String, case_name: String, payload: Vec<Value> },
}

impl Value {
    /// Helper to create a symbol
    pub fn sym(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// Helper to create a record from `(field, value)` pairs
    pub fn record<K, V>(type_name: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Record {
            type_name: type_name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Helper to create a variant case with a payload
    pub fn variant(
        type_name: impl Into<String>,
        case_name: impl Into<String>,
        payload: Vec<Value>,
    ) -> Self {
        Value::Variant {
            type_name: type_name.into(),
            case_name: case_name.into(),
            payload,
        }
    }

    /// Name of this value's case, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::S8(_) => "s8",
            Value::S16(_) => "s16",
            Value::S32(_) => "s32",
            Value::S64(_) => "s64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Option(_) => "option",
            Value::Result(_) => "result",
            Value::Tuple(_) => "tuple",
            Value::Record { .. } => "record",
            Value::Variant { .. } => "variant",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any signed or unsigned integer that fits into an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::U8(x) => Some(x.into()),
            Value::U16(x) => Some(x.into()),
            Value::U32(x) => Some(x.into()),
            Value::U64(x) => i64::try_from(x).ok(),
            Value::S8(x) => Some(x.into()),
            Value::S16(x) => Some(x.into()),
            Value::S32(x) => Some(x.into()),
            Value::S64(x) => Some(x),
            _ => None,
        }
    }

    fn mismatch(self, expected: &str) -> ConversionError {
        ConversionError::TypeMismatch {
            expected: expected.to_string(),
            got: format!("{} {}", self.kind(), self),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Unit, Unit) => true,
            (Bool(a), Bool(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (S8(a), S8(b)) => a == b,
            (S16(a), S16(b)) => a == b,
            (S32(a), S32(b)) => a == b,
            (S64(a), S64(b)) => a == b,
            (F32(a), F32(b)) => a.to_bits() == b.to_bits(),
            (F64(a), F64(b)) => a.to_bits() == b.to_bits(),
            (Char(a), Char(b)) => a == b,
            (String(a), String(b)) | (Symbol(a), Symbol(b)) => a == b,
            (List(a), List(b)) | (Tuple(a), Tuple(b)) => a == b,
            (Option(a), Option(b)) => a == b,
            (Result(a), Result(b)) => a == b,
            (
                Record { type_name: ta, fields: fa },
                Record { type_name: tb, fields: fb },
            ) => ta == tb && fa == fb,
            (
                Variant { type_name: ta, case_name: ca, payload: pa },
                Variant { type_name: tb, case_name: cb, payload: pb },
            ) => ta == tb && ca == cb && pa == pb,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(x) => write!(f, "{x}"),
            Value::U8(x) => write!(f, "{x}"),
            Value::U16(x) => write!(f, "{x}"),
            Value::U32(x) => write!(f, "{x}"),
            Value::U64(x) => write!(f, "{x}"),
            Value::S8(x) => write!(f, "{x}"),
            Value::S16(x) => write!(f, "{x}"),
            Value::S32(x) => write!(f, "{x}"),
            Value::S64(x) => write!(f, "{x}"),
            Value::F32(x) => write!(f, "{x:?}"),
            Value::F64(x) => write!(f, "{x:?}"),
            Value::Char(x) => write!(f, "{x:?}"),
            Value::String(x) => write!(f, "{x:?}"),
            Value::Symbol(x) => write!(f, ":{x}"),
            Value::List(items) => {
                f.write_str("[")?;
                write_seq(f, items)?;
                f.write_str("]")
            }
            Value::Option(None) => f.write_str("None"),
            Value::Option(Some(inner)) => write!(f, "Some({inner})"),
            Value::Result(Ok(inner)) => write!(f, "Ok({inner})"),
            Value::Result(Err(inner)) => write!(f, "Err({inner})"),
            Value::Tuple(items) => {
                f.write_str("(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Record { type_name, fields } => {
                write!(f, "{type_name} {{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{name}: {value}")?;
                }
                if !fields.is_empty() {
                    f.write_str(" ")?;
                }
                f.write_str("}")
            }
            Value::Variant { type_name, case_name, payload } => {
                write!(f, "{type_name}::{case_name}")?;
                if !payload.is_empty() {
                    f.write_str("(")?;
                    write_seq(f, payload)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// FromValue trait
// ============================================================================

/// Conversion out of a [`Value`].
///
/// This trait exists alongside `TryFrom<Value>` so that generic containers
/// (`Option<T>`, `Vec<T>`, tuples) and `Value` itself can be converted
/// without colliding with the standard library's blanket `TryFrom` impl.
pub trait FromValue: Sized {
    fn from_value(v: Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(v: Value) -> Result<Self, ConversionError> {
        Ok(v)
    }
}

// ============================================================================
// Primitive conversions
// ============================================================================

macro_rules! primitive_conversions {
    ($($ty:ty => $case:ident, $name:literal;)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$case(v)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = ConversionError;
                fn try_from(v: Value) -> Result<Self, Self::Error> {
                    match v {
                        Value::$case(x) => Ok(x),
                        other => Err(other.mismatch($name)),
                    }
                }
            }

            impl FromValue for $ty {
                fn from_value(v: Value) -> Result<Self, ConversionError> {
                    <$ty>::try_from(v)
                }
            }
        )*
    };
}

primitive_conversions! {
    bool => Bool, "bool";
    u8 => U8, "u8";
    u16 => U16, "u16";
    u32 => U32, "u32";
    u64 => U64, "u64";
    i8 => S8, "i8";
    i16 => S16, "i16";
    i32 => S32, "i32";
    i64 => S64, "i64";
    f32 => F32, "f32";
    f64 => F64, "f64";
    char => Char, "char";
    String => String, "String";
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl TryFrom<Value> for () {
    type Error = ConversionError;
    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Unit => Ok(()),
            other => Err(other.mismatch("()")),
        }
    }
}

impl FromValue for () {
    fn from_value(v: Value) -> Result<Self, ConversionError> {
        <()>::try_from(v)
    }
}

// ============================================================================
// Container conversions
// ============================================================================

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(v: Value) -> Result<Self, ConversionError> {
        match v {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    T::from_value(item).map_err(|e| ConversionError::IndexError(i, Box::new(e)))
                })
                .collect(),
            other => Err(ConversionError::ExpectedList(other.to_string())),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        Value::Option(v.map(|x| Box::new(x.into())))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(v: Value) -> Result<Self, ConversionError> {
        match v {
            Value::Option(None) => Ok(None),
            Value::Option(Some(inner)) => T::from_value(*inner)
                .map(Some)
                .map_err(|e| ConversionError::PayloadError(Box::new(e))),
            other => Err(ConversionError::ExpectedOption(other.to_string())),
        }
    }
}

impl<T: Into<Value>, E: Into<Value>> From<Result<T, E>> for Value {
    fn from(r: Result<T, E>) -> Self {
        Value::Result(match r {
            Ok(v) => Ok(Box::new(v.into())),
            Err(e) => Err(Box::new(e.into())),
        })
    }
}

impl<T: FromValue, E: FromValue> FromValue for Result<T, E> {
    fn from_value(v: Value) -> Result<Self, ConversionError> {
        match v {
            Value::Result(Ok(inner)) => T::from_value(*inner)
                .map(Ok)
                .map_err(|e| ConversionError::PayloadError(Box::new(e))),
            Value::Result(Err(inner)) => E::from_value(*inner)
                .map(Err)
                .map_err(|e| ConversionError::PayloadError(Box::new(e))),
            other => Err(ConversionError::ExpectedResult(other.to_string())),
        }
    }
}

// ============================================================================
// Tuple conversions
// ============================================================================

macro_rules! tuple_conversions {
    ($len:literal => $($name:ident : $idx:tt),+) => {
        impl<$($name: Into<Value>),+> From<($($name,)+)> for Value {
            fn from(t: ($($name,)+)) -> Self {
                Value::Tuple(vec![$(t.$idx.into()),+])
            }
        }

        impl<$($name: FromValue),+> FromValue for ($($name,)+) {
            fn from_value(v: Value) -> Result<Self, ConversionError> {
                match v {
                    Value::Tuple(items) if items.len() == $len => {
                        let mut items = items.into_iter();
                        Ok(($(
                            items
                                .next()
                                .ok_or(ConversionError::ExpectedTuple {
                                    expected: $len,
                                    got: String::from("shorter tuple"),
                                })
                                .and_then($name::from_value)
                                .map_err(|e| ConversionError::IndexError($idx, Box::new(e)))?,
                        )+))
                    }
                    other => Err(ConversionError::ExpectedTuple {
                        expected: $len,
                        got: other.to_string(),
                    }),
                }
            }
        }
    };
}

tuple_conversions!(1 => A: 0);
tuple_conversions!(2 => A: 0, B: 1);
tuple_conversions!(3 => A: 0, B: 1, C: 2);
tuple_conversions!(4 => A: 0, B: 1, C: 2, D: 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Value::record("point", [("x", 1i64), ("y", 2i64)]);
        let b = Value::record("point", [("x", 1i64), ("y", 2i64)]);
        let c = Value::record("point", [("x", 1i64), ("y", 3i64)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(Value::S32(1), Value::S64(1));
    }

    #[test]
    fn test_floats_compare_by_bits() {
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
        assert_eq!(Value::F32(f32::NAN), Value::F32(f32::NAN));
        assert_ne!(Value::F64(0.0), Value::F64(-0.0));
        assert_eq!(
            Value::from(vec![Some(f64::NAN)]),
            Value::from(vec![Some(f64::NAN)])
        );
        assert_ne!(Value::F32(1.0), Value::F64(1.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("hello").to_string(), "\"hello\"");
        assert_eq!(Value::sym("replaced").to_string(), ":replaced");
        assert_eq!(Value::from(vec![1i64, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Value::from((1i64,)).to_string(), "(1,)");
        assert_eq!(Value::from(Some(2.5f64)).to_string(), "Some(2.5)");
        assert_eq!(
            Value::record("user", [("name", "ann")]).to_string(),
            "user { name: \"ann\" }"
        );
        assert_eq!(
            Value::variant("shape", "circle", vec![Value::F64(1.0)]).to_string(),
            "shape::circle(1.0)"
        );
    }

    #[test]
    fn test_nested_conversion() {
        let v: Value = vec![Some((1i32, String::from("a"))), None].into();
        let back: Vec<Option<(i32, String)>> = FromValue::from_value(v).unwrap();
        assert_eq!(back, vec![Some((1, "a".to_string())), None]);
    }

    #[test]
    fn test_conversion_errors() {
        let err = i64::try_from(Value::from("x")).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));

        let err = <Vec<i64>>::from_value(Value::from(vec![Value::S64(1), Value::Bool(true)]))
            .unwrap_err();
        assert!(matches!(err, ConversionError::IndexError(1, _)));

        let err = <(i64, i64)>::from_value(Value::from((1i64,))).unwrap_err();
        assert!(matches!(err, ConversionError::ExpectedTuple { expected: 2, .. }));
    }

    #[test]
    fn test_as_i64_widening() {
        assert_eq!(Value::U8(7).as_i64(), Some(7));
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::from("7").as_i64(), None);
    }
}
