//! Call patterns for history queries.
//!
//! A [`Pattern`] is an ordered list of [`Term`]s compared positionally
//! against a recorded argument list. The [`pattern!`](crate::pattern!)
//! macro builds one from call-like syntax, with `_` as the wildcard:
//!
//! ```
//! use intercept::{pattern, Term, Value};
//!
//! let p = pattern![1i64, _, "x"];
//! assert_eq!(p.terms()[1], Term::Any);
//! assert!(p.matches(&[Value::S64(1), Value::Bool(true), Value::from("x")]));
//! assert!(!p.matches(&[Value::S64(1), Value::Bool(true)]));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use intercept_value::Value;

/// One position of a call pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// Matches an argument structurally equal to the value
    Literal(Value),
    /// Matches any single argument
    Any,
}

impl Term {
    pub fn matches(&self, arg: &Value) -> bool {
        match self {
            Term::Any => true,
            Term::Literal(expected) => expected == arg,
        }
    }
}

impl<T: Into<Value>> From<T> for Term {
    fn from(v: T) -> Self {
        Term::Literal(v.into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Any => f.write_str("_"),
            Term::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// Ordered match terms for one call's arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(Vec<Term>);

impl Pattern {
    pub fn new(terms: Vec<Term>) -> Self {
        Self(terms)
    }

    /// A pattern of `arity` wildcards.
    pub fn any(arity: usize) -> Self {
        Self(vec![Term::Any; arity])
    }

    /// A pattern matching exactly these arguments.
    pub fn exact(args: impl IntoIterator<Item = Value>) -> Self {
        args.into_iter().map(Term::Literal).collect()
    }

    pub fn terms(&self) -> &[Term] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lengths must be equal; every term must match its argument.
    pub fn matches(&self, args: &[Value]) -> bool {
        self.0.len() == args.len() && self.0.iter().zip(args).all(|(term, arg)| term.matches(arg))
    }
}

impl FromIterator<Term> for Pattern {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern;
    use proptest::prelude::*;

    #[test]
    fn test_wildcard_matches_single_argument() {
        let hello = [Value::from("hello")];
        assert!(pattern![_].matches(&hello));
        assert!(!pattern!["goodbye"].matches(&hello));
        assert!(pattern!["hello"].matches(&hello));
    }

    #[test]
    fn test_length_must_match() {
        assert!(!pattern![_].matches(&[]));
        assert!(!pattern![_, _].matches(&[Value::Unit]));
        assert!(pattern![].matches(&[]));
    }

    #[test]
    fn test_nan_literal_matches_recorded_nan() {
        let args = [Value::F64(f64::NAN)];
        assert!(pattern![f64::NAN].matches(&args));
        assert!(!pattern![1.0f64].matches(&args));
    }

    #[test]
    fn test_display() {
        assert_eq!(pattern![1i64, _, Value::sym("ok")].to_string(), "1, _, :ok");
        assert_eq!(Pattern::any(2).to_string(), "_, _");
    }

    #[test]
    fn test_macro_accepts_expressions() {
        let name = String::from("ann");
        let p = pattern![name.clone(), -1i64, Some(2u8), _,];
        assert_eq!(p.len(), 4);
        assert_eq!(p.terms()[0], Term::Literal(Value::from("ann")));
        assert_eq!(p.terms()[1], Term::Literal(Value::S64(-1)));
        assert_eq!(p.terms()[3], Term::Any);
    }

    fn arg() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::S64),
            any::<bool>().prop_map(Value::Bool),
            any::<f64>().prop_map(Value::F64),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    proptest! {
        /// An exact pattern always matches the arguments it was built from
        #[test]
        fn prop_exact_pattern_matches_own_args(args in prop::collection::vec(arg(), 0..=10)) {
            prop_assert!(Pattern::exact(args.clone()).matches(&args));
        }

        /// Replacing any subset of positions with wildcards keeps the match
        #[test]
        fn prop_wildcards_preserve_match(
            args in prop::collection::vec(arg(), 0..=10),
            mask in prop::collection::vec(any::<bool>(), 10),
        ) {
            let pattern: Pattern = args
                .iter()
                .zip(&mask)
                .map(|(a, wild)| if *wild { Term::Any } else { Term::Literal(a.clone()) })
                .collect();
            prop_assert!(pattern.matches(&args));
        }

        /// Patterns never match argument lists of a different length
        #[test]
        fn prop_length_mismatch_never_matches(
            args in prop::collection::vec(arg(), 0..=10),
            extra in 1usize..3,
        ) {
            prop_assert!(!Pattern::any(args.len() + extra).matches(&args));
        }
    }
}
