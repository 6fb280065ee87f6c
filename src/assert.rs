//! Call assertions over a session's recorded history.
//!
//! Each assertion takes the already-parsed `(target, function, pattern)`
//! triple. On failure the error carries a [`CallDiagnostic`]: the requested
//! call and the target's rendered history, kept as separate pieces so
//! callers can format them however they like.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pattern::Pattern;
use crate::runtime::Session;
use crate::unit::Target;

/// The structured pieces of a failed call assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDiagnostic {
    pub target: Target,
    pub function: String,
    /// `None` when the assertion was about any call regardless of arguments
    pub pattern: Option<Pattern>,
    /// Output of [`Session::render`] at the time of failure
    pub history: String,
}

impl CallDiagnostic {
    /// The call the assertion was about, e.g. `math.add(1, _)`.
    pub fn expected_call(&self) -> String {
        match &self.pattern {
            Some(pattern) => format!("{}.{}({})", self.target, self.function, pattern),
            None => format!("{}.{}(..)", self.target, self.function),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for CallDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\nCalls:\n", self.expected_call())?;
        if self.history.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&self.history)
        }
    }
}

impl Session {
    fn diagnostic(&self, target: &Target, function: &str, pattern: Option<&Pattern>) -> Box<CallDiagnostic> {
        Box::new(CallDiagnostic {
            target: target.clone(),
            function: function.to_string(),
            pattern: pattern.cloned(),
            history: self.render(target),
        })
    }

    /// Succeed if some recorded call to `function` matches `pattern`.
    pub fn assert_called(&self, target: &Target, function: &str, pattern: &Pattern) -> Result<()> {
        if self.matches(target, function, pattern) {
            Ok(())
        } else {
            Err(Error::MissingCall(self.diagnostic(target, function, Some(pattern))))
        }
    }

    /// Succeed if no recorded call to `function` matches `pattern`.
    pub fn refute_called(&self, target: &Target, function: &str, pattern: &Pattern) -> Result<()> {
        if self.matches(target, function, pattern) {
            Err(Error::UnexpectedCall(self.diagnostic(target, function, Some(pattern))))
        } else {
            Ok(())
        }
    }

    /// Succeed if exactly one recorded call to `function` matches `pattern`.
    pub fn assert_called_once(&self, target: &Target, function: &str, pattern: &Pattern) -> Result<()> {
        match self.call_count(target, function, pattern) {
            1 => Ok(()),
            found => Err(Error::CallCount {
                expected: 1,
                found,
                diagnostic: self.diagnostic(target, function, Some(pattern)),
            }),
        }
    }

    /// Succeed if `function` was called at any arity with any arguments.
    pub fn assert_any_call(&self, target: &Target, function: &str) -> Result<()> {
        if self.history_of(target, function).is_empty() {
            Err(Error::MissingCall(self.diagnostic(target, function, None)))
        } else {
            Ok(())
        }
    }

    /// Succeed if `function` was never called, at any arity.
    pub fn refute_any_call(&self, target: &Target, function: &str) -> Result<()> {
        if self.history_of(target, function).is_empty() {
            Ok(())
        } else {
            Err(Error::UnexpectedCall(self.diagnostic(target, function, None)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Dispatch;
    use crate::unit::Catalog;
    use crate::{args, pattern, Value};
    use std::sync::Arc;

    fn spied() -> (Session, Target) {
        let catalog = Arc::new(Catalog::new());
        let echo = catalog
            .define("echo", |unit| {
                unit.func("say", |s: String| s)?;
                Ok(())
            })
            .unwrap();
        let session = Session::new(catalog);
        session.spy(&echo).unwrap();
        (session, echo)
    }

    #[test]
    fn test_missing_call_carries_history_and_pattern() {
        let (session, echo) = spied();
        session.call(&echo, "say", args!["hello"]).unwrap();

        let err = session
            .assert_called(&echo, "say", &pattern!["goodbye"])
            .unwrap_err();
        let diagnostic = err.diagnostic().unwrap();
        assert_eq!(diagnostic.pattern, Some(pattern!["goodbye"]));
        assert_eq!(diagnostic.history, "1. echo.say(\"hello\") -> \"hello\"");
        assert_eq!(diagnostic.expected_call(), "echo.say(\"goodbye\")");
    }

    #[test]
    fn test_refute_called() {
        let (session, echo) = spied();
        session.refute_called(&echo, "say", &pattern![_]).unwrap();
        session.call(&echo, "say", args!["hi"]).unwrap();
        assert!(matches!(
            session.refute_called(&echo, "say", &pattern![_]),
            Err(Error::UnexpectedCall(_))
        ));
    }

    #[test]
    fn test_called_once() {
        let (session, echo) = spied();
        session.call(&echo, "say", args!["a"]).unwrap();
        session.assert_called_once(&echo, "say", &pattern![_]).unwrap();
        session.call(&echo, "say", args!["b"]).unwrap();
        assert!(matches!(
            session.assert_called_once(&echo, "say", &pattern![_]),
            Err(Error::CallCount { expected: 1, found: 2, .. })
        ));
        session.assert_called_once(&echo, "say", &pattern!["b"]).unwrap();
    }

    #[test]
    fn test_any_call() {
        let (session, echo) = spied();
        session.refute_any_call(&echo, "say").unwrap();
        assert!(session.assert_any_call(&echo, "say").is_err());
        session.call(&echo, "say", args!["x"]).unwrap();
        session.assert_any_call(&echo, "say").unwrap();
        let err = session.refute_any_call(&echo, "say").unwrap_err();
        assert_eq!(err.diagnostic().unwrap().expected_call(), "echo.say(..)");
    }

    #[test]
    fn test_diagnostic_json() {
        let diagnostic = CallDiagnostic {
            target: Target::new("echo"),
            function: "say".into(),
            pattern: Some(pattern![_, Value::sym("ok")]),
            history: String::new(),
        };
        let json: serde_json::Value = serde_json::from_str(&diagnostic.to_json().unwrap()).unwrap();
        assert_eq!(json["target"], "echo");
        assert_eq!(json["pattern"][0], "Any");
        assert!(diagnostic.to_string().ends_with("Calls:\n(none)"));
    }
}
