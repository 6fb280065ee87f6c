//! Intercept: test-time function interception
//!
//! Code under test calls its dependencies by name through [`Dispatch`].
//! A test wraps the [`Catalog`] of real units in a [`Session`], spies on or
//! patches the units it cares about, and asserts on the calls that were
//! recorded. Dropping the session's [`TeardownGuard`] puts everything back.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Session                    │
//! │                                         │
//! │  spy / patch   - install interception   │
//! │  history       - recorded calls         │
//! │  assert_called - pattern assertions     │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │    Catalog (units by target, direct)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use intercept::{args, assert_called, refute_called, Catalog, Dispatch, Session, Value};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(Catalog::new());
//! let echo = catalog
//!     .define("echo", |unit| {
//!         unit.func("say", |s: String| s)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let session = Session::new(catalog);
//! let _teardown = session.teardown_guard();
//!
//! session.spy(&echo).unwrap();
//! assert_eq!(session.call(&echo, "say", args!["hello"]).unwrap(), Value::from("hello"));
//!
//! assert_called!(session, echo, say("hello"));
//! assert_called!(session, echo, say(_));
//! refute_called!(session, echo, say("goodbye"));
//! ```

pub mod callable;
pub mod error;
pub mod history;
pub mod pattern;
pub mod runtime;
pub mod unit;

mod assert;
mod macros;

pub use assert::CallDiagnostic;
pub use callable::{Callable, IntoCallable, IntoMock, Mock, MAX_ARITY};
pub use error::{Error, InvocationError, InvocationErrorKind, Result};
pub use history::{History, RecordedCall};
pub use intercept_value::{ConversionError, FromValue, Value};
pub use pattern::{Pattern, Term};
pub use runtime::{Dispatch, Limits, Mode, Session, TeardownGuard};
pub use unit::{Catalog, Target, Unit, UnitBuilder};
