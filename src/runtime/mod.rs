//! Interception runtime
//!
//! Routes calls, installs overrides and tears interception down again.
//!
//! A [`Session`] wraps a [`Catalog`] and owns every piece of interception
//! state for one test. Code under test calls its dependencies through
//! [`Dispatch`]; in production that is the catalog itself, in tests the
//! session:
//!
//! ```
//! use intercept::runtime::{Dispatch, Session};
//! use intercept::unit::Catalog;
//! use intercept::{args, pattern, Value};
//! use std::sync::Arc;
//!
//! fn total(deps: &dyn Dispatch, math: &intercept::Target) -> intercept::Result<Value> {
//!     deps.call(math, "add", args![2i64, 3i64])
//! }
//!
//! let catalog = Arc::new(Catalog::new());
//! let math = catalog
//!     .define("math", |unit| {
//!         unit.func("add", |a: i64, b: i64| a + b)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let session = Session::new(catalog);
//! let _teardown = session.teardown_guard();
//!
//! session.patch(&math, "add", 100i64).unwrap();
//! assert_eq!(total(&session, &math).unwrap(), Value::S64(100));
//! assert!(session.matches(&math, "add", &pattern![2i64, _]));
//! ```

mod interceptor;

pub use interceptor::Mode;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::callable::{Callable, IntoCallable, IntoMock, Mock, MAX_ARITY};
use crate::error::{Error, Result};
use crate::history::RecordedCall;
use crate::pattern::Pattern;
use crate::unit::{Catalog, Target, Unit};
use intercept_value::Value;
use interceptor::{Interception, Route};

/// Route a call to a named function on a target.
///
/// Implemented by [`Catalog`] (direct calls, nothing recorded) and by
/// [`Session`] (calls routed through installed interception).
pub trait Dispatch: Send + Sync {
    fn call(&self, target: &Target, function: &str, args: Vec<Value>) -> Result<Value>;
}

/// Resource limits for a session.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Calls recorded per target before dispatch fails with
    /// [`Error::HistoryLimit`]
    pub max_recorded_calls: usize,
    /// Calls listed by [`Session::render`] before the rest are summarized
    pub max_rendered_calls: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_recorded_calls: 1_000_000,
            max_rendered_calls: 200,
        }
    }
}

#[derive(Default)]
struct SessionState {
    interceptions: BTreeMap<Target, Interception>,
    next_position: u64,
}

struct SessionInner {
    catalog: Arc<Catalog>,
    limits: Limits,
    state: Mutex<SessionState>,
}

/// Interception state for one test.
///
/// Cloning yields another handle to the same state. The lock is never held
/// while a function body runs, so originals and replacements may call back
/// into the session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_limits(catalog, Limits::default())
    }

    pub fn with_limits(catalog: Arc<Catalog>, limits: Limits) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                catalog,
                limits,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub fn limits(&self) -> &Limits {
        &self.inner.limits
    }

    /// Intercept `target` in passthrough mode: every call still runs the
    /// original and is recorded.
    ///
    /// Idempotent; history and overrides already installed are kept.
    pub fn spy(&self, target: &Target) -> Result<()> {
        self.ensure_intercepted(target)
    }

    fn ensure_intercepted(&self, target: &Target) -> Result<()> {
        if self.is_intercepted(target) {
            return Ok(());
        }
        let original = self.inner.catalog.resolve(target)?;
        let mut state = self.inner.state.lock();
        state.interceptions.entry(target.clone()).or_insert_with(|| {
            debug!(unit = %target, "installing interception");
            Interception::new(original)
        });
        Ok(())
    }

    /// Replace `function` on `target` and return `mock` unchanged.
    ///
    /// A [`Callable`] is installed at its own arity. A plain value is
    /// installed at every arity the function is currently defined at, and
    /// fails with [`Error::UnknownFunction`] if there is none.
    ///
    /// The mock is validated before anything is installed: a failed patch
    /// leaves the target exactly as it was.
    pub fn patch<M: IntoMock>(&self, target: &Target, function: &str, mock: M) -> Result<M> {
        let replacements = match mock.to_mock() {
            Mock::Callable(callable) => {
                if callable.arity() > MAX_ARITY {
                    return Err(Error::ArityOutOfRange {
                        arity: callable.arity(),
                        max: MAX_ARITY,
                    });
                }
                vec![callable]
            }
            Mock::Value(value) => {
                let arities = self.inner.catalog.resolve_arities(target, function)?;
                if arities.is_empty() {
                    return Err(Error::UnknownFunction {
                        target: target.clone(),
                        function: function.to_string(),
                    });
                }
                arities
                    .into_iter()
                    .map(|arity| Callable::constant(arity, value.clone()))
                    .collect()
            }
        };

        self.ensure_intercepted(target)?;
        let mut state = self.inner.state.lock();
        let interception = state
            .interceptions
            .get_mut(target)
            .ok_or_else(|| Error::UnresolvableTarget(target.clone()))?;
        for callable in replacements {
            debug!(unit = %target, function, arity = callable.arity(), "installing override");
            interception.install(function, callable);
        }
        Ok(mock)
    }

    /// Patch with a typed closure, returning the installed [`Callable`].
    ///
    /// ```ignore
    /// session.patch_fn(&math, "add", |a: i64, b: i64| a * b)?;
    /// ```
    pub fn patch_fn<Args, F>(&self, target: &Target, function: &str, func: F) -> Result<Callable>
    where
        F: IntoCallable<Args>,
    {
        self.patch(target, function, func.into_callable())
    }

    /// Return `function` to passthrough at every arity. History is kept.
    pub fn restore_function(&self, target: &Target, function: &str) {
        let mut state = self.inner.state.lock();
        if let Some(interception) = state.interceptions.get_mut(target) {
            let removed = interception.remove_overrides(function);
            debug!(unit = %target, function, removed, "restored function");
        }
    }

    /// Remove all interception of `target`, dropping overrides and history.
    ///
    /// Restoring a target that is not intercepted does nothing.
    pub fn restore(&self, target: &Target) {
        if self.inner.state.lock().interceptions.remove(target).is_some() {
            debug!(unit = %target, "restored");
        }
    }

    /// Restore every intercepted target.
    pub fn restore_all(&self) {
        let removed = std::mem::take(&mut self.inner.state.lock().interceptions);
        if !removed.is_empty() {
            debug!(count = removed.len(), "restored all targets");
        }
    }

    /// Guard that runs [`restore_all`](Self::restore_all) when dropped,
    /// including while a failing test unwinds.
    pub fn teardown_guard(&self) -> TeardownGuard {
        TeardownGuard {
            session: self.clone(),
        }
    }

    pub fn is_intercepted(&self, target: &Target) -> bool {
        self.inner.state.lock().interceptions.contains_key(target)
    }

    pub fn intercepted_targets(&self) -> Vec<Target> {
        self.inner.state.lock().interceptions.keys().cloned().collect()
    }

    /// How calls to `function` at `arity` are routed, or `None` if the
    /// target is not intercepted.
    pub fn mode(&self, target: &Target, function: &str, arity: usize) -> Option<Mode> {
        self.with_interception(target, |i| i.mode(function, arity))
    }

    fn with_interception<R>(&self, target: &Target, f: impl FnOnce(&Interception) -> R) -> Option<R> {
        self.inner.state.lock().interceptions.get(target).map(f)
    }

    /// Every recorded call on `target`, oldest first. Empty if the target
    /// was never intercepted.
    pub fn history(&self, target: &Target) -> Vec<RecordedCall> {
        self.with_interception(target, |i| i.history().all())
            .unwrap_or_default()
    }

    /// Recorded calls to `function` on `target`, oldest first.
    pub fn history_of(&self, target: &Target, function: &str) -> Vec<RecordedCall> {
        self.with_interception(target, |i| i.history().of(function))
            .unwrap_or_default()
    }

    pub fn last_call(&self, target: &Target, function: &str) -> Option<RecordedCall> {
        self.history_of(target, function).pop()
    }

    /// True if any recorded call to `function` matches `pattern`.
    pub fn matches(&self, target: &Target, function: &str, pattern: &Pattern) -> bool {
        self.with_interception(target, |i| i.history().matches(function, pattern))
            .unwrap_or(false)
    }

    pub fn call_count(&self, target: &Target, function: &str, pattern: &Pattern) -> usize {
        self.with_interception(target, |i| i.history().count(function, pattern))
            .unwrap_or(0)
    }

    /// The target's history as 1-indexed lines, for failure messages.
    pub fn render(&self, target: &Target) -> String {
        let max = self.inner.limits.max_rendered_calls;
        self.with_interception(target, |i| i.history().render(max))
            .unwrap_or_default()
    }
}

enum Plan {
    Direct,
    Unrecorded(Arc<Unit>),
    Recorded { position: u64, route: Route },
}

fn undefined(target: &Target, function: &str, arity: usize) -> Error {
    Error::UndefinedFunction {
        target: target.clone(),
        function: function.to_string(),
        arity,
    }
}

impl Dispatch for Session {
    fn call(&self, target: &Target, function: &str, args: Vec<Value>) -> Result<Value> {
        let plan = {
            let mut state = self.inner.state.lock();
            let SessionState {
                interceptions,
                next_position,
            } = &mut *state;

            match interceptions.get_mut(target) {
                None => Plan::Direct,
                Some(interception) if args.len() > MAX_ARITY => {
                    Plan::Unrecorded(Arc::clone(interception.original()))
                }
                Some(interception) => {
                    let limit = self.inner.limits.max_recorded_calls;
                    if interception.history().len() >= limit {
                        return Err(Error::HistoryLimit {
                            target: target.clone(),
                            limit,
                        });
                    }
                    let position = *next_position;
                    let route = interception
                        .before_call(position, function, &args)
                        .ok_or_else(|| undefined(target, function, args.len()))?;
                    *next_position += 1;
                    Plan::Recorded { position, route }
                }
            }
        };

        let (position, route) = match plan {
            Plan::Direct => return self.inner.catalog.call(target, function, args),
            Plan::Unrecorded(original) => {
                let callable = original
                    .function(function, args.len())
                    .ok_or_else(|| undefined(target, function, args.len()))?;
                return callable
                    .call(&args)
                    .map_err(|kind| kind.at(target, function).into());
            }
            Plan::Recorded { position, route } => (position, route),
        };

        trace!(unit = %target, function, position, mode = ?route.mode, "dispatching");
        let outcome = route.callable.call(&args);

        // The target may have been restored while the body ran.
        if let Some(interception) = self.inner.state.lock().interceptions.get_mut(target) {
            interception.after_call(position, outcome.as_ref().ok().cloned());
        }

        outcome.map_err(|kind| kind.at(target, function).into())
    }
}

/// Restores every target of a session when dropped.
#[must_use = "teardown runs when the guard is dropped"]
pub struct TeardownGuard {
    session: Session,
}

impl TeardownGuard {
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        self.session.restore_all();
    }
}
