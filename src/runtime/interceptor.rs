//! Per-target interception state
//!
//! Every call routed through an intercepted target passes through two
//! hooks on its [`Interception`]:
//!
//! # Before the call
//!
//! `before_call` picks the body to run. An override installed by `patch`
//! short-circuits the original; without one the call falls through to the
//! unit's own function (passthrough). Either way a history slot is
//! taken so the call is recorded in start order.
//!
//! # After the call
//!
//! `after_call` fills the slot with the result, or drops it if the body
//! failed.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::callable::Callable;
use crate::history::History;
use crate::unit::Unit;
use intercept_value::Value;

/// How calls to one function at one arity are routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The original runs; the call is recorded
    Passthrough,
    /// An installed replacement runs; the call is recorded
    Override,
}

/// The routing decision for one call.
pub(crate) struct Route {
    pub callable: Callable,
    pub mode: Mode,
}

pub(crate) struct Interception {
    original: Arc<Unit>,
    overrides: BTreeMap<(String, usize), Callable>,
    history: History,
}

impl Interception {
    pub fn new(original: Arc<Unit>) -> Self {
        let history = History::new(original.target().clone());
        Self {
            original,
            overrides: BTreeMap::new(),
            history,
        }
    }

    pub fn original(&self) -> &Arc<Unit> {
        &self.original
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn mode(&self, function: &str, arity: usize) -> Mode {
        if self.overrides.contains_key(&(function.to_string(), arity)) {
            Mode::Override
        } else {
            Mode::Passthrough
        }
    }

    /// Install `callable` as the override at its own arity, returning any
    /// override it replaced.
    pub fn install(&mut self, function: &str, callable: Callable) -> Option<Callable> {
        self.overrides
            .insert((function.to_string(), callable.arity()), callable)
    }

    /// Drop every override of `function`, returning how many were removed.
    pub fn remove_overrides(&mut self, function: &str) -> usize {
        let before = self.overrides.len();
        self.overrides.retain(|(name, _), _| name != function);
        before - self.overrides.len()
    }

    /// Choose the body for a call and take its history slot.
    ///
    /// Returns `None` when neither an override nor the original defines
    /// `function` at this arity; nothing is recorded then.
    pub fn before_call(&mut self, position: u64, function: &str, args: &[Value]) -> Option<Route> {
        let arity = args.len();
        let route = match self.overrides.get(&(function.to_string(), arity)) {
            Some(callable) => Route {
                callable: callable.clone(),
                mode: Mode::Override,
            },
            None => Route {
                callable: self.original.function(function, arity)?.clone(),
                mode: Mode::Passthrough,
            },
        };
        self.history.begin(position, function, args.to_vec());
        Some(route)
    }

    /// Complete the slot taken by `before_call`. `None` means the body
    /// failed and the slot is dropped.
    pub fn after_call(&mut self, position: u64, result: Option<Value>) {
        match result {
            Some(result) => {
                self.history.complete(position, result);
            }
            None => self.history.abandon(position),
        }
    }
}
