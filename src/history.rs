//! Call history: the chronological log of intercepted calls for one target.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pattern::Pattern;
use crate::unit::Target;
use intercept_value::Value;

/// One completed call routed through an intercepted target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    pub target: Target,
    pub function: String,
    pub args: Vec<Value>,
    /// Session-wide sequence number taken when the call started
    pub position: u64,
    pub result: Value,
}

impl RecordedCall {
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for RecordedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.target, self.function)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") -> {}", self.result)
    }
}

#[derive(Debug)]
struct Slot {
    position: u64,
    function: String,
    args: Vec<Value>,
    result: Option<Value>,
}

/// Append-only call log for one target.
///
/// A call takes its slot when it starts and is filled in when it returns,
/// so calls made from inside another intercepted call keep start order.
/// Slots that never complete are invisible to every query.
#[derive(Debug)]
pub struct History {
    target: Target,
    slots: Vec<Slot>,
}

impl History {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            slots: Vec::new(),
        }
    }

    pub(crate) fn begin(&mut self, position: u64, function: &str, args: Vec<Value>) {
        self.slots.push(Slot {
            position,
            function: function.to_string(),
            args,
            result: None,
        });
    }

    pub(crate) fn complete(&mut self, position: u64, result: Value) -> bool {
        match self.slot_mut(position) {
            Some(slot) => {
                slot.result = Some(result);
                true
            }
            None => false,
        }
    }

    pub(crate) fn abandon(&mut self, position: u64) {
        if let Some(index) = self.slots.iter().rposition(|s| s.position == position) {
            self.slots.remove(index);
        }
    }

    fn slot_mut(&mut self, position: u64) -> Option<&mut Slot> {
        // Completion is nearly always for the most recent slot.
        self.slots.iter_mut().rev().find(|s| s.position == position)
    }

    /// Number of slots taken, including calls still in progress.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn completed(&self) -> impl Iterator<Item = (&Slot, &Value)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.result.as_ref().map(|result| (slot, result)))
    }

    fn to_call(&self, slot: &Slot, result: &Value) -> RecordedCall {
        RecordedCall {
            target: self.target.clone(),
            function: slot.function.clone(),
            args: slot.args.clone(),
            position: slot.position,
            result: result.clone(),
        }
    }

    /// Every completed call in chronological order.
    pub fn all(&self) -> Vec<RecordedCall> {
        self.completed()
            .map(|(slot, result)| self.to_call(slot, result))
            .collect()
    }

    /// Completed calls to `function`, in chronological order.
    pub fn of(&self, function: &str) -> Vec<RecordedCall> {
        self.completed()
            .filter(|(slot, _)| slot.function == function)
            .map(|(slot, result)| self.to_call(slot, result))
            .collect()
    }

    fn matching<'a>(
        &'a self,
        function: &'a str,
        pattern: &'a Pattern,
    ) -> impl Iterator<Item = &'a Slot> + 'a {
        self.completed()
            .map(|(slot, _)| slot)
            .filter(move |slot| slot.function == function && pattern.matches(&slot.args))
    }

    pub fn matches(&self, function: &str, pattern: &Pattern) -> bool {
        self.matching(function, pattern).next().is_some()
    }

    pub fn count(&self, function: &str, pattern: &Pattern) -> usize {
        self.matching(function, pattern).count()
    }

    /// Format the history as 1-indexed `"{index}. {call}"` lines.
    ///
    /// At most `max_lines` calls are listed; the rest are summarized on a
    /// final line.
    pub fn render(&self, max_lines: usize) -> String {
        let calls = self.all();
        let mut lines: Vec<String> = calls
            .iter()
            .take(max_lines)
            .enumerate()
            .map(|(i, call)| format!("{}. {}", i + 1, call))
            .collect();
        if calls.len() > max_lines {
            lines.push(format!("... {} more call(s)", calls.len() - max_lines));
        }
        lines.join("\n")
    }
}
