//! The condition ledger: an insertion-ordered, name-keyed set of conditions.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::names::{self, init_message, reasons};
use crate::types::{Condition, Severity};

/// Ordered collection of conditions, keyed by name.
///
/// Iteration order is insertion order, which keeps [`ConditionLedger::mirror`]
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct ConditionLedger {
    conditions: IndexMap<String, Condition>,
}

impl ConditionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an Unknown/`Init` condition for every name not already present.
    ///
    /// Existing conditions are never overwritten.
    pub fn init(&mut self, names: &[&str]) {
        for name in names {
            if !self.conditions.contains_key(*name) {
                self.conditions.insert(
                    (*name).to_string(),
                    Condition::unknown(*name, reasons::INIT, init_message(name)),
                );
            }
        }
    }

    /// Upsert a condition, stamping the current time on status changes.
    pub fn set(&mut self, condition: Condition) {
        self.set_at(condition, Utc::now());
    }

    /// Upsert a condition using `now` as the transition time if the status changed.
    pub fn set_at(&mut self, condition: Condition, now: DateTime<Utc>) {
        match self.conditions.get_mut(&condition.name) {
            Some(existing) => {
                let last_transition_time = if existing.status == condition.status {
                    existing.last_transition_time
                } else {
                    now
                };
                *existing = Condition {
                    last_transition_time,
                    ..condition
                };
            }
            None => {
                let name = condition.name.clone();
                self.conditions.insert(
                    name,
                    Condition {
                        last_transition_time: now,
                        ..condition
                    },
                );
            }
        }
    }

    /// Set `name` to True with the standard reason.
    pub fn mark_true(&mut self, name: &str, message: impl Into<String>) {
        self.set(Condition::ready(name, message));
    }

    /// Set `name` to False.
    pub fn mark_false(
        &mut self,
        name: &str,
        reason: &str,
        severity: Severity,
        message: impl Into<String>,
    ) {
        self.set(Condition::not_ready(name, reason, severity, message));
    }

    /// Look up a condition by name
    pub fn get(&self, name: &str) -> Option<&Condition> {
        self.conditions.get(name)
    }

    /// Check if the named condition is True
    pub fn is_true(&self, name: &str) -> bool {
        self.get(name).is_some_and(Condition::is_true)
    }

    /// Check if the named condition is False
    pub fn is_false(&self, name: &str) -> bool {
        self.get(name).is_some_and(Condition::is_false)
    }

    /// Check if the named condition is stored with status Unknown
    pub fn is_unknown(&self, name: &str) -> bool {
        self.get(name).is_some_and(Condition::is_unknown)
    }

    /// Check whether every condition other than `except` is True.
    pub fn all_true_except(&self, except: &[&str]) -> bool {
        self.conditions
            .values()
            .filter(|c| !except.contains(&c.name.as_str()))
            .all(Condition::is_true)
    }

    /// Synthesize a condition named `target` that summarizes all the others.
    ///
    /// Returns a True condition when every other condition is True. Otherwise
    /// copies status, reason, severity and message from the first non-True
    /// condition in insertion order.
    pub fn mirror(&self, target: &str) -> Condition {
        let source = self
            .conditions
            .values()
            .find(|c| c.name != target && !c.is_true());

        match source {
            Some(c) => Condition::new(
                target,
                c.status,
                c.reason.clone(),
                c.severity,
                c.message.clone(),
            ),
            None => Condition::ready(target, names::messages::READY),
        }
    }

    /// Put back transition times from a previous snapshot where the status
    /// value did not change.
    ///
    /// Used when the ledger was rebuilt from scratch during an invocation.
    pub fn restore_transition_times(&mut self, previous: &ConditionLedger) {
        for condition in self.conditions.values_mut() {
            if let Some(old) = previous.get(&condition.name)
                && old.status == condition.status
            {
                condition.last_transition_time = old.last_transition_time;
            }
        }
    }

    /// Iterate conditions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values()
    }

    /// Number of conditions
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Check if the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl From<Vec<Condition>> for ConditionLedger {
    fn from(conditions: Vec<Condition>) -> Self {
        Self {
            conditions: conditions
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }
}

impl From<ConditionLedger> for Vec<Condition> {
    fn from(ledger: ConditionLedger) -> Self {
        ledger.conditions.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a ConditionLedger {
    type Item = &'a Condition;
    type IntoIter = indexmap::map::Values<'a, String, Condition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.values()
    }
}
