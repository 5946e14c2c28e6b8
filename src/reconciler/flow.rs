//! Phase outcomes and invocation results.

use std::time::Duration;

use crate::error::Error;

/// When the next invocation should happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Only when a watched input changes
    OnTrigger,
    /// Right away
    Immediately,
    /// After a delay
    After(Duration),
}

/// Result of a phase
#[derive(Debug)]
pub enum Flow {
    /// Proceed with the next phase
    Continue,
    /// Stop without error and come back later
    Wait(Requeue),
    /// Stop with an error
    Fail(Error),
}

/// Returned from a single reconcile invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Invoke again even if nothing changes
    pub requeue: bool,
    /// Delay before invoking again
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    /// Nothing further to do until an input changes
    pub fn done() -> Self {
        Self::default()
    }

    /// Invoke again right away
    pub fn immediately() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    /// Invoke again once `delay` has passed
    pub fn after(delay: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: Some(delay),
        }
    }
}

impl From<Requeue> for ReconcileResult {
    fn from(requeue: Requeue) -> Self {
        match requeue {
            Requeue::OnTrigger => Self::done(),
            Requeue::Immediately => Self::immediately(),
            Requeue::After(delay) => Self::after(delay),
        }
    }
}
