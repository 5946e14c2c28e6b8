//! Core condition types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::names::reasons;

/// Tri-state status of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The condition holds
    True,
    /// The condition does not hold
    False,
    /// Not yet determined
    Unknown,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Severity attached to a non-True condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Expected, transient state (waiting for something)
    Info,
    /// Problem the user should look at
    Warning,
    /// Infrastructure failure
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// A single named, timestamped status signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition name (e.g. `Ready`)
    #[serde(rename = "type")]
    pub name: String,
    /// Current status value
    pub status: Status,
    /// Machine-readable reason in CamelCase
    pub reason: String,
    /// Severity, only meaningful when status is not True
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Last time `status` changed value
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a condition with an explicit status.
    pub fn new(
        name: impl Into<String>,
        status: Status,
        reason: impl Into<String>,
        severity: Option<Severity>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            reason: reason.into(),
            severity,
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// A True condition with the standard `Ready` reason.
    pub fn ready(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Status::True, reasons::READY, None, message)
    }

    /// A False condition.
    pub fn not_ready(
        name: impl Into<String>,
        reason: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self::new(name, Status::False, reason, Some(severity), message)
    }

    /// An Unknown condition.
    pub fn unknown(
        name: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(name, Status::Unknown, reason, None, message)
    }

    /// Check if status is True
    pub fn is_true(&self) -> bool {
        self.status == Status::True
    }

    /// Check if status is False
    pub fn is_false(&self) -> bool {
        self.status == Status::False
    }

    /// Check if status is Unknown
    pub fn is_unknown(&self) -> bool {
        self.status == Status::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let c = Condition::ready("InputReady", "done");
        assert!(c.is_true());
        assert_eq!(c.reason, reasons::READY);
        assert_eq!(c.severity, None);

        let c = Condition::not_ready("InputReady", reasons::ERROR, Severity::Warning, "bad");
        assert!(c.is_false());
        assert_eq!(c.severity, Some(Severity::Warning));

        let c = Condition::unknown("InputReady", reasons::INIT, "starting");
        assert!(c.is_unknown());
    }

    #[test]
    fn test_serialized_field_names() {
        let c = Condition::ready("Ready", "Setup complete");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "Ready");
        assert_eq!(json["status"], "True");
        assert!(json.get("lastTransitionTime").is_some());
        assert!(json.get("severity").is_none());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
