//! # conditions
//!
//! Named status conditions for reconciled objects.
//!
//! A [`ConditionLedger`] keeps one [`Condition`] per name, in insertion order.
//! Upserts preserve the last transition time unless the status value actually
//! changes, and the ledger can synthesize an aggregate condition (usually
//! `Ready`) that mirrors the most relevant non-True condition.
//!
//! ## Example
//!
//! ```
//! use conditions::{ConditionLedger, Severity, names, reasons};
//!
//! let mut ledger = ConditionLedger::new();
//! ledger.init(&[names::READY, names::INPUT_READY]);
//! assert!(ledger.is_unknown(names::READY));
//!
//! ledger.mark_false(
//!     names::INPUT_READY,
//!     reasons::REQUESTED,
//!     Severity::Info,
//!     "Input data resources missing",
//! );
//! let mirrored = ledger.mirror(names::READY);
//! assert_eq!(mirrored.reason, reasons::REQUESTED);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ledger;
pub mod names;
pub mod types;

pub use ledger::ConditionLedger;
pub use names::{messages, reasons};
pub use types::{Condition, Severity, Status};
