//! # inputhash
//!
//! Stable content hashing of configuration inputs and drift detection.
//!
//! Inputs are canonicalized through a sorted map before hashing, so two
//! mappings with the same entries hash identically regardless of insertion
//! order. Hashes are BLAKE3, hex encoded.
//!
//! ## Example
//!
//! ```
//! use inputhash::{HashLedger, stable_hash};
//!
//! let a = stable_hash([("b", "2"), ("a", "1")])?;
//! let b = stable_hash([("a", "1"), ("b", "2")])?;
//! assert_eq!(a, b);
//!
//! let mut ledger = HashLedger::new();
//! assert!(ledger.record("input", &a));
//! assert!(!ledger.record("input", &b));
//! # Ok::<(), inputhash::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ledger;

pub use error::{Error, Result};
pub use ledger::{HashLedger, INPUT_HASH_KEY, record_and_detect_change};

use serde::Serialize;
use std::collections::BTreeMap;

/// Hash a set of key/value pairs independently of their order.
///
/// When a key appears more than once the last value wins.
pub fn stable_hash<I, K, V>(pairs: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Serialize,
{
    let canonical: BTreeMap<String, V> = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
    hash_value(&canonical)
}

/// Hash any serializable value through its JSON encoding.
///
/// Only order-independent for values whose serialization is (sorted maps,
/// structs); use [`stable_hash`] for unordered pairs.
pub fn hash_value<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hash_bytes(&bytes))
}

/// Hash raw bytes
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
