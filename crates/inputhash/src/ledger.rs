//! Recorded hashes and change detection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key under which the hash of all merged inputs is recorded.
pub const INPUT_HASH_KEY: &str = "input";

/// Record `new_hash` under `key` and report whether it differs from what
/// was stored.
///
/// `changed` is true when `key` was absent or held a different value. A
/// caller that sees `changed == true` must persist the returned map before
/// building anything from the new inputs.
pub fn record_and_detect_change(
    previous: &BTreeMap<String, String>,
    key: &str,
    new_hash: &str,
) -> (BTreeMap<String, String>, bool) {
    let changed = previous.get(key).is_none_or(|old| old != new_hash);
    let mut updated = previous.clone();
    if changed {
        updated.insert(key.to_string(), new_hash.to_string());
    }
    (updated, changed)
}

/// Named hashes recorded in an object's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashLedger {
    hashes: BTreeMap<String, String>,
}

impl HashLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hash, returning true if it changed.
    pub fn record(&mut self, key: &str, hash: &str) -> bool {
        let (updated, changed) = record_and_detect_change(&self.hashes, key, hash);
        if changed {
            self.hashes = updated;
        }
        changed
    }

    /// Get the recorded hash for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.hashes.get(key).map(String::as_str)
    }

    /// All recorded hashes
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl From<BTreeMap<String, String>> for HashLedger {
    fn from(hashes: BTreeMap<String, String>) -> Self {
        Self { hashes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_key_is_change() {
        let (updated, changed) = record_and_detect_change(&BTreeMap::new(), INPUT_HASH_KEY, "abc");
        assert!(changed);
        assert_eq!(updated.get(INPUT_HASH_KEY).map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_same_value_is_not_change() {
        let mut previous = BTreeMap::new();
        previous.insert(INPUT_HASH_KEY.to_string(), "abc".to_string());
        let (updated, changed) = record_and_detect_change(&previous, INPUT_HASH_KEY, "abc");
        assert!(!changed);
        assert_eq!(updated, previous);
    }

    #[test]
    fn test_different_value_is_change() {
        let mut previous = BTreeMap::new();
        previous.insert(INPUT_HASH_KEY.to_string(), "abc".to_string());
        previous.insert("other".to_string(), "keep".to_string());
        let (updated, changed) = record_and_detect_change(&previous, INPUT_HASH_KEY, "def");
        assert!(changed);
        assert_eq!(updated.get(INPUT_HASH_KEY).map(String::as_str), Some("def"));
        assert_eq!(updated.get("other").map(String::as_str), Some("keep"));
        // The input map is untouched
        assert_eq!(previous.get(INPUT_HASH_KEY).map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_ledger_record() {
        let mut ledger = HashLedger::new();
        assert!(ledger.is_empty());
        assert!(ledger.record(INPUT_HASH_KEY, "one"));
        assert!(!ledger.record(INPUT_HASH_KEY, "one"));
        assert!(ledger.record(INPUT_HASH_KEY, "two"));
        assert_eq!(ledger.get(INPUT_HASH_KEY), Some("two"));
    }
}
