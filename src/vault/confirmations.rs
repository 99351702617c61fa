//! Per-transaction, per-owner confirmation flags
//!
//! The ledger records which identities have confirmed which transaction.
//! It deliberately knows nothing about the current owner set: counts are
//! always recomputed against the owner sequence supplied by the caller,
//! so a confirmation from a since-removed owner silently stops counting
//! toward quorum without any explicit revocation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Confirmation flags keyed by (transaction id, owner identity)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfirmationLedger {
    confirmations: HashMap<String, HashSet<String>>,
}

impl ConfirmationLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confirmation flag for (id, owner).
    ///
    /// Returns false if the flag was already set (idempotence signal for
    /// the batch path, a duplicate error for the direct path).
    pub fn record(&mut self, id: &str, owner: &str) -> bool {
        self.confirmations
            .entry(id.to_string())
            .or_default()
            .insert(owner.to_string())
    }

    /// Clear the confirmation flag for (id, owner).
    ///
    /// Returns false if no flag was set.
    pub fn clear(&mut self, id: &str, owner: &str) -> bool {
        self.confirmations
            .get_mut(id)
            .map(|set| set.remove(owner))
            .unwrap_or(false)
    }

    /// Whether (id, owner) has a set flag
    pub fn has_confirmed(&self, id: &str, owner: &str) -> bool {
        self.confirmations
            .get(id)
            .map(|set| set.contains(owner))
            .unwrap_or(false)
    }

    /// Count set flags for `id` among the given current owners
    pub fn count_for(&self, id: &str, owners: &[String]) -> usize {
        match self.confirmations.get(id) {
            Some(set) => owners.iter().filter(|o| set.contains(o.as_str())).count(),
            None => 0,
        }
    }

    /// The subset of the given owners that have confirmed `id`,
    /// in owner-sequence order
    pub fn confirmers<'a>(&self, id: &str, owners: &'a [String]) -> Vec<&'a str> {
        match self.confirmations.get(id) {
            Some(set) => owners
                .iter()
                .filter(|o| set.contains(o.as_str()))
                .map(|o| o.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners() -> Vec<String> {
        vec!["alice".to_string(), "bob".to_string(), "carol".to_string()]
    }

    #[test]
    fn test_record_and_query() {
        let mut ledger = ConfirmationLedger::new();
        assert!(ledger.record("tx1", "alice"));
        assert!(ledger.has_confirmed("tx1", "alice"));
        assert!(!ledger.has_confirmed("tx1", "bob"));
        assert!(!ledger.has_confirmed("tx2", "alice"));
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut ledger = ConfirmationLedger::new();
        assert!(ledger.record("tx1", "alice"));
        assert!(!ledger.record("tx1", "alice"));
        assert_eq!(ledger.count_for("tx1", &owners()), 1);
    }

    #[test]
    fn test_clear() {
        let mut ledger = ConfirmationLedger::new();
        ledger.record("tx1", "alice");
        assert!(ledger.clear("tx1", "alice"));
        assert!(!ledger.has_confirmed("tx1", "alice"));
        assert!(!ledger.clear("tx1", "alice"));
        assert!(!ledger.clear("tx2", "bob"));
    }

    #[test]
    fn test_count_uses_supplied_owner_set() {
        let mut ledger = ConfirmationLedger::new();
        ledger.record("tx1", "alice");
        ledger.record("tx1", "bob");
        ledger.record("tx1", "mallory");

        // mallory's flag exists but is not a current owner
        assert_eq!(ledger.count_for("tx1", &owners()), 2);

        // Removing bob from the owner set drops his flag from the count
        let shrunk = vec!["alice".to_string(), "carol".to_string()];
        assert_eq!(ledger.count_for("tx1", &shrunk), 1);
    }

    #[test]
    fn test_confirmers_in_owner_order() {
        let mut ledger = ConfirmationLedger::new();
        ledger.record("tx1", "carol");
        ledger.record("tx1", "alice");

        let owners = owners();
        assert_eq!(ledger.confirmers("tx1", &owners), vec!["alice", "carol"]);
        assert!(ledger.confirmers("tx9", &owners).is_empty());
    }
}
