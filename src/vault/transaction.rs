//! Transaction records and the content-addressed store
//!
//! A transaction is identified by the SHA-256 hash of its
//! (destination, value, payload, nonce) tuple, so resubmitting identical
//! parameters is idempotent: the store returns the existing id instead of
//! creating a second pending entry.

use crate::crypto::sha256;
use crate::vault::VaultError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A proposed action awaiting (or having received) quorum approval
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Content hash identifying this transaction (hex)
    pub id: String,
    /// Destination identity to invoke
    pub destination: String,
    /// Value to transfer out of the vault pool
    pub value: u64,
    /// Opaque call payload
    pub payload: Vec<u8>,
    /// Caller-supplied disambiguator for otherwise-identical tuples
    pub nonce: u64,
    /// Whether the external effect has been performed (false -> true, once)
    pub executed: bool,
    /// First submission time
    pub submitted_at: DateTime<Utc>,
}

impl Transaction {
    /// Compute the content hash for a (destination, value, payload, nonce)
    /// tuple. Fields are length-prefixed so distinct tuples can never
    /// collide through boundary ambiguity.
    pub fn content_hash(destination: &str, value: u64, payload: &[u8], nonce: u64) -> String {
        let mut preimage = Vec::with_capacity(destination.len() + payload.len() + 28);
        preimage.extend_from_slice(&(destination.len() as u32).to_be_bytes());
        preimage.extend_from_slice(destination.as_bytes());
        preimage.extend_from_slice(&value.to_be_bytes());
        preimage.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        preimage.extend_from_slice(payload);
        preimage.extend_from_slice(&nonce.to_be_bytes());
        hex::encode(sha256(&preimage))
    }

    /// The raw 32-byte digest owners sign for off-band confirmation
    pub fn digest(&self) -> Vec<u8> {
        hex::decode(&self.id).unwrap_or_default()
    }
}

/// Content-addressed transaction store with submission ordering.
///
/// Owns every transaction record exclusively; only the engine flips the
/// executed flag, through the crate-private methods below.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionStore {
    /// Transactions by content hash
    transactions: HashMap<String, Transaction>,
    /// Append-only submission order, one entry per distinct transaction
    order: Vec<String>,
}

impl TransactionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transaction, or fetch the id of an identical prior one.
    ///
    /// Returns `(id, created)`; `created` is false when the tuple was
    /// already known, in which case nothing changes.
    pub fn propose_or_fetch(
        &mut self,
        destination: &str,
        value: u64,
        payload: Vec<u8>,
        nonce: u64,
    ) -> Result<(String, bool), VaultError> {
        if destination.is_empty() {
            return Err(VaultError::NullDestination);
        }

        let id = Transaction::content_hash(destination, value, &payload, nonce);
        if self.transactions.contains_key(&id) {
            return Ok((id, false));
        }

        let tx = Transaction {
            id: id.clone(),
            destination: destination.to_string(),
            value,
            payload,
            nonce,
            executed: false,
            submitted_at: Utc::now(),
        };
        self.transactions.insert(id.clone(), tx);
        self.order.push(id.clone());
        Ok((id, true))
    }

    /// Look up a transaction by id
    pub fn get(&self, id: &str) -> Result<&Transaction, VaultError> {
        self.transactions
            .get(id)
            .ok_or_else(|| VaultError::UnknownTransaction(id.to_string()))
    }

    /// Whether a transaction's effect has been performed
    pub fn is_executed(&self, id: &str) -> bool {
        self.transactions.get(id).map(|tx| tx.executed).unwrap_or(false)
    }

    /// Pending transaction ids, in submission order
    pub fn list_pending(&self) -> Vec<String> {
        self.partition(false)
    }

    /// Executed transaction ids, in submission order
    pub fn list_executed(&self) -> Vec<String> {
        self.partition(true)
    }

    fn partition(&self, executed: bool) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                self.transactions
                    .get(id.as_str())
                    .map(|tx| tx.executed == executed)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Total number of distinct transactions ever submitted
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when nothing has been submitted yet
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Commit the executed flag. Called by the engine strictly before the
    /// external effect runs.
    pub(crate) fn mark_executed(&mut self, id: &str) {
        if let Some(tx) = self.transactions.get_mut(id) {
            tx.executed = true;
        }
    }

    /// Roll the executed flag back after a failed effect, restoring the
    /// transaction to pending within the same call.
    pub(crate) fn clear_executed(&mut self, id: &str) {
        if let Some(tx) = self.transactions.get_mut(id) {
            tx.executed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_deterministic() {
        let a = Transaction::content_hash("dest", 10, b"pay", 0);
        let b = Transaction::content_hash("dest", 10, b"pay", 0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_distinguishes_fields() {
        let base = Transaction::content_hash("dest", 10, b"pay", 0);
        assert_ne!(base, Transaction::content_hash("dest2", 10, b"pay", 0));
        assert_ne!(base, Transaction::content_hash("dest", 11, b"pay", 0));
        assert_ne!(base, Transaction::content_hash("dest", 10, b"pax", 0));
        assert_ne!(base, Transaction::content_hash("dest", 10, b"pay", 1));
    }

    #[test]
    fn test_content_hash_no_boundary_ambiguity() {
        // Same concatenated bytes, different field split
        let a = Transaction::content_hash("ab", 0, b"c", 0);
        let b = Transaction::content_hash("a", 0, b"bc", 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_propose_is_idempotent() {
        let mut store = TransactionStore::new();
        let (id1, created1) = store.propose_or_fetch("dest", 10, vec![], 0).unwrap();
        let (id2, created2) = store.propose_or_fetch("dest", 10, vec![], 0).unwrap();

        assert_eq!(id1, id2);
        assert!(created1);
        assert!(!created2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list_pending(), vec![id1]);
    }

    #[test]
    fn test_nonce_disambiguates() {
        let mut store = TransactionStore::new();
        let (id1, _) = store.propose_or_fetch("dest", 10, vec![], 0).unwrap();
        let (id2, _) = store.propose_or_fetch("dest", 10, vec![], 1).unwrap();
        assert_ne!(id1, id2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_null_destination_rejected() {
        let mut store = TransactionStore::new();
        assert!(matches!(
            store.propose_or_fetch("", 10, vec![], 0),
            Err(VaultError::NullDestination)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_partition_by_executed() {
        let mut store = TransactionStore::new();
        let (a, _) = store.propose_or_fetch("dest", 1, vec![], 0).unwrap();
        let (b, _) = store.propose_or_fetch("dest", 2, vec![], 0).unwrap();
        let (c, _) = store.propose_or_fetch("dest", 3, vec![], 0).unwrap();

        store.mark_executed(&b);

        assert_eq!(store.list_pending(), vec![a.clone(), c.clone()]);
        assert_eq!(store.list_executed(), vec![b.clone()]);
        assert!(store.is_executed(&b));
        assert!(!store.is_executed(&a));

        // Rollback restores pending membership
        store.clear_executed(&b);
        assert_eq!(store.list_pending(), vec![a, b, c]);
        assert!(store.list_executed().is_empty());
    }

    #[test]
    fn test_unknown_transaction() {
        let store = TransactionStore::new();
        assert!(matches!(
            store.get("deadbeef"),
            Err(VaultError::UnknownTransaction(_))
        ));
        assert!(!store.is_executed("deadbeef"));
    }

    #[test]
    fn test_digest_round_trip() {
        let mut store = TransactionStore::new();
        let (id, _) = store.propose_or_fetch("dest", 10, b"p".to_vec(), 0).unwrap();
        let tx = store.get(&id).unwrap();
        assert_eq!(hex::encode(tx.digest()), id);
        assert_eq!(tx.digest().len(), 32);
    }
}
