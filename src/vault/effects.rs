//! The abstract external capability invoked at execution time
//!
//! "Invoke destination with value and payload" is host-specific; here it
//! is a trait with all-or-nothing semantics: a handler either fully
//! performs the call or returns an error, in which case the engine rolls
//! the triggering execution back and the transaction stays pending.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Failure of an external effect. Always retryable: the engine leaves the
/// transaction pending so a later `execute` can succeed once conditions
/// change.
#[derive(Error, Debug)]
pub enum EffectError {
    #[error("Destination rejected the call: {0}")]
    Rejected(String),
    #[error("Insufficient vault balance: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
}

/// An external capability the vault can invoke once quorum is reached.
///
/// Implementations must be all-or-nothing: on `Err` no observable part of
/// the call may have been performed.
pub trait EffectHandler {
    fn invoke(&mut self, destination: &str, value: u64, payload: &[u8]) -> Result<(), EffectError>;
}

/// Default effect stand-in: an internal credit book.
///
/// Executed value transfers credit the destination's account; the payload
/// is carried but ignored, like value sent to a plain account.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccountBook {
    accounts: HashMap<String, u64>,
}

impl AccountBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance credited to an account so far
    pub fn balance_of(&self, account: &str) -> u64 {
        self.accounts.get(account).copied().unwrap_or(0)
    }

    /// Accounts that have received value
    pub fn accounts(&self) -> impl Iterator<Item = (&str, u64)> {
        self.accounts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl EffectHandler for AccountBook {
    fn invoke(&mut self, destination: &str, value: u64, _payload: &[u8]) -> Result<(), EffectError> {
        let entry = self.accounts.entry(destination.to_string()).or_insert(0);
        *entry = entry.saturating_add(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_book_credits() {
        let mut book = AccountBook::new();
        book.invoke("dest", 30, b"ignored").unwrap();
        book.invoke("dest", 12, &[]).unwrap();
        assert_eq!(book.balance_of("dest"), 42);
        assert_eq!(book.balance_of("other"), 0);
    }

    #[test]
    fn test_account_book_enumeration() {
        let mut book = AccountBook::new();
        book.invoke("a", 1, &[]).unwrap();
        book.invoke("b", 2, &[]).unwrap();
        let mut seen: Vec<_> = book.accounts().collect();
        seen.sort();
        assert_eq!(seen, vec![("a", 1), ("b", 2)]);
    }
}
