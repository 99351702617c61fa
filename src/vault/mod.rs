//! Threshold-authorization vault engine
//!
//! An M-of-N vault: a set of registered owners jointly controls a pool
//! of value and the right to invoke external actions. Any action is a
//! transaction identified by its content hash; it executes exactly once,
//! after at least `required` distinct current owners have confirmed it.
//!
//! # Example
//!
//! ```ignore
//! use quorum_vault::vault::{Vault, VaultConfig};
//!
//! // Create a 2-of-3 vault
//! let config = VaultConfig::new(2, vec![a.clone(), b.clone(), c.clone()], None)?;
//! let mut vault = Vault::new(config)?;
//! vault.deposit("funder", 100);
//!
//! // Propose a transfer (auto-confirms as the submitter)
//! let tx = vault.submit(&a, "recipient", 40, vec![], 0)?;
//!
//! // Second confirmation reaches quorum and executes
//! vault.confirm(&tx, &b)?;
//! assert!(vault.is_executed(&tx));
//! ```

pub mod config;
pub mod confirmations;
pub mod effects;
pub mod engine;
pub mod events;
pub mod owners;
pub mod transaction;

pub use config::VaultConfig;
pub use confirmations::ConfirmationLedger;
pub use effects::{AccountBook, EffectError, EffectHandler};
pub use engine::{GovernanceAction, Vault};
pub use events::{EventLog, EventRecord, VaultEvent};
pub use owners::OwnerRegistry;
pub use transaction::{Transaction, TransactionStore};

use thiserror::Error;

/// Errors raised by vault operations
///
/// Every error is local to the triggering call: the operation aborts and
/// leaves state exactly as before it.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Not an owner: {0}")]
    NotAnOwner(String),
    #[error("Owner already registered: {0}")]
    DuplicateOwner(String),
    #[error("Unknown owner: {0}")]
    UnknownOwner(String),
    #[error("Owner identity must not be empty")]
    NullOwner,
    #[error("Invalid requirement: need between 1 and {owners} signatures, got {required}")]
    InvalidRequirement { required: usize, owners: usize },
    #[error("Destination must not be empty")]
    NullDestination,
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),
    #[error("Already confirmed by {0}")]
    AlreadyConfirmed(String),
    #[error("No confirmation recorded for {0}")]
    NotConfirmed(String),
    #[error("Transaction already executed: {0}")]
    AlreadyExecuted(String),
    #[error("External effect failed: {0}")]
    EffectFailed(String),
    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::KeyError),
}
