//! Quorum-Vault: an M-of-N threshold-authorization vault in Rust
//!
//! This crate provides a complete vault engine featuring:
//! - Owner registry with quorum threshold management
//! - Content-addressed transaction store with idempotent submission
//! - Dual confirmation paths: direct per-owner calls and batched
//!   off-band secp256k1 recoverable signatures
//! - Atomic, re-entrancy-safe execution with all-or-nothing effects
//! - Self-referential governance: owner and quorum changes run through
//!   the same quorum pipeline as value transfers
//! - Append-only, subscribable event log
//! - JSON persistence with backups
//!
//! # Example
//!
//! ```rust
//! use quorum_vault::vault::{Vault, VaultConfig};
//!
//! // Create a 2-of-3 vault
//! let config = VaultConfig::new(
//!     2,
//!     vec!["alice".into(), "bob".into(), "carol".into()],
//!     None,
//! )
//! .unwrap();
//! let mut vault = Vault::new(config).unwrap();
//! vault.deposit("funder", 100);
//!
//! // Alice proposes a transfer (auto-confirms as her)
//! let tx = vault.submit("alice", "recipient", 40, vec![], 0).unwrap();
//! assert!(!vault.is_executed(&tx));
//!
//! // Bob's confirmation reaches quorum and executes the transfer
//! vault.confirm(&tx, "bob").unwrap();
//! assert!(vault.is_executed(&tx));
//! assert_eq!(vault.balance(), 60);
//! ```

pub mod cli;
pub mod crypto;
pub mod storage;
pub mod vault;

// Re-export commonly used types
pub use crypto::{recover_signer, KeyError, KeyPair, OwnerSignature};
pub use storage::{Storage, StorageConfig};
pub use vault::{
    AccountBook, ConfirmationLedger, EffectError, EffectHandler, EventRecord, GovernanceAction,
    OwnerRegistry, Transaction, TransactionStore, Vault, VaultConfig, VaultError, VaultEvent,
};
