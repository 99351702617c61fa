//! The vault engine: confirm, check quorum, execute
//!
//! Orchestrates the owner registry, transaction store and confirmation
//! ledger into one authorization pipeline. Governance changes flow
//! through the identical pipeline as value transfers: they are ordinary
//! transactions whose destination is the vault's own address, dispatched
//! at execution time into the registry's privileged entry points.

use crate::crypto::{recover_signer, OwnerSignature};
use crate::vault::config::VaultConfig;
use crate::vault::confirmations::ConfirmationLedger;
use crate::vault::effects::{AccountBook, EffectError, EffectHandler};
use crate::vault::events::{EventLog, EventRecord, VaultEvent};
use crate::vault::owners::OwnerRegistry;
use crate::vault::transaction::{Transaction, TransactionStore};
use crate::vault::VaultError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;

/// A privileged registry operation, carried as the payload of a
/// transaction whose destination is the vault itself. There is no other
/// path to the registry mutators.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GovernanceAction {
    AddOwner { owner: String },
    RemoveOwner { owner: String },
    SetRequirement { required: usize },
}

impl GovernanceAction {
    /// Encode as a transaction payload
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode from a transaction payload
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// Result of a single execution attempt
enum ExecOutcome {
    /// Quorum met, effect performed
    Executed,
    /// Quorum not met, nothing happened
    Pending,
    /// Quorum met but the effect failed; state rolled back
    Failed(String),
}

/// An M-of-N threshold-authorization vault.
///
/// All shared state (owner set, quorum, transaction records,
/// confirmation flags, value pool) is exclusively owned here and mutated
/// only through the transactional methods below; each call either
/// commits fully or returns an error with state unchanged.
#[derive(Serialize, Deserialize)]
pub struct Vault {
    /// The vault's own identity, fixed at construction
    address: String,
    /// Optional human-readable label
    label: Option<String>,
    registry: OwnerRegistry,
    store: TransactionStore,
    ledger: ConfirmationLedger,
    events: EventLog,
    /// Pooled value under joint control
    balance: u64,
    /// Default effect stand-in for plain value transfers
    book: AccountBook,
    /// Registered external capabilities by destination; process-local,
    /// re-registered after a reload
    #[serde(skip)]
    handlers: HashMap<String, Box<dyn EffectHandler>>,
}

impl Vault {
    /// Create a vault from a validated configuration
    pub fn new(config: VaultConfig) -> Result<Self, VaultError> {
        let address = config.derive_address();
        let registry = OwnerRegistry::new(config.owners, config.required)?;

        log::info!(
            "Vault {} created: {}-of-{}",
            address,
            registry.required(),
            registry.len()
        );

        Ok(Self {
            address,
            label: config.label,
            registry,
            store: TransactionStore::new(),
            ledger: ConfirmationLedger::new(),
            events: EventLog::new(),
            balance: 0,
            book: AccountBook::new(),
            handlers: HashMap::new(),
        })
    }

    // ========================================================================
    // Submission & confirmation
    // ========================================================================

    /// Propose a transaction and auto-confirm as the caller.
    ///
    /// Resubmitting identical parameters is idempotent: the existing id
    /// is returned and no duplicate pending entry or confirmation is
    /// created. The caller must be a current owner; that is checked
    /// before anything is recorded, so a failed call leaves no trace.
    pub fn submit(
        &mut self,
        caller: &str,
        destination: &str,
        value: u64,
        payload: Vec<u8>,
        nonce: u64,
    ) -> Result<String, VaultError> {
        if !self.registry.is_owner(caller) {
            return Err(VaultError::NotAnOwner(caller.to_string()));
        }

        let (id, created) = self.store.propose_or_fetch(destination, value, payload, nonce)?;
        if created {
            log::info!("Transaction {} submitted by {}", id, caller);
            self.events.emit(VaultEvent::Submission { tx_id: id.clone() });
        }

        if self.ledger.record(&id, caller) {
            self.events.emit(VaultEvent::Confirmation {
                tx_id: id.clone(),
                owner: caller.to_string(),
            });
            if !self.store.is_executed(&id) {
                self.attempt_after_confirmation(&id);
            }
        }

        Ok(id)
    }

    /// Propose a transaction and confirm it from off-band signatures.
    ///
    /// The whole batch is validated before anything is recorded: if any
    /// signature fails to recover to a current owner, the call fails and
    /// the transaction is not created.
    pub fn submit_with_signatures(
        &mut self,
        destination: &str,
        value: u64,
        payload: Vec<u8>,
        nonce: u64,
        signatures: &[OwnerSignature],
    ) -> Result<String, VaultError> {
        if destination.is_empty() {
            return Err(VaultError::NullDestination);
        }

        let id = Transaction::content_hash(destination, value, &payload, nonce);
        let digest = hex::decode(&id).unwrap_or_default();
        let signers = self.recover_batch(&digest, signatures)?;

        let (id, created) = self.store.propose_or_fetch(destination, value, payload, nonce)?;
        if created {
            log::info!("Transaction {} submitted with {} signatures", id, signatures.len());
            self.events.emit(VaultEvent::Submission { tx_id: id.clone() });
        }

        self.record_batch(&id, signers);
        Ok(id)
    }

    /// Record a direct confirmation from `caller` and attempt execution.
    ///
    /// Confirming an already-executed transaction is accepted but inert:
    /// execution is terminal, so the recorded flag can never retrigger.
    pub fn confirm(&mut self, id: &str, caller: &str) -> Result<(), VaultError> {
        if !self.registry.is_owner(caller) {
            return Err(VaultError::NotAnOwner(caller.to_string()));
        }
        self.store.get(id)?;
        if self.ledger.has_confirmed(id, caller) {
            return Err(VaultError::AlreadyConfirmed(caller.to_string()));
        }

        self.ledger.record(id, caller);
        log::info!("Transaction {} confirmed by {}", id, caller);
        self.events.emit(VaultEvent::Confirmation {
            tx_id: id.to_string(),
            owner: caller.to_string(),
        });

        if !self.store.is_executed(id) {
            self.attempt_after_confirmation(id);
        }
        Ok(())
    }

    /// Confirm a known transaction from a batch of off-band signatures.
    ///
    /// Atomic over the entire batch: every signature must recover to a
    /// current owner or nothing is recorded. Re-confirming an identity
    /// (within the batch or across calls) is harmless; execution is
    /// attempted exactly once afterwards.
    pub fn confirm_with_signatures(
        &mut self,
        id: &str,
        signatures: &[OwnerSignature],
    ) -> Result<(), VaultError> {
        let digest = self.store.get(id)?.digest();
        let signers = self.recover_batch(&digest, signatures)?;
        self.record_batch(id, signers);
        Ok(())
    }

    /// Clear the caller's confirmation for a still-pending transaction
    pub fn revoke(&mut self, id: &str, caller: &str) -> Result<(), VaultError> {
        if !self.registry.is_owner(caller) {
            return Err(VaultError::NotAnOwner(caller.to_string()));
        }
        self.store.get(id)?;
        if !self.ledger.has_confirmed(id, caller) {
            return Err(VaultError::NotConfirmed(caller.to_string()));
        }
        if self.store.is_executed(id) {
            return Err(VaultError::AlreadyExecuted(id.to_string()));
        }

        self.ledger.clear(id, caller);
        log::info!("Confirmation revoked by {} on {}", caller, id);
        self.events.emit(VaultEvent::Revocation {
            tx_id: id.to_string(),
            owner: caller.to_string(),
        });
        Ok(())
    }

    /// Validate a signature batch against the current owner set.
    /// Nothing is recorded here; a single bad signature fails the call.
    fn recover_batch(
        &self,
        digest: &[u8],
        signatures: &[OwnerSignature],
    ) -> Result<Vec<String>, VaultError> {
        let mut signers = Vec::with_capacity(signatures.len());
        for signature in signatures {
            let signer = recover_signer(digest, signature)?;
            if !self.registry.is_owner(&signer) {
                return Err(VaultError::NotAnOwner(signer));
            }
            signers.push(signer);
        }
        Ok(signers)
    }

    /// Record validated batch signers (idempotent per identity), then
    /// attempt execution once.
    fn record_batch(&mut self, id: &str, signers: Vec<String>) {
        for signer in signers {
            if self.ledger.record(id, &signer) {
                log::info!("Transaction {} confirmed by {} (signature)", id, signer);
                self.events.emit(VaultEvent::Confirmation {
                    tx_id: id.to_string(),
                    owner: signer,
                });
            }
        }
        if !self.store.is_executed(id) {
            self.attempt_after_confirmation(id);
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Explicit execution entry point, callable by anyone.
    ///
    /// Returns `Ok(true)` if the effect was performed, `Ok(false)` if
    /// quorum is not yet met (no-op), `AlreadyExecuted` for a terminal
    /// transaction, and `EffectFailed` when quorum was met but the
    /// effect failed — the transaction then stays pending and the call
    /// can be retried once conditions change.
    pub fn execute(&mut self, id: &str) -> Result<bool, VaultError> {
        match self.attempt_execute(id)? {
            ExecOutcome::Executed => Ok(true),
            ExecOutcome::Pending => Ok(false),
            ExecOutcome::Failed(reason) => Err(VaultError::EffectFailed(reason)),
        }
    }

    /// Execution attempt triggered by a confirmation. An effect failure
    /// here never fails the confirmation: the flag stays recorded and
    /// the failure is observable through the event log.
    fn attempt_after_confirmation(&mut self, id: &str) {
        if let Err(e) = self.attempt_execute(id) {
            // Unknown/executed cannot occur here; keep the log honest anyway.
            log::warn!("Execution attempt for {} rejected: {}", id, e);
        }
    }

    fn attempt_execute(&mut self, id: &str) -> Result<ExecOutcome, VaultError> {
        if self.store.get(id)?.executed {
            return Err(VaultError::AlreadyExecuted(id.to_string()));
        }
        if !self.is_confirmed(id) {
            return Ok(ExecOutcome::Pending);
        }

        let tx = self.store.get(id)?.clone();

        // Commit the terminal flag strictly before the effect runs: a
        // re-entrant attempt for this transaction observes it as executed
        // and is rejected.
        self.store.mark_executed(id);

        match self.perform_effect(&tx) {
            Ok(()) => {
                log::info!("Transaction {} executed", id);
                self.events.emit(VaultEvent::Execution {
                    tx_id: id.to_string(),
                });
                Ok(ExecOutcome::Executed)
            }
            Err(reason) => {
                // Roll back within the same call; the transaction stays
                // pending and may be retried later.
                self.store.clear_executed(id);
                log::warn!("Transaction {} failed: {}", id, reason);
                self.events.emit(VaultEvent::ExecutionFailure {
                    tx_id: id.to_string(),
                    reason: reason.clone(),
                });
                Ok(ExecOutcome::Failed(reason))
            }
        }
    }

    /// Perform the external effect for a confirmed transaction.
    /// All-or-nothing: on error nothing observable has happened.
    fn perform_effect(&mut self, tx: &Transaction) -> Result<(), String> {
        if tx.destination == self.address {
            // Self-targeted: governance dispatch. No value moves.
            return self.dispatch_governance(&tx.payload).map_err(|e| e.to_string());
        }

        if tx.value > self.balance {
            return Err(EffectError::InsufficientFunds {
                have: self.balance,
                need: tx.value,
            }
            .to_string());
        }

        let result = match self.handlers.get_mut(&tx.destination) {
            Some(handler) => handler.invoke(&tx.destination, tx.value, &tx.payload),
            None => self.book.invoke(&tx.destination, tx.value, &tx.payload),
        };
        result.map_err(|e| e.to_string())?;

        self.balance -= tx.value;
        Ok(())
    }

    /// Dispatch a self-targeted payload into the registry's privileged
    /// entry points. A malformed payload or a registry error is an effect
    /// failure: the triggering execution rolls back and stays retryable.
    fn dispatch_governance(&mut self, payload: &[u8]) -> Result<(), VaultError> {
        let action = GovernanceAction::decode(payload)
            .map_err(|e| VaultError::EffectFailed(format!("malformed governance payload: {}", e)))?;

        match action {
            GovernanceAction::AddOwner { owner } => {
                self.registry.add_owner(&owner)?;
                self.events.emit(VaultEvent::OwnerAdded { owner });
            }
            GovernanceAction::RemoveOwner { owner } => {
                let before = self.registry.required();
                self.registry.remove_owner(&owner)?;
                self.events.emit(VaultEvent::OwnerRemoved { owner });
                // Removal may auto-lower the requirement
                if self.registry.required() != before {
                    self.events.emit(VaultEvent::RequirementChanged {
                        required: self.registry.required(),
                    });
                }
            }
            GovernanceAction::SetRequirement { required } => {
                self.registry.set_required(required)?;
                self.events.emit(VaultEvent::RequirementChanged { required });
            }
        }
        Ok(())
    }

    /// Convenience: submit a governance action as a self-targeted
    /// transaction through the ordinary pipeline.
    pub fn submit_governance(
        &mut self,
        caller: &str,
        action: &GovernanceAction,
        nonce: u64,
    ) -> Result<String, VaultError> {
        let destination = self.address.clone();
        self.submit(caller, &destination, 0, action.encode(), nonce)
    }

    // ========================================================================
    // Deposits
    // ========================================================================

    /// Accept unsolicited value into the pool. Not a governed
    /// transaction: no quorum, only a Deposit notification.
    pub fn deposit(&mut self, sender: &str, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
        log::info!("Deposit of {} from {} (pool now {})", amount, sender, self.balance);
        self.events.emit(VaultEvent::Deposit {
            sender: sender.to_string(),
            amount,
        });
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether the current confirmations meet the requirement.
    /// Scans the current owner sequence, short-circuiting at the
    /// threshold; the short-circuit is invisible to callers.
    pub fn is_confirmed(&self, id: &str) -> bool {
        let required = self.registry.required();
        let mut count = 0;
        for owner in self.registry.owners() {
            if self.ledger.has_confirmed(id, owner) {
                count += 1;
                if count >= required {
                    return true;
                }
            }
        }
        false
    }

    /// Count of current owners with a set confirmation flag
    pub fn confirmation_count(&self, id: &str) -> usize {
        self.ledger.count_for(id, self.registry.owners())
    }

    /// The current owners that have confirmed `id`
    pub fn confirmations(&self, id: &str) -> Vec<&str> {
        self.ledger.confirmers(id, self.registry.owners())
    }

    /// Whether a transaction's effect has been performed
    pub fn is_executed(&self, id: &str) -> bool {
        self.store.is_executed(id)
    }

    /// Pending transaction ids in submission order
    pub fn list_pending(&self) -> Vec<String> {
        self.store.list_pending()
    }

    /// Executed transaction ids in submission order
    pub fn list_executed(&self) -> Vec<String> {
        self.store.list_executed()
    }

    /// Look up a transaction record
    pub fn transaction(&self, id: &str) -> Result<&Transaction, VaultError> {
        self.store.get(id)
    }

    /// The vault's own identity
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Optional label
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Confirmations required to execute
    pub fn required(&self) -> usize {
        self.registry.required()
    }

    /// Whether an identity is a current owner
    pub fn is_owner(&self, identity: &str) -> bool {
        self.registry.is_owner(identity)
    }

    /// The current owner sequence
    pub fn owners(&self) -> &[String] {
        self.registry.owners()
    }

    /// Pooled value under joint control
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// The default credit book (balances of executed transfers)
    pub fn book(&self) -> &AccountBook {
        &self.book
    }

    /// Events emitted so far, oldest first
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    /// Open a live channel receiving every event emitted from now on
    pub fn subscribe(&mut self) -> Receiver<EventRecord> {
        self.events.subscribe()
    }

    /// Register an external capability for a destination. Registered
    /// handlers take precedence over the default credit book.
    pub fn register_handler<H: EffectHandler + 'static>(&mut self, destination: &str, handler: H) {
        self.handlers.insert(destination.to_string(), Box::new(handler));
    }
}
