//! Owner registry: the principal set and the quorum threshold
//!
//! Mutation is privileged: the mutators are `pub(crate)` and only
//! reachable through the engine's governance dispatch, which itself runs
//! only as an executed self-targeted transaction.

use crate::vault::VaultError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The registered owner set and the signature requirement.
///
/// Owners are kept twice: an ordered sequence for enumeration and quorum
/// scans, and a membership set for O(1) lookups. The two structures are
/// updated together by every mutation and must always agree; removal
/// swap-removes from the sequence, so enumeration order is not preserved
/// across removals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnerRegistry {
    /// Ordered owner sequence (swap-removed, order not stable)
    owners: Vec<String>,
    /// Membership mirror of `owners`
    members: HashSet<String>,
    /// Confirmations required to execute a transaction
    required: usize,
}

impl OwnerRegistry {
    /// Build a registry from a validated owner list and requirement.
    ///
    /// Callers are expected to have validated via `VaultConfig::new`;
    /// the invariants are re-checked here so the registry can never be
    /// constructed in an inconsistent state.
    pub(crate) fn new(owners: Vec<String>, required: usize) -> Result<Self, VaultError> {
        if required == 0 || required > owners.len() {
            return Err(VaultError::InvalidRequirement {
                required,
                owners: owners.len(),
            });
        }

        let mut members = HashSet::new();
        for owner in &owners {
            if owner.is_empty() {
                return Err(VaultError::NullOwner);
            }
            if !members.insert(owner.clone()) {
                return Err(VaultError::DuplicateOwner(owner.clone()));
            }
        }

        Ok(Self {
            owners,
            members,
            required,
        })
    }

    /// Register a new owner
    pub(crate) fn add_owner(&mut self, owner: &str) -> Result<(), VaultError> {
        if owner.is_empty() {
            return Err(VaultError::NullOwner);
        }
        if self.members.contains(owner) {
            return Err(VaultError::DuplicateOwner(owner.to_string()));
        }

        self.members.insert(owner.to_string());
        self.owners.push(owner.to_string());
        log::info!("Owner added: {} ({} total)", owner, self.owners.len());
        Ok(())
    }

    /// Remove an owner, lowering the requirement if it now exceeds the
    /// owner count. The threshold adjustment never fails and needs no
    /// separate authorization.
    pub(crate) fn remove_owner(&mut self, owner: &str) -> Result<(), VaultError> {
        if !self.members.remove(owner) {
            return Err(VaultError::UnknownOwner(owner.to_string()));
        }

        let index = self
            .owners
            .iter()
            .position(|o| o == owner)
            .unwrap_or_else(|| unreachable!("members and owners always agree"));
        self.owners.swap_remove(index);

        if self.required > self.owners.len() {
            self.required = self.owners.len();
            log::info!("Requirement auto-lowered to {}", self.required);
        }
        log::info!("Owner removed: {} ({} remain)", owner, self.owners.len());
        Ok(())
    }

    /// Change the signature requirement
    pub(crate) fn set_required(&mut self, required: usize) -> Result<(), VaultError> {
        if required == 0 || required > self.owners.len() {
            return Err(VaultError::InvalidRequirement {
                required,
                owners: self.owners.len(),
            });
        }
        self.required = required;
        log::info!("Requirement changed to {}", required);
        Ok(())
    }

    /// Check whether an identity is a current owner
    pub fn is_owner(&self, identity: &str) -> bool {
        self.members.contains(identity)
    }

    /// The current owner sequence
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Number of registered owners
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// True when no owners remain (never the case for a live vault)
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Confirmations required to execute
    pub fn required(&self) -> usize {
        self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OwnerRegistry {
        OwnerRegistry::new(
            vec!["alice".to_string(), "bob".to_string(), "carol".to_string()],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_membership_agrees_with_sequence() {
        let reg = registry();
        assert_eq!(reg.len(), 3);
        for owner in reg.owners() {
            assert!(reg.is_owner(owner));
        }
        assert!(!reg.is_owner("mallory"));
    }

    #[test]
    fn test_add_owner() {
        let mut reg = registry();
        reg.add_owner("dave").unwrap();
        assert!(reg.is_owner("dave"));
        assert_eq!(reg.len(), 4);

        assert!(matches!(
            reg.add_owner("dave"),
            Err(VaultError::DuplicateOwner(_))
        ));
        assert!(matches!(reg.add_owner(""), Err(VaultError::NullOwner)));
    }

    #[test]
    fn test_remove_owner() {
        let mut reg = registry();
        reg.remove_owner("alice").unwrap();
        assert!(!reg.is_owner("alice"));
        assert_eq!(reg.len(), 2);
        // Sequence and set still agree after swap-remove
        for owner in reg.owners() {
            assert!(reg.is_owner(owner));
        }

        assert!(matches!(
            reg.remove_owner("alice"),
            Err(VaultError::UnknownOwner(_))
        ));
    }

    #[test]
    fn test_remove_auto_lowers_requirement() {
        let mut reg = OwnerRegistry::new(vec!["a".to_string(), "b".to_string()], 2).unwrap();
        reg.remove_owner("a").unwrap();
        assert_eq!(reg.required(), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_set_required_bounds() {
        let mut reg = registry();
        reg.set_required(3).unwrap();
        assert_eq!(reg.required(), 3);

        assert!(matches!(
            reg.set_required(0),
            Err(VaultError::InvalidRequirement { .. })
        ));
        assert!(matches!(
            reg.set_required(4),
            Err(VaultError::InvalidRequirement { .. })
        ));
        // Failed mutation leaves the previous value
        assert_eq!(reg.required(), 3);
    }

    #[test]
    fn test_new_rejects_bad_input() {
        assert!(matches!(
            OwnerRegistry::new(vec!["a".to_string()], 2),
            Err(VaultError::InvalidRequirement { .. })
        ));
        assert!(matches!(
            OwnerRegistry::new(vec!["a".to_string(), "a".to_string()], 1),
            Err(VaultError::DuplicateOwner(_))
        ));
    }
}
