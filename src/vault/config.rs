//! Vault configuration and identity derivation

use crate::crypto::{double_sha256, sha256};
use crate::vault::VaultError;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::collections::HashSet;

/// Configuration for a threshold vault
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VaultConfig {
    /// Minimum confirmations required (M in M-of-N)
    pub required: usize,
    /// Addresses of the initial owners (N)
    pub owners: Vec<String>,
    /// Optional human-readable label
    pub label: Option<String>,
}

impl VaultConfig {
    /// Create a new vault configuration
    ///
    /// # Errors
    /// Returns an error if the requirement is outside `1..=owners.len()`,
    /// an owner identity is empty, or the owner list contains duplicates.
    pub fn new(
        required: usize,
        owners: Vec<String>,
        label: Option<String>,
    ) -> Result<Self, VaultError> {
        if required == 0 || required > owners.len() {
            return Err(VaultError::InvalidRequirement {
                required,
                owners: owners.len(),
            });
        }

        let mut seen = HashSet::new();
        for owner in &owners {
            if owner.is_empty() {
                return Err(VaultError::NullOwner);
            }
            if !seen.insert(owner.as_str()) {
                return Err(VaultError::DuplicateOwner(owner.clone()));
            }
        }

        Ok(Self {
            required,
            owners,
            label,
        })
    }

    /// Get the total owner count (N)
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.required, self.owners.len())
    }

    /// Derive the vault's own address from this configuration
    ///
    /// Address = Base58Check(version || RIPEMD160(SHA256(required || sorted owners))).
    /// Derived once at construction; later governance changes to the owner
    /// set never re-derive it, so the vault identity is stable for the
    /// lifetime of the vault.
    pub fn derive_address(&self) -> String {
        // Sort owners for a deterministic identity
        let mut sorted_owners = self.owners.clone();
        sorted_owners.sort();

        let mut preimage = vec![self.required as u8];
        for owner in &sorted_owners {
            preimage.extend_from_slice(owner.as_bytes());
        }

        // SHA256 then RIPEMD160
        let sha256_hash = sha256(&preimage);
        let mut ripemd = Ripemd160::new();
        ripemd.update(&sha256_hash);
        let ripemd_hash = ripemd.finalize();

        // Version byte 0x05 (script-style, produces addresses starting with '3')
        let mut address_bytes = vec![0x05];
        address_bytes.extend_from_slice(&ripemd_hash);

        let checksum = double_sha256(&address_bytes);
        address_bytes.extend_from_slice(&checksum[..4]);

        bs58::encode(address_bytes).into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_owners() -> Vec<String> {
        vec!["alice".to_string(), "bob".to_string(), "carol".to_string()]
    }

    #[test]
    fn test_config_creation() {
        let config = VaultConfig::new(2, sample_owners(), Some("Treasury".to_string())).unwrap();

        assert_eq!(config.required, 2);
        assert_eq!(config.owner_count(), 3);
        assert_eq!(config.description(), "2-of-3");
        assert!(config.label.is_some());
    }

    #[test]
    fn test_config_validation() {
        // Zero requirement
        assert!(matches!(
            VaultConfig::new(0, sample_owners(), None),
            Err(VaultError::InvalidRequirement { .. })
        ));

        // Requirement > owners
        assert!(matches!(
            VaultConfig::new(4, sample_owners(), None),
            Err(VaultError::InvalidRequirement { .. })
        ));

        // Single owner with requirement 1 is legal
        assert!(VaultConfig::new(1, vec!["solo".to_string()], None).is_ok());

        // Empty owner identity
        assert!(matches!(
            VaultConfig::new(1, vec![String::new()], None),
            Err(VaultError::NullOwner)
        ));

        // Duplicate owners
        assert!(matches!(
            VaultConfig::new(2, vec!["same".to_string(), "same".to_string()], None),
            Err(VaultError::DuplicateOwner(_))
        ));
    }

    #[test]
    fn test_address_determinism() {
        let config1 = VaultConfig::new(2, sample_owners(), None).unwrap();
        let config2 = VaultConfig::new(2, sample_owners(), None).unwrap();

        // Same config produces the same address
        assert_eq!(config1.derive_address(), config2.derive_address());

        // Script-style addresses start with '3'
        assert!(config1.derive_address().starts_with('3'));
    }

    #[test]
    fn test_address_depends_on_requirement() {
        let two_of_three = VaultConfig::new(2, sample_owners(), None).unwrap();
        let three_of_three = VaultConfig::new(3, sample_owners(), None).unwrap();
        assert_ne!(two_of_three.derive_address(), three_of_three.derive_address());
    }
}
