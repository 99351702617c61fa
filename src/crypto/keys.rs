//! ECDSA key management for the vault
//!
//! Provides key pair generation, recoverable signing, and signer
//! recovery using the secp256k1 elliptic curve (same as Bitcoin).
//! Owner identities are Base58Check addresses derived from public keys,
//! so a recovered public key maps directly to a registered owner.

use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use thiserror::Error;

use super::hash::{double_sha256, sha256};

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid message digest: expected 32 bytes")]
    InvalidDigest,
    #[error("Signature recovery failed: {0}")]
    RecoveryFailed(String),
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A recoverable ECDSA signature as produced off-band by an owner.
///
/// The triplet (recovery id, r, s) is enough to recover the signer's
/// public key from the signed digest; `r` and `s` are hex-encoded
/// 32-byte scalars.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerSignature {
    /// Recovery id (0..=3)
    pub recovery_id: u8,
    /// First half of the compact signature (hex)
    pub r: String,
    /// Second half of the compact signature (hex)
    pub s: String,
}

impl OwnerSignature {
    /// Parse the triplet back into a library signature
    fn to_recoverable(&self) -> Result<RecoverableSignature, KeyError> {
        let rec_id = RecoveryId::from_i32(self.recovery_id as i32)
            .map_err(|e| KeyError::RecoveryFailed(format!("bad recovery id: {}", e)))?;

        let r = hex::decode(&self.r)
            .map_err(|_| KeyError::RecoveryFailed("r is not valid hex".to_string()))?;
        let s = hex::decode(&self.s)
            .map_err(|_| KeyError::RecoveryFailed("s is not valid hex".to_string()))?;
        if r.len() != 32 || s.len() != 32 {
            return Err(KeyError::RecoveryFailed(
                "r and s must each be 32 bytes".to_string(),
            ));
        }

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&r);
        compact[32..].copy_from_slice(&s);

        RecoverableSignature::from_compact(&compact, rec_id)
            .map_err(|e| KeyError::RecoveryFailed(e.to_string()))
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Derive the owner address for this key pair
    /// Uses Bitcoin-style address generation: Base58Check(RIPEMD160(SHA256(pubkey)))
    pub fn address(&self) -> String {
        public_key_to_address(&self.public_key)
    }

    /// Sign a 32-byte digest, producing a recoverable signature triplet
    pub fn sign_recoverable(&self, digest: &[u8]) -> Result<OwnerSignature, KeyError> {
        if digest.len() != 32 {
            return Err(KeyError::InvalidDigest);
        }

        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(digest)?;
        let signature = secp.sign_ecdsa_recoverable(&message, &self.secret_key);

        let (rec_id, compact) = signature.serialize_compact();
        Ok(OwnerSignature {
            recovery_id: rec_id.to_i32() as u8,
            r: hex::encode(&compact[..32]),
            s: hex::encode(&compact[32..]),
        })
    }
}

/// Convert a public key to a vault owner address
pub fn public_key_to_address(public_key: &PublicKey) -> String {
    // SHA256 of the public key
    let sha256_hash = sha256(&public_key.serialize());

    // RIPEMD160 of the SHA256 hash
    let mut ripemd = Ripemd160::new();
    ripemd.update(&sha256_hash);
    let ripemd_hash = ripemd.finalize();

    // Add version byte (0x00 for owner addresses)
    let mut address_bytes = vec![0x00];
    address_bytes.extend_from_slice(&ripemd_hash);

    // Checksum (first 4 bytes of double SHA256)
    let checksum = double_sha256(&address_bytes);
    address_bytes.extend_from_slice(&checksum[..4]);

    // Base58 encode
    bs58::encode(address_bytes).into_string()
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Recover the signer address from a 32-byte digest and a signature triplet.
///
/// Deterministic and side-effect-free: the same (digest, signature) pair
/// always yields the same address, matching standard secp256k1 recovery
/// semantics so that signatures produced off-band verify identically.
pub fn recover_signer(digest: &[u8], signature: &OwnerSignature) -> Result<String, KeyError> {
    if digest.len() != 32 {
        return Err(KeyError::InvalidDigest);
    }

    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)?;
    let recoverable = signature.to_recoverable()?;

    let public_key = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| KeyError::RecoveryFailed(e.to_string()))?;

    Ok(public_key_to_address(&public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert!(!kp.private_key_hex().is_empty());
        assert!(!kp.public_key_hex().is_empty());
        assert!(!kp.address().is_empty());
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let private_hex = kp1.private_key_hex();

        let kp2 = KeyPair::from_private_key_hex(&private_hex).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn test_address_format() {
        let kp = KeyPair::generate();
        let address = kp.address();
        // Version byte 0x00 produces addresses starting with 1
        assert!(address.starts_with('1'));
    }

    #[test]
    fn test_sign_and_recover() {
        let kp = KeyPair::generate();
        let digest = sha256(b"spend 40 coins");

        let sig = kp.sign_recoverable(&digest).unwrap();
        let recovered = recover_signer(&digest, &sig).unwrap();
        assert_eq!(recovered, kp.address());
    }

    #[test]
    fn test_recover_wrong_digest_yields_other_address() {
        let kp = KeyPair::generate();
        let digest = sha256(b"original message");
        let sig = kp.sign_recoverable(&digest).unwrap();

        // Recovery over a different digest still succeeds mathematically
        // but yields a different signer identity
        let other = sha256(b"tampered message");
        let recovered = recover_signer(&other, &sig).unwrap();
        assert_ne!(recovered, kp.address());
    }

    #[test]
    fn test_recover_malformed_signature() {
        let digest = sha256(b"message");

        // Out-of-range recovery id
        let bad_id = OwnerSignature {
            recovery_id: 7,
            r: hex::encode([1u8; 32]),
            s: hex::encode([2u8; 32]),
        };
        assert!(matches!(
            recover_signer(&digest, &bad_id),
            Err(KeyError::RecoveryFailed(_))
        ));

        // Truncated scalar
        let short_r = OwnerSignature {
            recovery_id: 0,
            r: hex::encode([1u8; 16]),
            s: hex::encode([2u8; 32]),
        };
        assert!(matches!(
            recover_signer(&digest, &short_r),
            Err(KeyError::RecoveryFailed(_))
        ));

        // Not hex at all
        let not_hex = OwnerSignature {
            recovery_id: 0,
            r: "zzzz".to_string(),
            s: hex::encode([2u8; 32]),
        };
        assert!(matches!(
            recover_signer(&digest, &not_hex),
            Err(KeyError::RecoveryFailed(_))
        ));
    }

    #[test]
    fn test_sign_rejects_short_digest() {
        let kp = KeyPair::generate();
        assert!(matches!(
            kp.sign_recoverable(b"short"),
            Err(KeyError::InvalidDigest)
        ));
    }
}
