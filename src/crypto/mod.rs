//! Cryptographic primitives: hashing, key pairs, and signer recovery

pub mod hash;
pub mod keys;

pub use hash::{double_sha256, sha256, sha256_hex};
pub use keys::{
    public_key_from_hex, public_key_to_address, recover_signer, KeyError, KeyPair, OwnerSignature,
};
