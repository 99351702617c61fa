//! Persistence for vault state

pub mod persistence;

pub use persistence::{Storage, StorageConfig, StorageError};
