//! Vault persistence layer
//!
//! Provides save/load functionality for the vault state.

use crate::vault::Vault;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: std::path::PathBuf,
    pub vault_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: std::path::PathBuf::from(".vault_data"),
            vault_file: "vault.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Vault storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    /// Get the vault file path
    fn vault_path(&self) -> std::path::PathBuf {
        self.config.data_dir.join(&self.config.vault_file)
    }

    /// Get a backup file path
    fn backup_path(&self, index: usize) -> std::path::PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.vault_file, index))
    }

    /// Save the vault to disk
    pub fn save(&self, vault: &Vault) -> Result<(), StorageError> {
        let path = self.vault_path();

        // Create backup if enabled
        if self.config.backup_enabled && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self.config.data_dir.join("vault.tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, vault)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Load the vault from disk.
    ///
    /// Effect handlers are process-local and not persisted; callers
    /// re-register them after loading.
    pub fn load(&self) -> Result<Vault, StorageError> {
        let path = self.vault_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Vault file not found".to_string(),
            ));
        }

        let file = fs::File::open(&path)?;
        let reader = BufReader::new(file);

        let vault: Vault = serde_json::from_reader(reader)?;
        Ok(vault)
    }

    /// Check if a saved vault exists
    pub fn exists(&self) -> bool {
        self.vault_path().exists()
    }

    /// Delete the saved vault
    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.vault_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                let next = self.backup_path(i + 1);
                fs::rename(&current, &next)?;
            }
        }

        Ok(())
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        let mut backups = Vec::new();

        for i in 0..self.config.max_backups {
            if self.backup_path(i).exists() {
                backups.push(i);
            }
        }

        backups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{VaultConfig, VaultEvent};

    fn sample_vault() -> Vault {
        let config = VaultConfig::new(
            2,
            vec!["alice".to_string(), "bob".to_string(), "carol".to_string()],
            Some("Treasury".to_string()),
        )
        .unwrap();
        let mut vault = Vault::new(config).unwrap();
        vault.deposit("funder", 100);
        let id = vault.submit("alice", "recipient", 40, vec![], 0).unwrap();
        vault.confirm(&id, "bob").unwrap();
        vault
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let vault = sample_vault();

        storage.save(&vault).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.address(), vault.address());
        assert_eq!(loaded.owners(), vault.owners());
        assert_eq!(loaded.required(), vault.required());
        assert_eq!(loaded.balance(), vault.balance());
        assert_eq!(loaded.list_executed(), vault.list_executed());
        assert_eq!(loaded.events().len(), vault.events().len());
        assert!(loaded
            .events()
            .iter()
            .any(|r| matches!(&r.event, VaultEvent::Execution { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        assert!(!storage.exists());
        assert!(matches!(
            storage.load(),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            max_backups: 3,
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let mut vault = sample_vault();

        // Save multiple times
        for i in 0..5 {
            storage.save(&vault).unwrap();
            vault.deposit("funder", i);
        }

        // Should have at most 3 backups
        let backups = storage.list_backups();
        assert!(backups.len() <= 3);
        assert!(!backups.is_empty());
    }

    #[test]
    fn test_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        storage.save(&sample_vault()).unwrap();
        storage.delete().unwrap();
        assert!(!storage.exists());
    }
}
