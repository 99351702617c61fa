//! CLI commands for the vault
//!
//! Implements all command handlers for the CLI interface.

use crate::crypto::{KeyPair, OwnerSignature};
use crate::storage::{Storage, StorageConfig};
use crate::vault::{GovernanceAction, Vault, VaultConfig};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub vault: Vault,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the vault from the data directory
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };
        let storage = Storage::new(storage_config)?;

        if !storage.exists() {
            return Err(format!(
                "No vault found in {:?}. Run 'vault init' first.",
                data_dir
            )
            .into());
        }

        let vault = storage.load()?;
        Ok(Self {
            vault,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.vault)?;
        Ok(())
    }
}

/// Initialize a new vault
pub fn cmd_init(
    data_dir: &Path,
    owners: Vec<String>,
    required: usize,
    label: Option<String>,
) -> CliResult<()> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    let storage = Storage::new(storage_config)?;

    if storage.exists() {
        println!("⚠️  A vault already exists at {:?}", data_dir);
        return Ok(());
    }

    let config = VaultConfig::new(required, owners, label)?;
    let vault = Vault::new(config)?;
    storage.save(&vault)?;

    println!("🔐 Vault created: {}", vault.address());
    println!("   Policy: {}-of-{}", vault.required(), vault.owners().len());
    for owner in vault.owners() {
        println!("   Owner: {}", owner);
    }
    Ok(())
}

/// Generate a new key pair
pub fn cmd_keygen() -> CliResult<()> {
    let kp = KeyPair::generate();
    println!("🔑 New key pair generated");
    println!("   Address:     {}", kp.address());
    println!("   Public key:  {}", kp.public_key_hex());
    println!("   Private key: {}", kp.private_key_hex());
    println!("   Keep the private key secret!");
    Ok(())
}

/// Deposit value into the pool
pub fn cmd_deposit(state: &mut AppState, from: &str, amount: u64) -> CliResult<()> {
    state.vault.deposit(from, amount);
    state.save()?;
    println!("💰 Deposited {} from {}", amount, from);
    println!("   Pool balance: {}", state.vault.balance());
    Ok(())
}

/// Submit a transaction (auto-confirms as the submitter)
pub fn cmd_submit(
    state: &mut AppState,
    from: &str,
    to: &str,
    amount: u64,
    payload_hex: Option<&str>,
    nonce: u64,
) -> CliResult<()> {
    let payload = match payload_hex {
        Some(h) => hex::decode(h)?,
        None => Vec::new(),
    };

    let id = state.vault.submit(from, to, amount, payload, nonce)?;
    state.save()?;

    println!("📤 Transaction submitted: {}", id);
    print_tx_status(state, &id);
    Ok(())
}

/// Confirm a transaction directly
pub fn cmd_confirm(state: &mut AppState, tx: &str, from: &str) -> CliResult<()> {
    state.vault.confirm(tx, from)?;
    state.save()?;

    println!("✍️  Confirmed by {}", from);
    print_tx_status(state, tx);
    Ok(())
}

/// Produce an off-band signature for a transaction
pub fn cmd_sign(state: &AppState, tx: &str, key_hex: &str) -> CliResult<()> {
    let record = state.vault.transaction(tx)?;
    let kp = KeyPair::from_private_key_hex(key_hex)?;
    let signature = kp.sign_recoverable(&record.digest())?;

    println!("🖋️  Signature by {}", kp.address());
    println!(
        "   {}:{}:{}",
        signature.recovery_id, signature.r, signature.s
    );
    Ok(())
}

/// Confirm a transaction from off-band signatures
pub fn cmd_confirm_signed(state: &mut AppState, tx: &str, sigs: &[String]) -> CliResult<()> {
    let signatures = sigs
        .iter()
        .map(|s| parse_signature(s))
        .collect::<Result<Vec<_>, _>>()?;

    state.vault.confirm_with_signatures(tx, &signatures)?;
    state.save()?;

    println!("✍️  Batch of {} signature(s) accepted", signatures.len());
    print_tx_status(state, tx);
    Ok(())
}

/// Revoke a prior confirmation
pub fn cmd_revoke(state: &mut AppState, tx: &str, from: &str) -> CliResult<()> {
    state.vault.revoke(tx, from)?;
    state.save()?;

    println!("↩️  Confirmation revoked by {}", from);
    print_tx_status(state, tx);
    Ok(())
}

/// Retry execution of a pending transaction
pub fn cmd_execute(state: &mut AppState, tx: &str) -> CliResult<()> {
    let executed = state.vault.execute(tx);
    // Persist even on failure: the event log records the attempt
    state.save()?;

    match executed? {
        true => println!("✅ Transaction executed"),
        false => println!("⏳ Quorum not met yet"),
    }
    print_tx_status(state, tx);
    Ok(())
}

/// Submit a governance action through the quorum pipeline
pub fn cmd_govern(
    state: &mut AppState,
    from: &str,
    action: GovernanceAction,
    nonce: u64,
) -> CliResult<()> {
    let id = state.vault.submit_governance(from, &action, nonce)?;
    state.save()?;

    println!("🏛️  Governance transaction submitted: {}", id);
    print_tx_status(state, &id);
    Ok(())
}

/// List pending or executed transactions
pub fn cmd_list(state: &AppState, executed: bool) -> CliResult<()> {
    let ids = if executed {
        state.vault.list_executed()
    } else {
        state.vault.list_pending()
    };

    if ids.is_empty() {
        println!(
            "📋 No {} transactions.",
            if executed { "executed" } else { "pending" }
        );
        return Ok(());
    }

    println!(
        "📋 {} transactions ({}):",
        if executed { "Executed" } else { "Pending" },
        ids.len()
    );
    for id in ids {
        let tx = state.vault.transaction(&id)?;
        println!(
            "   {} -> {} (value {}, {}/{} confirmations)",
            id,
            tx.destination,
            tx.value,
            state.vault.confirmation_count(&id),
            state.vault.required()
        );
    }
    Ok(())
}

/// Show vault status
pub fn cmd_status(state: &AppState) -> CliResult<()> {
    let vault = &state.vault;
    println!("🔐 Vault {}", vault.address());
    if let Some(label) = vault.label() {
        println!("   Label: {}", label);
    }
    println!("   Policy: {}-of-{}", vault.required(), vault.owners().len());
    for owner in vault.owners() {
        println!("   Owner: {}", owner);
    }
    println!("   Pool balance: {}", vault.balance());
    println!("   Pending: {}", vault.list_pending().len());
    println!("   Executed: {}", vault.list_executed().len());
    println!("   Events: {}", vault.events().len());
    Ok(())
}

/// Print the event log
pub fn cmd_events(state: &AppState) -> CliResult<()> {
    if state.vault.events().is_empty() {
        println!("📡 No events yet.");
        return Ok(());
    }

    println!("📡 Event log ({}):", state.vault.events().len());
    for record in state.vault.events() {
        println!(
            "   #{} {} {:?}",
            record.seq,
            record.at.format("%Y-%m-%d %H:%M:%S"),
            record.event
        );
    }
    Ok(())
}

fn print_tx_status(state: &AppState, id: &str) {
    if state.vault.is_executed(id) {
        println!("   Status: executed");
    } else {
        println!(
            "   Status: pending ({}/{} confirmations)",
            state.vault.confirmation_count(id),
            state.vault.required()
        );
    }
}

/// Parse a "recovery_id:r:s" signature string
fn parse_signature(s: &str) -> Result<OwnerSignature, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err("signature must be recovery_id:r:s".into());
    }
    Ok(OwnerSignature {
        recovery_id: parts[0].parse()?,
        r: parts[1].to_string(),
        s: parts[2].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_state(dir: &Path) -> AppState {
        cmd_init(
            dir,
            vec!["alice".to_string(), "bob".to_string()],
            2,
            None,
        )
        .unwrap();
        AppState::new(dir.to_path_buf()).unwrap()
    }

    #[test]
    fn test_init_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = init_state(temp_dir.path());

        assert_eq!(state.vault.required(), 2);
        assert_eq!(state.vault.owners().len(), 2);

        // Init again is a no-op, not an error
        cmd_init(temp_dir.path(), vec!["x".to_string()], 1, None).unwrap();
        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.vault.owners().len(), 2);
    }

    #[test]
    fn test_missing_vault_errors() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(temp_dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn test_submit_confirm_persists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = init_state(temp_dir.path());

        cmd_deposit(&mut state, "funder", 100).unwrap();
        cmd_submit(&mut state, "alice", "recipient", 40, None, 0).unwrap();

        // Reload and finish the confirmation from fresh state
        let mut state = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        let id = state.vault.list_pending()[0].clone();
        cmd_confirm(&mut state, &id, "bob").unwrap();

        let state = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(state.vault.is_executed(&id));
        assert_eq!(state.vault.balance(), 60);
    }

    #[test]
    fn test_parse_signature() {
        let sig = parse_signature("1:aabb:ccdd").unwrap();
        assert_eq!(sig.recovery_id, 1);
        assert_eq!(sig.r, "aabb");
        assert_eq!(sig.s, "ccdd");

        assert!(parse_signature("nope").is_err());
        assert!(parse_signature("x:aa:bb").is_err());
    }
}
