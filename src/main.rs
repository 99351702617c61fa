//! Vault CLI Application
//!
//! A command-line interface for operating a threshold-authorization vault.

use clap::{Parser, Subcommand};
use quorum_vault::cli::{self, AppState};
use quorum_vault::vault::GovernanceAction;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vault")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "An M-of-N threshold-authorization vault", long_about = None)]
struct Cli {
    /// Data directory for vault storage
    #[arg(short, long, default_value = ".vault_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new vault
    Init {
        /// Owner address (repeat for each owner)
        #[arg(short, long = "owner", required = true)]
        owners: Vec<String>,

        /// Confirmations required to execute (M in M-of-N)
        #[arg(short, long)]
        required: usize,

        /// Optional human-readable label
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Generate a new key pair
    Keygen,

    /// Deposit value into the pool
    Deposit {
        /// Depositor identity (informational)
        #[arg(short, long)]
        from: String,

        /// Amount to deposit
        #[arg(short, long)]
        amount: u64,
    },

    /// Submit a transaction (auto-confirms as the submitter)
    Submit {
        /// Submitting owner address
        #[arg(short, long)]
        from: String,

        /// Destination identity
        #[arg(short, long)]
        to: String,

        /// Value to transfer
        #[arg(short, long)]
        amount: u64,

        /// Opaque payload (hex)
        #[arg(short, long)]
        payload: Option<String>,

        /// Disambiguating nonce
        #[arg(short, long, default_value = "0")]
        nonce: u64,
    },

    /// Confirm a pending transaction
    Confirm {
        /// Transaction id
        #[arg(short, long)]
        tx: String,

        /// Confirming owner address
        #[arg(short, long)]
        from: String,
    },

    /// Produce an off-band signature for a transaction
    Sign {
        /// Transaction id
        #[arg(short, long)]
        tx: String,

        /// Signer's private key (hex)
        #[arg(short, long)]
        key: String,
    },

    /// Confirm a transaction from off-band signatures
    ConfirmSigned {
        /// Transaction id
        #[arg(short, long)]
        tx: String,

        /// Signature as recovery_id:r:s (repeat for each signer)
        #[arg(short, long = "sig", required = true)]
        sigs: Vec<String>,
    },

    /// Revoke a prior confirmation
    Revoke {
        /// Transaction id
        #[arg(short, long)]
        tx: String,

        /// Revoking owner address
        #[arg(short, long)]
        from: String,
    },

    /// Retry execution of a pending transaction
    Execute {
        /// Transaction id
        #[arg(short, long)]
        tx: String,
    },

    /// Owner and quorum management (runs through the quorum pipeline)
    Govern {
        #[command(subcommand)]
        action: GovernCommands,
    },

    /// List transactions
    List {
        /// Show executed instead of pending transactions
        #[arg(long)]
        executed: bool,
    },

    /// Show vault status
    Status,

    /// Print the event log
    Events,
}

#[derive(Subcommand)]
enum GovernCommands {
    /// Propose adding an owner
    AddOwner {
        /// Owner address to add
        #[arg(short, long)]
        owner: String,

        /// Proposing owner address
        #[arg(short, long)]
        from: String,

        /// Disambiguating nonce
        #[arg(short, long, default_value = "0")]
        nonce: u64,
    },

    /// Propose removing an owner
    RemoveOwner {
        /// Owner address to remove
        #[arg(short, long)]
        owner: String,

        /// Proposing owner address
        #[arg(short, long)]
        from: String,

        /// Disambiguating nonce
        #[arg(short, long, default_value = "0")]
        nonce: u64,
    },

    /// Propose changing the signature requirement
    SetRequired {
        /// New requirement
        #[arg(short, long)]
        required: usize,

        /// Proposing owner address
        #[arg(short, long)]
        from: String,

        /// Disambiguating nonce
        #[arg(short, long, default_value = "0")]
        nonce: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that don't need loaded state
    match &cli.command {
        Commands::Init {
            owners,
            required,
            label,
        } => {
            return cli::cmd_init(&cli.data_dir, owners.clone(), *required, label.clone());
        }
        Commands::Keygen => return cli::cmd_keygen(),
        _ => {}
    }

    // Load application state
    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init { .. } | Commands::Keygen => unreachable!(),

        Commands::Deposit { from, amount } => {
            cli::cmd_deposit(&mut state, &from, amount)?;
        }

        Commands::Submit {
            from,
            to,
            amount,
            payload,
            nonce,
        } => {
            cli::cmd_submit(&mut state, &from, &to, amount, payload.as_deref(), nonce)?;
        }

        Commands::Confirm { tx, from } => {
            cli::cmd_confirm(&mut state, &tx, &from)?;
        }

        Commands::Sign { tx, key } => {
            cli::cmd_sign(&state, &tx, &key)?;
        }

        Commands::ConfirmSigned { tx, sigs } => {
            cli::cmd_confirm_signed(&mut state, &tx, &sigs)?;
        }

        Commands::Revoke { tx, from } => {
            cli::cmd_revoke(&mut state, &tx, &from)?;
        }

        Commands::Execute { tx } => {
            cli::cmd_execute(&mut state, &tx)?;
        }

        Commands::Govern { action } => match action {
            GovernCommands::AddOwner { owner, from, nonce } => {
                cli::cmd_govern(&mut state, &from, GovernanceAction::AddOwner { owner }, nonce)?;
            }
            GovernCommands::RemoveOwner { owner, from, nonce } => {
                cli::cmd_govern(
                    &mut state,
                    &from,
                    GovernanceAction::RemoveOwner { owner },
                    nonce,
                )?;
            }
            GovernCommands::SetRequired {
                required,
                from,
                nonce,
            } => {
                cli::cmd_govern(
                    &mut state,
                    &from,
                    GovernanceAction::SetRequirement { required },
                    nonce,
                )?;
            }
        },

        Commands::List { executed } => {
            cli::cmd_list(&state, executed)?;
        }

        Commands::Status => {
            cli::cmd_status(&state)?;
        }

        Commands::Events => {
            cli::cmd_events(&state)?;
        }
    }

    Ok(())
}
