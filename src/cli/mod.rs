//! Command-line interface for the vault

pub mod commands;

pub use commands::{
    cmd_confirm, cmd_confirm_signed, cmd_deposit, cmd_events, cmd_execute, cmd_govern, cmd_init,
    cmd_keygen, cmd_list, cmd_revoke, cmd_sign, cmd_status, cmd_submit, AppState, CliResult,
};
