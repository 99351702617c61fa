//! Observable vault event log
//!
//! Every state change emits an event into an append-only log. External
//! observers can either read the log or subscribe to a live channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};

/// A notification emitted by the vault
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultEvent {
    Submission { tx_id: String },
    Confirmation { tx_id: String, owner: String },
    Revocation { tx_id: String, owner: String },
    Execution { tx_id: String },
    ExecutionFailure { tx_id: String, reason: String },
    Deposit { sender: String, amount: u64 },
    OwnerAdded { owner: String },
    OwnerRemoved { owner: String },
    RequirementChanged { required: usize },
}

/// A logged event with ordering metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 0
    pub seq: u64,
    /// Emission time
    pub at: DateTime<Utc>,
    /// The event itself
    pub event: VaultEvent,
}

/// Append-only event log with live subscribers.
///
/// Subscriber channels are process-local and not persisted; after a
/// reload, observers re-subscribe.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    #[serde(skip)]
    subscribers: Vec<Sender<EventRecord>>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and fan it out to live subscribers
    pub fn emit(&mut self, event: VaultEvent) {
        let record = EventRecord {
            seq: self.records.len() as u64,
            at: Utc::now(),
            event,
        };
        log::debug!("Event #{}: {:?}", record.seq, record.event);

        // Drop subscribers whose receiving end has gone away
        self.subscribers
            .retain(|tx| tx.send(record.clone()).is_ok());
        self.records.push(record);
    }

    /// All events emitted so far, oldest first
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of events emitted
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been emitted yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Open a live channel receiving every event emitted from now on
    pub fn subscribe(&mut self) -> Receiver<EventRecord> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        // Subscriber handles stay with the original log
        Self {
            records: self.records.clone(),
            subscribers: Vec::new(),
        }
    }
}
