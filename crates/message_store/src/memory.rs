//! In-memory message store
//!
//! Emulates the message, notification and working-row tables together with
//! a (nestable) transaction. Used by the CLI and tests; supports injecting a
//! transaction-state failure.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use contracts::{
    ContractError, MessageEnvelope, MessageId, MessageStore, ProcessorName, SavedMessage,
    TransactionId, TransactionListener, TransactionState, UserId,
};
use tracing::{debug, instrument, warn};

use crate::error::{Result, StoreError};

/// A persisted message or notification row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub sender: UserId,
    pub recipient: UserId,
    pub notification: bool,
    pub time_created: DateTime<Utc>,
    /// Set once; a read row never becomes unread again
    pub time_read: Option<DateTime<Utc>>,
}

impl StoredMessage {
    pub fn is_read(&self) -> bool {
        self.time_read.is_some()
    }

    fn kind(&self) -> &'static str {
        if self.notification {
            "notification"
        } else {
            "message"
        }
    }
}

/// Marker that a processor still has to acknowledge a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingRow {
    pub message_id: MessageId,
    pub notification: bool,
    pub processor: ProcessorName,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    messages: BTreeMap<MessageId, StoredMessage>,
    working: Vec<WorkingRow>,
}

#[derive(Debug)]
struct OpenTransaction {
    id: TransactionId,
    depth: u32,
    /// Tables as they stood at begin; restored on rollback
    before: Tables,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: Tables,
    transaction: Option<OpenTransaction>,
}

/// How a transaction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Committed,
    RolledBack,
}

/// In-memory persistence layer
pub struct MemoryStore {
    state: Mutex<StoreState>,
    listeners: Mutex<Vec<Weak<dyn TransactionListener>>>,
    next_message_id: AtomicI64,
    next_transaction_id: AtomicU64,
    fail_transaction_state: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            listeners: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1),
            next_transaction_id: AtomicU64::new(1),
            fail_transaction_state: AtomicBool::new(false),
        }
    }

    /// Register a transaction listener
    ///
    /// Held weakly: a dropped listener is skipped and pruned.
    pub fn register_listener(&self, listener: &Arc<dyn TransactionListener>) {
        self.listeners_guard().push(Arc::downgrade(listener));
    }

    /// Make `transaction_state()` fail until reset
    pub fn fail_transaction_state(&self, fail: bool) {
        self.fail_transaction_state.store(fail, Ordering::SeqCst);
    }

    /// Persist the row for `envelope`
    #[instrument(
        name = "memory_store_save_message",
        skip(self, envelope),
        fields(to = %envelope.user_to.id, notification = envelope.notification)
    )]
    pub fn save_message(&self, envelope: &MessageEnvelope) -> SavedMessage {
        let id = MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        let row = StoredMessage {
            id,
            sender: envelope.user_from.id,
            recipient: envelope.user_to.id,
            notification: envelope.notification,
            time_created: envelope.time_created,
            time_read: None,
        };

        self.state_guard().tables.messages.insert(id, row);
        debug!(message_id = %id, "Message row saved");

        SavedMessage {
            id,
            recipient: envelope.user_to.id,
            notification: envelope.notification,
        }
    }

    /// Record that `processor` has not yet acknowledged `message_id`
    pub fn add_working_row(
        &self,
        message_id: MessageId,
        notification: bool,
        processor: impl Into<ProcessorName>,
    ) {
        self.state_guard().tables.working.push(WorkingRow {
            message_id,
            notification,
            processor: processor.into(),
        });
    }

    /// Remove the working row of `processor`; returns whether one existed
    pub fn acknowledge(&self, message_id: MessageId, notification: bool, processor: &str) -> bool {
        let mut state = self.state_guard();
        let working = &mut state.tables.working;
        let before = working.len();
        working.retain(|row| {
            !(row.message_id == message_id
                && row.notification == notification
                && row.processor == processor)
        });
        before != working.len()
    }

    pub fn message(&self, id: MessageId) -> Option<StoredMessage> {
        self.state_guard().tables.messages.get(&id).cloned()
    }

    /// `None` when the row does not exist
    pub fn is_read(&self, id: MessageId) -> Option<bool> {
        self.state_guard()
            .tables
            .messages
            .get(&id)
            .map(StoredMessage::is_read)
    }

    pub fn message_count(&self) -> usize {
        self.state_guard().tables.messages.len()
    }

    pub fn working_rows(&self) -> Vec<WorkingRow> {
        self.state_guard().tables.working.clone()
    }

    /// Open a transaction, or join the open one
    ///
    /// Nested calls return the same handle; only the outermost commit
    /// completes it.
    #[instrument(name = "memory_store_begin", skip(self))]
    pub fn begin_transaction(&self) -> TransactionId {
        let mut state = self.state_guard();
        match state.transaction.as_mut() {
            Some(tx) => {
                tx.depth += 1;
                debug!(tx = %tx.id, depth = tx.depth, "Joined open transaction");
                tx.id
            }
            None => {
                let id = TransactionId(self.next_transaction_id.fetch_add(1, Ordering::SeqCst));
                let before = state.tables.clone();
                state.transaction = Some(OpenTransaction {
                    id,
                    depth: 1,
                    before,
                });
                debug!(tx = %id, "Transaction started");
                id
            }
        }
    }

    /// Commit one nesting level of `tx`
    ///
    /// Listeners are notified after the outermost level, with no lock held.
    #[instrument(name = "memory_store_commit", skip(self, tx), fields(tx = %tx))]
    pub fn commit(&self, tx: TransactionId) -> Result<()> {
        let finished = {
            let mut state = self.state_guard();
            let open = Self::open_transaction(&mut state, tx)?;
            open.depth -= 1;
            if open.depth == 0 {
                state.transaction = None;
                true
            } else {
                false
            }
        };

        if finished {
            debug!("Transaction committed");
            self.notify(tx, Outcome::Committed);
        }
        Ok(())
    }

    /// Roll back `tx` entirely, whatever its nesting depth
    ///
    /// Tables return to their state at begin, including read marks and
    /// working rows on older messages. Ids handed out meanwhile are not
    /// reused.
    #[instrument(name = "memory_store_rollback", skip(self, tx), fields(tx = %tx))]
    pub fn rollback(&self, tx: TransactionId) -> Result<()> {
        {
            let mut state = self.state_guard();
            Self::open_transaction(&mut state, tx)?;
            if let Some(open) = state.transaction.take() {
                let removed = state
                    .tables
                    .messages
                    .len()
                    .saturating_sub(open.before.messages.len());
                state.tables = open.before;
                debug!(removed, "Transaction rolled back");
            }
        }

        self.notify(tx, Outcome::RolledBack);
        Ok(())
    }

    fn open_transaction(
        state: &mut StoreState,
        tx: TransactionId,
    ) -> Result<&mut OpenTransaction> {
        match state.transaction.as_mut() {
            Some(open) if open.id == tx => Ok(open),
            Some(open) => Err(StoreError::TransactionMismatch {
                given: tx,
                open: open.id,
            }),
            None => Err(StoreError::NoTransaction),
        }
    }

    fn notify(&self, tx: TransactionId, outcome: Outcome) {
        let listeners: Vec<Arc<dyn TransactionListener>> = {
            let mut guard = self.listeners_guard();
            guard.retain(|weak| weak.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };

        for listener in listeners {
            match outcome {
                Outcome::Committed => listener.on_transaction_committed(tx),
                Outcome::RolledBack => listener.on_transaction_rolled_back(tx),
            }
        }
    }

    fn mark_read(&self, user: UserId, id: MessageId, notification: bool) -> Result<()> {
        let mut state = self.state_guard();
        let row = state
            .tables
            .messages
            .get_mut(&id)
            .ok_or(StoreError::MessageNotFound(id))?;

        if row.notification != notification {
            return Err(StoreError::WrongKind {
                id,
                actual: row.kind(),
                requested: if notification { "notification" } else { "message" },
            });
        }
        if row.recipient != user {
            return Err(StoreError::WrongRecipient { id, user: user.get() });
        }
        if row.time_read.is_none() {
            row.time_read = Some(Utc::now());
            debug!(message_id = %id, notification, "Marked read");
        }
        Ok(())
    }

    fn state_guard(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners_guard(&self) -> MutexGuard<'_, Vec<Weak<dyn TransactionListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore for MemoryStore {
    fn transaction_state(&self) -> std::result::Result<TransactionState, ContractError> {
        if self.fail_transaction_state.load(Ordering::SeqCst) {
            warn!("Transaction state query failed (injected)");
            return Err(StoreError::Injected("transaction state unavailable").into());
        }
        Ok(match self.state_guard().transaction.as_ref() {
            Some(tx) => TransactionState::Open(tx.id),
            None => TransactionState::Idle,
        })
    }

    fn count_working_rows(
        &self,
        message_id: MessageId,
        notification: bool,
    ) -> std::result::Result<u64, ContractError> {
        let state = self.state_guard();
        let count = state
            .tables
            .working
            .iter()
            .filter(|row| row.message_id == message_id && row.notification == notification)
            .count();
        Ok(count as u64)
    }

    fn mark_message_read(
        &self,
        user: UserId,
        message_id: MessageId,
    ) -> std::result::Result<(), ContractError> {
        Ok(self.mark_read(user, message_id, false)?)
    }

    fn mark_notification_read(
        &self,
        user: UserId,
        message_id: MessageId,
    ) -> std::result::Result<(), ContractError> {
        Ok(self.mark_read(user, message_id, true)?)
    }
}
