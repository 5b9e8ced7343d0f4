//! Persistence contracts consumed by the dispatcher

use crate::{ContractError, MessageId, TransactionId, UserId};

/// Transaction state reported by the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction in progress
    Idle,
    /// A transaction is open under this handle
    Open(TransactionId),
}

/// Narrow view of the message tables
pub trait MessageStore: Send + Sync {
    /// Current transaction state of the calling context
    fn transaction_state(&self) -> Result<TransactionState, ContractError>;

    /// Number of processors that have not yet acknowledged a message
    fn count_working_rows(
        &self,
        message_id: MessageId,
        notification: bool,
    ) -> Result<u64, ContractError>;

    /// Mark a direct message read for `user`
    fn mark_message_read(&self, user: UserId, message_id: MessageId) -> Result<(), ContractError>;

    /// Mark a notification read for `user`
    fn mark_notification_read(
        &self,
        user: UserId,
        message_id: MessageId,
    ) -> Result<(), ContractError>;
}

/// Receives transaction outcome callbacks from the persistence layer
///
/// Called after every commit and every rollback, even when nothing was
/// submitted during the transaction.
pub trait TransactionListener: Send + Sync {
    fn on_transaction_committed(&self, tx: TransactionId);

    fn on_transaction_rolled_back(&self, tx: TransactionId);
}
