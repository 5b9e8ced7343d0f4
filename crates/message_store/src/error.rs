//! Message store error types

use contracts::{ContractError, MessageId, TransactionId};
use thiserror::Error;

/// Message store specific error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Commit/rollback without an open transaction
    #[error("no transaction is open")]
    NoTransaction,

    /// Commit/rollback with a handle other than the open one
    #[error("transaction {given} is not the open transaction {open}")]
    TransactionMismatch {
        given: TransactionId,
        open: TransactionId,
    },

    /// Row lookup failed
    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    /// Read-marking through the wrong table
    #[error("message {id} is {actual}, cannot mark it read as {requested}")]
    WrongKind {
        id: MessageId,
        actual: &'static str,
        requested: &'static str,
    },

    /// Read-marking for someone other than the recipient
    #[error("message {id} does not belong to user {user}")]
    WrongRecipient { id: MessageId, user: i64 },

    /// Injected failure
    #[error("injected failure: {0}")]
    Injected(&'static str),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl From<StoreError> for ContractError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Contract(inner) => inner,
            other => ContractError::store(other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, StoreError>;
