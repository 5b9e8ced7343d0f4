//! PopupProcessor - in-memory per-recipient inbox

use chrono::{DateTime, Utc};
use contracts::{ContractError, MessageId, MessageProcessor, ProcessorPayload, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument};

/// One popup shown to a recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupEntry {
    pub message_id: MessageId,
    pub from: UserId,
    pub subject: String,
    pub small_message: String,
    pub notification: bool,
    pub time_created: DateTime<Utc>,
    pub seen: bool,
}

/// Popups grouped by recipient
///
/// Shared between the processor and whoever displays the popups.
#[derive(Debug, Default)]
pub struct PopupInbox {
    entries: Mutex<HashMap<UserId, Vec<PopupEntry>>>,
}

impl PopupInbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<UserId, Vec<PopupEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an entry, refusing it if the recipient already has `limit` unseen
    /// popups. Returns whether the entry was stored.
    pub fn push(&self, recipient: UserId, entry: PopupEntry, limit: Option<usize>) -> bool {
        let mut entries = self.guard();
        let inbox = entries.entry(recipient).or_default();

        if let Some(limit) = limit {
            if inbox.iter().filter(|e| !e.seen).count() >= limit {
                return false;
            }
        }
        inbox.push(entry);
        true
    }

    /// Popups for `user`, oldest first
    pub fn entries_for(&self, user: UserId) -> Vec<PopupEntry> {
        self.guard().get(&user).cloned().unwrap_or_default()
    }

    pub fn unread_count(&self, user: UserId) -> usize {
        self.guard()
            .get(&user)
            .map_or(0, |inbox| inbox.iter().filter(|e| !e.seen).count())
    }

    /// Mark every popup of `user` as seen; returns how many changed
    pub fn mark_seen(&self, user: UserId) -> usize {
        let mut entries = self.guard();
        let Some(inbox) = entries.get_mut(&user) else {
            return 0;
        };
        let mut changed = 0;
        for entry in inbox.iter_mut().filter(|e| !e.seen) {
            entry.seen = true;
            changed += 1;
        }
        changed
    }

    /// Total popups across all recipients
    pub fn total(&self) -> usize {
        self.guard().values().map(Vec::len).sum()
    }
}

/// Processor that stores a popup for the recipient
pub struct PopupProcessor {
    name: String,
    inbox: Arc<PopupInbox>,
    max_unread: Option<usize>,
}

impl PopupProcessor {
    pub fn new(name: impl Into<String>, inbox: Arc<PopupInbox>) -> Self {
        Self {
            name: name.into(),
            inbox,
            max_unread: None,
        }
    }

    /// Refuse new popups once a recipient has `limit` unseen ones
    pub fn with_max_unread(mut self, limit: usize) -> Self {
        self.max_unread = Some(limit);
        self
    }

    /// Create from params map (for the registry)
    pub fn from_params(
        name: impl Into<String>,
        inbox: Arc<PopupInbox>,
        params: &HashMap<String, String>,
    ) -> Result<Self, String> {
        let processor = Self::new(name, inbox);
        match params.get("max_unread") {
            None => Ok(processor),
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => Ok(processor.with_max_unread(limit)),
                _ => Err(format!("invalid max_unread '{raw}'")),
            },
        }
    }
}

impl MessageProcessor for PopupProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "popup_processor_send",
        skip(self, payload),
        fields(processor = %self.name, recipient = %payload.user_to.id)
    )]
    fn send_message(&self, payload: &ProcessorPayload) -> Result<bool, ContractError> {
        let entry = PopupEntry {
            message_id: payload.saved_message_id,
            from: payload.user_from.id,
            subject: payload.subject.clone(),
            small_message: payload.small_message.clone(),
            notification: payload.notification,
            time_created: payload.time_created,
            seen: false,
        };

        let stored = self.inbox.push(payload.user_to.id, entry, self.max_unread);
        if !stored {
            debug!(
                processor = %self.name,
                recipient = %payload.user_to.id,
                limit = ?self.max_unread,
                "Popup inbox full"
            );
        }
        Ok(stored)
    }
}
