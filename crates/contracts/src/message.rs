//! Saved message record and processor selection

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{ContractError, MessageEnvelope, MessageId, ProcessorName, UserId};

/// A message row already written by the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    /// Row id
    pub id: MessageId,

    /// User whose read state is tracked
    pub recipient: UserId,

    /// Whether the row lives in the notification table
    pub notification: bool,
}

impl SavedMessage {
    /// Check that this record belongs to `envelope`
    pub fn validate_for(&self, envelope: &MessageEnvelope) -> Result<(), ContractError> {
        if self.id.get() <= 0 {
            return Err(ContractError::invalid_input(
                "saved.id",
                format!("saved message id must be positive, got {}", self.id),
            ));
        }
        if self.recipient != envelope.user_to.id {
            return Err(ContractError::invalid_input(
                "saved.recipient",
                format!(
                    "saved recipient {} does not match envelope recipient {}",
                    self.recipient, envelope.user_to.id
                ),
            ));
        }
        if self.notification != envelope.notification {
            return Err(ContractError::invalid_input(
                "saved.notification",
                "saved record and envelope disagree on notification flag",
            ));
        }
        Ok(())
    }
}

/// Ordered processor names selected for one message
///
/// An empty list is valid and means no external processor is involved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessorList(Vec<ProcessorName>);

impl ProcessorList {
    pub fn new(names: Vec<ProcessorName>) -> Self {
        Self(names)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessorName> {
        self.0.iter()
    }

    /// Names must be non-blank and unique
    pub fn validate(&self) -> Result<(), ContractError> {
        let mut seen = HashSet::new();
        for (idx, name) in self.0.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ContractError::invalid_input(
                    format!("processors[{idx}]"),
                    "processor name cannot be empty",
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ContractError::invalid_input(
                    format!("processors[{idx}]"),
                    format!("duplicate processor '{name}'"),
                ));
            }
        }
        Ok(())
    }
}

impl<'a> FromIterator<&'a str> for ProcessorList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(ProcessorName::from).collect())
    }
}

impl FromIterator<ProcessorName> for ProcessorList {
    fn from_iter<I: IntoIterator<Item = ProcessorName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ProcessorList {
    type Item = &'a ProcessorName;
    type IntoIter = std::slice::Iter<'a, ProcessorName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
