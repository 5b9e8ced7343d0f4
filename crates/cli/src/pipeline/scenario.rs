//! Scenario files: an ordered script of transaction and send steps.

use contracts::{MessageEnvelope, ProcessorList, ProcessorName};
use serde::Deserialize;
use std::path::Path;

use crate::error::{CliError, Result};

/// A scenario document
///
/// ```toml
/// name = "forum post inside a transaction"
///
/// [[steps]]
/// action = "begin"
///
/// [[steps]]
/// action = "send"
/// processors = ["popup", "email"]
/// [steps.envelope]
/// component = "mod_forum"
/// name = "posts"
/// user_from = { id = 2, username = "teacher" }
/// user_to = { id = 3, username = "student" }
///
/// [[steps]]
/// action = "commit"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scenario step
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Open (or join) a transaction
    Begin,
    /// Commit one nesting level of the open transaction
    Commit,
    /// Roll back the open transaction
    Rollback,
    /// Save a message and submit it
    Send {
        envelope: MessageEnvelope,
        #[serde(default)]
        processors: ProcessorList,
        /// Processors that have not acknowledged the message yet
        #[serde(default)]
        pending_ack: Vec<ProcessorName>,
    },
    /// Flip the site-wide messaging switch
    SetMessaging { enabled: bool },
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::Send { .. } => "send",
            Self::SetMessaging { .. } => "set_messaging",
        }
    }
}

impl Scenario {
    /// Load a scenario from a TOML or JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::not_found(path.display().to_string()));
        }
        let scenario: Self = config_loader::ConfigLoader::load_document(path)?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Static checks that need no store: envelopes and processor lists are
    /// well-formed and transaction steps balance.
    pub fn check(&self) -> Result<()> {
        let mut depth: usize = 0;
        for (index, step) in self.steps.iter().enumerate() {
            let number = index + 1;
            match step {
                Step::Begin => depth += 1,
                Step::Commit => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| CliError::step(number, "commit without begin"))?;
                }
                Step::Rollback => {
                    if depth == 0 {
                        return Err(CliError::step(number, "rollback without begin"));
                    }
                    depth = 0;
                }
                Step::Send {
                    envelope,
                    processors,
                    ..
                } => {
                    envelope
                        .validate()
                        .and_then(|()| processors.validate())
                        .map_err(|e| CliError::step(number, e.to_string()))?;
                }
                Step::SetMessaging { .. } => {}
            }
        }
        Ok(())
    }

    /// Number of send steps
    pub fn send_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Send { .. }))
            .count()
    }
}
