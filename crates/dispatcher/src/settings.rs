//! Runtime messaging switch

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{MessagingSection, MessagingSettings};
use tracing::info;

/// Site-wide "messaging enabled" flag that can change at runtime
#[derive(Debug)]
pub struct RuntimeSettings {
    messaging_enabled: AtomicBool,
}

impl RuntimeSettings {
    pub fn new(messaging_enabled: bool) -> Self {
        Self {
            messaging_enabled: AtomicBool::new(messaging_enabled),
        }
    }

    pub fn set_messaging_enabled(&self, enabled: bool) {
        let previous = self.messaging_enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "Messaging switch changed");
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl From<&MessagingSection> for RuntimeSettings {
    fn from(section: &MessagingSection) -> Self {
        Self::new(section.enabled)
    }
}

impl MessagingSettings for RuntimeSettings {
    fn messaging_enabled(&self) -> bool {
        self.messaging_enabled.load(Ordering::SeqCst)
    }
}
