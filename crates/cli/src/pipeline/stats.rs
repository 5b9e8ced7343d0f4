//! Scenario run statistics.

use std::time::Duration;

use dispatcher::{DispatchSnapshot, MetricsSnapshot};
use observability::DeliverySummary;
use serde_json::{json, Value};

/// Statistics from a scenario run
#[derive(Debug, Clone)]
pub struct RunStats {
    pub scenario: Option<String>,

    pub steps: usize,

    pub sends: usize,

    pub duration: Duration,

    /// Saved messages that ended up read
    pub messages_read: usize,

    pub messages_unread: usize,

    /// Saved messages removed by a rollback
    pub messages_removed: usize,

    /// "message sent" events emitted
    pub events: usize,

    /// Popups stored across all recipients
    pub popups: usize,

    pub dispatch: DispatchSnapshot,

    /// Per-processor counters in registration order
    pub processors: Vec<(String, MetricsSnapshot)>,

    pub delivery: DeliverySummary,
}

impl RunStats {
    /// Machine-readable report for `--json`
    pub fn to_json(&self) -> Value {
        let processors: Vec<Value> = self
            .processors
            .iter()
            .map(|(name, m)| {
                json!({ "name": name, "sent": m.sent_count, "failed": m.failure_count })
            })
            .collect();

        json!({
            "scenario": self.scenario,
            "steps": self.steps,
            "sends": self.sends,
            "duration_ms": self.duration.as_millis() as u64,
            "messages": {
                "read": self.messages_read,
                "unread": self.messages_unread,
                "removed": self.messages_removed,
            },
            "events": self.events,
            "popups": self.popups,
            "dispatch": {
                "submitted": self.dispatch.submitted,
                "recorded": self.dispatch.recorded,
                "buffered": self.dispatch.buffered,
                "dispatched": self.dispatch.dispatched,
                "replayed": self.dispatch.replayed,
                "discarded": self.dispatch.discarded,
                "marked_read": self.dispatch.marked_read,
                "state_unknown": self.dispatch.state_unknown,
            },
            "transactions": {
                "committed": self.delivery.commits,
                "rolled_back": self.delivery.rollbacks,
            },
            "processors": processors,
        })
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Scenario: {} ===\n", self.scenario.as_deref().unwrap_or("unnamed"));

        println!("Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Steps: {}", self.steps);
        println!("   ├─ Sends: {}", self.sends);
        println!("   ├─ Events emitted: {}", self.events);
        println!("   └─ Popups stored: {}", self.popups);

        println!("\nMessages");
        println!("   ├─ Read: {}", self.messages_read);
        println!("   ├─ Unread: {}", self.messages_unread);
        println!("   └─ Removed by rollback: {}", self.messages_removed);

        println!("\nDispatcher");
        println!("   ├─ Recorded only: {}", self.dispatch.recorded);
        println!("   ├─ Buffered: {}", self.dispatch.buffered);
        println!("   ├─ Fan-outs: {}", self.dispatch.dispatched);
        println!("   ├─ Replayed: {}", self.dispatch.replayed);
        println!("   ├─ Discarded: {}", self.dispatch.discarded);
        println!("   └─ State unknown: {}", self.dispatch.state_unknown);

        if !self.processors.is_empty() {
            println!("\nProcessors");
            for (name, m) in &self.processors {
                println!("   ├─ {}: {} sent, {} failed", name, m.sent_count, m.failure_count);
            }
        }

        println!("\n{}", self.delivery);
    }
}
