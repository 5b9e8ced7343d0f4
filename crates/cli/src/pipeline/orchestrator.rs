//! Scenario runner - wires store, dispatcher and processors together and
//! replays a scenario against them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use contracts::{CourierConfig, MessageId, TransactionId, TransactionListener};
use dispatcher::{
    BufferingDispatcher, DispatcherBuilder, PopupInbox, ProcessorRegistry, RecordingEventSink,
    RuntimeSettings,
};
use message_store::MemoryStore;
use observability::DeliveryMetricsAggregator;
use tracing::{debug, info, instrument, warn};

use super::{RunStats, Scenario, Step};
use crate::error::{CliError, Result};

/// Forwards store callbacks to the dispatcher and records what they did
struct ReportingListener {
    dispatcher: Arc<BufferingDispatcher>,
    delivery: Mutex<DeliveryMetricsAggregator>,
}

impl ReportingListener {
    fn delivery(&self) -> MutexGuard<'_, DeliveryMetricsAggregator> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionListener for ReportingListener {
    fn on_transaction_committed(&self, tx: TransactionId) {
        let report = self.dispatcher.on_transaction_committed(tx);
        observability::record_replay_report(&report);
        observability::record_pending_depth(self.dispatcher.pending_total());
        self.delivery().record_replay(&report);
    }

    fn on_transaction_rolled_back(&self, tx: TransactionId) {
        let discarded = self.dispatcher.on_transaction_rolled_back(tx);
        observability::record_discarded(discarded);
        observability::record_pending_depth(self.dispatcher.pending_total());
        self.delivery().record_rollback(discarded);
    }
}

/// Replays scenarios against an in-memory store
pub struct ScenarioRunner {
    store: Arc<MemoryStore>,
    dispatcher: Arc<BufferingDispatcher>,
    listener: Arc<ReportingListener>,
    settings: Arc<RuntimeSettings>,
    events: Arc<RecordingEventSink>,
    inbox: Arc<PopupInbox>,
    open: Option<TransactionId>,
    depth: usize,
    saved: Vec<MessageId>,
}

impl ScenarioRunner {
    /// Build the store, registry and dispatcher described by `config`
    pub fn new(config: &CourierConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let inbox = Arc::new(PopupInbox::new());
        let events = Arc::new(RecordingEventSink::new());
        let settings = Arc::new(RuntimeSettings::from(&config.messaging));

        let registry = ProcessorRegistry::from_config(&config.processors, inbox.clone())?;
        let dispatcher = Arc::new(
            DispatcherBuilder::new(store.clone())
                .registry(registry)
                .events(events.clone())
                .settings(settings.clone())
                .build(),
        );

        let listener = Arc::new(ReportingListener {
            dispatcher: dispatcher.clone(),
            delivery: Mutex::new(DeliveryMetricsAggregator::new()),
        });
        let registered: Arc<dyn TransactionListener> = listener.clone();
        store.register_listener(&registered);

        Ok(Self {
            store,
            dispatcher,
            listener,
            settings,
            events,
            inbox,
            open: None,
            depth: 0,
            saved: Vec::new(),
        })
    }

    /// Run every step in order
    ///
    /// A transaction still open after the last step is rolled back.
    #[instrument(name = "scenario_run", skip(self, scenario), fields(steps = scenario.steps.len()))]
    pub fn run(&mut self, scenario: &Scenario) -> Result<RunStats> {
        let start_time = Instant::now();
        info!(
            scenario = scenario.name.as_deref().unwrap_or("unnamed"),
            sends = scenario.send_count(),
            "Scenario started"
        );

        for (index, step) in scenario.steps.iter().enumerate() {
            let number = index + 1;
            debug!(step = number, action = step.label(), "Executing step");
            self.execute(number, step)?;
        }

        if let Some(tx) = self.open.take() {
            warn!(tx = %tx, "Transaction left open at end of scenario, rolling back");
            self.store
                .rollback(tx)
                .map_err(|e| CliError::step(scenario.steps.len(), e.to_string()))?;
            self.depth = 0;
        }

        let stats = self.collect_stats(scenario, start_time);
        info!(
            sends = stats.sends,
            duration_ms = stats.duration.as_millis() as u64,
            "Scenario finished"
        );
        Ok(stats)
    }

    fn execute(&mut self, number: usize, step: &Step) -> Result<()> {
        match step {
            Step::Begin => {
                let tx = self.store.begin_transaction();
                self.open = Some(tx);
                self.depth += 1;
            }
            Step::Commit => {
                let tx = self.require_open(number)?;
                self.store
                    .commit(tx)
                    .map_err(|e| CliError::step(number, e.to_string()))?;
                self.depth -= 1;
                if self.depth == 0 {
                    self.open = None;
                }
            }
            Step::Rollback => {
                let tx = self.require_open(number)?;
                self.store
                    .rollback(tx)
                    .map_err(|e| CliError::step(number, e.to_string()))?;
                self.open = None;
                self.depth = 0;
            }
            Step::Send {
                envelope,
                processors,
                pending_ack,
            } => {
                let saved = self.store.save_message(envelope);
                for processor in pending_ack {
                    self.store
                        .add_working_row(saved.id, saved.notification, processor.clone());
                }
                self.saved.push(saved.id);

                let outcome = self
                    .dispatcher
                    .submit_detailed(envelope.clone(), saved, processors.clone())
                    .map_err(|e| CliError::step(number, e.to_string()))?;

                debug!(message_id = %saved.id, path = outcome.path(), "Message submitted");
                observability::record_submit_outcome(&outcome);
                observability::record_pending_depth(self.dispatcher.pending_total());
                self.listener.delivery().record_submit(&outcome);
            }
            Step::SetMessaging { enabled } => self.settings.set_messaging_enabled(*enabled),
        }
        Ok(())
    }

    fn require_open(&self, number: usize) -> Result<TransactionId> {
        self.open
            .ok_or_else(|| CliError::step(number, "no transaction is open"))
    }

    fn collect_stats(&self, scenario: &Scenario, start_time: Instant) -> RunStats {
        let processors = self.dispatcher.processor_metrics();
        for (name, snapshot) in &processors {
            observability::record_processor_counts(
                name,
                snapshot.sent_count,
                snapshot.failure_count,
            );
        }

        let read_states: Vec<Option<bool>> =
            self.saved.iter().map(|id| self.store.is_read(*id)).collect();

        RunStats {
            scenario: scenario.name.clone(),
            steps: scenario.steps.len(),
            sends: scenario.send_count(),
            duration: start_time.elapsed(),
            messages_read: read_states.iter().filter(|s| **s == Some(true)).count(),
            messages_unread: read_states.iter().filter(|s| **s == Some(false)).count(),
            messages_removed: read_states.iter().filter(|s| s.is_none()).count(),
            events: self.events.len(),
            popups: self.inbox.total(),
            dispatch: self.dispatcher.metrics(),
            processors,
            delivery: self.listener.delivery().summary(),
        }
    }
}
