//! BufferingDispatcher - transaction-aware fan-out to processors

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use contracts::{
    CourierConfig, DispatchOutcome, EventSink, MessageEnvelope, MessageId, MessageSentEvent,
    MessageStore, MessagingSettings, ProcessorList, ReplayReport, SavedMessage, SubmitOutcome,
    TransactionId, TransactionListener, TransactionState,
};

use crate::buffer::{PendingBuffer, PendingMessage};
use crate::error::DispatcherError;
use crate::events::TracingEventSink;
use crate::metrics::{DispatchMetrics, DispatchSnapshot, MetricsSnapshot};
use crate::processors::PopupInbox;
use crate::registry::ProcessorRegistry;
use crate::settings::RuntimeSettings;

/// Builder for creating a BufferingDispatcher
pub struct DispatcherBuilder {
    store: Arc<dyn MessageStore>,
    registry: ProcessorRegistry,
    events: Arc<dyn EventSink>,
    settings: Arc<dyn MessagingSettings>,
}

impl DispatcherBuilder {
    /// Start from a store; events go to tracing and messaging is enabled
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            registry: ProcessorRegistry::new(),
            events: Arc::new(TracingEventSink),
            settings: Arc::new(RuntimeSettings::default()),
        }
    }

    pub fn registry(mut self, registry: ProcessorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn settings(mut self, settings: Arc<dyn MessagingSettings>) -> Self {
        self.settings = settings;
        self
    }

    #[instrument(name = "dispatcher_builder_build", skip(self), fields(processors = self.registry.len()))]
    pub fn build(self) -> BufferingDispatcher {
        info!(processors = self.registry.len(), "Dispatcher ready");
        BufferingDispatcher {
            registry: self.registry,
            store: self.store,
            events: self.events,
            settings: self.settings,
            pending: Mutex::new(HashMap::new()),
            metrics: DispatchMetrics::new(),
        }
    }
}

/// Convenience function to create a dispatcher from configuration
///
/// Messaging starts in the state given by `[messaging]`; events are logged.
#[instrument(name = "dispatcher_create", skip(config, store, popup_inbox))]
pub fn create_dispatcher(
    config: &CourierConfig,
    store: Arc<dyn MessageStore>,
    popup_inbox: Arc<PopupInbox>,
) -> Result<BufferingDispatcher, DispatcherError> {
    let registry = ProcessorRegistry::from_config(&config.processors, popup_inbox)?;
    Ok(DispatcherBuilder::new(store)
        .registry(registry)
        .settings(Arc::new(RuntimeSettings::from(&config.messaging)))
        .build())
}

/// Delivers saved messages to processors, deferring sends made inside an
/// open transaction until it commits.
///
/// One `PendingBuffer` exists per open transaction handle. Buffers are taken
/// out of the map before replay, so processors never run under the lock.
pub struct BufferingDispatcher {
    registry: ProcessorRegistry,
    store: Arc<dyn MessageStore>,
    events: Arc<dyn EventSink>,
    settings: Arc<dyn MessagingSettings>,
    pending: Mutex<HashMap<TransactionId, PendingBuffer>>,
    metrics: DispatchMetrics,
}

impl BufferingDispatcher {
    /// Submit a saved message for delivery; returns its record id
    ///
    /// # Errors
    /// Only invalid input is an error. Processor and store failures are
    /// logged and never surface here.
    pub fn submit(
        &self,
        envelope: MessageEnvelope,
        saved: SavedMessage,
        processors: ProcessorList,
    ) -> Result<MessageId, DispatcherError> {
        self.submit_detailed(envelope, saved, processors)
            .map(|outcome| outcome.message_id())
    }

    /// Like [`submit`](Self::submit), reporting which path ran
    #[instrument(
        name = "dispatcher_submit",
        skip(self, envelope, saved, processors),
        fields(
            component = %envelope.component,
            message_id = %saved.id,
            notification = saved.notification,
            processors = processors.len()
        )
    )]
    pub fn submit_detailed(
        &self,
        envelope: MessageEnvelope,
        saved: SavedMessage,
        processors: ProcessorList,
    ) -> Result<SubmitOutcome, DispatcherError> {
        self.validate(&envelope, &saved, &processors)?;
        self.metrics.inc_submitted();

        if processors.is_empty() {
            return Ok(self.record_without_processors(&envelope, saved));
        }

        match self.current_transaction() {
            Some(tx) => Ok(self.buffer(tx, envelope, saved, processors)),
            None => Ok(SubmitOutcome::Dispatched(
                self.dispatch(&envelope, saved, &processors),
            )),
        }
    }

    /// Replay everything buffered under `tx`, in submission order
    #[instrument(name = "dispatcher_commit", skip(self, tx), fields(tx = %tx))]
    pub fn on_transaction_committed(&self, tx: TransactionId) -> ReplayReport {
        let Some(buffer) = self.pending_guard().remove(&tx) else {
            return ReplayReport::empty(tx);
        };

        debug!(pending = buffer.len(), "Replaying buffered messages");
        self.metrics.add_replayed(buffer.len());

        let outcomes: Vec<DispatchOutcome> = buffer
            .into_iter()
            .map(|message| self.dispatch(&message.envelope, message.saved, &message.processors))
            .collect();

        let report = ReplayReport { tx, outcomes };
        info!(
            replayed = report.replayed(),
            failures = report.failures(),
            "Transaction committed, buffer replayed"
        );
        report
    }

    /// Drop everything buffered under `tx`; returns how many sends were discarded
    #[instrument(name = "dispatcher_rollback", skip(self, tx), fields(tx = %tx))]
    pub fn on_transaction_rolled_back(&self, tx: TransactionId) -> usize {
        let discarded = self
            .pending_guard()
            .remove(&tx)
            .map_or(0, |buffer| buffer.len());

        if discarded > 0 {
            self.metrics.add_discarded(discarded);
            info!(discarded, "Transaction rolled back, buffer discarded");
        }
        discarded
    }

    /// Number of sends buffered under `tx`
    pub fn pending_len(&self, tx: TransactionId) -> usize {
        self.pending_guard().get(&tx).map_or(0, PendingBuffer::len)
    }

    /// Number of sends buffered across all transactions
    pub fn pending_total(&self) -> usize {
        self.pending_guard().values().map(PendingBuffer::len).sum()
    }

    pub fn metrics(&self) -> DispatchSnapshot {
        self.metrics.snapshot()
    }

    /// Per-processor metrics in registration order
    pub fn processor_metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.registry.metrics()
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }
}

impl BufferingDispatcher {
    fn validate(
        &self,
        envelope: &MessageEnvelope,
        saved: &SavedMessage,
        processors: &ProcessorList,
    ) -> Result<(), DispatcherError> {
        envelope.validate()?;
        saved.validate_for(envelope)?;
        processors.validate()?;

        if let Some(unknown) = processors.iter().find(|name| !self.registry.contains(name)) {
            return Err(DispatcherError::UnknownProcessor {
                name: unknown.to_string(),
            });
        }
        Ok(())
    }

    /// Bookkeeping for a message no processor wants
    fn record_without_processors(
        &self,
        envelope: &MessageEnvelope,
        saved: SavedMessage,
    ) -> SubmitOutcome {
        self.metrics.inc_recorded();

        let event_emitted = self.emit_if_message(envelope, saved);
        let marked_read = if saved.notification || !self.settings.messaging_enabled() {
            self.mark_read(saved)
        } else {
            false
        };

        debug!(event_emitted, marked_read, "No processors, recorded only");
        SubmitOutcome::Recorded {
            message_id: saved.id,
            event_emitted,
            marked_read,
        }
    }

    /// Ask the store which transaction, if any, is open
    ///
    /// An indeterminate state counts as no transaction, so the message is
    /// sent now rather than risk a buffer that is never replayed.
    fn current_transaction(&self) -> Option<TransactionId> {
        match self.store.transaction_state() {
            Ok(TransactionState::Open(tx)) => Some(tx),
            Ok(TransactionState::Idle) => None,
            Err(e) => {
                self.metrics.inc_state_unknown();
                warn!(error = %e, "Transaction state unknown, sending immediately");
                None
            }
        }
    }

    fn buffer(
        &self,
        tx: TransactionId,
        envelope: MessageEnvelope,
        saved: SavedMessage,
        processors: ProcessorList,
    ) -> SubmitOutcome {
        let message = PendingMessage::snapshot(envelope, saved, processors);
        let depth = self.pending_guard().entry(tx).or_default().push(message);
        self.metrics.inc_buffered();

        debug!(tx = %tx, depth, "Buffered until commit");
        SubmitOutcome::Buffered {
            message_id: saved.id,
            tx,
            depth,
        }
    }

    /// Fan a message out to its processors, then settle event and read state
    fn dispatch(
        &self,
        envelope: &MessageEnvelope,
        saved: SavedMessage,
        processors: &ProcessorList,
    ) -> DispatchOutcome {
        self.metrics.inc_dispatched();

        let mut outcome = DispatchOutcome {
            message_id: saved.id,
            notification: saved.notification,
            ..Default::default()
        };

        for name in processors {
            outcome.attempted.push(name.clone());
            let Some(handle) = self.registry.get(name) else {
                warn!(processor = %name, message_id = %saved.id, "Processor not registered");
                outcome.failed.push(name.clone());
                continue;
            };
            if !handle.send(&envelope.payload_for(name, saved.id)) {
                outcome.failed.push(name.clone());
            }
        }

        outcome.event_emitted = self.emit_if_message(envelope, saved);

        if saved.notification && !self.settings.messaging_enabled() {
            outcome.marked_read |= self.mark_read(saved);
        }

        match self.store.count_working_rows(saved.id, saved.notification) {
            Ok(0) if outcome.marked_read => {}
            Ok(0) => outcome.marked_read = self.mark_read(saved),
            Ok(outstanding) => {
                debug!(message_id = %saved.id, outstanding, "Processors still working");
            }
            Err(e) => {
                warn!(message_id = %saved.id, error = %e, "Cannot count working rows");
            }
        }

        outcome
    }

    /// Emit "message sent" for direct messages; notifications emit nothing
    fn emit_if_message(&self, envelope: &MessageEnvelope, saved: SavedMessage) -> bool {
        if saved.notification {
            return false;
        }
        self.events.message_sent(&MessageSentEvent {
            user_from: envelope.user_from.id,
            user_to: envelope.user_to.id,
            message_id: saved.id,
            course_id: envelope.course_id,
            time: Utc::now(),
        });
        self.metrics.inc_events_emitted();
        true
    }

    fn mark_read(&self, saved: SavedMessage) -> bool {
        let result = if saved.notification {
            self.store.mark_notification_read(saved.recipient, saved.id)
        } else {
            self.store.mark_message_read(saved.recipient, saved.id)
        };

        match result {
            Ok(()) => {
                self.metrics.inc_marked_read();
                true
            }
            Err(e) => {
                warn!(message_id = %saved.id, error = %e, "Failed to mark read");
                false
            }
        }
    }

    fn pending_guard(&self) -> MutexGuard<'_, HashMap<TransactionId, PendingBuffer>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionListener for BufferingDispatcher {
    fn on_transaction_committed(&self, tx: TransactionId) {
        BufferingDispatcher::on_transaction_committed(self, tx);
    }

    fn on_transaction_rolled_back(&self, tx: TransactionId) {
        BufferingDispatcher::on_transaction_rolled_back(self, tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingEventSink;
    use contracts::{ContractError, MessageProcessor, ProcessorPayload, UserIdentity};
    use message_store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Mock processor that records every payload it receives
    struct MockProcessor {
        name: String,
        calls: Mutex<Vec<ProcessorPayload>>,
        fail_on: Mutex<Vec<MessageId>>,
        raise: AtomicBool,
    }

    impl MockProcessor {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                calls: Mutex::new(Vec::new()),
                fail_on: Mutex::new(Vec::new()),
                raise: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> Vec<ProcessorPayload> {
            self.calls.lock().unwrap().clone()
        }

        fn call_ids(&self) -> Vec<i64> {
            self.calls().iter().map(|p| p.saved_message_id.get()).collect()
        }

        fn fail_on(&self, id: MessageId) {
            self.fail_on.lock().unwrap().push(id);
        }
    }

    impl MessageProcessor for MockProcessor {
        fn name(&self) -> &str {
            &self.name
        }

        fn send_message(&self, payload: &ProcessorPayload) -> Result<bool, ContractError> {
            self.calls.lock().unwrap().push(payload.clone());
            if self.raise.load(Ordering::SeqCst) {
                return Err(ContractError::processor_send(&self.name, "connection refused"));
            }
            Ok(!self.fail_on.lock().unwrap().contains(&payload.saved_message_id))
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        events: Arc<RecordingEventSink>,
        settings: Arc<RuntimeSettings>,
        popup: Arc<MockProcessor>,
        email: Arc<MockProcessor>,
        dispatcher: Arc<BufferingDispatcher>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(RecordingEventSink::new());
        let settings = Arc::new(RuntimeSettings::new(true));
        let popup = MockProcessor::new("popup");
        let email = MockProcessor::new("email");

        let mut registry = ProcessorRegistry::new();
        registry.register_arc(popup.clone()).unwrap();
        registry.register_arc(email.clone()).unwrap();

        let dispatcher = Arc::new(
            DispatcherBuilder::new(store.clone())
                .registry(registry)
                .events(events.clone())
                .settings(settings.clone())
                .build(),
        );
        let listener: Arc<dyn TransactionListener> = dispatcher.clone();
        store.register_listener(&listener);

        Fixture {
            store,
            events,
            settings,
            popup,
            email,
            dispatcher,
        }
    }

    fn envelope(notification: bool) -> MessageEnvelope {
        let env = MessageEnvelope::new(
            "moodle",
            "instantmessage",
            UserIdentity::new(2, "sender").with_description("sender bio"),
            UserIdentity::new(3, "recipient").with_description("recipient bio"),
        )
        .with_course(7)
        .with_subject("Hello");
        if notification { env.as_notification() } else { env }
    }

    fn list(names: &[&str]) -> ProcessorList {
        names.iter().copied().collect()
    }

    impl Fixture {
        fn save(&self, notification: bool) -> (MessageEnvelope, SavedMessage) {
            let env = envelope(notification);
            let saved = self.store.save_message(&env);
            (env, saved)
        }
    }

    #[test]
    fn test_empty_list_message_emits_event_and_stays_unread() {
        let f = fixture();
        let (env, saved) = f.save(false);

        let outcome = f
            .dispatcher
            .submit_detailed(env, saved, ProcessorList::empty())
            .unwrap();

        assert_eq!(outcome.message_id(), saved.id);
        assert_eq!(outcome.path(), "recorded");
        assert!(f.popup.calls().is_empty());
        assert_eq!(f.events.len(), 1);
        assert_eq!(f.store.is_read(saved.id), Some(false));
    }

    #[test]
    fn test_empty_list_notification_with_messaging_disabled() {
        let f = fixture();
        f.settings.set_messaging_enabled(false);
        let (env, saved) = f.save(true);

        let id = f
            .dispatcher
            .submit(env, saved, ProcessorList::empty())
            .unwrap();

        assert_eq!(id, saved.id);
        assert_eq!(f.store.is_read(saved.id), Some(true));
        assert!(f.events.is_empty());
        assert!(f.popup.calls().is_empty());
    }

    #[test]
    fn test_empty_list_message_with_messaging_disabled_is_marked_read() {
        let f = fixture();
        f.settings.set_messaging_enabled(false);
        let (env, saved) = f.save(false);

        f.dispatcher.submit(env, saved, ProcessorList::empty()).unwrap();

        assert_eq!(f.events.len(), 1);
        assert_eq!(f.store.is_read(saved.id), Some(true));
    }

    #[test]
    fn test_empty_list_is_never_buffered() {
        let f = fixture();
        let tx = f.store.begin_transaction();
        let (env, saved) = f.save(true);

        f.dispatcher.submit(env, saved, ProcessorList::empty()).unwrap();

        assert_eq!(f.dispatcher.pending_len(tx), 0);
        assert_eq!(f.store.is_read(saved.id), Some(true));
    }

    #[test]
    fn test_synchronous_dispatch_without_transaction() {
        let f = fixture();
        let (env, saved) = f.save(false);

        let outcome = f
            .dispatcher
            .submit_detailed(env, saved, list(&["popup", "email"]))
            .unwrap();

        let SubmitOutcome::Dispatched(outcome) = outcome else {
            panic!("expected synchronous dispatch");
        };
        assert_eq!(outcome.delivered(), 2);
        assert!(outcome.event_emitted);
        assert!(outcome.marked_read);
        assert_eq!(f.popup.call_ids(), vec![saved.id.get()]);
        assert_eq!(f.email.call_ids(), vec![saved.id.get()]);
        assert_eq!(f.store.is_read(saved.id), Some(true));
    }

    #[test]
    fn test_descriptions_dropped_only_from_buffered_payloads() {
        let f = fixture();
        let (env, saved) = f.save(false);
        f.dispatcher.submit(env, saved, list(&["popup"])).unwrap();

        let tx = f.store.begin_transaction();
        let (env, saved) = f.save(false);
        f.dispatcher.submit(env, saved, list(&["popup"])).unwrap();
        f.store.commit(tx).unwrap();

        let calls = f.popup.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].processor, "popup");
        assert_eq!(calls[0].user_from.description.as_deref(), Some("sender bio"));
        assert_eq!(calls[0].user_to.description.as_deref(), Some("recipient bio"));
        assert!(calls[1].user_from.description.is_none());
        assert!(calls[1].user_to.description.is_none());
    }

    #[test]
    fn test_open_transaction_buffers_one_entry() {
        let f = fixture();
        let tx = f.store.begin_transaction();
        let (env, saved) = f.save(false);
        let mut caller_copy = env.clone();

        let outcome = f
            .dispatcher
            .submit_detailed(env, saved, list(&["popup"]))
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Buffered {
                message_id: saved.id,
                tx,
                depth: 1
            }
        );
        assert_eq!(f.dispatcher.pending_len(tx), 1);
        assert!(f.popup.calls().is_empty());
        assert!(f.events.is_empty());

        // Caller-side changes after submit do not reach the buffered snapshot
        caller_copy.subject = "changed".into();
        f.store.commit(tx).unwrap();

        let calls = f.popup.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].subject, "Hello");
    }

    #[test]
    fn test_rollback_discards_without_invocation() {
        let f = fixture();
        let tx = f.store.begin_transaction();
        for _ in 0..3 {
            let (env, saved) = f.save(false);
            f.dispatcher.submit(env, saved, list(&["popup", "email"])).unwrap();
        }
        assert_eq!(f.dispatcher.pending_len(tx), 3);

        f.store.rollback(tx).unwrap();

        assert_eq!(f.dispatcher.pending_len(tx), 0);
        assert_eq!(f.dispatcher.pending_total(), 0);
        assert!(f.popup.calls().is_empty());
        assert!(f.email.calls().is_empty());
        assert!(f.events.is_empty());
        assert_eq!(f.dispatcher.metrics().discarded, 3);
    }

    #[test]
    fn test_commit_replays_in_order_despite_failures() {
        let f = fixture();
        let tx = f.store.begin_transaction();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let (env, saved) = f.save(false);
            ids.push(saved.id);
            f.dispatcher.submit(env, saved, list(&["popup"])).unwrap();
        }
        f.popup.fail_on(ids[1]);

        f.store.commit(tx).unwrap();

        let expected: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        assert_eq!(f.popup.call_ids(), expected);
        assert_eq!(f.events.len(), 4);
        assert_eq!(f.dispatcher.pending_total(), 0);
        assert_eq!(f.dispatcher.metrics().replayed, 4);
        assert_eq!(f.dispatcher.processor_metrics()[0].1.failure_count, 1);
    }

    #[test]
    fn test_commit_report_from_direct_call() {
        let f = fixture();
        let tx = TransactionId(99);
        assert_eq!(f.dispatcher.on_transaction_committed(tx).replayed(), 0);
        assert_eq!(f.dispatcher.on_transaction_rolled_back(tx), 0);
    }

    #[test]
    fn test_raising_processor_does_not_stop_fanout() {
        let f = fixture();
        f.popup.raise.store(true, Ordering::SeqCst);
        let (env, saved) = f.save(false);

        let SubmitOutcome::Dispatched(outcome) = f
            .dispatcher
            .submit_detailed(env, saved, list(&["popup", "email"]))
            .unwrap()
        else {
            panic!("expected synchronous dispatch");
        };

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0], "popup");
        assert_eq!(f.email.calls().len(), 1);
        assert!(outcome.event_emitted);
    }

    #[test]
    fn test_marked_read_only_when_no_working_rows() {
        let f = fixture();
        let (env, saved) = f.save(false);
        f.store.add_working_row(saved.id, false, "email");

        f.dispatcher.submit(env, saved, list(&["popup", "email"])).unwrap();
        assert_eq!(f.store.is_read(saved.id), Some(false));

        // Same rule on the buffered path
        let tx = f.store.begin_transaction();
        let (env, saved) = f.save(false);
        f.dispatcher.submit(env, saved, list(&["popup"])).unwrap();
        f.store.commit(tx).unwrap();
        assert_eq!(f.store.is_read(saved.id), Some(true));
    }

    #[test]
    fn test_notification_with_messaging_disabled_marked_read_despite_working_rows() {
        let f = fixture();
        f.settings.set_messaging_enabled(false);
        let (env, saved) = f.save(true);
        f.store.add_working_row(saved.id, true, "email");

        let SubmitOutcome::Dispatched(outcome) = f
            .dispatcher
            .submit_detailed(env, saved, list(&["popup"]))
            .unwrap()
        else {
            panic!("expected synchronous dispatch");
        };

        assert!(!outcome.event_emitted);
        assert!(outcome.marked_read);
        assert_eq!(f.store.is_read(saved.id), Some(true));
    }

    #[test]
    fn test_read_state_counted_once_per_record() {
        let f = fixture();
        f.settings.set_messaging_enabled(false);
        let (env, saved) = f.save(true);

        f.dispatcher.submit(env, saved, list(&["popup"])).unwrap();

        assert_eq!(f.store.is_read(saved.id), Some(true));
        assert_eq!(f.dispatcher.metrics().marked_read, 1);
    }

    #[test]
    fn test_buffered_send_with_outstanding_working_row_stays_unread() {
        let f = fixture();
        let tx = f.store.begin_transaction();
        let (env, saved) = f.save(false);
        f.store.add_working_row(saved.id, false, "email");

        f.dispatcher.submit(env, saved, list(&["popup", "email"])).unwrap();
        f.store.commit(tx).unwrap();

        assert_eq!(f.popup.calls().len(), 1);
        assert_eq!(f.email.calls().len(), 1);
        assert_eq!(f.store.is_read(saved.id), Some(false));
        assert_eq!(f.dispatcher.metrics().marked_read, 0);
    }

    #[test]
    fn test_buffered_message_scenario() {
        let f = fixture();
        let tx = f.store.begin_transaction();
        let (env, saved) = f.save(false);

        f.dispatcher.submit(env, saved, list(&["popup"])).unwrap();
        assert!(f.popup.calls().is_empty());

        f.store.commit(tx).unwrap();

        assert_eq!(f.popup.calls().len(), 1);
        let events = f.events.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message_id, saved.id);
        assert_eq!(events[0].course_id.map(|c| c.get()), Some(7));
        assert_eq!(f.store.is_read(saved.id), Some(true));
        assert_eq!(f.dispatcher.metrics().marked_read, 1);
    }

    #[test]
    fn test_nested_transaction_replays_on_outermost_commit() {
        let f = fixture();
        let outer = f.store.begin_transaction();
        let inner = f.store.begin_transaction();
        assert_eq!(outer, inner);

        let (env, saved) = f.save(false);
        f.dispatcher.submit(env, saved, list(&["popup"])).unwrap();

        f.store.commit(inner).unwrap();
        assert!(f.popup.calls().is_empty());
        assert_eq!(f.dispatcher.pending_len(outer), 1);

        f.store.commit(outer).unwrap();
        assert_eq!(f.popup.calls().len(), 1);
    }

    #[test]
    fn test_separate_buffers_per_transaction() {
        let f = fixture();
        let (env_a, saved_a) = f.save(false);
        let (env_b, saved_b) = f.save(false);

        // Two handles driven directly, as a store with concurrent
        // transactions would
        let a = TransactionId(100);
        let b = TransactionId(200);
        f.dispatcher.buffer(a, env_a, saved_a, list(&["popup"]));
        f.dispatcher.buffer(b, env_b, saved_b, list(&["email"]));
        assert_eq!(f.dispatcher.pending_total(), 2);

        assert_eq!(f.dispatcher.on_transaction_rolled_back(a), 1);
        let report = f.dispatcher.on_transaction_committed(b);

        assert_eq!(report.replayed(), 1);
        assert!(f.popup.calls().is_empty());
        assert_eq!(f.email.call_ids(), vec![saved_b.id.get()]);
    }

    #[test]
    fn test_unknown_transaction_state_sends_immediately() {
        let f = fixture();
        f.store.fail_transaction_state(true);
        let (env, saved) = f.save(false);

        let outcome = f
            .dispatcher
            .submit_detailed(env, saved, list(&["popup"]))
            .unwrap();

        assert_eq!(outcome.path(), "dispatched");
        assert_eq!(f.popup.calls().len(), 1);
        assert_eq!(f.dispatcher.metrics().state_unknown, 1);
    }

    #[test]
    fn test_invalid_input_mutates_nothing() {
        let f = fixture();
        let (env, saved) = f.save(false);

        let err = f
            .dispatcher
            .submit(env.clone(), saved, list(&["sms"]))
            .unwrap_err();
        assert!(matches!(err, DispatcherError::UnknownProcessor { .. }));

        let err = f
            .dispatcher
            .submit(env.clone(), saved, list(&["popup", "popup"]))
            .unwrap_err();
        assert!(err.is_invalid_input());

        let mismatched = SavedMessage {
            notification: true,
            ..saved
        };
        let err = f
            .dispatcher
            .submit(env, mismatched, list(&["popup"]))
            .unwrap_err();
        assert!(err.is_invalid_input());

        assert!(f.popup.calls().is_empty());
        assert!(f.events.is_empty());
        assert_eq!(f.dispatcher.metrics().submitted, 0);
        assert_eq!(f.store.is_read(saved.id), Some(false));
    }

    #[test]
    fn test_create_dispatcher_from_config() {
        let config: CourierConfig = serde_json::from_str(
            r#"{
                "messaging": { "enabled": false },
                "processors": [
                    { "name": "popup", "processor_type": "popup" },
                    { "name": "log", "processor_type": "log" }
                ]
            }"#,
        )
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        let inbox = Arc::new(PopupInbox::new());

        let dispatcher = create_dispatcher(&config, store.clone(), inbox.clone()).unwrap();
        assert_eq!(dispatcher.registry().len(), 2);

        let env = envelope(true);
        let saved = store.save_message(&env);
        dispatcher.submit(env, saved, list(&["popup", "log"])).unwrap();

        assert_eq!(inbox.total(), 1);
        assert_eq!(store.is_read(saved.id), Some(true));
    }
}
