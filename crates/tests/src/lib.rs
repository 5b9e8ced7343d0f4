//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 → Registry → Dispatcher → Store 的端到端流程

#[cfg(test)]
mod contract_tests {
    use contracts::{ProcessorList, SubmitOutcome, TransactionId};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::ALL_PROCESSORS, "*");
    }

    #[test]
    fn test_submit_outcome_json_shape() {
        let outcome = SubmitOutcome::Buffered {
            message_id: contracts::MessageId(4),
            tx: TransactionId(2),
            depth: 3,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["path"], "buffered");
        assert_eq!(json["message_id"], 4);
        assert_eq!(json["depth"], 3);
    }

    #[test]
    fn test_processor_list_is_a_plain_array() {
        let list: ProcessorList = serde_json::from_str(r#"["popup", "email"]"#).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["popup","email"]"#);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::thread;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContentDecoration, HeaderFooter, MessageEnvelope, MessageFormat, ProcessorList,
        TransactionListener, UserId, UserIdentity, ALL_PROCESSORS,
    };
    use dispatcher::{
        create_dispatcher, BufferingDispatcher, DispatcherBuilder, PopupInbox, ProcessorRegistry,
        RecordingEventSink, RuntimeSettings,
    };
    use message_store::MemoryStore;
    use observability::DeliveryMetricsAggregator;

    const CONFIG: &str = r#"
[messaging]
enabled = true

[[processors]]
name = "popup"
processor_type = "popup"

[[processors]]
name = "log"
processor_type = "log"

[[processors]]
name = "jabber"
processor_type = "log"
enabled = false
"#;

    struct Harness {
        store: Arc<MemoryStore>,
        inbox: Arc<PopupInbox>,
        events: Arc<RecordingEventSink>,
        settings: Arc<RuntimeSettings>,
        dispatcher: Arc<BufferingDispatcher>,
    }

    /// Config text -> registry -> dispatcher registered on a fresh store
    fn harness(config_text: &str) -> Harness {
        let config = ConfigLoader::load_from_str(config_text, ConfigFormat::Toml).unwrap();
        let store = Arc::new(MemoryStore::new());
        let inbox = Arc::new(PopupInbox::new());
        let events = Arc::new(RecordingEventSink::new());
        let settings = Arc::new(RuntimeSettings::from(&config.messaging));

        let registry = ProcessorRegistry::from_config(&config.processors, inbox.clone()).unwrap();
        let dispatcher = Arc::new(
            DispatcherBuilder::new(store.clone())
                .registry(registry)
                .events(events.clone())
                .settings(settings.clone())
                .build(),
        );
        let listener: Arc<dyn TransactionListener> = dispatcher.clone();
        store.register_listener(&listener);

        Harness {
            store,
            inbox,
            events,
            settings,
            dispatcher,
        }
    }

    fn forum_post(to: i64) -> MessageEnvelope {
        MessageEnvelope::new(
            "mod_forum",
            "posts",
            UserIdentity::new(2, "teacher").with_description("Teaches maths"),
            UserIdentity::new(to, "student").with_email("student@example.com"),
        )
        .with_course(12)
        .with_subject("New forum post")
        .with_full_message("Please read the syllabus.", MessageFormat::Markdown)
        .with_small_message("New post in Announcements")
    }

    fn list(names: &[&str]) -> ProcessorList {
        names.iter().copied().collect()
    }

    #[test]
    fn test_e2e_buffered_commit_delivers_once() {
        let h = harness(CONFIG);

        let tx = h.store.begin_transaction();
        let env = forum_post(3);
        let saved = h.store.save_message(&env);
        h.dispatcher.submit(env, saved, list(&["popup", "log"])).unwrap();

        assert_eq!(h.inbox.total(), 0);
        assert_eq!(h.dispatcher.pending_len(tx), 1);

        h.store.commit(tx).unwrap();

        assert_eq!(h.inbox.entries_for(UserId(3)).len(), 1);
        assert_eq!(h.events.len(), 1);
        assert_eq!(h.store.is_read(saved.id), Some(true));
        assert_eq!(h.dispatcher.pending_total(), 0);

        let metrics = h.dispatcher.processor_metrics();
        assert!(metrics.iter().all(|(_, m)| m.sent_count == 1));
    }

    #[test]
    fn test_e2e_rollback_removes_rows_and_sends() {
        let h = harness(CONFIG);

        let tx = h.store.begin_transaction();
        let mut ids = Vec::new();
        for to in 3..6 {
            let env = forum_post(to);
            let saved = h.store.save_message(&env);
            ids.push(saved.id);
            h.dispatcher.submit(env, saved, list(&["popup"])).unwrap();
        }
        h.store.rollback(tx).unwrap();

        assert_eq!(h.inbox.total(), 0);
        assert!(h.events.is_empty());
        assert_eq!(h.store.message_count(), 0);
        assert!(ids.iter().all(|id| h.store.is_read(*id).is_none()));
        assert_eq!(h.dispatcher.metrics().discarded, 3);
    }

    #[test]
    fn test_e2e_disabled_processor_is_unknown() {
        let h = harness(CONFIG);
        let env = forum_post(3);
        let saved = h.store.save_message(&env);

        let err = h
            .dispatcher
            .submit(env, saved, list(&["jabber"]))
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("jabber"));
    }

    #[test]
    fn test_e2e_notification_with_messaging_switched_off() {
        let h = harness(CONFIG);
        h.settings.set_messaging_enabled(false);

        let env = forum_post(3).as_notification();
        let saved = h.store.save_message(&env);
        h.store.add_working_row(saved.id, true, "email");

        h.dispatcher.submit(env, saved, ProcessorList::empty()).unwrap();

        assert_eq!(h.store.is_read(saved.id), Some(true));
        assert!(h.events.is_empty());
        assert_eq!(h.inbox.total(), 0);
    }

    #[test]
    fn test_e2e_read_waits_for_acknowledgement() {
        let h = harness(CONFIG);
        let env = forum_post(3);
        let saved = h.store.save_message(&env);
        h.store.add_working_row(saved.id, false, "email");

        h.dispatcher.submit(env, saved, list(&["popup"])).unwrap();
        assert_eq!(h.store.is_read(saved.id), Some(false));

        assert!(h.store.acknowledge(saved.id, false, "email"));
        assert!(h.store.working_rows().is_empty());
    }

    #[test]
    fn test_e2e_file_spool_with_additional_content() {
        let dir = tempfile::tempdir().unwrap();
        let config = format!(
            r#"
[[processors]]
name = "email"
processor_type = "file"
params = {{ base_path = "{}" }}
"#,
            dir.path().display().to_string().replace('\\', "/")
        );
        let h = harness(&config);

        let env = forum_post(3)
            .with_additional_content(
                ALL_PROCESSORS,
                ContentDecoration {
                    small_message: Some(HeaderFooter {
                        header: "[site] ".into(),
                        footer: String::new(),
                    }),
                    ..Default::default()
                },
            )
            .with_additional_content(
                "email",
                ContentDecoration {
                    full_message: Some(HeaderFooter {
                        header: "Hello,\n".into(),
                        footer: "\n-- Unsubscribe".into(),
                    }),
                    ..Default::default()
                },
            );
        let saved = h.store.save_message(&env);
        h.dispatcher.submit(env, saved, list(&["email"])).unwrap();

        let spool = std::fs::read_to_string(dir.path().join("email.jsonl")).unwrap();
        let line: serde_json::Value = serde_json::from_str(spool.trim()).unwrap();

        assert_eq!(line["saved_message_id"], saved.id.get());
        assert_eq!(
            line["full_message"],
            "Hello,\nPlease read the syllabus.\n-- Unsubscribe"
        );
        // The email entry wins outright; the "*" entry is not merged in
        assert_eq!(line["small_message"], "New post in Announcements");
        assert_eq!(line["user_from"]["description"], "Teaches maths");
    }

    #[test]
    fn test_e2e_nested_transactions_replay_once() {
        let h = harness(CONFIG);

        let outer = h.store.begin_transaction();
        let env = forum_post(3);
        let first = h.store.save_message(&env);
        h.dispatcher.submit(env, first, list(&["popup"])).unwrap();

        let inner = h.store.begin_transaction();
        let env = forum_post(4);
        let second = h.store.save_message(&env);
        h.dispatcher.submit(env, second, list(&["popup"])).unwrap();
        h.store.commit(inner).unwrap();

        assert_eq!(h.inbox.total(), 0);
        assert_eq!(h.dispatcher.pending_len(outer), 2);

        h.store.commit(outer).unwrap();
        assert_eq!(h.inbox.total(), 2);
        assert_eq!(h.dispatcher.metrics().replayed, 2);
    }

    #[test]
    fn test_e2e_concurrent_synchronous_sends() {
        let h = harness(CONFIG);

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let store = h.store.clone();
                let dispatcher = h.dispatcher.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        let env = forum_post(10 + worker);
                        let saved = store.save_message(&env);
                        dispatcher.submit(env, saved, list(&["popup"])).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(h.inbox.total(), 40);
        assert_eq!(h.events.len(), 40);
        assert_eq!(h.dispatcher.metrics().dispatched, 40);
        assert_eq!(h.inbox.unread_count(UserId(10)), 10);
    }

    #[test]
    fn test_e2e_create_dispatcher_and_aggregate() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let store = Arc::new(MemoryStore::new());
        let inbox = Arc::new(PopupInbox::new());
        let dispatcher = create_dispatcher(&config, store.clone(), inbox.clone()).unwrap();
        let mut aggregator = DeliveryMetricsAggregator::new();

        for notification in [false, true] {
            let mut env = forum_post(3);
            env.notification = notification;
            let saved = store.save_message(&env);
            let outcome = dispatcher
                .submit_detailed(env, saved, list(&["popup", "log"]))
                .unwrap();
            aggregator.record_submit(&outcome);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.submissions.get("dispatched"), Some(&2));
        assert_eq!(summary.events_emitted, 1);
        assert_eq!(summary.marked_read, 2);
        assert_eq!(summary.processor_calls.get("popup"), Some(&(2, 0)));
        assert_eq!(inbox.total(), 2);
    }
}
