mod common;

use common::book;
use lexsync_engine::{CommitStrategy, LoggingFailureHandler, RefreshStrategy};
use lexsync_indexing::config::MapConfigSource;
use lexsync_indexing::context::mock::MockMapping;
use lexsync_indexing::context::{SessionContext, StartContext};
use lexsync_indexing::queue::mock::RecordingSender;
use lexsync_indexing::settings::{
    AUTOMATIC_INDEXING_ENABLE_DIRTY_CHECK, INDEXING_LISTENERS_ENABLED,
    INDEXING_PLAN_SYNCHRONIZATION_STRATEGY,
};
use lexsync_indexing::{
    BuiltinStrategy, BuiltinStrategyResolver, ConfigError, EventSender, FlushTiming,
    IndexingCoordinator, IndexingError, ReportMode, SenderFactory, SessionPlanHolder,
    StrategyHandle, StrategyResolver, SynchronizationStrategy, TransactionSynchronization,
};
use lexsync_types::TransactionId;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn start_context<'a>(
    config: &'a MapConfigSource,
    resolver: &'a BuiltinStrategyResolver,
) -> StartContext<'a> {
    StartContext { config, resolver }
}

fn started_coordinator(config: &MapConfigSource) -> (IndexingCoordinator, Arc<MockMapping>) {
    common::init_tracing();
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(None, false);
    coordinator
        .start(mapping.clone(), &start_context(config, &BuiltinStrategyResolver))
        .unwrap();
    (coordinator, mapping)
}

fn queue_factory(sender: &Arc<RecordingSender>) -> SenderFactory {
    let sender = Arc::clone(sender);
    Arc::new(move |_session: &SessionContext| Arc::clone(&sender) as Arc<dyn EventSender>)
}

// ── Lifecycle ─────────────────────────────────────────────────────

#[test]
fn factory_methods_fail_before_start() {
    let coordinator = IndexingCoordinator::new(None, false);
    let session = SessionContext::new();
    let mut builder =
        lexsync_indexing::SynchronizationPolicyBuilder::new(Arc::new(LoggingFailureHandler));
    BuiltinStrategy::WriteSync.apply(&mut builder);
    let policy = builder.build("write-sync");

    assert!(matches!(
        coordinator.default_synchronization(),
        Err(IndexingError::NotStarted)
    ));
    assert!(matches!(
        coordinator.override_synchronization(&BuiltinStrategy::Sync),
        Err(IndexingError::NotStarted)
    ));
    assert!(matches!(
        coordinator.create_indexing_plan(&session, &policy),
        Err(IndexingError::NotStarted)
    ));
    assert!(matches!(
        coordinator.create_queue_processing_plan(&session, &policy),
        Err(IndexingError::NotStarted)
    ));
    assert!(matches!(
        coordinator.listener_settings(),
        Err(IndexingError::NotStarted)
    ));
}

#[test]
fn start_resolves_the_default_policy_and_registers_the_listener() {
    let config = MapConfigSource::new();
    let (coordinator, mapping) = started_coordinator(&config);

    let policy = coordinator.default_synchronization().unwrap();
    assert_eq!(policy.name(), "write-sync");
    assert_eq!(policy.commit(), CommitStrategy::Force);
    assert_eq!(policy.refresh(), RefreshStrategy::None);

    let registrations = mapping.registrations();
    assert_eq!(registrations.len(), 1);
    assert!(registrations[0].dirty_check_enabled);
}

#[test]
fn disabled_listeners_are_not_registered() {
    let config = MapConfigSource::new().set(INDEXING_LISTENERS_ENABLED, "false");
    let (_coordinator, mapping) = started_coordinator(&config);

    assert!(mapping.registrations().is_empty());
}

#[test]
fn dirty_check_flag_reaches_the_registration() {
    let config = MapConfigSource::new().set(AUTOMATIC_INDEXING_ENABLE_DIRTY_CHECK, "false");
    let (coordinator, mapping) = started_coordinator(&config);

    assert!(!mapping.registrations()[0].dirty_check_enabled);
    assert!(!coordinator.listener_settings().unwrap().dirty_check_enabled);
}

#[test]
fn configured_strategy_is_resolved() {
    let config = MapConfigSource::new().set(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY, "async");
    let (coordinator, _mapping) = started_coordinator(&config);

    let policy = coordinator.default_synchronization().unwrap();
    assert_eq!(policy.name(), "async");
    assert_eq!(policy.report_mode(), ReportMode::Background);
}

#[test]
fn failed_start_leaves_the_coordinator_unstarted() {
    let config = MapConfigSource::new().set(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY, "bogus");
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(None, false);

    let err = coordinator
        .start(mapping.clone(), &start_context(&config, &BuiltinStrategyResolver))
        .unwrap_err();

    assert!(matches!(
        err,
        IndexingError::Config(ConfigError::UnknownStrategy { .. })
    ));
    assert!(mapping.registrations().is_empty());
    assert!(matches!(
        coordinator.default_synchronization(),
        Err(IndexingError::NotStarted)
    ));

    // stop after a failed start is harmless.
    coordinator.stop();
}

#[test]
fn stop_releases_the_strategy_exactly_once() {
    struct CountingResolver {
        released: Arc<AtomicUsize>,
    }

    impl StrategyResolver for CountingResolver {
        fn resolve(&self, name: &str, key: &str) -> Result<StrategyHandle, ConfigError> {
            let strategy = BuiltinStrategy::from_name(name).ok_or_else(|| {
                ConfigError::UnknownStrategy {
                    key: key.to_string(),
                    name: name.to_string(),
                }
            })?;
            let released = self.released.clone();
            Ok(StrategyHandle::with_release(Arc::new(strategy), move || {
                released.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    let released = Arc::new(AtomicUsize::new(0));
    let resolver = CountingResolver {
        released: released.clone(),
    };
    let config = MapConfigSource::new();
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(None, false);
    coordinator
        .start(
            mapping,
            &StartContext {
                config: &config,
                resolver: &resolver,
            },
        )
        .unwrap();

    coordinator.stop();
    coordinator.stop();

    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_without_start_is_a_no_op() {
    let mut coordinator = IndexingCoordinator::new(None, false);
    coordinator.stop();
    coordinator.stop();
}

#[test]
fn flush_timing_follows_transaction_enlistment() {
    assert_eq!(
        IndexingCoordinator::new(None, true).flush_timing(),
        FlushTiming::BeforeCommit
    );
    assert_eq!(
        IndexingCoordinator::new(None, false).flush_timing(),
        FlushTiming::AfterCommit
    );
}

// ── Direct mode ───────────────────────────────────────────────────

#[test]
fn direct_mode_plans_write_into_the_mapping_engine() {
    let config = MapConfigSource::new();
    let (coordinator, mapping) = started_coordinator(&config);
    let policy = coordinator.default_synchronization().unwrap();
    let session = SessionContext::new();

    let mut plan = coordinator.create_indexing_plan(&session, &policy).unwrap();
    assert!(!plan.is_queued());
    plan.add(book("1"), json!({"title": "Dune"}));
    policy.execute(plan).unwrap();

    assert_eq!(
        mapping.engine().document(&book("1")),
        Some(json!({"title": "Dune"}))
    );
    assert_eq!(mapping.engine().commit_count(), 1);
}

#[test]
fn override_builds_a_one_off_policy_in_direct_mode() {
    let config = MapConfigSource::new();
    let (coordinator, _mapping) = started_coordinator(&config);

    let policy = coordinator
        .override_synchronization(&BuiltinStrategy::Sync)
        .unwrap();

    assert_eq!(policy.commit(), CommitStrategy::Force);
    assert_eq!(policy.refresh(), RefreshStrategy::Force);
}

#[test]
fn direct_mode_has_no_queue_processing_plan() {
    let config = MapConfigSource::new();
    let (coordinator, _mapping) = started_coordinator(&config);
    let policy = coordinator.default_synchronization().unwrap();
    let session = SessionContext::new();

    assert!(matches!(
        coordinator.create_queue_processing_plan(&session, &policy),
        Err(IndexingError::QueueNotConfigured)
    ));
}

#[test]
fn transaction_synchronization_round_trip() {
    let config = MapConfigSource::new();
    let (coordinator, mapping) = started_coordinator(&config);
    let policy = coordinator.default_synchronization().unwrap();
    let session = SessionContext::new();
    let holder = Arc::new(SessionPlanHolder::new());
    let transaction_id = TransactionId::new();

    let plan = coordinator.create_indexing_plan(&session, &policy).unwrap();
    let hook = coordinator
        .create_transaction_synchronization(plan, Arc::clone(&holder), transaction_id, &policy)
        .unwrap();

    // Listeners record through the holder while the transaction runs.
    holder
        .with_plan(transaction_id, |plan| {
            plan.add(book("1"), json!({"title": "Dune"}));
        })
        .unwrap();

    hook.before_completion().unwrap();
    hook.after_completion(lexsync_indexing::CompletionStatus::Committed);

    assert_eq!(mapping.engine().len(), 1);
}

// ── Queue mode ────────────────────────────────────────────────────

#[test]
fn uses_async_processing_reflects_the_sender_factory() {
    let sender = Arc::new(RecordingSender::new());
    assert!(IndexingCoordinator::new(Some(queue_factory(&sender)), false).uses_async_processing());
    assert!(!IndexingCoordinator::new(None, false).uses_async_processing());
}

#[test]
fn queue_mode_forces_a_write_sync_policy() {
    let sender = Arc::new(RecordingSender::new());
    let config = MapConfigSource::new();
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(Some(queue_factory(&sender)), false);
    coordinator
        .start(mapping, &start_context(&config, &BuiltinStrategyResolver))
        .unwrap();

    let policy = coordinator.default_synchronization().unwrap();
    assert_eq!(policy.name(), "write-sync");
    assert_eq!(policy.commit(), CommitStrategy::Force);
    assert_eq!(policy.report_mode(), ReportMode::Synchronous);
}

#[test]
fn queue_mode_rejects_a_configured_strategy_at_start() {
    let sender = Arc::new(RecordingSender::new());
    let config = MapConfigSource::new().set(INDEXING_PLAN_SYNCHRONIZATION_STRATEGY, "sync");
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(Some(queue_factory(&sender)), false);

    let err = coordinator
        .start(mapping, &start_context(&config, &BuiltinStrategyResolver))
        .unwrap_err();

    assert!(matches!(
        err,
        IndexingError::Config(ConfigError::StrategyConfiguredWithQueue { .. })
    ));
}

#[test]
fn queue_mode_rejects_overrides() {
    let sender = Arc::new(RecordingSender::new());
    let config = MapConfigSource::new();
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(Some(queue_factory(&sender)), false);
    coordinator
        .start(mapping, &start_context(&config, &BuiltinStrategyResolver))
        .unwrap();

    let err = coordinator
        .override_synchronization(&BuiltinStrategy::Sync)
        .unwrap_err();

    assert!(matches!(
        err,
        IndexingError::Config(ConfigError::StrategyOverrideWithQueue)
    ));
}

#[test]
fn queue_mode_plans_enqueue_instead_of_writing() {
    let sender = Arc::new(RecordingSender::new());
    let config = MapConfigSource::new();
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(Some(queue_factory(&sender)), false);
    coordinator
        .start(mapping.clone(), &start_context(&config, &BuiltinStrategyResolver))
        .unwrap();

    let policy = coordinator.default_synchronization().unwrap();
    let session = SessionContext::new();
    let mut plan = coordinator.create_indexing_plan(&session, &policy).unwrap();
    assert!(plan.is_queued());
    plan.add(book("1"), json!({"title": "Dune"}));
    plan.delete(book("2"));

    policy.execute(plan).unwrap();

    // Nothing hit the index; the events went to the queue.
    assert!(mapping.engine().is_empty());
    let events = sender.sent_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].reference, book("1"));
    assert_eq!(events[1].reference, book("2"));
}

#[test]
fn queue_mode_builds_processing_plans() {
    let sender = Arc::new(RecordingSender::new());
    let config = MapConfigSource::new();
    let mapping = Arc::new(MockMapping::new());
    let mut coordinator = IndexingCoordinator::new(Some(queue_factory(&sender)), false);
    coordinator
        .start(mapping.clone(), &start_context(&config, &BuiltinStrategyResolver))
        .unwrap();

    let policy = coordinator.default_synchronization().unwrap();
    let session = SessionContext::new();
    let mut processing = coordinator
        .create_queue_processing_plan(&session, &policy)
        .unwrap();

    let events = vec![lexsync_types::ChangeEvent::add_or_update(
        book("1"),
        json!({"title": "Dune"}),
    )];
    let outcome = processing.process(events).unwrap();

    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.requeued, 0);
    assert_eq!(
        mapping.engine().document(&book("1")),
        Some(json!({"title": "Dune"}))
    );
}
