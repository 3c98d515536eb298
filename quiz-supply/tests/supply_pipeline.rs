//! End-to-end supply scenarios against a scripted generator.

use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

use quiz_agent::backend::{sample_item, MockBackend};
use quiz_agent::{AcquisitionGateway, BackendError};
use quiz_bank::{dice_coefficient, Category, ItemStore, SchemaValidator};
use quiz_supply::{
    BackfillTrigger, BufferReport, ItemSource, SeenSet, SupplyConfig, SupplyController,
    SupplyError,
};

const QUESTIONS: [&str; 6] = [
    "Which enzyme converts angiotensin I to angiotensin II?",
    "What is the drug of choice for absence seizures?",
    "Which nerve is damaged in wrist drop?",
    "What is the most common site of ectopic pregnancy?",
    "Which vitamin deficiency causes pellagra?",
    "What is the normal range of serum potassium in adults?",
];

fn setup(backend: MockBackend, config: SupplyConfig) -> (Arc<MockBackend>, SupplyController) {
    let backend = Arc::new(backend);
    let gateway = Arc::new(AcquisitionGateway::new(backend.clone()));
    let controller =
        SupplyController::with_config(gateway, Arc::new(ItemStore::in_memory()), config);
    (backend, controller)
}

fn fast_initial() -> SupplyConfig {
    let mut config = SupplyConfig::default();
    config.acquisition.initial_timeout_ms = 50;
    config
}

async fn assert_store_invariants(controller: &SupplyController) {
    let validator = SchemaValidator::strict();
    for category in Category::ALL {
        let items = controller.store().by_category(category).await;
        for item in &items {
            assert!(validator.validate(&item.to_candidate()), "stored item invalid: {}", item.id);
        }
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                assert!(
                    dice_coefficient(&a.primary_text, &b.primary_text) <= 0.85,
                    "near-duplicates stored: {:?} / {:?}",
                    a.primary_text,
                    b.primary_text
                );
            }
        }
    }
}

#[tokio::test]
async fn batch_of_zero_is_empty_without_upstream_calls() {
    let (backend, controller) = setup(MockBackend::default(), SupplyConfig::default());

    let outcome = controller.request_batch(Category::NeetUg, 0).await.unwrap();

    assert!(outcome.items.is_empty());
    assert_eq!(outcome.attempts, 0);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn timeout_with_empty_store_is_exhausted() {
    let (_, controller) = setup(
        MockBackend::default()
            .with_response(sample_item(QUESTIONS[0]))
            .with_delay(Duration::from_millis(500)),
        fast_initial(),
    );

    let result = controller.request_initial(Category::NeetPg).await;

    assert!(matches!(result, Err(SupplyError::Exhausted(Category::NeetPg))));
    assert!(controller.store().is_empty().await);
}

#[tokio::test]
async fn late_reply_after_timeout_is_never_stored() {
    let mut config = SupplyConfig::default();
    config.acquisition.initial_timeout_ms = 20;
    let (backend, controller) = setup(
        MockBackend::default()
            .with_response(sample_item(QUESTIONS[0]))
            .with_delay(Duration::from_millis(100)),
        config,
    );

    let result = controller.request_initial(Category::NeetPg).await;
    assert!(matches!(result, Err(SupplyError::Exhausted(Category::NeetPg))));

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(controller.store().is_empty().await);
    assert!(!controller.backfill_in_flight(Category::NeetPg));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn timeout_falls_back_to_previously_admitted_item() {
    let mut config = fast_initial();
    config.buffer.initial_backfill = 0;
    let (_, controller) = setup(
        MockBackend::default()
            .then_respond(sample_item(QUESTIONS[0]))
            .with_response(sample_item(QUESTIONS[1]))
            .with_delay(Duration::from_millis(500)),
        config,
    );

    let first = assert_ok!(controller.request_initial(Category::NeetUg).await);
    assert_eq!(first.source, ItemSource::Fresh);

    let second = assert_ok!(controller.request_initial(Category::NeetUg).await);
    assert_eq!(second.source, ItemSource::Fallback);
    assert_eq!(second.item, first.item);
}

#[tokio::test]
async fn fallback_never_crosses_categories() {
    let mut config = fast_initial();
    config.buffer.initial_backfill = 0;
    let (_, controller) = setup(
        MockBackend::default()
            .then_respond(sample_item(QUESTIONS[0]))
            .with_response(sample_item(QUESTIONS[1]))
            .with_delay(Duration::from_millis(500)),
        config,
    );

    controller.request_initial(Category::NeetUg).await.unwrap();

    let result = controller.request_initial(Category::Mds).await;
    assert!(matches!(result, Err(SupplyError::Exhausted(Category::Mds))));
}

#[tokio::test]
async fn candidate_missing_rationale_is_never_admitted() {
    let mut raw: serde_json::Value = serde_json::from_str(&sample_item(QUESTIONS[2])).unwrap();
    raw.as_object_mut().unwrap().remove("explanation");
    let (backend, controller) = setup(
        MockBackend::default().with_response(raw.to_string()),
        SupplyConfig::default(),
    );

    let outcome = assert_ok!(controller.request_batch(Category::Mds, 1).await);

    assert!(outcome.items.is_empty());
    assert_eq!(outcome.skipped_invalid, 3);
    assert_eq!(backend.call_count(), 3);
    assert!(controller.store().is_empty().await);
}

#[tokio::test]
async fn unparseable_reply_before_any_admission_is_an_error() {
    let (_, controller) = setup(
        MockBackend::default().with_response("Here is your question: what is ACE?"),
        SupplyConfig::default(),
    );

    let outcome = controller.request_batch(Category::Mds, 1).await;

    assert!(matches!(outcome, Err(SupplyError::MalformedResponse(_))));
    assert!(controller.store().is_empty().await);
}

#[tokio::test]
async fn invalid_candidates_count_as_skips() {
    let (_, controller) = setup(
        MockBackend::default()
            .then_respond(r#"{"question": "Missing everything else"}"#)
            .then_respond(sample_item(QUESTIONS[2])),
        SupplyConfig::default(),
    );

    let outcome = assert_ok!(controller.request_batch(Category::Mds, 1).await);

    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.skipped_invalid, 1);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(controller.store().len().await, 1);
}

#[tokio::test]
async fn batch_never_exceeds_requested_count() {
    let mut backend = MockBackend::default();
    for question in QUESTIONS {
        backend = backend.then_respond(sample_item(question));
    }
    let (backend, controller) = setup(backend, SupplyConfig::default());

    let outcome = controller.request_batch(Category::NeetUg, 4).await.unwrap();

    assert_eq!(outcome.items.len(), 4);
    assert_eq!(backend.call_count(), 4);
    assert_eq!(controller.store().len().await, 4);
}

#[tokio::test]
async fn repeating_generator_yields_partial_batch() {
    let (backend, controller) = setup(
        MockBackend::default()
            .then_respond(sample_item(QUESTIONS[3]))
            // Punctuation-only variant of the same question
            .with_response(sample_item(
                "What is the most common site of ectopic pregnancy ?",
            )),
        SupplyConfig::default(),
    );

    let outcome = controller.request_batch(Category::NeetPg, 2).await.unwrap();

    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.attempts, 6);
    assert_eq!(outcome.skipped_duplicate, 5);
    assert_eq!(backend.call_count(), 6);
    assert_store_invariants(&controller).await;
}

#[tokio::test]
async fn same_text_in_different_categories_is_admitted() {
    let (_, controller) = setup(
        MockBackend::default().with_response(sample_item(QUESTIONS[4])),
        SupplyConfig::default(),
    );

    let ug = controller.request_batch(Category::NeetUg, 1).await.unwrap();
    let pg = controller.request_batch(Category::NeetPg, 1).await.unwrap();

    assert_eq!(ug.items.len(), 1);
    assert_eq!(pg.items.len(), 1);
    assert_ne!(ug.items[0].id, pg.items[0].id);
}

#[tokio::test]
async fn concurrent_backfill_triggers_run_one_loop() {
    let mut backend = MockBackend::default().with_error(BackendError::Unavailable("drained".to_string()));
    for question in &QUESTIONS[..3] {
        backend = backend.then_respond_after(Duration::from_millis(30), sample_item(question));
    }
    let (backend, controller) = setup(backend, SupplyConfig::default());

    let report = BufferReport::new(0, 1);
    let triggers: Vec<BackfillTrigger> = (0..5)
        .map(|_| controller.maintain_buffer(Category::Upsc, report))
        .collect();

    let started: Vec<_> = triggers
        .into_iter()
        .filter_map(BackfillTrigger::into_handle)
        .collect();
    assert_eq!(started.len(), 1);
    assert!(controller.backfill_in_flight(Category::Upsc));

    futures::future::join_all(started.into_iter().map(|h| h.join())).await;

    assert!(!controller.backfill_in_flight(Category::Upsc));
    assert_eq!(backend.call_count(), 3);
    assert_eq!(backend.peak_concurrency(), 1);
    assert_eq!(controller.pending(Category::Upsc), 3);
}

#[tokio::test]
async fn concurrent_triggers_across_tasks_are_coalesced() {
    let backend = MockBackend::default()
        .with_response(sample_item(QUESTIONS[5]))
        .with_delay(Duration::from_millis(50));
    let (backend, controller) = setup(backend, SupplyConfig::default());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.maintain_buffer(Category::Mds, BufferReport::new(2, 20))
            })
        })
        .collect();

    let mut handles = Vec::new();
    for task in futures::future::join_all(tasks).await {
        if let Some(handle) = task.unwrap().into_handle() {
            handles.push(handle);
        }
    }
    assert_eq!(handles.len(), 1);
    for handle in handles {
        handle.join().await;
    }

    assert_eq!(backend.peak_concurrency(), 1);
    assert_store_invariants(&controller).await;
}

#[tokio::test]
async fn fresh_initial_item_starts_backfill() {
    let mut backend = MockBackend::default();
    for question in &QUESTIONS[..5] {
        backend = backend.then_respond(sample_item(question));
    }
    let (_, controller) = setup(backend, SupplyConfig::default());

    let mut initial = controller.request_initial(Category::NeetUg).await.unwrap();
    assert_eq!(initial.source, ItemSource::Fresh);

    initial.backfill.take().expect("fresh item starts a backfill").join().await;
    assert!(!controller.backfill_in_flight(Category::NeetUg));

    let mut seen = SeenSet::new();
    seen.mark(&initial.item);
    let delivery = controller.collect(Category::NeetUg, &seen);

    assert_eq!(delivery.items.len(), 4);
    assert!(delivery.items.iter().all(|i| i.id != initial.item.id));
    assert!(delivery.flagged.is_none());
    assert_eq!(controller.store().len().await, 5);
    assert_store_invariants(&controller).await;
}

#[tokio::test]
async fn backfilled_item_already_seen_is_flagged() {
    let (_, controller) = setup(
        MockBackend::default()
            .then_respond(sample_item(QUESTIONS[0]))
            .then_respond(sample_item(QUESTIONS[1])),
        SupplyConfig::default(),
    );

    let handle = controller
        .maintain_buffer(Category::NeetPg, BufferReport::new(0, 0))
        .into_handle()
        .unwrap();
    handle.join().await;

    // The consumer already saw the first question through another channel
    let mut seen = SeenSet::new();
    seen.insert_text(QUESTIONS[0]);
    let delivery = controller.collect(Category::NeetPg, &seen);

    assert_eq!(delivery.items.len(), 1);
    assert_eq!(delivery.items[0].primary_text, QUESTIONS[1]);
    assert_eq!(delivery.flagged.unwrap().primary_text, QUESTIONS[0]);
}
