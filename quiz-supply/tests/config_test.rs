//! Config loading and store persistence integration tests

use std::io::Write;
use std::sync::Arc;

use quiz_agent::backend::{sample_item, MockBackend};
use quiz_agent::AcquisitionGateway;
use quiz_bank::{Category, ItemStore};
use quiz_supply::{SupplyConfig, SupplyController, SupplyError};

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
acquisition:
  initial_timeout_ms: 1500
  backfill_timeout_ms: 10000
  max_attempts_per_item: 2
buffer:
  low_water_mark: 10
validation:
  duplicate_threshold: 0.9
store:
  path: /var/lib/quiz/questions.json
"#
    )
    .unwrap();

    let config = SupplyConfig::load(file.path()).unwrap();

    assert_eq!(config.acquisition.initial_timeout_ms, 1500);
    assert_eq!(config.acquisition.backfill_timeout_ms, Some(10000));
    assert_eq!(config.acquisition.max_attempts_per_item, 2);
    assert_eq!(config.buffer.low_water_mark, 10);
    // Unset fields keep their defaults
    assert_eq!(config.buffer.backfill_batch, 3);
    assert!(config.validation.require_single_correct);
    assert_eq!(config.store.path, "/var/lib/quiz/questions.json");
}

#[test]
fn test_load_rejects_bad_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "validation:\n  duplicate_threshold: 0").unwrap();

    assert!(matches!(
        SupplyConfig::load(file.path()),
        Err(SupplyError::Config(_))
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = SupplyConfig::load(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(SupplyError::Config(_))));
}

#[tokio::test]
async fn test_admitted_items_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("questions.json");

    let backend = Arc::new(
        MockBackend::default()
            .then_respond(sample_item("Which layer of the tooth is the hardest?"))
            .then_respond(sample_item("Which cells produce dentin?")),
    );
    let gateway = Arc::new(AcquisitionGateway::new(backend));
    let store = Arc::new(ItemStore::open(&path).await.unwrap());
    let controller = SupplyController::new(gateway, store);

    let outcome = controller.request_batch(Category::Mds, 2).await.unwrap();
    assert_eq!(outcome.items.len(), 2);

    let reopened = ItemStore::open(&path).await.unwrap();
    assert_eq!(reopened.by_category(Category::Mds).await, outcome.items);
    assert!(reopened.by_category(Category::Upsc).await.is_empty());
}
