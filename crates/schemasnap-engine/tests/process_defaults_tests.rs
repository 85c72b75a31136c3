#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Process defaults are global, so everything that installs them lives in
//! this one test binary and runs in a single test.

use schemasnap_core::model::{KeySelection, PermissionMode, PrimaryKey, SchemaRecord};
use schemasnap_core::ExErrorKind;
use schemasnap_engine::{
    get_snapshot, install_process_defaults, ItemUpdateOperation, ItemUpdateOptions, MemoryStore,
    ProcessDefaults, SnapshotOptions,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_defaults_fill_omitted_options() {
    assert_eq!(
        ItemUpdateOperation::from_process_defaults().err().map(|e| e.kind()),
        Some(ExErrorKind::NotConfigured)
    );

    let collections: Vec<SchemaRecord> =
        serde_json::from_value(json!([{"collection": "pages", "meta": {"id": 1}}])).unwrap();
    let store = MemoryStore::new("mssql")
        .with_collections(collections)
        .with_item("pages", PrimaryKey::Integer(7), json!({"title": "Home"}))
        .unwrap();
    let store = Arc::new(store);

    install_process_defaults(
        ProcessDefaults::new(store.clone())
            .with_producer_version("11.0.0"),
    )
    .unwrap();

    let snapshot = get_snapshot(SnapshotOptions::new()).await.unwrap();
    assert_eq!(snapshot.vendor, "mssql");
    assert_eq!(snapshot.producer_version, "11.0.0");
    assert_eq!(snapshot.collections.len(), 1);

    // An explicit version still wins over the installed one.
    let snapshot = get_snapshot(SnapshotOptions::new().with_producer_version("dev"))
        .await
        .unwrap();
    assert_eq!(snapshot.producer_version, "dev");

    let operation = ItemUpdateOperation::from_process_defaults().unwrap();
    let options = ItemUpdateOptions::new("pages")
        .with_key(KeySelection::One(PrimaryKey::Integer(7)))
        .with_payload(json!({"title": "Start"}))
        .with_permissions(PermissionMode::FullAccess);
    operation.execute(options, None).await.unwrap();
    assert_eq!(
        store.item("pages", &PrimaryKey::Integer(7)).unwrap()["title"],
        json!("Start")
    );

    let err = install_process_defaults(ProcessDefaults::new(store)).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}
