#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use schemasnap_core::compute_snapshot_digest;
use schemasnap_core::logging_facility::test_capture::init_test_capture;
use schemasnap_core::model::{RecordKind, SchemaRecord};
use schemasnap_core::schemasnap_core_types::schema::{EVENT_END, EVENT_END_ERROR};
use schemasnap_core::schemasnap_core_types::RequestContext;
use schemasnap_core::{ExError, ExErrorKind};
use schemasnap_engine::ports::{
    AccountabilityResolver, ItemsService, SchemaOverview, SchemaService, StoreHandle,
};
use schemasnap_engine::{get_snapshot, MemoryStore, SnapshotOptions};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

fn records(value: Value) -> Vec<SchemaRecord> {
    serde_json::from_value(value).unwrap()
}

fn sample_store() -> MemoryStore {
    MemoryStore::new("postgres")
        .with_collections(records(json!([
            {"collection": "directus_roles", "meta": {"system": true}},
            {"collection": "articles", "meta": {"id": 3, "icon": "article"}, "schema": {"name": "articles", "sql": "CREATE TABLE"}},
            {"collection": "authors", "meta": {"id": 4}, "schema": {"name": "authors"}}
        ])))
        .with_fields(records(json!([
            {"collection": "authors", "field": "name", "type": "string", "meta": {"id": 21}},
            {"collection": "articles", "field": "author", "type": "integer", "meta": {"id": 12}},
            {"collection": "directus_roles", "field": "name", "meta": {"id": 2, "system": true}},
            {"collection": "articles", "field": "id", "type": "integer", "meta": {"id": 11}}
        ])))
        .with_relations(records(json!([
            {
                "collection": "articles",
                "field": "author",
                "related_collection": "authors",
                "meta": {"id": 5, "one_allowed_collections": ["b", "a"]},
                "schema": {"table": "articles", "column": "author", "on_delete": "SET NULL"}
            }
        ])))
}

fn options_for(store: MemoryStore) -> SnapshotOptions {
    SnapshotOptions::new()
        .with_store(Arc::new(store))
        .with_producer_version("10.8.3")
}

#[tokio::test]
async fn test_snapshot_end_to_end() {
    let snapshot = get_snapshot(options_for(sample_store())).await.unwrap();

    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.producer_version, "10.8.3");
    assert_eq!(snapshot.vendor, "postgres");

    let collections: Vec<&Value> = snapshot.collections.iter().map(|c| &c["collection"]).collect();
    assert_eq!(collections, vec![&json!("articles"), &json!("authors")]);

    let fields: Vec<(String, String)> = snapshot
        .fields
        .iter()
        .map(|f| {
            (
                f["collection"].as_str().unwrap().to_string(),
                f["field"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        fields,
        vec![
            ("articles".to_string(), "author".to_string()),
            ("articles".to_string(), "id".to_string()),
            ("authors".to_string(), "name".to_string()),
        ]
    );

    assert_eq!(snapshot.relations.len(), 1);
    assert_eq!(
        snapshot.relations[0]["meta"],
        json!({"one_allowed_collections": ["a", "b"]})
    );
    for kind in RecordKind::ALL {
        for record in snapshot.records(kind) {
            assert!(record.get("meta").and_then(|m| m.get("id")).is_none());
        }
    }
    assert!(snapshot.collections[0]["schema"].get("sql").is_none());
}

#[tokio::test]
async fn test_snapshot_serialization_contract() {
    let snapshot = get_snapshot(options_for(MemoryStore::new("sqlite")))
        .await
        .unwrap();

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(
        value,
        json!({
            "version": 1,
            "directus": "10.8.3",
            "vendor": "sqlite",
            "collections": [],
            "fields": [],
            "relations": []
        })
    );
}

#[tokio::test]
async fn test_fetch_failure_fails_whole_snapshot() {
    let store = sample_store().with_failing_fetch(RecordKind::Field, "connection reset");

    let err = get_snapshot(options_for(store)).await.unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::FetchFailed);
    assert_eq!(err.op(), Some("get_snapshot"));
    assert_eq!(err.record_kind(), Some(RecordKind::Field));
    assert_eq!(err.message(), "Failed to fetch fields: connection reset");
    assert!(err.request_id().is_some());
    let source = err.source_error().unwrap();
    assert_eq!(source.kind(), ExErrorKind::ExternalService);
    assert_eq!(source.message(), "connection reset");
}

#[tokio::test]
async fn test_request_id_is_attached_to_errors() {
    let request = RequestContext::new();
    let expected = request.request_id.clone();
    let store = MemoryStore::new("mysql").with_failing_fetch(RecordKind::Relation, "boom");

    let err = get_snapshot(options_for(store).with_request(request))
        .await
        .unwrap_err();

    assert_eq!(err.request_id(), Some(&expected));
}

#[tokio::test]
async fn test_identical_schema_from_different_orders_has_same_digest() {
    let reversed = {
        let base = sample_store();
        let mut collections = records(json!([
            {"collection": "authors", "schema": {"name": "authors"}, "meta": {"id": 40}},
            {"collection": "articles", "schema": {"name": "articles"}, "meta": {"icon": "article", "id": 30}},
            {"collection": "directus_roles", "meta": {"system": true}}
        ]));
        collections.rotate_left(1);
        base.with_collections(collections)
    };

    let a = get_snapshot(options_for(sample_store())).await.unwrap();
    let b = get_snapshot(options_for(reversed)).await.unwrap();

    assert_eq!(
        compute_snapshot_digest(&a).unwrap(),
        compute_snapshot_digest(&b).unwrap()
    );
}

/// Schema service whose fetches only complete once all three are in flight.
struct RendezvousService {
    barrier: Barrier,
}

impl RendezvousService {
    async fn meet(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.barrier.wait().await;
        Ok(Vec::new())
    }
}

#[async_trait]
impl SchemaService for RendezvousService {
    async fn list_collections(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.meet().await
    }

    async fn list_fields(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.meet().await
    }

    async fn list_relations(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.meet().await
    }
}

/// Schema service where relations fail while the other fetches never finish.
struct StalledService;

#[async_trait]
impl SchemaService for StalledService {
    async fn list_collections(&self) -> Result<Vec<SchemaRecord>, ExError> {
        futures::future::pending().await
    }

    async fn list_fields(&self) -> Result<Vec<SchemaRecord>, ExError> {
        futures::future::pending().await
    }

    async fn list_relations(&self) -> Result<Vec<SchemaRecord>, ExError> {
        Err(ExError::new(ExErrorKind::ExternalService).with_message("relations unavailable"))
    }
}

/// Schema service whose fetches never finish. Counts fetches that started
/// and fetches whose futures were dropped.
#[derive(Default)]
struct HangingService {
    started: AtomicUsize,
    dropped: Arc<AtomicUsize>,
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl HangingService {
    async fn hang(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _counter = DropCounter(Arc::clone(&self.dropped));
        futures::future::pending().await
    }
}

#[async_trait]
impl SchemaService for HangingService {
    async fn list_collections(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.hang().await
    }

    async fn list_fields(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.hang().await
    }

    async fn list_relations(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.hang().await
    }
}

struct CustomStore {
    service: Arc<dyn SchemaService>,
    inner: MemoryStore,
}

#[async_trait]
impl StoreHandle for CustomStore {
    fn vendor(&self) -> &str {
        "cockroachdb"
    }

    async fn load_schema(&self) -> Result<SchemaOverview, ExError> {
        Ok(SchemaOverview::default())
    }

    fn schema_service(&self, _schema: Arc<SchemaOverview>) -> Arc<dyn SchemaService> {
        Arc::clone(&self.service)
    }

    fn accountability_resolver(
        &self,
        schema: Arc<SchemaOverview>,
    ) -> Arc<dyn AccountabilityResolver> {
        self.inner.accountability_resolver(schema)
    }

    fn items_service(
        &self,
        collection: &str,
        schema: Arc<SchemaOverview>,
        accountability: Option<schemasnap_core::AccountabilityContext>,
    ) -> Arc<dyn ItemsService> {
        self.inner.items_service(collection, schema, accountability)
    }
}

fn custom(service: Arc<dyn SchemaService>) -> SnapshotOptions {
    SnapshotOptions::new()
        .with_store(Arc::new(CustomStore {
            service,
            inner: MemoryStore::new("unused"),
        }))
        .with_schema(SchemaOverview::new(json!({})))
}

#[tokio::test]
async fn test_fetches_run_concurrently() {
    let service = Arc::new(RendezvousService {
        barrier: Barrier::new(3),
    });

    let snapshot = tokio::time::timeout(Duration::from_secs(5), get_snapshot(custom(service)))
        .await
        .expect("fetches were not issued concurrently")
        .unwrap();

    assert_eq!(snapshot.vendor, "cockroachdb");
}

#[tokio::test]
async fn test_first_failure_abandons_pending_fetches() {
    let result =
        tokio::time::timeout(Duration::from_secs(5), get_snapshot(custom(Arc::new(StalledService))))
            .await
            .expect("assembly waited on stalled fetches");

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::FetchFailed);
    assert_eq!(err.record_kind(), Some(RecordKind::Relation));
}

#[tokio::test]
async fn test_abandoned_assembly_cancels_in_flight_fetches() {
    let service = Arc::new(HangingService::default());

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), get_snapshot(custom(service.clone())))
            .await;

    assert!(outcome.is_err(), "no snapshot may come back");
    assert_eq!(service.started.load(Ordering::SeqCst), 3);
    assert_eq!(service.dropped.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_missing_store_without_defaults_is_not_configured() {
    let err = get_snapshot(SnapshotOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotConfigured);
}

#[tokio::test]
async fn test_snapshot_logs_lifecycle() {
    let capture = init_test_capture();

    get_snapshot(options_for(sample_store())).await.unwrap();
    let store = MemoryStore::new("sqlite").with_failing_fetch(RecordKind::Collection, "down");
    get_snapshot(options_for(store)).await.unwrap_err();

    let events = capture.events_for("get_snapshot");
    let end = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END) && e.field("vendor") == Some("postgres"))
        .expect("end event");
    assert_eq!(end.field("collections"), Some("2"));
    assert_eq!(end.field("fields"), Some("3"));

    assert!(events.iter().any(|e| {
        e.event.as_deref() == Some(EVENT_END_ERROR) && e.field("err.code") == Some("ERR_FETCH_FAILED")
    }));
}
