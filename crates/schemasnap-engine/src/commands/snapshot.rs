//! Snapshot assembly.
//!
//! Fetches collections, fields and relations concurrently, then hands them to
//! the pure kernel for sanitizing, canonical sorting and tagging.
//!
//! The three fetches are joined fail-fast: the first error drops the other
//! futures, which cancels whatever they still had in flight. Dropping the
//! future returned by [`get_snapshot`] cancels all of them the same way.

use crate::defaults::{default_producer_version, process_defaults};
use crate::ports::{SchemaOverview, SchemaService, StoreHandle};
use schemasnap_core::model::{RecordKind, SchemaRecord};
use schemasnap_core::snapshot::{generate_snapshot, RawSchema};
use schemasnap_core::{log_op_end, log_op_error, log_op_start};
use schemasnap_core::errors::SnapError;
use schemasnap_core::{ExError, Snapshot};
use schemasnap_core_types::RequestContext;
use std::sync::Arc;

const OP: &str = "get_snapshot";

/// Inputs of [`get_snapshot`]. Anything left out comes from the process
/// defaults.
#[derive(Clone, Default)]
pub struct SnapshotOptions {
    pub store: Option<Arc<dyn StoreHandle>>,
    pub schema: Option<Arc<SchemaOverview>>,
    pub producer_version: Option<String>,
    pub request: RequestContext,
}

impl SnapshotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn StoreHandle>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_schema(mut self, schema: SchemaOverview) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    pub fn with_producer_version(mut self, version: impl Into<String>) -> Self {
        self.producer_version = Some(version.into());
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }
}

/// Produce the canonical snapshot of the live schema.
///
/// ## Errors
///
/// - `FetchFailed`: one of the three fetches failed; carries the record kind
///   and the collaborator's error as source
/// - `CycleDetected`: a fetched record nests beyond the canonical depth bound
/// - `NotConfigured`: no store was given and no defaults are installed
pub async fn get_snapshot(options: SnapshotOptions) -> Result<Snapshot, ExError> {
    let request = options.request.clone();
    log_op_start!(OP, request_id = %request.request_id);
    let start = std::time::Instant::now();

    let result = get_snapshot_impl(options).await.map_err(|e| {
        let mut e = e.with_request_id(request.request_id.clone());
        if let Some(trace_id) = &request.trace_id {
            e = e.with_trace_id(trace_id.clone());
        }
        log_op_error!(
            OP,
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = %request.request_id
        );
        e
    })?;

    log_op_end!(
        OP,
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request.request_id,
        vendor = %result.vendor,
        collections = result.collections.len(),
        fields = result.fields.len(),
        relations = result.relations.len()
    );

    Ok(result)
}

async fn get_snapshot_impl(options: SnapshotOptions) -> Result<Snapshot, ExError> {
    let store = match options.store {
        Some(store) => store,
        None => process_defaults()?.store(),
    };
    let producer_version = options
        .producer_version
        .unwrap_or_else(default_producer_version);
    let schema = match options.schema {
        Some(schema) => schema,
        None => Arc::new(store.load_schema().await?),
    };

    let service = store.schema_service(schema);
    let (collections, fields, relations) = tokio::try_join!(
        fetch(service.as_ref(), RecordKind::Collection),
        fetch(service.as_ref(), RecordKind::Field),
        fetch(service.as_ref(), RecordKind::Relation)
    )?;

    let snapshot = generate_snapshot(
        RawSchema {
            collections,
            fields,
            relations,
        },
        producer_version,
        store.vendor(),
    )
    .map_err(|e| ExError::from(e).with_op(OP))?;

    for kind in RecordKind::ALL {
        tracing::debug!(
            op = OP,
            record_kind = %kind,
            kept_len = snapshot.records(kind).len(),
            "records kept"
        );
    }

    Ok(snapshot)
}

async fn fetch(
    service: &dyn SchemaService,
    kind: RecordKind,
) -> Result<Vec<SchemaRecord>, ExError> {
    let fetched = match kind {
        RecordKind::Collection => service.list_collections().await,
        RecordKind::Field => service.list_fields().await,
        RecordKind::Relation => service.list_relations().await,
    };

    match fetched {
        Ok(records) => {
            tracing::debug!(
                op = OP,
                record_kind = %kind,
                raw_len = records.len(),
                "records fetched"
            );
            Ok(records)
        }
        Err(source) => Err(ExError::from(SnapError::Fetch {
            kind,
            reason: source.message().to_string(),
        })
        .with_op(OP)
        .with_source(source)),
    }
}
