//! Removal of platform-owned records and internal identifiers.

use crate::model::record::{SchemaRecord, ID_KEY, META_KEY, SYSTEM_KEY};
use serde_json::Value;

/// Whether a record is owned by the platform.
///
/// Only a literal boolean `true` at `meta.system` counts. Strings such as
/// `"true"` or numbers such as `1` do not exclude a record.
pub fn is_system(record: &SchemaRecord) -> bool {
    matches!(
        record.get(META_KEY).and_then(|meta| meta.get(SYSTEM_KEY)),
        Some(Value::Bool(true))
    )
}

/// Drop `meta.id`, leaving every other attribute in place.
///
/// A `meta` that becomes empty stays as an empty mapping.
pub fn omit_meta_id(mut record: SchemaRecord) -> SchemaRecord {
    if let Some(Value::Object(meta)) = record.get_mut(META_KEY) {
        meta.remove(ID_KEY);
    }
    record
}

/// Keep non-system records and strip their internal identifiers.
pub fn sanitize_records(records: Vec<SchemaRecord>) -> Vec<SchemaRecord> {
    records
        .into_iter()
        .filter(|record| !is_system(record))
        .map(omit_meta_id)
        .collect()
}
