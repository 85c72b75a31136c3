//! Snapshot generation from already-fetched records.
//!
//! Per record kind, in order:
//!
//! 1. Drop system records, strip `meta.id`
//! 2. Project onto the kind's comparison surface
//! 3. Deep canonical sort
//! 4. Top-level sort by collection, then field, then full record

use crate::canonical::{canonicalize_record, compare_mappings, compare_values};
use crate::errors::Result;
use crate::model::record::{RecordKind, SchemaRecord};
use crate::model::snapshot::{Snapshot, SNAPSHOT_FORMAT_VERSION};
use crate::sanitize::{sanitize_records, sanitize_shape};
use std::cmp::Ordering;

/// Raw records of all three kinds, as the schema service yielded them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSchema {
    pub collections: Vec<SchemaRecord>,
    pub fields: Vec<SchemaRecord>,
    pub relations: Vec<SchemaRecord>,
}

impl RawSchema {
    pub fn take(&mut self, kind: RecordKind) -> Vec<SchemaRecord> {
        match kind {
            RecordKind::Collection => std::mem::take(&mut self.collections),
            RecordKind::Field => std::mem::take(&mut self.fields),
            RecordKind::Relation => std::mem::take(&mut self.relations),
        }
    }
}

/// Sanitize, canonicalize and order the records of one kind.
///
/// # Errors
///
/// Returns `CyclicStructure` if a record nests past the canonical bound.
pub fn prepare_records(kind: RecordKind, raw: Vec<SchemaRecord>) -> Result<Vec<SchemaRecord>> {
    let mut records = sanitize_records(raw)
        .iter()
        .map(|record| canonicalize_record(sanitize_shape(kind, record)))
        .collect::<Result<Vec<_>>>()?;

    records.sort_by(|a, b| compare_top_level(kind, a, b));
    Ok(records)
}

/// Top-level order of records of one kind.
///
/// Sort keys are compared under the canonical value order; records missing
/// a sort key go after those that have it. Records equal on every sort key
/// fall back to full canonical comparison, so the order never depends on
/// fetch order.
pub fn compare_top_level(kind: RecordKind, a: &SchemaRecord, b: &SchemaRecord) -> Ordering {
    for key in kind.sort_keys() {
        let ord = match (a.get(*key), b.get(*key)) {
            (Some(x), Some(y)) => compare_values(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    compare_mappings(a, b)
}

/// Build a snapshot from raw records.
///
/// # Errors
///
/// Returns `CyclicStructure` if any record nests past the canonical bound.
pub fn generate_snapshot(
    mut raw: RawSchema,
    producer_version: impl Into<String>,
    vendor: impl Into<String>,
) -> Result<Snapshot> {
    Ok(Snapshot {
        version: SNAPSHOT_FORMAT_VERSION,
        producer_version: producer_version.into(),
        vendor: vendor.into(),
        collections: prepare_records(RecordKind::Collection, raw.take(RecordKind::Collection))?,
        fields: prepare_records(RecordKind::Field, raw.take(RecordKind::Field))?,
        relations: prepare_records(RecordKind::Relation, raw.take(RecordKind::Relation))?,
    })
}
