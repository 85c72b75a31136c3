//! Deep canonical sort.

use crate::canonical::order::compare_values;
use crate::errors::{Result, SnapError};
use crate::model::record::SchemaRecord;
use serde_json::{Map, Value};

/// Maximum nesting depth accepted by [`canonicalize`].
///
/// Owned value trees cannot alias, so a cyclic schema graph can only reach
/// the sorter as an expansion that an upstream producer failed to stop.
/// Nesting past this bound is reported as a cyclic structure.
pub const MAX_CANONICAL_DEPTH: usize = 256;

/// Canonicalize a value bottom-up.
///
/// - scalars are returned unchanged
/// - mappings are rebuilt with keys in sorted order
/// - sequences are sorted under [`compare_values`]
///
/// Every sequence is sorted, including sequences whose order carries
/// meaning. Callers that need an ordered list preserved must not route it
/// through this function.
///
/// # Errors
///
/// Returns `CyclicStructure` when nesting exceeds [`MAX_CANONICAL_DEPTH`].
pub fn canonicalize(value: Value) -> Result<Value> {
    let mut path = Vec::new();
    canonicalize_at(value, &mut path)
}

/// Canonicalize a record, keeping it a mapping.
///
/// # Errors
///
/// Returns `CyclicStructure` when nesting exceeds [`MAX_CANONICAL_DEPTH`].
pub fn canonicalize_record(record: SchemaRecord) -> Result<SchemaRecord> {
    let mut path = Vec::new();
    canonicalize_map(record, &mut path)
}

fn canonicalize_at(value: Value, path: &mut Vec<String>) -> Result<Value> {
    match value {
        Value::Object(map) => canonicalize_map(map, path).map(Value::Object),
        Value::Array(items) => canonicalize_seq(items, path).map(Value::Array),
        scalar => Ok(scalar),
    }
}

fn enter(path: &mut Vec<String>, segment: String) -> Result<()> {
    path.push(segment);
    if path.len() > MAX_CANONICAL_DEPTH {
        return Err(SnapError::CyclicStructure {
            path: render_path(path),
            depth: path.len(),
        });
    }
    Ok(())
}

fn canonicalize_map(map: Map<String, Value>, path: &mut Vec<String>) -> Result<Map<String, Value>> {
    let mut pairs = Vec::with_capacity(map.len());
    for (key, child) in map {
        enter(path, key.clone())?;
        let child = canonicalize_at(child, path)?;
        path.pop();
        pairs.push((key, child));
    }

    // Keys are unique, the value comparison only keeps the order total.
    pairs.sort_by(|(ka, va), (kb, vb)| ka.cmp(kb).then_with(|| compare_values(va, vb)));

    let mut out = Map::with_capacity(pairs.len());
    for (key, child) in pairs {
        out.insert(key, child);
    }
    Ok(out)
}

fn canonicalize_seq(items: Vec<Value>, path: &mut Vec<String>) -> Result<Vec<Value>> {
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        enter(path, index.to_string())?;
        out.push(canonicalize_at(item, path)?);
        path.pop();
    }
    out.sort_by(compare_values);
    Ok(out)
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        return "$".to_string();
    }
    format!("$.{}", path.join("."))
}
