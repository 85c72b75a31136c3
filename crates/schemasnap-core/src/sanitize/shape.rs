//! Projection of records onto their comparison surface.
//!
//! The schema service reports store-specific details (comments, index
//! names, engine-specific column flags) that differ between environments
//! without any logical schema change. Each record kind keeps only the
//! attribute paths listed here.

use crate::model::record::{RecordKind, SchemaRecord};
use serde_json::{Map, Value};

const COLLECTION_PATHS: &[&str] = &["collection", "meta", "schema.name"];

const FIELD_PATHS: &[&str] = &[
    "collection",
    "field",
    "type",
    "meta",
    "schema.name",
    "schema.table",
    "schema.data_type",
    "schema.default_value",
    "schema.max_length",
    "schema.numeric_precision",
    "schema.numeric_scale",
    "schema.is_nullable",
    "schema.is_unique",
    "schema.is_primary_key",
    "schema.has_auto_increment",
    "schema.foreign_key_column",
    "schema.foreign_key_table",
];

const RELATION_PATHS: &[&str] = &[
    "collection",
    "field",
    "related_collection",
    "meta",
    "schema.table",
    "schema.column",
    "schema.foreign_key_table",
    "schema.foreign_key_column",
    "schema.constraint_name",
    "schema.on_update",
    "schema.on_delete",
];

pub fn sanitize_collection(record: &SchemaRecord) -> SchemaRecord {
    pick(record, COLLECTION_PATHS)
}

pub fn sanitize_field(record: &SchemaRecord) -> SchemaRecord {
    pick(record, FIELD_PATHS)
}

pub fn sanitize_relation(record: &SchemaRecord) -> SchemaRecord {
    pick(record, RELATION_PATHS)
}

/// Shape sanitizer for a record kind.
pub fn sanitize_shape(kind: RecordKind, record: &SchemaRecord) -> SchemaRecord {
    match kind {
        RecordKind::Collection => sanitize_collection(record),
        RecordKind::Field => sanitize_field(record),
        RecordKind::Relation => sanitize_relation(record),
    }
}

/// Copy the listed dotted paths from `record` into a fresh mapping.
///
/// Missing paths are skipped. A `null` parent of a nested path is copied as
/// `null` so that e.g. a collection without a table keeps `schema: null`.
fn pick(record: &SchemaRecord, paths: &[&str]) -> SchemaRecord {
    let mut out = Map::new();
    for path in paths {
        let segments: Vec<&str> = path.split('.').collect();
        copy_path(record, &mut out, &segments);
    }
    out
}

fn copy_path(source: &Map<String, Value>, target: &mut Map<String, Value>, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = source.get(*head) else {
        return;
    };

    if rest.is_empty() {
        target.insert((*head).to_string(), value.clone());
        return;
    }

    match value {
        Value::Object(child) => {
            let slot = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child_target) = slot {
                copy_path(child, child_target, rest);
            }
        }
        Value::Null => {
            target.entry((*head).to_string()).or_insert(Value::Null);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> SchemaRecord {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_collection_keeps_only_table_name() {
        let raw = record(json!({
            "collection": "articles",
            "meta": {"icon": "article"},
            "schema": {"name": "articles", "comment": "blog", "schema": "public"}
        }));

        assert_eq!(
            Value::Object(sanitize_collection(&raw)),
            json!({
                "collection": "articles",
                "meta": {"icon": "article"},
                "schema": {"name": "articles"}
            })
        );
    }

    #[test]
    fn test_folder_collection_keeps_null_schema() {
        let raw = record(json!({"collection": "folder", "meta": {}, "schema": null}));
        assert_eq!(
            Value::Object(sanitize_collection(&raw)),
            json!({"collection": "folder", "meta": {}, "schema": null})
        );
    }

    #[test]
    fn test_field_drops_store_specific_schema_detail() {
        let raw = record(json!({
            "collection": "articles",
            "field": "title",
            "type": "string",
            "meta": null,
            "schema": {
                "name": "title",
                "table": "articles",
                "data_type": "varchar",
                "max_length": 255,
                "is_nullable": true,
                "comment": "headline",
                "numeric_precision": null
            }
        }));

        let out = sanitize_field(&raw);
        let schema = out.get("schema").and_then(Value::as_object).unwrap();

        assert!(schema.get("comment").is_none());
        assert_eq!(schema.get("max_length"), Some(&json!(255)));
        assert_eq!(schema.get("numeric_precision"), Some(&Value::Null));
        assert_eq!(out.get("meta"), Some(&Value::Null));
    }

    #[test]
    fn test_relation_without_schema_has_no_schema_key() {
        let raw = record(json!({
            "collection": "articles",
            "field": "author",
            "related_collection": "authors",
            "meta": {"one_field": null}
        }));
        let out = sanitize_relation(&raw);
        assert!(out.get("schema").is_none());
        assert_eq!(out.len(), 4);
    }
}
