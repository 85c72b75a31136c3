//! Schema records as yielded by the schema service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One collection, field, or relation definition.
///
/// Records are free-form mappings: the schema service decides which
/// attributes exist, and nested `meta`/`schema` sub-mappings may hold
/// arbitrary scalars, mappings, and sequences.
pub type SchemaRecord = Map<String, Value>;

/// Attribute holding internal metadata.
pub const META_KEY: &str = "meta";
/// Flag under `meta` marking a platform-owned record.
pub const SYSTEM_KEY: &str = "system";
/// Internal identifier under `meta`.
pub const ID_KEY: &str = "id";

/// The three record kinds a snapshot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Collection,
    Field,
    Relation,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Collection,
        RecordKind::Field,
        RecordKind::Relation,
    ];

    /// Attribute names that order records of this kind at the top level.
    pub fn sort_keys(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Collection => &["collection"],
            RecordKind::Field | RecordKind::Relation => &["collection", "field"],
        }
    }

    /// Name of the snapshot sequence holding this kind.
    pub fn plural(&self) -> &'static str {
        match self {
            RecordKind::Collection => "collections",
            RecordKind::Field => "fields",
            RecordKind::Relation => "relations",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.plural())
    }
}

/// Collection name of a record, if it carries one as a string.
pub fn collection_name(record: &SchemaRecord) -> Option<&str> {
    record.get("collection").and_then(Value::as_str)
}

/// Field name of a record, if it carries one as a string.
pub fn field_name(record: &SchemaRecord) -> Option<&str> {
    record.get("field").and_then(Value::as_str)
}
