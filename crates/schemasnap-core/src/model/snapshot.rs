//! Snapshot schema.
//!
//! ## Format Version
//!
//! Current snapshot format version: **1**
//!
//! ## Fields
//!
//! - `version`: Snapshot format version (currently 1)
//! - `directus`: Version string of the producing system
//! - `vendor`: Vendor/dialect identifier of the backing store
//! - `collections`: Sanitized, canonicalized collection records
//! - `fields`: Sanitized, canonicalized field records
//! - `relations`: Sanitized, canonicalized relation records
//!
//! Field names and their declaration order are the serialization contract.

use crate::model::record::{RecordKind, SchemaRecord};
use serde::{Deserialize, Serialize};

/// Format version stamped on every snapshot.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Canonical, versioned serialization of a schema.
///
/// Constructed fresh by the assembler on each invocation and never mutated
/// afterwards; there are no setters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// Snapshot format version
    pub version: u32,

    /// Version string of the producing system
    #[serde(rename = "directus")]
    pub producer_version: String,

    /// Vendor/dialect identifier reported by the store handle
    pub vendor: String,

    pub collections: Vec<SchemaRecord>,
    pub fields: Vec<SchemaRecord>,
    pub relations: Vec<SchemaRecord>,
}

impl Snapshot {
    /// Records of one kind.
    pub fn records(&self, kind: RecordKind) -> &[SchemaRecord] {
        match kind {
            RecordKind::Collection => &self.collections,
            RecordKind::Field => &self.fields,
            RecordKind::Relation => &self.relations,
        }
    }
}
