//! schemasnap core - deterministic schema-snapshot kernel
//!
//! Pure, synchronous building blocks:
//! - Record sanitization (system records, internal ids, shape projection)
//! - Deep canonical sorting under a total order over JSON values
//! - Snapshot generation and digests
//! - Accountability model and query sanitization for scoped operations
//! - Error and logging facilities shared by the workspace
//!
//! Nothing here performs I/O; fetching and dispatch live in
//! `schemasnap-engine`.

pub mod canonical;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod query;
pub mod sanitize;
pub mod snapshot;

// Used by the logging macros
pub use schemasnap_core_types;

// Re-export commonly used types
pub use canonical::{canonicalize, compare_values};
pub use errors::{ExError, ExErrorKind, Result, SnapError};
pub use model::{
    AccountabilityContext, KeySelection, OptionValue, PermissionMode, PrimaryKey, RecordKind,
    SchemaRecord, Snapshot, SNAPSHOT_FORMAT_VERSION,
};
pub use snapshot::{compute_snapshot_digest, generate_snapshot, RawSchema};
