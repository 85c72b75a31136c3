//! Record sanitization.
//!
//! Two passes, both pure:
//!
//! - `records`: drop platform-owned records, strip `meta.id`
//! - `shape`: project each record onto its kind's comparison surface

pub mod records;
pub mod shape;

pub use records::{is_system, omit_meta_id, sanitize_records};
pub use shape::{sanitize_collection, sanitize_field, sanitize_relation, sanitize_shape};
