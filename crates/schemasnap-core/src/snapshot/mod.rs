//! Snapshot domain logic.
//!
//! ## Responsibilities
//!
//! - Turn already-fetched records into a canonical, versioned snapshot
//! - Compute deterministic snapshot digests
//!
//! ## Non-Responsibilities
//!
//! - Fetching records (handled by `schemasnap-engine`)
//! - Diffing or applying snapshots
//! - Persistence of snapshots over time

pub mod build;
pub mod digest;

pub use build::{compare_top_level, generate_snapshot, prepare_records, RawSchema};
pub use digest::compute_snapshot_digest;
