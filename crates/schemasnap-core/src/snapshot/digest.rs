//! Digest computation for snapshots.
//!
//! ## Determinism Guarantees
//!
//! - Same logical schema → same canonical JSON → same digest
//! - Digest covers `version`, `directus` and `vendor` as well as the records,
//!   so snapshots from different producers or store dialects never collide

use crate::errors::Result;
use crate::model::snapshot::Snapshot;
use sha2::{Digest, Sha256};

impl Snapshot {
    /// Compact JSON in canonical key and element order.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if JSON serialization fails.
    pub fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Compute the digest of a snapshot.
///
/// Hex-encoded SHA256 (64 characters) of [`Snapshot::canonical_json`].
///
/// # Errors
///
/// Returns `Serialization` if JSON serialization fails.
pub fn compute_snapshot_digest(snapshot: &Snapshot) -> Result<String> {
    let canonical = snapshot.canonical_json()?;
    Ok(hash_string(&canonical))
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
