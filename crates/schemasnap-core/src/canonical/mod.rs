//! Deep canonical form for schema data.
//!
//! Two logically identical records fetched at different times, or from
//! different backends, canonicalize to values that serialize byte-for-byte
//! identically. Relies on `serde_json`'s `preserve_order` feature: a
//! canonical mapping's iteration order is its sorted key order, and that is
//! the order serializers emit.
//!
//! ## Guarantees
//!
//! - **Idempotent**: `canonicalize(canonicalize(x)) == canonicalize(x)`
//! - **Order-independent**: permuting a mapping's keys or a sequence's
//!   elements anywhere in the input yields the same output

pub mod order;
pub mod sort;

pub use order::{compare_mappings, compare_values};
pub use sort::{canonicalize, canonicalize_record, MAX_CANONICAL_DEPTH};
