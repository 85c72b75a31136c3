//! Core types shared across schemasnap facilities
//!
//! This crate provides foundational types used by the error and logging
//! facilities of `schemasnap-core` and by the orchestration layer:
//!
//! - **Correlation types**: RequestId, TraceId, RequestContext
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, TraceId};
