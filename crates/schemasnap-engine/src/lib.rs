//! schemasnap engine - orchestration over the collaborator ports
//!
//! Provides the asynchronous entry points that coordinate the pure kernel in
//! `schemasnap-core` with the data layer:
//! - [`commands::snapshot::get_snapshot`] fetches schema metadata
//!   concurrently and produces a canonical snapshot
//! - [`commands::item_update::ItemUpdateOperation`] runs an item update under
//!   a declaratively selected accountability context
//!
//! ## Logging Ownership
//!
//! The engine owns all logging: lifecycle events (`log_op_start!`,
//! `log_op_end!`, `log_op_error!`) plus `tracing::debug!()` detail inside
//! the commands. `schemasnap-core` emits no events.
//!
//! ## Features
//!
//! - `memory` (default): the in-process [`MemoryStore`]

pub mod commands;
pub mod defaults;
#[cfg(feature = "memory")]
pub mod memory;
pub mod ports;

pub use commands::item_update::{ItemUpdateOperation, ItemUpdateOptions, UpdateResult};
pub use commands::snapshot::{get_snapshot, SnapshotOptions};
pub use defaults::{install_process_defaults, ProcessDefaults};
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use ports::{AccountabilityResolver, ItemsService, SchemaOverview, SchemaService, StoreHandle};
