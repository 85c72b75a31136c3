//! Command handlers with boundary logging.

pub mod item_update;
pub mod snapshot;
