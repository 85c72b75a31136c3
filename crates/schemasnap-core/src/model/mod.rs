pub mod accountability;
pub mod options;
pub mod record;
pub mod snapshot;

pub use accountability::{AccountabilityContext, PermissionMode};
pub use options::{KeySelection, OptionValue, PrimaryKey};
pub use record::{RecordKind, SchemaRecord};
pub use snapshot::{Snapshot, SNAPSHOT_FORMAT_VERSION};
