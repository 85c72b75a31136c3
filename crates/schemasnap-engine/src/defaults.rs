//! Process-wide defaults.
//!
//! Installed once at the process boundary. Commands fall back to them only
//! for the parts their options leave out.

use crate::ports::StoreHandle;
use schemasnap_core::errors::SnapError;
use schemasnap_core::{ExError, ExErrorKind};
use std::sync::{Arc, OnceLock};

/// Producer version stamped into snapshots when nothing else is configured.
pub const DEFAULT_PRODUCER_VERSION: &str = env!("CARGO_PKG_VERSION");

static PROCESS_DEFAULTS: OnceLock<ProcessDefaults> = OnceLock::new();

#[derive(Clone)]
pub struct ProcessDefaults {
    store: Arc<dyn StoreHandle>,
    producer_version: String,
}

impl ProcessDefaults {
    pub fn new(store: Arc<dyn StoreHandle>) -> Self {
        Self {
            store,
            producer_version: DEFAULT_PRODUCER_VERSION.to_string(),
        }
    }

    pub fn with_producer_version(mut self, version: impl Into<String>) -> Self {
        self.producer_version = version.into();
        self
    }

    pub fn store(&self) -> Arc<dyn StoreHandle> {
        Arc::clone(&self.store)
    }

    pub fn producer_version(&self) -> &str {
        &self.producer_version
    }
}

impl std::fmt::Debug for ProcessDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessDefaults")
            .field("vendor", &self.store.vendor())
            .field("producer_version", &self.producer_version)
            .finish()
    }
}

/// Install the process-wide defaults.
///
/// # Errors
///
/// Returns `InvalidInput` if defaults were already installed; the first
/// installation wins.
pub fn install_process_defaults(defaults: ProcessDefaults) -> Result<(), ExError> {
    PROCESS_DEFAULTS.set(defaults).map_err(|_| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("install_process_defaults")
            .with_message("process defaults are already installed")
    })
}

/// The installed defaults.
///
/// # Errors
///
/// Returns `NotConfigured` if [`install_process_defaults`] was never called.
pub fn process_defaults() -> Result<&'static ProcessDefaults, ExError> {
    PROCESS_DEFAULTS.get().ok_or_else(|| {
        SnapError::DefaultsNotInstalled {
            what: "store handle".to_string(),
        }
        .into()
    })
}

/// Producer version from the installed defaults, or the package version.
pub fn default_producer_version() -> String {
    PROCESS_DEFAULTS
        .get()
        .map(|d| d.producer_version().to_string())
        .unwrap_or_else(|| DEFAULT_PRODUCER_VERSION.to_string())
}
