//! Collaborator ports.
//!
//! The engine never talks to a database directly. Everything it needs from
//! the data layer is expressed here as a trait so that a host application
//! can plug in its own store.
//!
//! All ports report failures as [`ExError`]; the engine wraps them with
//! operation context before they reach the caller.

use async_trait::async_trait;
use schemasnap_core::model::{AccountabilityContext, PrimaryKey, SchemaRecord};
use schemasnap_core::ExError;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Opaque description of the live schema.
///
/// Produced by [`StoreHandle::load_schema`] and handed back to the store when
/// building services. The engine never looks inside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaOverview(Value);

impl SchemaOverview {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

/// Read access to the three kinds of schema metadata.
///
/// Implementations may return system-internal records; filtering them is the
/// engine's job.
#[async_trait]
pub trait SchemaService: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<SchemaRecord>, ExError>;

    async fn list_fields(&self) -> Result<Vec<SchemaRecord>, ExError>;

    async fn list_relations(&self) -> Result<Vec<SchemaRecord>, ExError>;
}

/// Derives accountability contexts from roles.
#[async_trait]
pub trait AccountabilityResolver: Send + Sync {
    /// Build the context of `role`, or of the public role when `None`.
    ///
    /// `caller` is the context of whoever triggered the operation. It is
    /// informational; the resolved context must not inherit its identity.
    ///
    /// # Errors
    ///
    /// Returns an `ExError` of kind `RoleResolution` when the role does not
    /// exist.
    async fn resolve_for_role(
        &self,
        role: Option<&str>,
        caller: Option<&AccountabilityContext>,
    ) -> Result<AccountabilityContext, ExError>;
}

/// Update dispatch for one collection, bound to one effective context.
#[async_trait]
pub trait ItemsService: Send + Sync {
    async fn update_by_query(
        &self,
        query: &Map<String, Value>,
        payload: &Value,
    ) -> Result<Vec<PrimaryKey>, ExError>;

    async fn update_one(&self, key: &PrimaryKey, payload: &Value) -> Result<PrimaryKey, ExError>;

    async fn update_many(
        &self,
        keys: &[PrimaryKey],
        payload: &Value,
    ) -> Result<Vec<PrimaryKey>, ExError>;
}

/// Handle to a backing store.
///
/// The factory methods are synchronous: building a service is cheap, all I/O
/// happens when the service is used.
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Vendor or dialect identifier, e.g. `postgres`.
    fn vendor(&self) -> &str;

    /// Read a fresh schema overview, bypassing any cache.
    async fn load_schema(&self) -> Result<SchemaOverview, ExError>;

    fn schema_service(&self, schema: Arc<SchemaOverview>) -> Arc<dyn SchemaService>;

    fn accountability_resolver(&self, schema: Arc<SchemaOverview>)
        -> Arc<dyn AccountabilityResolver>;

    /// Items service for `collection`. `accountability` of `None` means
    /// unrestricted.
    fn items_service(
        &self,
        collection: &str,
        schema: Arc<SchemaOverview>,
        accountability: Option<AccountabilityContext>,
    ) -> Arc<dyn ItemsService>;
}
