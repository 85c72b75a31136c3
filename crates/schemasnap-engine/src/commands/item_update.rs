//! Item update under a declaratively selected accountability context.
//!
//! The operation resolves the effective context from [`PermissionMode`],
//! normalizes the payload and query options, sanitizes the query for that
//! context and dispatches exactly one update. An empty payload is a no-op.

use crate::defaults::process_defaults;
use crate::ports::{AccountabilityResolver, SchemaOverview, StoreHandle};
use schemasnap_core::model::{
    AccountabilityContext, KeySelection, OptionValue, PermissionMode, PrimaryKey,
};
use schemasnap_core::query::sanitize_query;
use schemasnap_core::{log_op_end, log_op_error, log_op_start};
use schemasnap_core::{ExError, ExErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const OP: &str = "item_update";

/// Declarative configuration of one item update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdateOptions {
    pub collection: String,
    #[serde(default)]
    pub key: Option<KeySelection>,
    #[serde(default)]
    pub payload: Option<OptionValue>,
    #[serde(default)]
    pub query: Option<OptionValue>,
    #[serde(default)]
    pub permissions: PermissionMode,
}

impl ItemUpdateOptions {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: None,
            payload: None,
            query: None,
            permissions: PermissionMode::default(),
        }
    }

    /// Parse options from their declarative JSON form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the value does not have the expected shape
    /// or the permission mode is not recognised.
    pub fn from_value(value: Value) -> Result<Self, ExError> {
        serde_json::from_value(value).map_err(|e| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op(OP)
                .with_message(e.to_string())
        })
    }

    pub fn with_key(mut self, key: KeySelection) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<OptionValue>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<OptionValue>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionMode) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Keys touched by a dispatched update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateResult {
    One(PrimaryKey),
    Many(Vec<PrimaryKey>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    ByQuery,
    One,
    Many,
}

impl Dispatch {
    fn for_key(key: Option<&KeySelection>) -> Self {
        match key {
            None => Dispatch::ByQuery,
            Some(KeySelection::One(_)) => Dispatch::One,
            Some(KeySelection::Many(keys)) if keys.len() == 1 => Dispatch::One,
            Some(KeySelection::Many(_)) => Dispatch::Many,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Dispatch::ByQuery => "update_by_query",
            Dispatch::One => "update_one",
            Dispatch::Many => "update_many",
        }
    }
}

/// Item update bound to a store.
pub struct ItemUpdateOperation {
    store: Arc<dyn StoreHandle>,
    schema: Option<Arc<SchemaOverview>>,
}

impl ItemUpdateOperation {
    pub fn new(store: Arc<dyn StoreHandle>) -> Self {
        Self {
            store,
            schema: None,
        }
    }

    /// Bind to the process-wide default store.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if no defaults are installed.
    pub fn from_process_defaults() -> Result<Self, ExError> {
        Ok(Self::new(process_defaults()?.store()))
    }

    /// Use a pre-resolved schema overview instead of loading one per call.
    pub fn with_schema(mut self, schema: SchemaOverview) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    /// Run the update for `caller`.
    ///
    /// Returns `Ok(None)` without touching the store's items when the
    /// payload is absent or empty.
    ///
    /// ## Errors
    ///
    /// - `RoleResolution`: the configured role does not exist
    /// - `InvalidPayloadFormat`: payload or query text is not valid JSON, or
    ///   the query is not a mapping
    /// - anything the items service reports
    pub async fn execute(
        &self,
        options: ItemUpdateOptions,
        caller: Option<&AccountabilityContext>,
    ) -> Result<Option<UpdateResult>, ExError> {
        let permission_mode = options.permissions.label();
        let collection = options.collection.clone();
        log_op_start!(OP, collection = %collection, permission_mode = permission_mode);
        let start = std::time::Instant::now();

        let result = self.execute_impl(options, caller).await.map_err(|e| {
            let e = if e.op().is_none() { e.with_op(OP) } else { e };
            let e = if e.collection().is_none() {
                e.with_collection(collection.as_str())
            } else {
                e
            };
            log_op_error!(
                OP,
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                collection = %collection,
                permission_mode = permission_mode
            );
            e
        })?;

        log_op_end!(
            OP,
            duration_ms = start.elapsed().as_millis() as u64,
            collection = %collection,
            permission_mode = permission_mode,
            updated = result.is_some()
        );

        Ok(result)
    }

    async fn execute_impl(
        &self,
        options: ItemUpdateOptions,
        caller: Option<&AccountabilityContext>,
    ) -> Result<Option<UpdateResult>, ExError> {
        let schema = match &self.schema {
            Some(schema) => Arc::clone(schema),
            None => Arc::new(self.store.load_schema().await?),
        };

        let resolver = self.store.accountability_resolver(Arc::clone(&schema));
        let accountability =
            resolve_accountability(&options.permissions, caller, resolver.as_ref()).await?;

        let items = self
            .store
            .items_service(&options.collection, schema, accountability.clone());

        let payload = match &options.payload {
            Some(payload) => payload.normalize("payload")?,
            None => None,
        };
        let query = match &options.query {
            Some(query) => query.normalize("query")?,
            None => None,
        };
        let query = sanitize_query(query.unwrap_or(Value::Null), accountability.as_ref())?;

        let payload = match payload {
            Some(payload) if !is_empty_payload(&payload) => payload,
            _ => {
                tracing::debug!(op = OP, "empty payload, nothing to update");
                return Ok(None);
            }
        };

        let dispatch = Dispatch::for_key(options.key.as_ref());
        tracing::debug!(op = OP, dispatch = dispatch.label(), "dispatching update");

        let result = match options.key {
            None => UpdateResult::Many(items.update_by_query(&query, &payload).await?),
            Some(KeySelection::One(key)) => UpdateResult::One(items.update_one(&key, &payload).await?),
            Some(KeySelection::Many(keys)) if keys.len() == 1 => {
                UpdateResult::One(items.update_one(&keys[0], &payload).await?)
            }
            Some(KeySelection::Many(keys)) => {
                UpdateResult::Many(items.update_many(&keys, &payload).await?)
            }
        };

        Ok(Some(result))
    }
}

/// Resolve the effective context for `mode`.
///
/// `Ok(None)` is the unrestricted context.
///
/// # Errors
///
/// Propagates the resolver's `RoleResolution` error for unknown roles.
pub async fn resolve_accountability(
    mode: &PermissionMode,
    caller: Option<&AccountabilityContext>,
    resolver: &dyn AccountabilityResolver,
) -> Result<Option<AccountabilityContext>, ExError> {
    match mode {
        PermissionMode::CurrentCaller => Ok(caller.cloned()),
        PermissionMode::FullAccess => Ok(None),
        PermissionMode::PublicRole => resolver.resolve_for_role(None, caller).await.map(Some),
        PermissionMode::Role(role) => resolver
            .resolve_for_role(Some(role.as_str()), caller)
            .await
            .map(Some),
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
