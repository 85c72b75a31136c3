//! In-memory collaborators.
//!
//! `MemoryStore` implements every port over in-process data. It is the
//! reference embedding of the engine and what the integration tests run
//! against.

use crate::ports::{AccountabilityResolver, ItemsService, SchemaOverview, SchemaService, StoreHandle};
use async_trait::async_trait;
use schemasnap_core::errors::SnapError;
use schemasnap_core::model::{AccountabilityContext, PrimaryKey, RecordKind, SchemaRecord};
use schemasnap_core::{ExError, ExErrorKind};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Item = Map<String, Value>;
type ItemTable = BTreeMap<String, BTreeMap<PrimaryKey, Item>>;

/// A role known to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRecord {
    pub admin_access: bool,
    pub app_access: bool,
    /// Collections the role may update
    pub collections: BTreeSet<String>,
}

impl RoleRecord {
    pub fn admin() -> Self {
        Self {
            admin_access: true,
            app_access: true,
            collections: BTreeSet::new(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collections.insert(collection.into());
        self
    }
}

/// One update that reached the items layer.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub collection: String,
    pub dispatch: &'static str,
    pub keys: Vec<PrimaryKey>,
    pub query: Option<Map<String, Value>>,
    pub payload: Value,
    pub accountability: Option<AccountabilityContext>,
}

#[derive(Debug, Clone, Default)]
struct Permissions {
    roles: BTreeMap<String, RoleRecord>,
    public: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
struct Records {
    collections: Vec<SchemaRecord>,
    fields: Vec<SchemaRecord>,
    relations: Vec<SchemaRecord>,
    failing: Option<(RecordKind, String)>,
}

/// Backing store held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    vendor: String,
    records: Records,
    permissions: Permissions,
    items: Arc<Mutex<ItemTable>>,
    calls: Arc<Mutex<Vec<UpdateCall>>>,
}

impl MemoryStore {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            records: Records::default(),
            permissions: Permissions::default(),
            items: Arc::new(Mutex::new(BTreeMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_collections(mut self, records: Vec<SchemaRecord>) -> Self {
        self.records.collections = records;
        self
    }

    pub fn with_fields(mut self, records: Vec<SchemaRecord>) -> Self {
        self.records.fields = records;
        self
    }

    pub fn with_relations(mut self, records: Vec<SchemaRecord>) -> Self {
        self.records.relations = records;
        self
    }

    /// Make every fetch of `kind` fail with an `ExternalService` error.
    pub fn with_failing_fetch(mut self, kind: RecordKind, message: impl Into<String>) -> Self {
        self.records.failing = Some((kind, message.into()));
        self
    }

    pub fn with_role(mut self, id: impl Into<String>, role: RoleRecord) -> Self {
        self.permissions.roles.insert(id.into(), role);
        self
    }

    /// Let the public role update `collection`.
    pub fn with_public_access(mut self, collection: impl Into<String>) -> Self {
        self.permissions.public.insert(collection.into());
        self
    }

    /// Seed one item.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `item` is not a mapping.
    pub fn with_item(
        self,
        collection: impl Into<String>,
        key: impl Into<PrimaryKey>,
        item: Value,
    ) -> Result<Self, ExError> {
        let collection = collection.into();
        let Value::Object(item) = item else {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("with_item")
                .with_collection(collection.as_str())
                .with_message("item must be a mapping"));
        };
        lock(&self.items)
            .entry(collection)
            .or_default()
            .insert(key.into(), item);
        Ok(self)
    }

    pub fn item(&self, collection: &str, key: &PrimaryKey) -> Option<Value> {
        lock(&self.items)
            .get(collection)
            .and_then(|table| table.get(key))
            .map(|item| Value::Object(item.clone()))
    }

    /// Updates that reached the items layer, oldest first.
    pub fn update_calls(&self) -> Vec<UpdateCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl StoreHandle for MemoryStore {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    async fn load_schema(&self) -> Result<SchemaOverview, ExError> {
        let collections: Vec<&str> = self
            .records
            .collections
            .iter()
            .filter_map(|r| r.get("collection").and_then(Value::as_str))
            .collect();
        Ok(SchemaOverview::new(json!({
            "vendor": self.vendor,
            "collections": collections,
        })))
    }

    fn schema_service(&self, _schema: Arc<SchemaOverview>) -> Arc<dyn SchemaService> {
        Arc::new(MemorySchemaService {
            records: self.records.clone(),
        })
    }

    fn accountability_resolver(
        &self,
        _schema: Arc<SchemaOverview>,
    ) -> Arc<dyn AccountabilityResolver> {
        Arc::new(MemoryResolver {
            roles: self.permissions.roles.clone(),
        })
    }

    fn items_service(
        &self,
        collection: &str,
        _schema: Arc<SchemaOverview>,
        accountability: Option<AccountabilityContext>,
    ) -> Arc<dyn ItemsService> {
        Arc::new(MemoryItemsService {
            collection: collection.to_string(),
            accountability,
            permissions: self.permissions.clone(),
            items: Arc::clone(&self.items),
            calls: Arc::clone(&self.calls),
        })
    }
}

struct MemorySchemaService {
    records: Records,
}

impl MemorySchemaService {
    fn list(&self, kind: RecordKind) -> Result<Vec<SchemaRecord>, ExError> {
        if let Some((failing, message)) = &self.records.failing {
            if *failing == kind {
                return Err(ExError::new(ExErrorKind::ExternalService).with_message(message.clone()));
            }
        }
        Ok(match kind {
            RecordKind::Collection => self.records.collections.clone(),
            RecordKind::Field => self.records.fields.clone(),
            RecordKind::Relation => self.records.relations.clone(),
        })
    }
}

#[async_trait]
impl SchemaService for MemorySchemaService {
    async fn list_collections(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.list(RecordKind::Collection)
    }

    async fn list_fields(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.list(RecordKind::Field)
    }

    async fn list_relations(&self) -> Result<Vec<SchemaRecord>, ExError> {
        self.list(RecordKind::Relation)
    }
}

struct MemoryResolver {
    roles: BTreeMap<String, RoleRecord>,
}

#[async_trait]
impl AccountabilityResolver for MemoryResolver {
    async fn resolve_for_role(
        &self,
        role: Option<&str>,
        _caller: Option<&AccountabilityContext>,
    ) -> Result<AccountabilityContext, ExError> {
        let Some(role) = role else {
            return Ok(AccountabilityContext::public());
        };
        let record = self.roles.get(role).ok_or_else(|| {
            ExError::from(SnapError::RoleNotFound {
                role_id: role.to_string(),
            })
        })?;
        Ok(AccountabilityContext {
            admin: record.admin_access,
            app: record.app_access,
            ..AccountabilityContext::for_role(role)
        })
    }
}

struct MemoryItemsService {
    collection: String,
    accountability: Option<AccountabilityContext>,
    permissions: Permissions,
    items: Arc<Mutex<ItemTable>>,
    calls: Arc<Mutex<Vec<UpdateCall>>>,
}

impl MemoryItemsService {
    fn authorize(&self, op: &'static str) -> Result<(), ExError> {
        let allowed = match &self.accountability {
            None => true,
            Some(ctx) if ctx.admin => true,
            Some(ctx) => match &ctx.role {
                Some(role) => self
                    .permissions
                    .roles
                    .get(role)
                    .is_some_and(|r| r.collections.contains(&self.collection)),
                None => self.permissions.public.contains(&self.collection),
            },
        };
        if allowed {
            Ok(())
        } else {
            Err(ExError::new(ExErrorKind::Forbidden)
                .with_op(op)
                .with_collection(self.collection.as_str())
                .with_message("update not permitted for this accountability"))
        }
    }

    /// Merge `payload` into every existing item in `keys`.
    fn apply(&self, op: &'static str, keys: &[PrimaryKey], payload: &Value) -> Result<(), ExError> {
        let Value::Object(changes) = payload else {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op(op)
                .with_collection(self.collection.as_str())
                .with_message("payload must be a mapping"));
        };
        let mut items = lock(&self.items);
        if let Some(table) = items.get_mut(&self.collection) {
            for key in keys {
                if let Some(item) = table.get_mut(key) {
                    for (field, value) in changes {
                        item.insert(field.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn record(
        &self,
        dispatch: &'static str,
        keys: &[PrimaryKey],
        query: Option<&Map<String, Value>>,
        payload: &Value,
    ) {
        lock(&self.calls).push(UpdateCall {
            collection: self.collection.clone(),
            dispatch,
            keys: keys.to_vec(),
            query: query.cloned(),
            payload: payload.clone(),
            accountability: self.accountability.clone(),
        });
    }

    fn select(&self, query: &Map<String, Value>) -> Result<Vec<PrimaryKey>, ExError> {
        let items = lock(&self.items);
        let Some(table) = items.get(&self.collection) else {
            return Ok(Vec::new());
        };
        let filter = query.get("filter").cloned().unwrap_or(Value::Null);
        let mut keys = Vec::new();
        for (key, item) in table {
            if matches_filter(item, &filter)? {
                keys.push(key.clone());
            }
        }
        if let Some(limit) = query.get("limit").and_then(Value::as_i64) {
            // -1 means no limit
            if limit >= 0 {
                keys.truncate(limit as usize);
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl ItemsService for MemoryItemsService {
    async fn update_by_query(
        &self,
        query: &Map<String, Value>,
        payload: &Value,
    ) -> Result<Vec<PrimaryKey>, ExError> {
        self.authorize("update_by_query")?;
        let keys = self.select(query)?;
        self.apply("update_by_query", &keys, payload)?;
        self.record("update_by_query", &keys, Some(query), payload);
        Ok(keys)
    }

    async fn update_one(&self, key: &PrimaryKey, payload: &Value) -> Result<PrimaryKey, ExError> {
        self.authorize("update_one")?;
        let keys = std::slice::from_ref(key);
        self.apply("update_one", keys, payload)?;
        self.record("update_one", keys, None, payload);
        Ok(key.clone())
    }

    async fn update_many(
        &self,
        keys: &[PrimaryKey],
        payload: &Value,
    ) -> Result<Vec<PrimaryKey>, ExError> {
        self.authorize("update_many")?;
        self.apply("update_many", keys, payload)?;
        self.record("update_many", keys, None, payload);
        Ok(keys.to_vec())
    }
}

/// Evaluate the subset of filter operators the in-memory store understands:
/// `_and`, `_or`, and per-field `_eq`, `_neq`, `_in`, `_null`.
fn matches_filter(item: &Item, filter: &Value) -> Result<bool, ExError> {
    let clauses = match filter {
        Value::Null => return Ok(true),
        Value::Object(clauses) => clauses,
        _ => return Err(unsupported_filter("filter must be a mapping")),
    };

    for (name, condition) in clauses {
        let matched = match name.as_str() {
            "_and" => all_of(item, condition, true)?,
            "_or" => all_of(item, condition, false)?,
            field => matches_condition(item.get(field).unwrap_or(&Value::Null), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_of(item: &Item, condition: &Value, conjunction: bool) -> Result<bool, ExError> {
    let Value::Array(filters) = condition else {
        return Err(unsupported_filter("logical operator expects a sequence"));
    };
    for filter in filters {
        if matches_filter(item, filter)? != conjunction {
            return Ok(!conjunction);
        }
    }
    Ok(conjunction)
}

fn matches_condition(value: &Value, condition: &Value) -> Result<bool, ExError> {
    let Value::Object(operators) = condition else {
        return Err(unsupported_filter("field condition must be a mapping"));
    };
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "_eq" => value == operand,
            "_neq" => value != operand,
            "_in" => operand.as_array().is_some_and(|set| set.contains(value)),
            "_null" => value.is_null() == operand.as_bool().unwrap_or(true),
            other => return Err(unsupported_filter(format!("unsupported operator {}", other))),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn unsupported_filter(message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("update_by_query")
        .with_message(message)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => panic!("not a mapping"),
        }
    }

    #[test]
    fn test_filter_eq_and_in() {
        let article = item(json!({"status": "draft", "author": 7}));

        assert!(matches_filter(&article, &json!({"status": {"_eq": "draft"}})).unwrap());
        assert!(!matches_filter(&article, &json!({"status": {"_neq": "draft"}})).unwrap());
        assert!(matches_filter(&article, &json!({"author": {"_in": [1, 7]}})).unwrap());
        assert!(matches_filter(&article, &Value::Null).unwrap());
    }

    #[test]
    fn test_filter_logical_operators() {
        let article = item(json!({"status": "draft", "author": 7}));
        let either = json!({"_or": [{"status": {"_eq": "published"}}, {"author": {"_eq": 7}}]});
        let both = json!({"_and": [{"status": {"_eq": "published"}}, {"author": {"_eq": 7}}]});

        assert!(matches_filter(&article, &either).unwrap());
        assert!(!matches_filter(&article, &both).unwrap());
    }

    #[test]
    fn test_filter_null_placeholder_matches_missing_field() {
        let article = item(json!({"status": "draft"}));
        assert!(matches_filter(&article, &json!({"user_created": {"_eq": null}})).unwrap());
    }

    #[test]
    fn test_unsupported_operator_is_rejected() {
        let article = item(json!({"status": "draft"}));
        let err = matches_filter(&article, &json!({"status": {"_regex": "^d"}})).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_non_mapping_item_is_rejected() {
        let err = MemoryStore::new("postgres")
            .with_item("articles", PrimaryKey::Integer(1), json!("draft"))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.collection(), Some("articles"));
    }

    #[tokio::test]
    async fn test_resolver_unknown_role_is_role_resolution() {
        let resolver = MemoryResolver {
            roles: BTreeMap::new(),
        };
        let err = resolver
            .resolve_for_role(Some("6f1c0d1e-0000-4000-8000-000000000000"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::RoleResolution);
    }
}
