//! Query sanitization for a resolved accountability context.
//!
//! Accepts the loosely-typed query shape found in declarative operation
//! configuration and produces the strict shape the items layer consumes.

use crate::errors::{Result, SnapError};
use crate::model::accountability::AccountabilityContext;
use serde_json::{Map, Number, Value};

const VAR_CURRENT_USER: &str = "$CURRENT_USER";
const VAR_CURRENT_ROLE: &str = "$CURRENT_ROLE";

/// Sanitize a query against the context it will run under.
///
/// - unknown keys are dropped
/// - `fields`, `sort`, `meta`, `groupBy`: comma-separated text becomes a
///   sequence of trimmed, non-empty names
/// - `limit`, `offset`, `page`: numeric text becomes a number
/// - `filter`, `deep`, `alias`, `aggregate`: JSON text is parsed
/// - `$CURRENT_USER` / `$CURRENT_ROLE` anywhere in `filter` are replaced by
///   the context's user / role, or `null` when the context lacks one
///
/// # Errors
///
/// Returns `InvalidPayloadFormat` if the query is not a mapping, or if a
/// textual entry cannot be parsed.
pub fn sanitize_query(
    query: Value,
    accountability: Option<&AccountabilityContext>,
) -> Result<Map<String, Value>> {
    let raw = match query {
        Value::Null => return Ok(Map::new()),
        Value::Object(map) => map,
        other => {
            return Err(invalid(
                "query",
                format!("expected a mapping, got {}", kind_name(&other)),
            ))
        }
    };

    let mut out = Map::new();
    for (key, value) in raw {
        let sanitized = match key.as_str() {
            "fields" | "sort" | "meta" | "groupBy" => Some(name_list(&key, value)?),
            "limit" | "offset" | "page" => Some(integer(&key, value)?),
            "search" => value.as_str().map(|s| Value::String(s.to_string())),
            "filter" => Some(substitute_variables(parsed(&key, value)?, accountability)),
            "deep" | "alias" | "aggregate" => Some(parsed(&key, value)?),
            _ => None,
        };
        if let Some(sanitized) = sanitized {
            out.insert(key, sanitized);
        }
    }
    Ok(out)
}

fn invalid(option: &str, reason: impl Into<String>) -> SnapError {
    SnapError::InvalidPayloadFormat {
        option: option.to_string(),
        reason: reason.into(),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Object(_) => "mapping",
        Value::Array(_) => "sequence",
    }
}

fn name_list(key: &str, value: Value) -> Result<Value> {
    match value {
        Value::String(text) => Ok(Value::Array(
            text.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| Value::String(name.to_string()))
                .collect(),
        )),
        Value::Array(items) => {
            if let Some(bad) = items.iter().find(|item| !item.is_string()) {
                return Err(invalid(
                    &format!("query.{}", key),
                    format!("expected names, found {}", kind_name(bad)),
                ));
            }
            Ok(Value::Array(items))
        }
        other => Err(invalid(
            &format!("query.{}", key),
            format!("expected text or a sequence, got {}", kind_name(&other)),
        )),
    }
}

fn integer(key: &str, value: Value) -> Result<Value> {
    match value {
        Value::Number(n) if n.is_i64() => Ok(Value::Number(n)),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(Number::from(n)))
            .map_err(|e| invalid(&format!("query.{}", key), e.to_string())),
        other => Err(invalid(
            &format!("query.{}", key),
            format!("expected an integer, got {}", kind_name(&other)),
        )),
    }
}

fn parsed(key: &str, value: Value) -> Result<Value> {
    match value {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| invalid(&format!("query.{}", key), e.to_string())),
        other => Ok(other),
    }
}

fn substitute_variables(value: Value, accountability: Option<&AccountabilityContext>) -> Value {
    match value {
        Value::String(text) if text == VAR_CURRENT_USER => accountability
            .and_then(|a| a.user.clone())
            .map_or(Value::Null, Value::String),
        Value::String(text) if text == VAR_CURRENT_ROLE => accountability
            .and_then(|a| a.role.clone())
            .map_or(Value::Null, Value::String),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute_variables(item, accountability))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute_variables(v, accountability)))
                .collect(),
        ),
        other => other,
    }
}
