//! Accountability contexts and the declarative modes that select them.
//!
//! An effective context is an `Option<AccountabilityContext>`: `None` means
//! unrestricted access, `Some` narrows the downstream operation to what the
//! carried role may see.

use crate::errors::{Result, SnapError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Who is asking.
///
/// The core treats this as an opaque capability token; only the query
/// sanitizer reads `user` and `role` to fill dynamic filter variables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountabilityContext {
    /// Authenticated user id; `None` for the public role
    pub user: Option<String>,
    /// Role id; `None` for the public role
    pub role: Option<String>,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub app: bool,
    pub ip: Option<String>,
}

impl AccountabilityContext {
    /// Context of the unauthenticated public role.
    pub fn public() -> Self {
        Self::default()
    }

    /// Context carrying a role and no user.
    pub fn for_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

const SENTINEL_TRIGGER: &str = "$trigger";
const SENTINEL_FULL: &str = "$full";
const SENTINEL_PUBLIC: &str = "$public";

/// How to derive the accountability context for a downstream operation.
///
/// Parsed once from the declarative `permissions` option; string sentinels
/// never travel past [`PermissionMode::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<String>", into = "String")]
pub enum PermissionMode {
    /// Pass the caller's context through unchanged (`$trigger` or absent)
    #[default]
    CurrentCaller,
    /// Unrestricted (`$full`)
    FullAccess,
    /// The unauthenticated public role (`$public`)
    PublicRole,
    /// A named role, identified by its UUID
    Role(String),
}

impl PermissionMode {
    /// Parse the declarative form.
    ///
    /// Absent and empty values select the caller's own permissions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPermissionMode` when the value is neither a sentinel
    /// nor a UUID role id.
    pub fn parse(value: Option<&str>) -> Result<Self> {
        let raw = match value.map(str::trim) {
            None | Some("") => return Ok(PermissionMode::CurrentCaller),
            Some(raw) => raw,
        };

        match raw {
            SENTINEL_TRIGGER => Ok(PermissionMode::CurrentCaller),
            SENTINEL_FULL => Ok(PermissionMode::FullAccess),
            SENTINEL_PUBLIC => Ok(PermissionMode::PublicRole),
            _ if raw.starts_with('$') => Err(SnapError::InvalidPermissionMode {
                value: raw.to_string(),
                reason: "unknown sentinel".to_string(),
            }),
            _ => {
                let role = Uuid::parse_str(raw).map_err(|e| SnapError::InvalidPermissionMode {
                    value: raw.to_string(),
                    reason: format!("role id is not a UUID: {}", e),
                })?;
                Ok(PermissionMode::Role(role.hyphenated().to_string()))
            }
        }
    }

    /// Short label used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            PermissionMode::CurrentCaller => "current-caller",
            PermissionMode::FullAccess => "full-access",
            PermissionMode::PublicRole => "public-role",
            PermissionMode::Role(_) => "specific-role-id",
        }
    }
}

impl FromStr for PermissionMode {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self> {
        PermissionMode::parse(Some(s))
    }
}

impl TryFrom<Option<String>> for PermissionMode {
    type Error = SnapError;

    fn try_from(value: Option<String>) -> Result<Self> {
        PermissionMode::parse(value.as_deref())
    }
}

impl From<PermissionMode> for String {
    fn from(mode: PermissionMode) -> Self {
        match mode {
            PermissionMode::CurrentCaller => SENTINEL_TRIGGER.to_string(),
            PermissionMode::FullAccess => SENTINEL_FULL.to_string(),
            PermissionMode::PublicRole => SENTINEL_PUBLIC.to_string(),
            PermissionMode::Role(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "8a1f7c4e-2b3d-4e5f-9a6b-7c8d9e0f1a2b";

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(PermissionMode::parse(None).unwrap(), PermissionMode::CurrentCaller);
        assert_eq!(PermissionMode::parse(Some("")).unwrap(), PermissionMode::CurrentCaller);
        assert_eq!(
            PermissionMode::parse(Some("$trigger")).unwrap(),
            PermissionMode::CurrentCaller
        );
        assert_eq!(PermissionMode::parse(Some("$full")).unwrap(), PermissionMode::FullAccess);
        assert_eq!(PermissionMode::parse(Some("$public")).unwrap(), PermissionMode::PublicRole);
    }

    #[test]
    fn test_parse_role_id_normalizes_case() {
        let upper = ROLE.to_uppercase();
        assert_eq!(
            PermissionMode::parse(Some(&upper)).unwrap(),
            PermissionMode::Role(ROLE.to_string())
        );
    }

    #[test]
    fn test_parse_rejects_unknown_sentinel_and_garbage() {
        assert!(matches!(
            PermissionMode::parse(Some("$admin")),
            Err(SnapError::InvalidPermissionMode { .. })
        ));
        assert!(matches!(
            "editor".parse::<PermissionMode>(),
            Err(SnapError::InvalidPermissionMode { .. })
        ));
    }

    #[test]
    fn test_serde_round_trips_through_declarative_form() {
        let mode: PermissionMode = serde_json::from_str("\"$public\"").unwrap();
        assert_eq!(mode, PermissionMode::PublicRole);
        let absent: PermissionMode = serde_json::from_str("null").unwrap();
        assert_eq!(absent, PermissionMode::CurrentCaller);
        assert_eq!(serde_json::to_string(&PermissionMode::FullAccess).unwrap(), "\"$full\"");
    }

    #[test]
    fn test_public_context_has_no_role() {
        let ctx = AccountabilityContext::public();
        assert!(ctx.role.is_none());
        assert!(ctx.user.is_none());
        assert!(!ctx.admin);
    }
}
