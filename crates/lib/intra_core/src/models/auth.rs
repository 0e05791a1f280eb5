//! Authentication domain models.
//!
//! These are internal domain models, distinct from API-specific response
//! models (which carry `#[serde(rename)]` for camelCase etc.).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Authorization role derived from directory group membership.
///
/// Closed set; anything outside it is rejected at the token boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    /// Parse a role literal, returning `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User information fetched from the directory, one instance per query.
///
/// `ad_login` and `ad_guid` are always non-empty; an entry without a
/// parseable GUID never becomes a profile.
#[derive(Debug, Clone)]
pub struct DirectoryProfile {
    /// Normalized (lowercase) directory login.
    pub ad_login: String,
    /// Stable directory identifier.
    pub ad_guid: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    /// Leading RDN of the manager entry, empty when unset.
    pub supervisor: String,
    /// Raw group DNs the entry is a member of.
    pub groups: Vec<String>,
    /// Display names of direct reports, disabled entries excluded.
    pub subordinates: Vec<String>,
}

/// Persistent user record, owned by the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub ad_guid: Uuid,
    pub ad_login: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub subordinates: Option<Vec<i32>>,
    pub supervisor: Option<String>,
    pub role: Option<String>,
}

/// Signed token claims.
///
/// Access tokens carry the full set; refresh tokens carry only
/// `sub`, `user_id`, `ad_login`, and `role`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — the directory GUID.
    pub sub: String,
    /// Local user identifier.
    pub user_id: i32,
    /// Directory login; checked explicitly on refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_login: Option<String>,
    /// Role literal; validated against [`Role`] on verification.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subordinates: Option<Vec<i32>>,
    /// Token type tag: `access` or `refresh`.
    pub typ: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// User profile returned alongside a token pair.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: i32,
    pub ad_login: String,
    pub ad_guid: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    pub role: Role,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Build a profile from a synchronized record and its resolved role.
    pub fn from_record(user: &UserRecord, role: Role) -> Self {
        Self {
            id: user.id,
            ad_login: user.ad_login.clone(),
            ad_guid: user.ad_guid,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            department: user.department.clone(),
            title: user.title.clone(),
            role,
            last_login_at: user.last_login_at,
        }
    }
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_literals_only() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("editor"), Some(Role::Editor));
        assert_eq!(Role::parse("viewer"), Some(Role::Viewer));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(Role::Viewer.to_string(), "viewer");
    }
}
