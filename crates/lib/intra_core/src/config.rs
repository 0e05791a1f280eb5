//! Core service configuration.
//!
//! All values are read from environment variables so the server binary can
//! be configured the same way in development (via `.env`) and in production.

/// Directory (LDAP) connection configuration.
#[derive(Clone, Debug)]
pub struct LdapConfig {
    /// Directory server URI, e.g. `ldap://dc01:389`.
    pub server_uri: String,
    /// Base DN for searches, e.g. `DC=example,DC=loc`.
    pub base_dn: String,
    /// Short domain name used to build bind identities (`DOMAIN\login`).
    pub domain: String,
    /// Bind identity of the service account (`DOMAIN\account`).
    pub service_user: String,
    /// Password of the service account.
    pub service_pass: String,
    /// Connection establishment timeout, seconds.
    pub connect_timeout_secs: u64,
    /// Search operation timeout, seconds.
    pub search_timeout_secs: u64,
    /// Group DN granting the admin role.
    pub admin_group: Option<String>,
    /// Group DN granting the editor role.
    pub editor_group: Option<String>,
    /// Group DN granting the viewer role.
    pub viewer_group: Option<String>,
}

impl LdapConfig {
    /// Reads directory configuration from environment variables.
    ///
    /// | Variable                    | Default               |
    /// |-----------------------------|-----------------------|
    /// | `LDAP_SERVER_URI`           | `ldap://localhost:389`|
    /// | `LDAP_BASE_DN`              | (empty)               |
    /// | `LDAP_DOMAIN`               | (empty)               |
    /// | `LDAP_SERVICE_USER`         | (empty)               |
    /// | `LDAP_SERVICE_PASS`         | (empty)               |
    /// | `LDAP_CONNECT_TIMEOUT_SECS` | `5`                   |
    /// | `LDAP_SEARCH_TIMEOUT_SECS`  | `5`                   |
    /// | `LDAP_ADMIN_GROUP`          | unset                 |
    /// | `LDAP_EDITOR_GROUP`         | unset                 |
    /// | `LDAP_VIEWER_GROUP`         | unset                 |
    pub fn from_env() -> Self {
        Self {
            server_uri: env_or("LDAP_SERVER_URI", "ldap://localhost:389"),
            base_dn: env_or("LDAP_BASE_DN", ""),
            domain: env_or("LDAP_DOMAIN", ""),
            service_user: env_or("LDAP_SERVICE_USER", ""),
            service_pass: env_or("LDAP_SERVICE_PASS", ""),
            connect_timeout_secs: env_secs("LDAP_CONNECT_TIMEOUT_SECS", 5),
            search_timeout_secs: env_secs("LDAP_SEARCH_TIMEOUT_SECS", 5),
            admin_group: env_opt("LDAP_ADMIN_GROUP"),
            editor_group: env_opt("LDAP_EDITOR_GROUP"),
            viewer_group: env_opt("LDAP_VIEWER_GROUP"),
        }
    }
}

/// Token signing configuration.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// Signing secret.
    pub secret: String,
    /// Signing algorithm name, e.g. `HS256`.
    pub algorithm: String,
    /// Access token lifetime, hours.
    pub access_ttl_hours: i64,
    /// Refresh token lifetime, days.
    pub refresh_ttl_days: i64,
    /// Optional `iss` claim value.
    pub issuer: Option<String>,
    /// Optional `aud` claim value.
    pub audience: Option<String>,
}

impl JwtConfig {
    /// Reads token configuration from environment variables.
    ///
    /// | Variable                | Default                              |
    /// |-------------------------|--------------------------------------|
    /// | `JWT_SECRET`            | `intra-dev-secret-change-in-production` |
    /// | `JWT_ALGORITHM`         | `HS256`                              |
    /// | `JWT_ACCESS_TTL_HOURS`  | `1`                                  |
    /// | `JWT_REFRESH_TTL_DAYS`  | `30`                                 |
    /// | `JWT_ISSUER`            | unset                                |
    /// | `JWT_AUDIENCE`          | unset                                |
    pub fn from_env() -> Self {
        Self {
            secret: env_or("JWT_SECRET", "intra-dev-secret-change-in-production"),
            algorithm: env_or("JWT_ALGORITHM", "HS256"),
            access_ttl_hours: env_i64("JWT_ACCESS_TTL_HOURS", 1),
            refresh_ttl_days: env_i64("JWT_REFRESH_TTL_DAYS", 30),
            issuer: env_opt("JWT_ISSUER"),
            audience: env_opt("JWT_AUDIENCE"),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
