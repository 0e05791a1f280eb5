//! Directory client — authenticates users and fetches profiles over LDAP.
//!
//! Two operations: bind with the caller's credentials and fetch the matching
//! entry, or fetch an entry by login using the service account. Everything
//! "attribute may be absent / multi-valued / binary" lives in the mapping
//! functions at the bottom of this module.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions, ldap_escape};
use tracing::{error, warn};
use uuid::Uuid;

use super::AuthError;
use crate::config::LdapConfig;
use crate::models::auth::DirectoryProfile;

/// Attributes requested for every user entry.
const USER_ATTRIBUTES: &[&str] = &[
    "sAMAccountName",
    "displayName",
    "mail",
    "department",
    "title",
    "memberOf",
    "objectGUID",
    "manager",
    "directReports",
];

/// Directory query capability consumed by the auth orchestrator.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Bind with the user's own credentials and fetch their profile.
    ///
    /// `None` means invalid credentials or no matching entry; transport
    /// failures surface as [`AuthError::DirectoryUnavailable`].
    async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<DirectoryProfile>, AuthError>;

    /// Fetch a profile by login, binding with the service account.
    async fn fetch_by_login(&self, login: &str) -> Result<Option<DirectoryProfile>, AuthError>;
}

/// LDAP-backed [`Directory`] implementation.
pub struct LdapDirectory {
    config: LdapConfig,
}

impl LdapDirectory {
    pub fn new(config: LdapConfig) -> Self {
        Self { config }
    }

    /// Bind identity for a raw user login: `DOMAIN\login`.
    ///
    /// `None` when the login is blank or no domain is configured — the
    /// caller must treat that as failed authentication, not an error.
    fn bind_identity(&self, login: &str) -> Option<String> {
        let raw = login.trim();
        let domain = self.config.domain.trim();
        if raw.is_empty() || domain.is_empty() {
            return None;
        }
        Some(format!("{domain}\\{raw}"))
    }

    /// Open a connection, bind, and run a single bounded search.
    async fn query_user(
        &self,
        bind_login: &str,
        password: &str,
        sam_login: &str,
    ) -> Result<Option<DirectoryProfile>, AuthError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connect_timeout_secs));
        let (conn, mut ldap) =
            LdapConnAsync::with_settings(settings, &self.config.server_uri)
                .await
                .map_err(|e| {
                    error!(login = sam_login, error = %e, "directory connection failed");
                    AuthError::DirectoryUnavailable(e.to_string())
                })?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "directory connection driver exited");
            }
        });

        let outcome = self
            .bind_and_search(&mut ldap, bind_login, password, sam_login)
            .await;
        let _ = ldap.unbind().await;
        outcome
    }

    async fn bind_and_search(
        &self,
        ldap: &mut Ldap,
        bind_login: &str,
        password: &str,
        sam_login: &str,
    ) -> Result<Option<DirectoryProfile>, AuthError> {
        // A rejected bind is expected traffic (wrong password, locked
        // account), not a system failure.
        if let Err(e) = ldap
            .simple_bind(bind_login, password)
            .await
            .and_then(|r| r.success())
        {
            warn!(login = sam_login, error = %e, "directory bind rejected");
            return Ok(None);
        }

        let filter = format!(
            "(&(objectClass=person)(sAMAccountName={}))",
            ldap_escape(sam_login)
        );
        let search = ldap
            .with_search_options(
                SearchOptions::new()
                    .sizelimit(1)
                    .timelimit(self.config.search_timeout_secs as i32),
            )
            .search(
                &self.config.base_dn,
                Scope::Subtree,
                &filter,
                USER_ATTRIBUTES.to_vec(),
            )
            .await
            .and_then(|r| r.success());
        let (entries, _) = match search {
            Ok(found) => found,
            // Search timeouts and other directory-level errors are
            // no-match, not an outage.
            Err(e) => {
                warn!(login = sam_login, error = %e, "directory search failed");
                return Ok(None);
            }
        };

        let Some(entry) = entries.into_iter().next() else {
            return Ok(None);
        };
        Ok(entry_to_profile(SearchEntry::construct(entry)))
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<DirectoryProfile>, AuthError> {
        // Fail closed: an empty password would be an anonymous bind.
        if password.is_empty() {
            return Ok(None);
        }
        let Some(bind_login) = self.bind_identity(login) else {
            return Ok(None);
        };
        self.query_user(&bind_login, password, &normalize_login(login))
            .await
    }

    async fn fetch_by_login(&self, login: &str) -> Result<Option<DirectoryProfile>, AuthError> {
        self.query_user(
            &self.config.service_user,
            &self.config.service_pass,
            &normalize_login(login),
        )
        .await
    }
}

/// Normalize a login for searching: trimmed, lowercase.
fn normalize_login(login: &str) -> String {
    login.trim().to_lowercase()
}

/// Map a raw directory entry to a domain profile.
///
/// Returns `None` when the entry has no parseable GUID or no login — such
/// entries are treated as absent.
fn entry_to_profile(entry: SearchEntry) -> Option<DirectoryProfile> {
    let ad_guid = extract_guid(&entry)?;
    let ad_login = single_attr(&entry, "sAMAccountName")?.to_lowercase();
    let supervisor = single_attr(&entry, "manager")
        .as_deref()
        .and_then(leading_rdn_value)
        .unwrap_or_default();
    Some(DirectoryProfile {
        ad_login,
        ad_guid,
        full_name: single_attr(&entry, "displayName"),
        email: single_attr(&entry, "mail").map(|m| m.to_lowercase()),
        department: single_attr(&entry, "department"),
        title: single_attr(&entry, "title"),
        supervisor,
        groups: multi_attr(&entry, "memberOf"),
        subordinates: active_report_names(&multi_attr(&entry, "directReports")),
    })
}

/// Extract the binary `objectGUID` (little-endian byte order).
fn extract_guid(entry: &SearchEntry) -> Option<Uuid> {
    let raw = entry
        .bin_attrs
        .get("objectGUID")
        .and_then(|values| values.first())
        .cloned()
        // A GUID that happens to be valid UTF-8 lands in the string attrs.
        .or_else(|| {
            entry
                .attrs
                .get("objectGUID")
                .and_then(|values| values.first())
                .map(|v| v.as_bytes().to_vec())
        })?;
    let bytes: [u8; 16] = raw.as_slice().try_into().ok()?;
    Some(Uuid::from_bytes_le(bytes))
}

/// First value of a single-valued attribute, trimmed; `None` when blank.
fn single_attr(entry: &SearchEntry, name: &str) -> Option<String> {
    entry
        .attrs
        .get(name)
        .and_then(|values| values.first())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// All values of a multi-valued attribute.
fn multi_attr(entry: &SearchEntry, name: &str) -> Vec<String> {
    entry
        .attrs
        .get(name)
        .map(|values| values.iter().filter(|v| !v.is_empty()).cloned().collect())
        .unwrap_or_default()
}

/// Value of the leading RDN of a DN: `CN=Doe John,OU=IT,...` → `Doe John`.
fn leading_rdn_value(dn: &str) -> Option<String> {
    dn.split(',')
        .next()?
        .split_once('=')
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Direct-report DNs reduced to names, skipping entries parked in a
/// `DISABLED` container.
fn active_report_names(dns: &[String]) -> Vec<String> {
    dns.iter()
        .filter_map(|dn| {
            let parts: Vec<&str> = dn.split(',').collect();
            if parts.len() > 1 && parts[1].contains("DISABLED") {
                return None;
            }
            parts
                .first()
                .and_then(|rdn| rdn.split_once('='))
                .map(|(_, value)| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .collect()
}
