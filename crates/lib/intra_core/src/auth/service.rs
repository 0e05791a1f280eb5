//! Auth orchestrator — ties the directory client, role resolver, user
//! synchronizer, and token codec together for the login and refresh flows.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use super::jwt::TokenCodec;
use super::ldap::Directory;
use super::queries;
use super::roles::RoleResolver;
use super::AuthError;
use crate::models::auth::{DirectoryProfile, LoginOutcome, TokenClaims, UserProfile};

/// Authenticates users against the directory and issues token pairs.
///
/// Constructed once at startup with its collaborators injected and shared
/// behind an `Arc` in the request state.
pub struct AuthService {
    directory: Arc<dyn Directory>,
    codec: TokenCodec,
    roles: RoleResolver,
}

impl AuthService {
    pub fn new(directory: Arc<dyn Directory>, codec: TokenCodec, roles: RoleResolver) -> Self {
        Self {
            directory,
            codec,
            roles,
        }
    }

    /// Refresh token lifetime in seconds, for the cookie max-age.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.codec.refresh_ttl_secs()
    }

    /// Verify a bearer access token (used by the request middleware).
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.verify(token)?;
        if claims.typ != "access" {
            return Err(AuthError::InvalidTokenType);
        }
        Ok(claims)
    }

    /// Primary credential check: bind against the directory, then complete
    /// the shared role/sync/issue sequence.
    pub async fn login(
        &self,
        pool: &PgPool,
        login: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let info = self.directory.authenticate(login, password).await?;
        self.complete_auth(pool, info, true).await
    }

    /// Token-driven re-authentication: verify the refresh token, then fetch
    /// the profile with service credentials and complete the same sequence
    /// without counting it as an interactive login.
    pub async fn refresh(
        &self,
        pool: &PgPool,
        refresh_token: &str,
    ) -> Result<LoginOutcome, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefresh);
        }

        let claims = self.codec.verify(refresh_token)?;
        if claims.typ != "refresh" {
            return Err(AuthError::InvalidTokenType);
        }
        let ad_login = match claims.ad_login.as_deref() {
            Some(login) if !login.is_empty() => login,
            _ => return Err(AuthError::InvalidTokenPayload),
        };

        let info = self.directory.fetch_by_login(ad_login).await?;
        self.complete_auth(pool, info, false).await
    }

    async fn complete_auth(
        &self,
        pool: &PgPool,
        info: Option<DirectoryProfile>,
        update_last_login: bool,
    ) -> Result<LoginOutcome, AuthError> {
        let Some(info) = info else {
            return Err(AuthError::InvalidCredentials);
        };

        let Some(role) = self.roles.resolve(&info.groups) else {
            // The user lost every role-granting group: flip the local record
            // to inactive in its own committed transaction, then fail.
            queries::deactivate_user(pool, info.ad_guid).await?;
            return Err(AuthError::Forbidden);
        };

        let mut tx = pool.begin().await?;
        let subordinate_ids = queries::resolve_subordinate_ids(&mut tx, &info.subordinates).await?;
        let user =
            queries::upsert_user(&mut tx, &info, &subordinate_ids, role, update_last_login).await?;
        tx.commit().await?;

        let access_token = self.codec.issue_access(&user, role)?;
        let refresh_token = self.codec.issue_refresh(&user, role)?;
        info!(ad_login = %user.ad_login, role = %role, "user authenticated");

        Ok(LoginOutcome {
            access_token,
            refresh_token,
            user: UserProfile::from_record(&user, role),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use uuid::Uuid;

    use crate::config::JwtConfig;
    use crate::models::auth::Role;

    const SECRET: &str = "test-secret";

    /// Directory stand-in with a fixed outcome and a call counter.
    ///
    /// The success path needs a database and is covered by the API crate's
    /// integration tests; these scripts cover everything that must fail
    /// before persistence.
    enum Script {
        Absent,
        Unavailable,
    }

    struct ScriptedDirectory {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedDirectory {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn respond(&self) -> Result<Option<DirectoryProfile>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Absent => Ok(None),
                Script::Unavailable => {
                    Err(AuthError::DirectoryUnavailable("connection refused".into()))
                }
            }
        }
    }

    #[async_trait]
    impl Directory for ScriptedDirectory {
        async fn authenticate(
            &self,
            _login: &str,
            _password: &str,
        ) -> Result<Option<DirectoryProfile>, AuthError> {
            self.respond()
        }

        async fn fetch_by_login(
            &self,
            _login: &str,
        ) -> Result<Option<DirectoryProfile>, AuthError> {
            self.respond()
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::from_config(&JwtConfig {
            secret: SECRET.into(),
            algorithm: "HS256".into(),
            access_ttl_hours: 1,
            refresh_ttl_days: 30,
            issuer: None,
            audience: None,
        })
        .unwrap()
    }

    fn service(script: Script) -> (Arc<ScriptedDirectory>, AuthService) {
        let directory = Arc::new(ScriptedDirectory::new(script));
        let resolver = RoleResolver::from_bindings(Some("CN=Admins"), None, None);
        (
            directory.clone(),
            AuthService::new(directory, codec(), resolver),
        )
    }

    /// Pool that never connects; tests must fail before touching it.
    fn lazy_pool() -> PgPool {
        PgPool::connect_lazy("postgres://localhost/intra_unreachable").unwrap()
    }

    #[tokio::test]
    async fn empty_credentials_are_rejected_without_a_directory_call() {
        let (directory, service) = service(Script::Absent);
        let pool = lazy_pool();

        for (login, password) in [("", "pass"), ("  ", "pass"), ("user", "")] {
            match service.login(&pool, login, password).await {
                Err(AuthError::InvalidCredentials) => {}
                other => panic!("expected InvalidCredentials, got {other:?}"),
            }
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn absent_profile_is_invalid_credentials() {
        let (_, service) = service(Script::Absent);
        match service.login(&lazy_pool(), "user", "pass").await {
            Err(AuthError::InvalidCredentials) => {}
            other => panic!("expected InvalidCredentials, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn directory_outage_propagates_without_touching_the_database() {
        let (_, service) = service(Script::Unavailable);
        match service.login(&lazy_pool(), "user", "pass").await {
            Err(AuthError::DirectoryUnavailable(_)) => {}
            other => panic!("expected DirectoryUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_refresh_token_is_missing_refresh() {
        let (directory, service) = service(Script::Absent);
        match service.refresh(&lazy_pool(), "").await {
            Err(AuthError::MissingRefresh) => {}
            other => panic!("expected MissingRefresh, got {other:?}"),
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn access_token_is_not_accepted_for_refresh() {
        let (directory, service) = service(Script::Absent);
        let user = crate::models::auth::UserRecord {
            id: 1,
            ad_guid: Uuid::new_v4(),
            ad_login: "user".into(),
            full_name: None,
            email: None,
            department: None,
            title: None,
            is_active: true,
            last_login_at: None,
            subordinates: None,
            supervisor: None,
            role: None,
        };
        let access = codec().issue_access(&user, Role::Admin).unwrap();

        match service.refresh(&lazy_pool(), &access).await {
            Err(AuthError::InvalidTokenType) => {}
            other => panic!("expected InvalidTokenType, got {other:?}"),
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_token_without_login_claim_is_invalid_payload() {
        let (directory, service) = service(Script::Absent);
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "user_id": 1,
            "role": "admin",
            "typ": "refresh",
            "iat": now,
            "exp": now + 3600,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        match service.refresh(&lazy_pool(), &token).await {
            Err(AuthError::InvalidTokenPayload) => {}
            other => panic!("expected InvalidTokenPayload, got {other:?}"),
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn garbage_refresh_token_is_invalid_token() {
        let (_, service) = service(Script::Absent);
        match service.refresh(&lazy_pool(), "definitely.not.jwt").await {
            Err(AuthError::InvalidToken(_)) => {}
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }
}
