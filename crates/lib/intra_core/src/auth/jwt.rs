//! Token codec — signing and verification of access/refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::auth::{Role, TokenClaims, UserRecord};

/// Signs and verifies bearer tokens over a single configured key.
///
/// Pure component: no clock state beyond `Utc::now()` at issue time, no I/O.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: Option<String>,
    audience: Option<String>,
}

impl TokenCodec {
    /// Build a codec from configuration.
    ///
    /// Only HMAC algorithms are accepted; the secret is a shared key.
    pub fn from_config(cfg: &JwtConfig) -> Result<Self, AuthError> {
        let algorithm: Algorithm = cfg
            .algorithm
            .parse()
            .map_err(|_| AuthError::Internal(format!("unknown JWT algorithm: {}", cfg.algorithm)))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Internal(format!(
                "unsupported JWT algorithm: {}",
                cfg.algorithm
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm,
            access_ttl: Duration::hours(cfg.access_ttl_hours),
            refresh_ttl: Duration::days(cfg.refresh_ttl_days),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        })
    }

    /// Refresh token lifetime in seconds (drives the cookie max-age).
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }

    /// Issue a short-lived access token with the full claim set.
    pub fn issue_access(&self, user: &UserRecord, role: Role) -> Result<String, AuthError> {
        let mut claims = self.base_claims(user, role, "access", self.access_ttl);
        claims.full_name = user.full_name.clone();
        claims.department = user.department.clone();
        claims.email = user.email.clone();
        claims.subordinates = user.subordinates.clone();
        self.sign(&claims)
    }

    /// Issue a long-lived refresh token.
    ///
    /// Carries only subject, user id, login, and role — never profile PII.
    pub fn issue_refresh(&self, user: &UserRecord, role: Role) -> Result<String, AuthError> {
        let claims = self.base_claims(user, role, "refresh", self.refresh_ttl);
        self.sign(&claims)
    }

    /// Verify a token and return its claims.
    ///
    /// `exp` and `iat` must be present; expiry, audience, and issuer
    /// mismatches each map to their own error kind. The role literal is
    /// validated against the closed [`Role`] set here, at the trust
    /// boundary.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;
        if let Some(aud) = &self.audience {
            validation.set_audience(&[aud]);
        } else {
            // Audience is checked only when configured.
            validation.validate_aud = false;
        }
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        let data =
            decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                    ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                    ErrorKind::InvalidSignature => {
                        AuthError::InvalidToken("signature mismatch".into())
                    }
                    _ => AuthError::InvalidToken(e.to_string()),
                }
            })?;
        if Role::parse(&data.claims.role).is_none() {
            return Err(AuthError::InvalidRole);
        }
        Ok(data.claims)
    }

    fn base_claims(&self, user: &UserRecord, role: Role, typ: &str, ttl: Duration) -> TokenClaims {
        let now = Utc::now();
        TokenClaims {
            sub: user.ad_guid.to_string(),
            user_id: user.id,
            ad_login: Some(user.ad_login.clone()),
            role: role.as_str().to_string(),
            full_name: None,
            department: None,
            email: None,
            subordinates: None,
            typ: typ.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    fn config() -> JwtConfig {
        JwtConfig {
            secret: SECRET.into(),
            algorithm: "HS256".into(),
            access_ttl_hours: 1,
            refresh_ttl_days: 30,
            issuer: Some("intra".into()),
            audience: Some("intra-web".into()),
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::from_config(&config()).unwrap()
    }

    fn sample_user() -> UserRecord {
        UserRecord {
            id: 7,
            ad_guid: Uuid::parse_str("4d36c2f1-9a0b-4c7e-9d2a-8f1e5b6a7c8d").unwrap(),
            ad_login: "j.doe".into(),
            full_name: Some("John Doe".into()),
            email: Some("j.doe@example.loc".into()),
            department: Some("IT".into()),
            title: Some("Engineer".into()),
            is_active: true,
            last_login_at: None,
            subordinates: Some(vec![3, 5]),
            supervisor: Some("Smith".into()),
            role: Some("editor".into()),
        }
    }

    #[test]
    fn access_token_round_trips_full_claims() {
        let codec = codec();
        let user = sample_user();
        let token = codec.issue_access(&user, Role::Editor).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.typ, "access");
        assert_eq!(claims.sub, user.ad_guid.to_string());
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.ad_login.as_deref(), Some("j.doe"));
        assert_eq!(claims.role, "editor");
        assert_eq!(claims.full_name.as_deref(), Some("John Doe"));
        assert_eq!(claims.department.as_deref(), Some("IT"));
        assert_eq!(claims.email.as_deref(), Some("j.doe@example.loc"));
        assert_eq!(claims.subordinates, Some(vec![3, 5]));
        assert_eq!(claims.iss.as_deref(), Some("intra"));
        assert_eq!(claims.aud.as_deref(), Some("intra-web"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_carries_no_profile_fields() {
        let codec = codec();
        let token = codec.issue_refresh(&sample_user(), Role::Admin).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.typ, "refresh");
        assert_eq!(claims.ad_login.as_deref(), Some("j.doe"));
        assert_eq!(claims.role, "admin");
        assert!(claims.full_name.is_none());
        assert!(claims.department.is_none());
        assert!(claims.email.is_none());
        assert!(claims.subordinates.is_none());
    }

    #[test]
    fn expired_token_fails_with_expired_kind() {
        let mut cfg = config();
        cfg.access_ttl_hours = -1;
        let codec = TokenCodec::from_config(&cfg).unwrap();
        let token = codec.issue_access(&sample_user(), Role::Viewer).unwrap();

        match codec.verify(&token) {
            Err(AuthError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {other:?}"),
        }
    }

    #[test]
    fn audience_mismatch_is_distinguished() {
        let issuing = codec();
        let mut cfg = config();
        cfg.audience = Some("other-app".into());
        let verifying = TokenCodec::from_config(&cfg).unwrap();

        let token = issuing.issue_access(&sample_user(), Role::Viewer).unwrap();
        match verifying.verify(&token) {
            Err(AuthError::InvalidAudience) => {}
            other => panic!("expected InvalidAudience, got {other:?}"),
        }
    }

    #[test]
    fn issuer_mismatch_is_distinguished() {
        let issuing = codec();
        let mut cfg = config();
        cfg.issuer = Some("someone-else".into());
        let verifying = TokenCodec::from_config(&cfg).unwrap();

        let token = issuing.issue_access(&sample_user(), Role::Viewer).unwrap();
        match verifying.verify(&token) {
            Err(AuthError::InvalidIssuer) => {}
            other => panic!("expected InvalidIssuer, got {other:?}"),
        }
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let mut cfg = config();
        cfg.secret = "another-secret".into();
        let foreign = TokenCodec::from_config(&cfg).unwrap();

        let token = foreign.issue_access(&sample_user(), Role::Viewer).unwrap();
        match codec().verify(&token) {
            Err(AuthError::InvalidToken(_)) => {}
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn garbage_token_is_rejected() {
        match codec().verify("not.a.token") {
            Err(AuthError::InvalidToken(_)) => {}
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn missing_exp_claim_is_a_verification_failure() {
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({
            "sub": "x",
            "user_id": 1,
            "role": "admin",
            "typ": "access",
            "iat": now,
            "iss": "intra",
            "aud": "intra-web",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(codec().verify(&token).is_err());
    }

    #[test]
    fn unknown_role_claim_is_rejected_as_invalid_role() {
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({
            "sub": "x",
            "user_id": 1,
            "ad_login": "j.doe",
            "role": "superuser",
            "typ": "access",
            "iat": now,
            "exp": now + 3600,
            "iss": "intra",
            "aud": "intra-web",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        match codec().verify(&token) {
            Err(AuthError::InvalidRole) => {}
            other => panic!("expected InvalidRole, got {other:?}"),
        }
    }

    #[test]
    fn non_hmac_algorithm_is_refused() {
        let mut cfg = config();
        cfg.algorithm = "RS256".into();
        assert!(TokenCodec::from_config(&cfg).is_err());
    }
}
