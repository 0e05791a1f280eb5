//! Authentication request handlers.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use intra_core::models::auth::{LoginOutcome, UserProfile};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::services::cookies::{REFRESH_COOKIE, clear_refresh_cookie, refresh_cookie};

/// `POST /api/v1/auth/login` request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Authenticated user as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: i32,
    pub ad_login: String,
    pub ad_guid: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    pub role: String,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<UserProfile> for AuthUser {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            ad_login: profile.ad_login,
            ad_guid: profile.ad_guid,
            full_name: profile.full_name,
            email: profile.email,
            department: profile.department,
            title: profile.title,
            role: profile.role.as_str().to_string(),
            last_login_at: profile.last_login_at,
        }
    }
}

/// Login/refresh response body. The refresh token travels only in the
/// cookie, never in the body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: AuthUser,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            access_token: outcome.access_token,
            user: outcome.user.into(),
        }
    }
}

/// `POST /api/v1/auth/login` — authenticate with directory credentials.
///
/// Sets the refresh-token cookie on success.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let outcome = state
        .auth
        .login(&state.pool, &body.login, &body.password)
        .await?;
    let jar = jar.add(refresh_cookie(
        &outcome.refresh_token,
        state.auth.refresh_ttl_secs(),
    ));
    Ok((jar, Json(LoginResponse::from(outcome))))
}

/// `POST /api/v1/auth/refresh` — exchange the refresh cookie for a new
/// token pair, rotating the cookie. On failure the cookie is cleared.
pub async fn refresh_handler(State(state): State<AppState>, jar: CookieJar) -> Response {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    match state.auth.refresh(&state.pool, &token).await {
        Ok(outcome) => {
            let jar = jar.add(refresh_cookie(
                &outcome.refresh_token,
                state.auth.refresh_ttl_secs(),
            ));
            (jar, Json(LoginResponse::from(outcome))).into_response()
        }
        Err(e) => {
            let jar = jar.add(clear_refresh_cookie());
            (jar, AppError::from(e)).into_response()
        }
    }
}

/// Claims-derived identity for the protected example route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: i32,
    pub ad_login: Option<String>,
    pub role: String,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub subordinates: Option<Vec<i32>>,
}

/// `GET /api/v1/auth/me` — identity of the bearer of the access token.
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    let claims = user.0;
    Json(MeResponse {
        user_id: claims.user_id,
        ad_login: claims.ad_login,
        role: claims.role,
        full_name: claims.full_name,
        department: claims.department,
        email: claims.email,
        subordinates: claims.subordinates,
    })
}
