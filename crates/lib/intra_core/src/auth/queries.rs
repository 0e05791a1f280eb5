//! User synchronization queries.
//!
//! The upsert path runs on the caller's transaction and never commits;
//! deactivation opens and commits its own transaction because it must
//! persist even when the surrounding auth attempt fails.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{DirectoryProfile, Role, UserRecord};

const USER_COLUMNS: &str = "id, ad_guid, ad_login, full_name, email, department, title, \
     is_active, last_login_at, subordinates, supervisor, role";

/// Resolve subordinate display names to local user ids, in order.
///
/// Names with no local record yet are silently dropped; such users only
/// become resolvable after their own first login.
pub async fn resolve_subordinate_ids(
    conn: &mut PgConnection,
    names: &[String],
) -> Result<Vec<i32>, AuthError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE full_name = $1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(id) = id {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Create or update a user record from directory data.
///
/// Locates the record by directory GUID, inserting when absent. Profile
/// fields, role, and `is_active = true` are always overwritten;
/// `last_login_at` is stamped only when `update_last_login` is set
/// (login yes, refresh no).
pub async fn upsert_user(
    conn: &mut PgConnection,
    profile: &DirectoryProfile,
    subordinate_ids: &[i32],
    role: Role,
    update_last_login: bool,
) -> Result<UserRecord, AuthError> {
    let update = format!(
        "UPDATE users SET \
            ad_login = $2, full_name = $3, email = $4, department = $5, title = $6, \
            subordinates = $7, supervisor = $8, role = $9, is_active = TRUE, \
            last_login_at = CASE WHEN $10 THEN now() ELSE last_login_at END, \
            updated_at = now() \
         WHERE ad_guid = $1 \
         RETURNING {USER_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, UserRecord>(&update)
        .bind(profile.ad_guid)
        .bind(&profile.ad_login)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.department)
        .bind(&profile.title)
        .bind(subordinate_ids)
        .bind(&profile.supervisor)
        .bind(role.as_str())
        .bind(update_last_login)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(user) = updated {
        return Ok(user);
    }

    let insert = format!(
        "INSERT INTO users \
            (ad_guid, ad_login, full_name, email, department, title, \
             subordinates, supervisor, role, is_active, last_login_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, \
                 CASE WHEN $10 THEN now() ELSE NULL END) \
         RETURNING {USER_COLUMNS}"
    );
    let user = sqlx::query_as::<_, UserRecord>(&insert)
        .bind(profile.ad_guid)
        .bind(&profile.ad_login)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.department)
        .bind(&profile.title)
        .bind(subordinate_ids)
        .bind(&profile.supervisor)
        .bind(role.as_str())
        .bind(update_last_login)
        .fetch_one(&mut *conn)
        .await?;
    Ok(user)
}

/// Mark a user inactive by directory GUID. No-op for unknown GUIDs.
///
/// Runs in its own transaction, committed here: the record must stay
/// inactive even though the caller is about to fail the request.
pub async fn deactivate_user(pool: &PgPool, ad_guid: Uuid) -> Result<(), AuthError> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE users SET is_active = FALSE, updated_at = now() WHERE ad_guid = $1")
        .bind(ad_guid)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
