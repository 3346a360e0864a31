/// Principal storage operations
///
/// Runtime-built queries against the `principal` table. The refresh token
/// column is only ever replaced through [`set_refresh_token`] (login),
/// [`replace_refresh_token`] (rotation, conditional) and
/// [`clear_refresh_token`] (logout).
use crate::{db::models::PrincipalRecord, error::ApiResult};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const PRINCIPAL_COLUMNS: &str =
    "id, username, email, full_name, password_hash, refresh_token, created_at, updated_at";

/// Load a principal by id
pub async fn find_by_id(db: &SqlitePool, id: &str) -> ApiResult<Option<PrincipalRecord>> {
    let principal = sqlx::query_as::<_, PrincipalRecord>(&format!(
        "SELECT {} FROM principal WHERE id = ?1",
        PRINCIPAL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(principal)
}

/// Load a principal by username
pub async fn find_by_username(
    db: &SqlitePool,
    username: &str,
) -> ApiResult<Option<PrincipalRecord>> {
    let principal = sqlx::query_as::<_, PrincipalRecord>(&format!(
        "SELECT {} FROM principal WHERE username = ?1",
        PRINCIPAL_COLUMNS
    ))
    .bind(username.to_lowercase())
    .fetch_optional(db)
    .await?;

    Ok(principal)
}

/// Load a principal by email
pub async fn find_by_email(db: &SqlitePool, email: &str) -> ApiResult<Option<PrincipalRecord>> {
    let principal = sqlx::query_as::<_, PrincipalRecord>(&format!(
        "SELECT {} FROM principal WHERE email = ?1",
        PRINCIPAL_COLUMNS
    ))
    .bind(email.to_lowercase())
    .fetch_optional(db)
    .await?;

    Ok(principal)
}

/// Whether a principal with this id exists
pub async fn exists(db: &SqlitePool, id: &str) -> ApiResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM principal WHERE id = ?1")
        .bind(id)
        .fetch_one(db)
        .await?;

    Ok(count > 0)
}

/// Whether the username or the email is already registered
pub async fn username_or_email_taken(
    db: &SqlitePool,
    username: &str,
    email: &str,
) -> ApiResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM principal WHERE username = ?1 OR email = ?2")
            .bind(username)
            .bind(email)
            .fetch_one(db)
            .await?;

    Ok(count > 0)
}

/// Whether the email belongs to a principal other than `id`
pub async fn email_taken_by_other(db: &SqlitePool, email: &str, id: &str) -> ApiResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM principal WHERE email = ?1 AND id != ?2")
            .bind(email)
            .bind(id)
            .fetch_one(db)
            .await?;

    Ok(count > 0)
}

/// Insert a new principal
pub async fn insert(db: &SqlitePool, principal: &PrincipalRecord) -> ApiResult<()> {
    sqlx::query(
        "INSERT INTO principal (id, username, email, full_name, password_hash, refresh_token, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&principal.id)
    .bind(&principal.username)
    .bind(&principal.email)
    .bind(&principal.full_name)
    .bind(&principal.password_hash)
    .bind(&principal.refresh_token)
    .bind(principal.created_at)
    .bind(principal.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

/// Unconditionally store the refresh token of a freshly issued pair
pub async fn set_refresh_token(db: &SqlitePool, id: &str, token: &str) -> ApiResult<bool> {
    let result = sqlx::query("UPDATE principal SET refresh_token = ?1 WHERE id = ?2")
        .bind(token)
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Replace the stored refresh token only if it still equals `expected`.
///
/// Returns `false` when another rotation or a logout got there first.
pub async fn replace_refresh_token(
    db: &SqlitePool,
    id: &str,
    expected: &str,
    replacement: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE principal SET refresh_token = ?1 WHERE id = ?2 AND refresh_token = ?3",
    )
    .bind(replacement)
    .bind(id)
    .bind(expected)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Clear the stored refresh token (logout)
pub async fn clear_refresh_token(db: &SqlitePool, id: &str) -> ApiResult<()> {
    sqlx::query("UPDATE principal SET refresh_token = NULL WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

/// Store a new password hash
pub async fn update_password_hash(db: &SqlitePool, id: &str, password_hash: &str) -> ApiResult<()> {
    sqlx::query("UPDATE principal SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

/// Update display name and email
pub async fn update_details(
    db: &SqlitePool,
    id: &str,
    full_name: &str,
    email: &str,
    updated_at: DateTime<Utc>,
) -> ApiResult<()> {
    sqlx::query("UPDATE principal SET full_name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4")
        .bind(full_name)
        .bind(email)
        .bind(updated_at)
        .bind(id)
        .execute(db)
        .await?;

    Ok(())
}

/// Insert a principal with a placeholder password hash
#[cfg(test)]
pub async fn insert_test_principal(db: &SqlitePool, username: &str) -> PrincipalRecord {
    let now = Utc::now();
    let principal = PrincipalRecord {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        full_name: format!("{} Example", username),
        password_hash: "not-a-real-hash".to_string(),
        refresh_token: None,
        created_at: now,
        updated_at: now,
    };

    insert(db, &principal).await.unwrap();
    principal
}
