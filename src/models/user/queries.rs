use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::types::{NewUser, User, UserDisplay};
use crate::errors::{AppError, is_unique_violation};
use crate::models::parse_column;

const SELECT_USER: &str = "\
    SELECT id, username, email, display_name, password_hash, role, created_at FROM users";

#[derive(sqlx::FromRow)]
struct Row {
    id: i64,
    username: String,
    email: String,
    display_name: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<Row> for User {
    type Error = AppError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            role: parse_column(&row.role)?,
            created_at: row.created_at,
        })
    }
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, Row>(&format!("{SELECT_USER} WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, Row>(&format!("{SELECT_USER} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(User::try_from).transpose()
}

pub async fn find_display_by_id(pool: &PgPool, id: i64) -> Result<Option<UserDisplay>, AppError> {
    Ok(find_by_id(pool, id).await?.map(UserDisplay::from))
}

pub async fn find_all(pool: &PgPool) -> Result<Vec<UserDisplay>, AppError> {
    let rows = sqlx::query_as::<_, Row>(&format!("{SELECT_USER} ORDER BY username"))
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|r| User::try_from(r).map(UserDisplay::from))
        .collect()
}

pub async fn count(pool: &PgPool) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Ids from `ids` that do not belong to any user.
pub async fn missing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT wanted FROM UNNEST($1::BIGINT[]) AS wanted \
         WHERE NOT EXISTS (SELECT 1 FROM users u WHERE u.id = wanted)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Insert a user. A taken username or email is reported as a conflict.
pub async fn create(pool: &PgPool, user: &NewUser) -> Result<i64, AppError> {
    let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
        "INSERT INTO users (username, email, display_name, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(user.username.trim())
    .bind(user.email.trim())
    .bind(user.display_name.trim())
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .fetch_one(pool)
    .await;

    match result {
        Ok((id,)) => Ok(id),
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
            "Username or email is already taken".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}
