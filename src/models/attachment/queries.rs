use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::AppError;

const SELECT_ATTACHMENT: &str = "\
    SELECT id, proposal_id, url, filename, content_type, size_bytes, uploaded_by, created_at \
        FROM files";

pub async fn find_for_proposal(
    conn: &mut PgConnection,
    proposal_id: i64,
) -> Result<Option<Attachment>, AppError> {
    let sql = format!("{SELECT_ATTACHMENT} WHERE proposal_id = $1");
    let row = sqlx::query_as::<_, Attachment>(&sql)
        .bind(proposal_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// Record the proposal's attachment, replacing any previous one.
/// Returns the replaced attachment so its blob can be removed.
pub async fn replace(pool: &PgPool, input: &NewAttachment) -> Result<Option<Attachment>, AppError> {
    let mut tx = pool.begin().await?;

    let previous = sqlx::query_as::<_, Attachment>(&format!(
        "{SELECT_ATTACHMENT} WHERE proposal_id = $1 FOR UPDATE"
    ))
    .bind(input.proposal_id)
    .fetch_optional(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM files WHERE proposal_id = $1")
        .bind(input.proposal_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO files (proposal_id, url, filename, content_type, size_bytes, uploaded_by) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(input.proposal_id)
    .bind(&input.url)
    .bind(&input.filename)
    .bind(&input.content_type)
    .bind(input.size_bytes)
    .bind(input.uploaded_by)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(previous)
}

/// Remove the proposal's attachment row, returning it if there was one.
pub async fn delete_for_proposal(
    pool: &PgPool,
    proposal_id: i64,
) -> Result<Option<Attachment>, AppError> {
    let row = sqlx::query_as::<_, Attachment>(
        "DELETE FROM files WHERE proposal_id = $1 \
         RETURNING id, proposal_id, url, filename, content_type, size_bytes, \
                    uploaded_by, created_at",
    )
    .bind(proposal_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
