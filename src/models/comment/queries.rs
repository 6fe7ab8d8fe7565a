use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::types::*;
use crate::errors::AppError;
use crate::models::parse_column;
use crate::models::user::UserRef;

/// The full comment thread of a report or proposal.
pub async fn find_thread(
    pool: &PgPool,
    target: CommentTarget,
) -> Result<Vec<CommentNode>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        parent_id: Option<i64>,
        author_id: i64,
        username: String,
        display_name: String,
        content: String,
        created_at: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, Row>(&format!(
        "SELECT c.id, c.parent_id, c.author_id, u.username, u.display_name, \
                c.content, c.created_at \
         FROM comments c \
         JOIN users u ON u.id = c.author_id \
         WHERE c.{} = $1 \
         ORDER BY c.created_at, c.id",
        target.column()
    ))
    .bind(target.id())
    .fetch_all(pool)
    .await?;

    let reactions: Vec<(i64, i64, String)> = sqlx::query_as(&format!(
        "SELECT r.comment_id, r.user_id, r.kind \
         FROM comment_reactions r \
         JOIN comments c ON c.id = r.comment_id \
         WHERE c.{} = $1 \
         ORDER BY r.created_at",
        target.column()
    ))
    .bind(target.id())
    .fetch_all(pool)
    .await?;

    let reactions = reactions
        .into_iter()
        .map(|(comment_id, user_id, kind)| {
            Ok((comment_id, user_id, parse_column::<ReactionKind>(&kind)?))
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let comments = rows
        .into_iter()
        .map(|r| FlatComment {
            id: r.id,
            parent_id: r.parent_id,
            author: UserRef {
                id: r.author_id,
                username: r.username,
                display_name: r.display_name,
            },
            content: r.content,
            created_at: r.created_at,
        })
        .collect();

    Ok(assemble_thread(comments, &reactions))
}

/// Where a comment lives and who wrote it.
pub async fn find_target(
    pool: &PgPool,
    comment_id: i64,
) -> Result<Option<(CommentTarget, i64)>, AppError> {
    let row: Option<(Option<i64>, Option<i64>, i64)> =
        sqlx::query_as("SELECT report_id, proposal_id, author_id FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(|(report_id, proposal_id, author_id)| {
        let target = match (report_id, proposal_id) {
            (Some(id), _) => CommentTarget::Report(id),
            (None, Some(id)) => CommentTarget::Proposal(id),
            (None, None) => return None,
        };
        Some((target, author_id))
    }))
}

/// Add a comment or a reply. Replies must point at a top-level comment on the same item.
pub async fn create(
    pool: &PgPool,
    target: CommentTarget,
    author_id: i64,
    input: &NewComment,
) -> Result<i64, AppError> {
    let content = input.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Comment content is required".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }

    if let Some(parent_id) = input.parent_id {
        let parent: Option<(Option<i64>, Option<i64>, Option<i64>)> =
            sqlx::query_as("SELECT report_id, proposal_id, parent_id FROM comments WHERE id = $1")
                .bind(parent_id)
                .fetch_optional(pool)
                .await?;
        let (report_id, proposal_id, grandparent) =
            parent.ok_or_else(|| {
                AppError::Validation("Parent comment does not exist".to_string())
            })?;

        let same_target = match target {
            CommentTarget::Report(id) => report_id == Some(id),
            CommentTarget::Proposal(id) => proposal_id == Some(id),
        };
        if !same_target {
            return Err(AppError::Validation(
                "Parent comment belongs to a different item".to_string(),
            ));
        }
        if grandparent.is_some() {
            return Err(AppError::Validation(
                "Replies cannot be nested more than one level".to_string(),
            ));
        }
    }

    let (id,): (i64,) = sqlx::query_as(&format!(
        "INSERT INTO comments ({}, parent_id, author_id, content) \
         VALUES ($1, $2, $3, $4) RETURNING id",
        target.column()
    ))
    .bind(target.id())
    .bind(input.parent_id)
    .bind(author_id)
    .bind(content)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Toggle the user's reaction on a comment. Returns the reaction now in place.
pub async fn toggle_reaction(
    pool: &PgPool,
    comment_id: i64,
    user_id: i64,
    pressed: ReactionKind,
) -> Result<Option<ReactionKind>, AppError> {
    let mut tx = pool.begin().await?;

    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM comments WHERE id = $1 FOR SHARE")
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    let current: Option<(String,)> = sqlx::query_as(
        "SELECT kind FROM comment_reactions WHERE comment_id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;
    let current: Option<ReactionKind> = current.map(|(k,)| parse_column(&k)).transpose()?;

    let next = next_reaction(current, pressed);
    match next {
        Some(kind) => {
            sqlx::query(
                "INSERT INTO comment_reactions (comment_id, user_id, kind) VALUES ($1, $2, $3) \
                 ON CONFLICT (comment_id, user_id) \
                  DO UPDATE SET kind = EXCLUDED.kind, created_at = NOW()",
            )
            .bind(comment_id)
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query("DELETE FROM comment_reactions WHERE comment_id = $1 AND user_id = $2")
                .bind(comment_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(next)
}

/// Delete a comment; its replies and reactions go with it.
pub async fn delete(pool: &PgPool, comment_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
