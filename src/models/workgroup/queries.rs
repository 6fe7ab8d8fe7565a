use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::types::*;
use crate::errors::{AppError, is_unique_violation};
use crate::models::parse_column;

#[derive(sqlx::FromRow)]
struct WorkgroupRow {
    id: i64,
    name: String,
    description: String,
    mission: String,
    status: String,
    member_count: i64,
    created_at: DateTime<Utc>,
}

const SELECT_WORKGROUP: &str = "\
    SELECT w.id, w.name, w.description, w.mission, w.status, w.created_at, \
           (SELECT COUNT(*) FROM workgroup_members m WHERE m.workgroup_id = w.id) AS member_count \
    FROM workgroups w";

pub async fn find_all(pool: &PgPool) -> Result<Vec<WorkgroupSummary>, AppError> {
    let rows = sqlx::query_as::<_, WorkgroupRow>(&format!("{SELECT_WORKGROUP} ORDER BY w.name"))
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|r| {
            Ok(WorkgroupSummary {
                id: r.id,
                name: r.name,
                description: r.description,
                status: parse_column(&r.status)?,
                member_count: r.member_count,
            })
        })
        .collect()
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<WorkgroupDetail>, AppError> {
    let row = sqlx::query_as::<_, WorkgroupRow>(&format!("{SELECT_WORKGROUP} WHERE w.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| {
        Ok(WorkgroupDetail {
            id: r.id,
            name: r.name,
            description: r.description,
            mission: r.mission,
            status: parse_column(&r.status)?,
            member_count: r.member_count,
            created_at: r.created_at,
        })
    })
    .transpose()
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let (found,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM workgroups WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(found)
}

/// Ids from `ids` that do not belong to any workgroup.
pub async fn missing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT wanted FROM UNNEST($1::BIGINT[]) AS wanted \
         WHERE NOT EXISTS (SELECT 1 FROM workgroups w WHERE w.id = wanted)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Create a workgroup. A duplicate name is reported as a conflict.
pub async fn create(pool: &PgPool, input: &NewWorkgroup) -> Result<i64, AppError> {
    let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
        "INSERT INTO workgroups (name, description, mission) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.mission.trim())
    .fetch_one(pool)
    .await;

    match result {
        Ok((id,)) => Ok(id),
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(format!(
            "A workgroup named '{}' already exists",
            input.name.trim()
        ))),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_members(
    pool: &PgPool,
    workgroup_id: i64,
) -> Result<Vec<WorkgroupMember>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        user_id: i64,
        username: String,
        display_name: String,
        role: String,
        joined_at: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT m.user_id, u.username, u.display_name, m.role, m.joined_at \
         FROM workgroup_members m \
         JOIN users u ON u.id = m.user_id \
         WHERE m.workgroup_id = $1 \
         ORDER BY m.role ASC, u.username",
    )
    .bind(workgroup_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(WorkgroupMember {
                user_id: r.user_id,
                username: r.username,
                display_name: r.display_name,
                role: parse_column(&r.role)?,
                joined_at: r.joined_at,
            })
        })
        .collect()
}

/// The user's role in the workgroup, or `None` for non-members.
pub async fn member_role(
    pool: &PgPool,
    workgroup_id: i64,
    user_id: i64,
) -> Result<Option<MemberRole>, AppError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT role FROM workgroup_members WHERE workgroup_id = $1 AND user_id = $2",
    )
    .bind(workgroup_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.map(|(role,)| parse_column(&role)).transpose()
}

pub async fn is_member(pool: &PgPool, workgroup_id: i64, user_id: i64) -> Result<bool, AppError> {
    Ok(member_role(pool, workgroup_id, user_id).await?.is_some())
}

/// Add a member. Adding an existing member is a no-op and returns `false`.
/// A pending join request from the same user is marked APPROVED.
pub async fn add_member(
    pool: &PgPool,
    workgroup_id: i64,
    user_id: i64,
    role: MemberRole,
    added_by: i64,
) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO workgroup_members (workgroup_id, user_id, role) VALUES ($1, $2, $3) \
         ON CONFLICT (workgroup_id, user_id) DO NOTHING",
    )
    .bind(workgroup_id)
    .bind(user_id)
    .bind(role.as_str())
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;

    sqlx::query(
        "UPDATE workgroup_join_requests \
         SET status = 'APPROVED', resolved_by = $3, resolved_at = NOW() \
         WHERE workgroup_id = $1 AND user_id = $2 AND status = 'PENDING'",
    )
    .bind(workgroup_id)
    .bind(user_id)
    .bind(added_by)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(inserted)
}

#[derive(sqlx::FromRow)]
struct JoinRequestRow {
    id: i64,
    workgroup_id: i64,
    user_id: i64,
    username: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<JoinRequestRow> for JoinRequest {
    type Error = AppError;

    fn try_from(r: JoinRequestRow) -> Result<Self, Self::Error> {
        Ok(JoinRequest {
            id: r.id,
            workgroup_id: r.workgroup_id,
            user_id: r.user_id,
            username: r.username,
            message: r.message,
            status: parse_column(&r.status)?,
            created_at: r.created_at,
            resolved_at: r.resolved_at,
        })
    }
}

const SELECT_JOIN_REQUEST: &str = "\
    SELECT j.id, j.workgroup_id, j.user_id, u.username, j.message, j.status, \
           j.created_at, j.resolved_at \
    FROM workgroup_join_requests j \
    JOIN users u ON u.id = j.user_id";

pub async fn find_join_request(pool: &PgPool, id: i64) -> Result<Option<JoinRequest>, AppError> {
    let row = sqlx::query_as::<_, JoinRequestRow>(&format!("{SELECT_JOIN_REQUEST} WHERE j.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(JoinRequest::try_from).transpose()
}

/// The user's most recent join request for a workgroup.
pub async fn find_latest_join_request(
    pool: &PgPool,
    workgroup_id: i64,
    user_id: i64,
) -> Result<Option<JoinRequest>, AppError> {
    let row = sqlx::query_as::<_, JoinRequestRow>(&format!(
        "{SELECT_JOIN_REQUEST} WHERE j.workgroup_id = $1 AND j.user_id = $2 \
         ORDER BY j.created_at DESC, j.id DESC LIMIT 1"
    ))
    .bind(workgroup_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    row.map(JoinRequest::try_from).transpose()
}

pub async fn find_pending_join_requests(
    pool: &PgPool,
    workgroup_id: i64,
) -> Result<Vec<JoinRequest>, AppError> {
    let rows = sqlx::query_as::<_, JoinRequestRow>(&format!(
        "{SELECT_JOIN_REQUEST} WHERE j.workgroup_id = $1 AND j.status = 'PENDING' \
         ORDER BY j.created_at"
    ))
    .bind(workgroup_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(JoinRequest::try_from).collect()
}

/// File a join request. Members and users with a pending request get a conflict.
pub async fn create_join_request(
    pool: &PgPool,
    workgroup_id: i64,
    user_id: i64,
    message: &str,
) -> Result<i64, AppError> {
    if is_member(pool, workgroup_id, user_id).await? {
        return Err(AppError::Conflict("You are already a member of this workgroup".to_string()));
    }

    let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
        "INSERT INTO workgroup_join_requests (workgroup_id, user_id, message) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(workgroup_id)
    .bind(user_id)
    .bind(message.trim())
    .fetch_one(pool)
    .await;

    match result {
        Ok((id,)) => Ok(id),
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict(
            "A join request for this workgroup is already pending".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Approve or reject a pending join request. Approval adds the user as a member.
pub async fn resolve_join_request(
    pool: &PgPool,
    request_id: i64,
    approve: bool,
    resolved_by: i64,
) -> Result<JoinRequest, AppError> {
    let mut tx = pool.begin().await?;

    let current: Option<(i64, i64, String)> = sqlx::query_as(
        "SELECT workgroup_id, user_id, status FROM workgroup_join_requests \
         WHERE id = $1 FOR UPDATE",
    )
    .bind(request_id)
    .fetch_optional(&mut *tx)
    .await?;
    let (workgroup_id, user_id, status) = current.ok_or(AppError::NotFound)?;

    let status: JoinRequestStatus = parse_column(&status)?;
    if status != JoinRequestStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Join request has already been {}",
            status.as_str().to_lowercase()
        )));
    }

    let new_status = if approve {
        JoinRequestStatus::Approved
    } else {
        JoinRequestStatus::Rejected
    };
    sqlx::query(
        "UPDATE workgroup_join_requests \
         SET status = $2, resolved_by = $3, resolved_at = NOW() WHERE id = $1",
    )
    .bind(request_id)
    .bind(new_status.as_str())
    .bind(resolved_by)
    .execute(&mut *tx)
    .await?;

    if approve {
        sqlx::query(
            "INSERT INTO workgroup_members (workgroup_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (workgroup_id, user_id) DO NOTHING",
        )
        .bind(workgroup_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    find_join_request(pool, request_id).await?.ok_or(AppError::NotFound)
}
