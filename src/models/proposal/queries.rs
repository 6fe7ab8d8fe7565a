use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::AppError;
use crate::models::attachment;
use crate::models::budget::{self, BudgetOwner};
use crate::models::consensus::{self, ProposalStatus, VoteTally, VoteType};
use crate::models::parse_column;
use crate::models::user::UserRef;

/// List proposals, newest first. `status` filters on the displayed (deadline-aware) status.
pub async fn find_all(
    pool: &PgPool,
    status: Option<ProposalStatus>,
    today: NaiveDate,
) -> Result<Vec<ProposalSummary>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        title: String,
        status: String,
        expires_at: Option<NaiveDate>,
        creator_id: i64,
        creator_username: String,
        creator_display_name: String,
        vote_count: i64,
        created_at: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT p.id, p.title, p.status, p.expires_at, \
                u.id AS creator_id, u.username AS creator_username, \
                u.display_name AS creator_display_name, \
                (SELECT COUNT(*) FROM proposal_votes v WHERE v.proposal_id = p.id) AS vote_count, \
                p.created_at \
         FROM proposals p \
         JOIN users u ON u.id = p.created_by \
         ORDER BY p.created_at DESC, p.id DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for r in rows {
        let stored: ProposalStatus = parse_column(&r.status)?;
        let effective = consensus::effective_proposal_status(stored, r.expires_at, today);
        if status.is_some_and(|wanted| wanted != effective) {
            continue;
        }
        items.push(ProposalSummary {
            id: r.id,
            title: r.title,
            status: effective,
            expires_at: r.expires_at,
            created_by: UserRef {
                id: r.creator_id,
                username: r.creator_username,
                display_name: r.creator_display_name,
            },
            vote_count: r.vote_count,
            created_at: r.created_at,
        });
    }
    Ok(items)
}

pub async fn find_by_id(
    pool: &PgPool,
    id: i64,
    today: NaiveDate,
) -> Result<Option<ProposalDetail>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        title: String,
        description: String,
        status: String,
        expires_at: Option<NaiveDate>,
        links: Vec<String>,
        creator_id: i64,
        creator_username: String,
        creator_display_name: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    let mut conn = pool.acquire().await?;

    let row = sqlx::query_as::<_, Row>(
        "SELECT p.id, p.title, p.description, p.status, p.expires_at, p.links, \
                u.id AS creator_id, u.username AS creator_username, \
                u.display_name AS creator_display_name, \
                p.created_at, p.updated_at \
         FROM proposals p \
         JOIN users u ON u.id = p.created_by \
         WHERE p.id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(r) = row else {
        return Ok(None);
    };

    let workgroups = sqlx::query_as::<_, WorkgroupRef>(
        "SELECT w.id, w.name FROM proposal_workgroups pw \
         JOIN workgroups w ON w.id = pw.workgroup_id \
         WHERE pw.proposal_id = $1 ORDER BY w.name",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let votes = find_votes(&mut conn, id).await?;
    let stats = VoteTally::from_votes(votes.iter().map(|v| v.vote_type));
    let budget = budget::find_for(&mut conn, BudgetOwner::Proposal(id)).await?;
    let attachment = attachment::find_for_proposal(&mut conn, id).await?;

    let stored: ProposalStatus = parse_column(&r.status)?;

    Ok(Some(ProposalDetail {
        id: r.id,
        title: r.title,
        description: r.description,
        status: consensus::effective_proposal_status(stored, r.expires_at, today),
        expires_at: r.expires_at,
        links: r.links,
        workgroups,
        budget,
        attachment,
        created_by: UserRef {
            id: r.creator_id,
            username: r.creator_username,
            display_name: r.creator_display_name,
        },
        votes,
        stats,
        can_vote: consensus::proposal_can_vote(stored, r.expires_at, today),
        created_at: r.created_at,
        updated_at: r.updated_at,
    }))
}

async fn find_votes(
    conn: &mut PgConnection,
    proposal_id: i64,
) -> Result<Vec<ProposalVote>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        user_id: i64,
        username: String,
        display_name: String,
        vote_type: String,
        comment: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT v.id, u.id AS user_id, u.username, u.display_name, v.vote_type, v.comment, \
                v.created_at, v.updated_at \
         FROM proposal_votes v \
         JOIN users u ON u.id = v.user_id \
         WHERE v.proposal_id = $1 \
         ORDER BY v.created_at, v.id",
    )
    .bind(proposal_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(ProposalVote {
                id: r.id,
                user: UserRef {
                    id: r.user_id,
                    username: r.username,
                    display_name: r.display_name,
                },
                vote_type: parse_column(&r.vote_type)?,
                comment: r.comment,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
        })
        .collect()
}

/// The creator of a proposal, or `None` if it does not exist.
pub async fn find_creator(pool: &PgPool, id: i64) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT created_by FROM proposals WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

/// Create a proposal in IN_REVIEW. Returns the new id.
pub async fn create(pool: &PgPool, input: &NewProposal, created_by: i64) -> Result<i64, AppError> {
    let links: Vec<String> = input.links.iter().map(|l| l.trim().to_string()).collect();

    let mut tx = pool.begin().await?;

    let (proposal_id,): (i64,) = sqlx::query_as(
        "INSERT INTO proposals (title, description, expires_at, links, created_by) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(input.title.trim())
    .bind(input.description.trim())
    .bind(input.expires_at)
    .bind(links.as_slice())
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    set_workgroups(&mut tx, proposal_id, &input.workgroup_ids).await?;
    budget::replace_for(&mut tx, BudgetOwner::Proposal(proposal_id), &input.budget_items).await?;

    tx.commit().await?;
    Ok(proposal_id)
}

async fn set_workgroups(
    conn: &mut PgConnection,
    proposal_id: i64,
    workgroup_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM proposal_workgroups WHERE proposal_id = $1")
        .bind(proposal_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT INTO proposal_workgroups (proposal_id, workgroup_id) \
         SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
    )
    .bind(proposal_id)
    .bind(workgroup_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Apply a partial update.
///
/// Content fields may only change while the proposal is in review. A status
/// change is checked against the deadline-aware current status. Permission
/// checks belong to the caller.
pub async fn update(
    pool: &PgPool,
    id: i64,
    changes: &ProposalUpdate,
    today: NaiveDate,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let row: Option<(String, Option<NaiveDate>)> =
        sqlx::query_as("SELECT status, expires_at FROM proposals WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (stored, expires_at) = row.ok_or(AppError::NotFound)?;
    let stored: ProposalStatus = parse_column(&stored)?;
    let current = consensus::effective_proposal_status(stored, expires_at, today);

    if changes.changes_content() && current != ProposalStatus::InReview {
        return Err(AppError::Conflict(format!(
            "A proposal that is {current} can no longer be edited"
        )));
    }

    if let Some(title) = &changes.title {
        sqlx::query("UPDATE proposals SET title = $2 WHERE id = $1")
            .bind(id)
            .bind(title.trim())
            .execute(&mut *tx)
            .await?;
    }
    if let Some(description) = &changes.description {
        sqlx::query("UPDATE proposals SET description = $2 WHERE id = $1")
            .bind(id)
            .bind(description.trim())
            .execute(&mut *tx)
            .await?;
    }
    if let Some(expires_at) = changes.expires_at {
        sqlx::query("UPDATE proposals SET expires_at = $2 WHERE id = $1")
            .bind(id)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(links) = &changes.links {
        let links: Vec<String> = links.iter().map(|l| l.trim().to_string()).collect();
        sqlx::query("UPDATE proposals SET links = $2 WHERE id = $1")
            .bind(id)
            .bind(links.as_slice())
            .execute(&mut *tx)
            .await?;
    }
    if let Some(workgroup_ids) = &changes.workgroup_ids {
        set_workgroups(&mut tx, id, workgroup_ids).await?;
    }
    if let Some(items) = &changes.budget_items {
        budget::replace_for(&mut tx, BudgetOwner::Proposal(id), items).await?;
    }
    if let Some(target) = changes.status {
        current.check_transition(target).map_err(AppError::Conflict)?;
        sqlx::query("UPDATE proposals SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(target.as_str())
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("UPDATE proposals SET updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Store a member's vote on a proposal, replacing any earlier vote by the same user.
pub async fn cast_vote(
    pool: &PgPool,
    proposal_id: i64,
    user_id: i64,
    vote_type: VoteType,
    comment: &str,
    today: NaiveDate,
) -> Result<(), AppError> {
    let comment = consensus::validate_vote(vote_type, comment).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;

    let row: Option<(String, Option<NaiveDate>)> =
        sqlx::query_as("SELECT status, expires_at FROM proposals WHERE id = $1 FOR SHARE")
            .bind(proposal_id)
            .fetch_optional(&mut *tx)
            .await?;
    let (status, expires_at) = row.ok_or(AppError::NotFound)?;
    let status: ProposalStatus = parse_column(&status)?;

    if !consensus::proposal_can_vote(status, expires_at, today) {
        let shown = consensus::effective_proposal_status(status, expires_at, today);
        return Err(AppError::Conflict(format!("Voting is closed: the proposal is {shown}")));
    }

    sqlx::query(
        "INSERT INTO proposal_votes (proposal_id, user_id, vote_type, comment) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (proposal_id, user_id) \
         DO UPDATE SET vote_type = EXCLUDED.vote_type, comment = EXCLUDED.comment, \
                       updated_at = NOW()",
    )
    .bind(proposal_id)
    .bind(user_id)
    .bind(vote_type.as_str())
    .bind(&comment)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!("Vote {vote_type} by user {user_id} on proposal {proposal_id}");
    Ok(())
}

/// Move every IN_REVIEW proposal whose deadline has passed to EXPIRED. Returns their ids.
pub async fn expire_overdue(pool: &PgPool, today: NaiveDate) -> Result<Vec<i64>, AppError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "UPDATE proposals SET status = 'EXPIRED', updated_at = NOW() \
         WHERE status = 'IN_REVIEW' AND expires_at IS NOT NULL AND expires_at < $1 \
         RETURNING id",
    )
    .bind(today)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
