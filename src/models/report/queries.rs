use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::{AppError, is_unique_violation};
use crate::models::budget::{self, BudgetOwner};
use crate::models::consensus::ConsensusStatus;
use crate::models::parse_column;
use crate::models::user::UserRef;

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    workgroup_id: i64,
    workgroup_name: String,
    year: i32,
    quarter: i32,
    consensus_status: String,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for ReportSummary {
    type Error = AppError;

    fn try_from(r: SummaryRow) -> Result<Self, Self::Error> {
        Ok(ReportSummary {
            id: r.id,
            workgroup_id: r.workgroup_id,
            workgroup_name: r.workgroup_name,
            year: r.year,
            quarter: r.quarter,
            consensus_status: parse_column(&r.consensus_status)?,
            created_by: r.created_by,
            created_at: r.created_at,
        })
    }
}

/// List reports, newest period first. Filters are optional.
pub async fn find_all(
    pool: &PgPool,
    filter: &ReportFilter,
) -> Result<Vec<ReportSummary>, AppError> {
    let rows = sqlx::query_as::<_, SummaryRow>(
        "SELECT r.id, r.workgroup_id, w.name AS workgroup_name, r.year, r.quarter, \
                r.consensus_status, r.created_by, r.created_at \
         FROM quarterly_reports r \
         JOIN workgroups w ON w.id = r.workgroup_id \
         WHERE ($1::BIGINT IS NULL OR r.workgroup_id = $1) \
           AND ($2::TEXT IS NULL OR r.consensus_status = $2) \
         ORDER BY r.year DESC, r.quarter DESC, w.name",
    )
    .bind(filter.workgroup_id)
    .bind(filter.status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ReportSummary::try_from).collect()
}

pub async fn find_for_workgroup(
    pool: &PgPool,
    workgroup_id: i64,
) -> Result<Vec<ReportSummary>, AppError> {
    find_all(
        pool,
        &ReportFilter {
            workgroup_id: Some(workgroup_id),
            status: None,
        },
    )
    .await
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let (found,): (bool,) =
        sqlx::query_as("SELECT EXISTS (SELECT 1 FROM quarterly_reports WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(found)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<ReportDetail>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        workgroup_id: i64,
        workgroup_name: String,
        year: i32,
        quarter: i32,
        detail: String,
        theory_of_change: String,
        challenges: String,
        plans: String,
        consensus_status: String,
        creator_id: i64,
        creator_username: String,
        creator_display_name: String,
        current_round: Option<i32>,
        round_count: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    let mut conn = pool.acquire().await?;

    let row = sqlx::query_as::<_, Row>(
        "SELECT r.id, r.workgroup_id, w.name AS workgroup_name, r.year, r.quarter, \
                r.detail, r.theory_of_change, r.challenges, r.plans, r.consensus_status, \
                u.id AS creator_id, u.username AS creator_username, \
                u.display_name AS creator_display_name, \
                (SELECT vr.round_number FROM voting_rounds vr \
                  WHERE vr.report_id = r.id AND vr.closed_at IS NULL) AS current_round, \
                (SELECT COUNT(*) FROM voting_rounds vr WHERE vr.report_id = r.id) AS round_count, \
                r.created_at, r.updated_at \
         FROM quarterly_reports r \
         JOIN workgroups w ON w.id = r.workgroup_id \
         JOIN users u ON u.id = r.created_by \
         WHERE r.id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(r) = row else {
        return Ok(None);
    };

    let participants = sqlx::query_as::<_, UserRef>(
        "SELECT u.id, u.username, u.display_name \
         FROM report_participants p \
         JOIN users u ON u.id = p.user_id \
         WHERE p.report_id = $1 \
         ORDER BY u.username",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let budget = budget::find_for(&mut conn, BudgetOwner::Report(id)).await?;

    Ok(Some(ReportDetail {
        id: r.id,
        workgroup_id: r.workgroup_id,
        workgroup_name: r.workgroup_name,
        year: r.year,
        quarter: r.quarter,
        detail: r.detail,
        theory_of_change: r.theory_of_change,
        challenges: r.challenges,
        plans: r.plans,
        consensus_status: parse_column(&r.consensus_status)?,
        created_by: UserRef {
            id: r.creator_id,
            username: r.creator_username,
            display_name: r.creator_display_name,
        },
        participants,
        budget,
        current_round: r.current_round,
        round_count: r.round_count,
        created_at: r.created_at,
        updated_at: r.updated_at,
    }))
}

/// Create a report with its participants and budget items. Returns the new id.
pub async fn create(pool: &PgPool, input: &NewReport, created_by: i64) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let inserted: Result<(i64,), sqlx::Error> = sqlx::query_as(
        "INSERT INTO quarterly_reports \
            (workgroup_id, year, quarter, detail, theory_of_change, challenges, plans, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
    )
    .bind(input.workgroup_id)
    .bind(input.year)
    .bind(input.quarter)
    .bind(input.detail.trim())
    .bind(input.theory_of_change.trim())
    .bind(input.challenges.trim())
    .bind(input.plans.trim())
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await;

    let report_id = match inserted {
        Ok((id,)) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict(format!(
                "A report for Q{} {} already exists for this workgroup",
                input.quarter, input.year
            )));
        }
        Err(e) => return Err(e.into()),
    };

    sqlx::query(
        "INSERT INTO report_participants (report_id, user_id) \
         SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
    )
    .bind(report_id)
    .bind(input.participant_ids.as_slice())
    .execute(&mut *tx)
    .await?;

    budget::replace_for(&mut tx, BudgetOwner::Report(report_id), &input.budget_items).await?;

    tx.commit().await?;
    Ok(report_id)
}

/// Read the report's status while holding a row lock for the rest of the transaction.
pub async fn lock_status(
    conn: &mut PgConnection,
    report_id: i64,
) -> Result<ConsensusStatus, AppError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT consensus_status FROM quarterly_reports WHERE id = $1 FOR UPDATE",
    )
    .bind(report_id)
    .fetch_optional(&mut *conn)
    .await?;
    let (status,) = row.ok_or(AppError::NotFound)?;
    parse_column(&status)
}

pub async fn set_status(
    conn: &mut PgConnection,
    report_id: i64,
    status: ConsensusStatus,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE quarterly_reports SET consensus_status = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(report_id)
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
