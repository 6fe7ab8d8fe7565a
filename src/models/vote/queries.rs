use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use super::types::*;
use crate::errors::AppError;
use crate::models::consensus::{self, ConsensusStatus, ObjectionStatus, VoteTally, VoteType};
use crate::models::parse_column;
use crate::models::report;
use crate::models::user::UserRef;

#[derive(sqlx::FromRow)]
struct RoundRow {
    id: i64,
    round_number: i32,
    opened_by: Option<i64>,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl From<RoundRow> for VotingRound {
    fn from(r: RoundRow) -> Self {
        VotingRound {
            id: r.id,
            round_number: r.round_number,
            opened_by: r.opened_by,
            opened_at: r.opened_at,
            closed_at: r.closed_at,
        }
    }
}

/// All rounds of a report, oldest first.
pub async fn find_rounds(
    conn: &mut PgConnection,
    report_id: i64,
) -> Result<Vec<VotingRound>, AppError> {
    let rows = sqlx::query_as::<_, RoundRow>(
        "SELECT id, round_number, opened_by, opened_at, closed_at \
         FROM voting_rounds WHERE report_id = $1 ORDER BY round_number",
    )
    .bind(report_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(VotingRound::from).collect())
}

async fn find_open_round(
    conn: &mut PgConnection,
    report_id: i64,
) -> Result<Option<VotingRound>, AppError> {
    let row = sqlx::query_as::<_, RoundRow>(
        "SELECT id, round_number, opened_by, opened_at, closed_at \
         FROM voting_rounds WHERE report_id = $1 AND closed_at IS NULL",
    )
    .bind(report_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(VotingRound::from))
}

/// Close any open round and open the next one. Callers hold the report lock.
async fn start_round(
    conn: &mut PgConnection,
    report_id: i64,
    opened_by: Option<i64>,
) -> Result<VotingRound, AppError> {
    close_open_round(conn, report_id).await?;

    let row = sqlx::query_as::<_, RoundRow>(
        "INSERT INTO voting_rounds (report_id, round_number, opened_by) \
         SELECT $1, COALESCE(MAX(round_number), 0) + 1, $2 FROM voting_rounds WHERE report_id = $1 \
         RETURNING id, round_number, opened_by, opened_at, closed_at",
    )
    .bind(report_id)
    .bind(opened_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

async fn close_open_round(conn: &mut PgConnection, report_id: i64) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE voting_rounds SET closed_at = NOW() WHERE report_id = $1 AND closed_at IS NULL",
    )
    .bind(report_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Votes cast in one round, oldest first, with their objections.
pub async fn find_votes(
    conn: &mut PgConnection,
    round_id: i64,
) -> Result<Vec<ReportVote>, AppError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i64,
        round_number: i32,
        user_id: i64,
        username: String,
        display_name: String,
        vote_type: String,
        comment: String,
        objection_id: Option<i64>,
        objection_status: Option<String>,
        resolved_by: Option<i64>,
        resolved_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT v.id, r.round_number, u.id AS user_id, u.username, u.display_name, \
                v.vote_type, v.comment, \
                o.id AS objection_id, o.status AS objection_status, o.resolved_by, o.resolved_at, \
                v.created_at, v.updated_at \
         FROM report_votes v \
         JOIN voting_rounds r ON r.id = v.round_id \
         JOIN users u ON u.id = v.user_id \
         LEFT JOIN objections o ON o.vote_id = v.id \
         WHERE v.round_id = $1 \
         ORDER BY v.created_at, v.id",
    )
    .bind(round_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|r| {
            let objection = match (r.objection_id, r.objection_status) {
                (Some(id), Some(status)) => Some(Objection {
                    id,
                    status: parse_column(&status)?,
                    resolved_by: r.resolved_by,
                    resolved_at: r.resolved_at,
                }),
                _ => None,
            };
            Ok(ReportVote {
                id: r.id,
                round_number: r.round_number,
                user: UserRef {
                    id: r.user_id,
                    username: r.username,
                    display_name: r.display_name,
                },
                vote_type: parse_column(&r.vote_type)?,
                comment: r.comment,
                objection,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
        })
        .collect()
}

/// Load the votes and tally of a report.
///
/// With `round_number = None` the open round is listed, or the latest round
/// when voting is closed. An unknown round number is a `NotFound`.
pub async fn load_votes(
    pool: &PgPool,
    report_id: i64,
    round_number: Option<i32>,
) -> Result<VotesPayload, AppError> {
    let mut conn = pool.acquire().await?;

    let status: Option<(String,)> =
        sqlx::query_as("SELECT consensus_status FROM quarterly_reports WHERE id = $1")
            .bind(report_id)
            .fetch_optional(&mut *conn)
            .await?;
    let (status,) = status.ok_or(AppError::NotFound)?;
    let consensus_status: ConsensusStatus = parse_column(&status)?;

    let rounds = find_rounds(&mut conn, report_id).await?;
    let round = match round_number {
        Some(n) => Some(
            rounds
                .iter()
                .find(|r| r.round_number == n)
                .cloned()
                .ok_or(AppError::NotFound)?,
        ),
        None => rounds
            .iter()
            .find(|r| r.is_open())
            .or_else(|| rounds.last())
            .cloned(),
    };

    let votes = match &round {
        Some(r) => find_votes(&mut conn, r.id).await?,
        None => Vec::new(),
    };
    let stats = VoteTally::from_votes(votes.iter().map(|v| v.vote_type));

    Ok(VotesPayload {
        report_id,
        consensus_status,
        round,
        rounds,
        votes,
        stats,
        round_created: false,
    })
}

/// Store a member's vote on a report.
///
/// The first vote on a report without an open round opens one and moves a
/// PENDING report to IN_CONSENSUS. A second vote by the same user in the same
/// round replaces the first, unless it carries an objection that has already
/// been resolved.
pub async fn submit_vote(
    pool: &PgPool,
    report_id: i64,
    user_id: i64,
    vote_type: VoteType,
    comment: &str,
) -> Result<VoteOutcome, AppError> {
    let comment = consensus::validate_vote(vote_type, comment).map_err(AppError::Validation)?;

    let mut tx = pool.begin().await?;

    let status = report::lock_status(&mut tx, report_id).await?;
    if !status.accepts_votes() {
        return Err(AppError::Conflict(format!("Voting is closed: the report is {status}")));
    }

    let (round, round_created) = match find_open_round(&mut tx, report_id).await? {
        Some(round) => (round, false),
        None => (start_round(&mut tx, report_id, None).await?, true),
    };
    if status == ConsensusStatus::Pending {
        report::set_status(&mut tx, report_id, ConsensusStatus::InConsensus).await?;
    }

    let existing: Option<(i64, Option<i64>, Option<String>)> = sqlx::query_as(
        "SELECT v.id, o.id, o.status \
         FROM report_votes v \
         LEFT JOIN objections o ON o.vote_id = v.id \
         WHERE v.round_id = $1 AND v.user_id = $2 \
         FOR UPDATE OF v",
    )
    .bind(round.id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let vote_id = match existing {
        Some((vote_id, objection_id, objection_status)) => {
            let objection_status: Option<ObjectionStatus> =
                objection_status.as_deref().map(parse_column).transpose()?;
            if matches!(objection_status, Some(s) if s != ObjectionStatus::Pendiente) {
                return Err(AppError::Conflict(
                    "Your objection in this round has been resolved; \
                     the vote can no longer be changed"
                        .to_string(),
                ));
            }

            sqlx::query(
                "UPDATE report_votes SET vote_type = $2, comment = $3, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(vote_id)
            .bind(vote_type.as_str())
            .bind(&comment)
            .execute(&mut *tx)
            .await?;

            match (objection_id, vote_type == VoteType::Objetar) {
                (Some(objection_id), false) => {
                    sqlx::query("DELETE FROM objections WHERE id = $1")
                        .bind(objection_id)
                        .execute(&mut *tx)
                        .await?;
                }
                (None, true) => insert_objection(&mut tx, vote_id).await?,
                _ => {}
            }
            vote_id
        }
        None => {
            let (vote_id,): (i64,) = sqlx::query_as(
                "INSERT INTO report_votes (round_id, report_id, user_id, vote_type, comment) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(round.id)
            .bind(report_id)
            .bind(user_id)
            .bind(vote_type.as_str())
            .bind(&comment)
            .fetch_one(&mut *tx)
            .await?;

            if vote_type == VoteType::Objetar {
                insert_objection(&mut tx, vote_id).await?;
            }
            vote_id
        }
    };

    tx.commit().await?;

    log::info!(
        "Vote {vote_type} by user {user_id} on report {report_id} (round {}{})",
        round.round_number,
        if round_created { ", opened" } else { "" }
    );

    Ok(VoteOutcome {
        vote_id,
        round_number: round.round_number,
        round_created,
    })
}

async fn insert_objection(conn: &mut PgConnection, vote_id: i64) -> Result<(), AppError> {
    sqlx::query("INSERT INTO objections (vote_id) VALUES ($1)")
        .bind(vote_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Resolve a pending objection. Returns the id of the report it belongs to.
pub async fn resolve_objection(
    pool: &PgPool,
    objection_id: i64,
    target: ObjectionStatus,
    resolved_by: i64,
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let row: Option<(String, i64)> = sqlx::query_as(
        "SELECT o.status, v.report_id \
         FROM objections o \
         JOIN report_votes v ON v.id = o.vote_id \
         WHERE o.id = $1 \
         FOR UPDATE OF o",
    )
    .bind(objection_id)
    .fetch_optional(&mut *tx)
    .await?;
    let (status, report_id) = row.ok_or(AppError::NotFound)?;

    let current: ObjectionStatus = parse_column(&status)?;
    current.check_resolve(target).map_err(AppError::Conflict)?;

    sqlx::query(
        "UPDATE objections SET status = $2, resolved_by = $3, resolved_at = NOW() WHERE id = $1",
    )
    .bind(objection_id)
    .bind(target.as_str())
    .bind(resolved_by)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    log::info!(
        "Objection {objection_id} on report {report_id} resolved as {target} by user {resolved_by}"
    );
    Ok(report_id)
}

/// Open the next voting round on a report (admin action).
///
/// Votes of earlier rounds stay attached to their round; the new round starts
/// with an empty tally.
pub async fn open_round(
    pool: &PgPool,
    report_id: i64,
    opened_by: i64,
) -> Result<VotingRound, AppError> {
    let mut tx = pool.begin().await?;

    let status = report::lock_status(&mut tx, report_id).await?;
    if !status.can_open_round() {
        return Err(AppError::Conflict(
            "A new voting round cannot be opened on a consensed report".to_string(),
        ));
    }

    let round = start_round(&mut tx, report_id, Some(opened_by)).await?;
    report::set_status(&mut tx, report_id, ConsensusStatus::InConsensus).await?;

    tx.commit().await?;
    log::info!("Round {} opened on report {report_id} by user {opened_by}", round.round_number);
    Ok(round)
}

/// Close the consensus process with CONSENSED or REJECTED (admin action).
pub async fn mark_consensus(
    pool: &PgPool,
    report_id: i64,
    target: ConsensusStatus,
    marked_by: i64,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let status = report::lock_status(&mut tx, report_id).await?;
    status.check_mark(target).map_err(AppError::Conflict)?;

    if target == ConsensusStatus::Consensed {
        let (pending,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) \
             FROM objections o \
             JOIN report_votes v ON v.id = o.vote_id \
             JOIN voting_rounds r ON r.id = v.round_id \
             WHERE v.report_id = $1 AND r.closed_at IS NULL AND o.status = 'PENDIENTE'",
        )
        .bind(report_id)
        .fetch_one(&mut *tx)
        .await?;
        if pending > 0 {
            return Err(AppError::Conflict(format!(
                "{pending} objection(s) in the current round are still pending resolution"
            )));
        }
    }

    close_open_round(&mut tx, report_id).await?;
    report::set_status(&mut tx, report_id, target).await?;

    tx.commit().await?;
    log::info!("Report {report_id} marked {target} by user {marked_by}");
    Ok(())
}
