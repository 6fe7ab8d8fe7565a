use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use super::reports::report_response;
use crate::audit;
use crate::auth::session::AuthContext;
use crate::errors::AppError;
use crate::models::consensus::ConsensusStatus;
use crate::models::vote::{self, SubmitVote};

#[derive(Deserialize)]
pub struct RoundQuery {
    pub round: Option<i32>,
}

#[derive(Deserialize)]
pub struct ConsensusStatusRequest {
    pub status: ConsensusStatus,
}

/// GET /api/reports/{id}/votes?round=N - votes and tally of a round.
pub async fn list(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<RoundQuery>,
) -> Result<HttpResponse, AppError> {
    let payload = vote::load_votes(&pool, path.into_inner(), query.round).await?;
    Ok(HttpResponse::Ok().json(payload))
}

/// POST /api/reports/{id}/votes - cast or replace the caller's vote.
pub async fn cast(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<SubmitVote>,
) -> Result<HttpResponse, AppError> {
    let report_id = path.into_inner();
    let outcome =
        vote::submit_vote(&pool, report_id, auth.user_id, body.vote_type, &body.comment).await?;

    audit::record(
        &pool,
        auth.user_id,
        "vote.cast",
        "quarterly_report",
        report_id,
        serde_json::json!({"vote_type": body.vote_type, "round": outcome.round_number}),
    )
    .await;

    let mut payload = vote::load_votes(&pool, report_id, None).await?;
    payload.round_created = outcome.round_created;
    Ok(HttpResponse::Ok().json(payload))
}

/// POST /api/reports/{id}/rounds (admin)
pub async fn open_round(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let report_id = path.into_inner();
    let round = vote::open_round(&pool, report_id, auth.user_id).await?;

    audit::record(
        &pool,
        auth.user_id,
        "round.opened",
        "quarterly_report",
        report_id,
        serde_json::json!({"round": round.round_number}),
    )
    .await;

    let mut payload = vote::load_votes(&pool, report_id, None).await?;
    payload.round_created = true;
    Ok(HttpResponse::Created().json(payload))
}

/// PUT /api/reports/{id}/consensus-status (admin) - CONSENSED or REJECTED.
pub async fn set_consensus_status(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<ConsensusStatusRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let report_id = path.into_inner();
    vote::mark_consensus(&pool, report_id, body.status, auth.user_id).await?;

    audit::record(
        &pool,
        auth.user_id,
        "consensus.marked",
        "quarterly_report",
        report_id,
        serde_json::json!({"status": body.status}),
    )
    .await;

    let response = report_response(&pool, report_id, &auth).await?;
    Ok(HttpResponse::Ok().json(response))
}
