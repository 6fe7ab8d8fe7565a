use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::AuthContext;
use crate::auth::validate;
use crate::errors::AppError;
use crate::handlers::today;
use crate::models::consensus::ProposalStatus;
use crate::models::proposal::{self, NewProposal, ProposalDetail, ProposalUpdate};
use crate::models::vote::SubmitVote;
use crate::models::workgroup;

#[derive(Deserialize)]
pub struct ProposalQuery {
    pub status: Option<ProposalStatus>,
}

pub(crate) async fn load(pool: &PgPool, id: i64) -> Result<ProposalDetail, AppError> {
    proposal::find_by_id(pool, id, today()).await?.ok_or(AppError::NotFound)
}

/// Creator or admin, else 403. 404 when the proposal does not exist.
pub(crate) async fn require_owner_or_admin(
    pool: &PgPool,
    auth: &AuthContext,
    id: i64,
) -> Result<(), AppError> {
    let creator = proposal::find_creator(pool, id).await?.ok_or(AppError::NotFound)?;
    if creator == auth.user_id || auth.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(
            "only the creator or an admin can change this proposal".to_string(),
        ))
    }
}

async fn check_workgroups(pool: &PgPool, ids: &[i64]) -> Result<(), AppError> {
    let missing = workgroup::missing_ids(pool, ids).await?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Unknown workgroup ids: {missing:?}")))
    }
}

/// GET /api/proposals?status=..
pub async fn list(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    query: web::Query<ProposalQuery>,
) -> Result<HttpResponse, AppError> {
    let items = proposal::find_all(&pool, query.status, today()).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// GET /api/proposals/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(load(&pool, path.into_inner()).await?))
}

/// POST /api/proposals
pub async fn create(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    body: web::Json<NewProposal>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner();
    validate::into_result(input.validate(today()))?;
    check_workgroups(&pool, &input.workgroup_ids).await?;

    let id = proposal::create(&pool, &input, auth.user_id).await?;
    log::info!("Proposal {id} created by user {}", auth.user_id);
    audit::record(
        &pool,
        auth.user_id,
        "proposal.created",
        "proposal",
        id,
        serde_json::json!({"title": input.title.trim()}),
    )
    .await;

    Ok(HttpResponse::Created().json(load(&pool, id).await?))
}

/// PATCH /api/proposals/{id}
///
/// Content changes: creator or admin. Status changes: admin only.
pub async fn update(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<ProposalUpdate>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let changes = body.into_inner();

    require_owner_or_admin(&pool, &auth, id).await?;
    if changes.status.is_some() {
        auth.require_admin()?;
    }
    validate::into_result(changes.validate())?;
    if let Some(ids) = &changes.workgroup_ids {
        check_workgroups(&pool, ids).await?;
    }

    proposal::update(&pool, id, &changes, today()).await?;
    if let Some(status) = changes.status {
        log::info!("Proposal {id} moved to {status} by user {}", auth.user_id);
    }
    audit::record(
        &pool,
        auth.user_id,
        "proposal.updated",
        "proposal",
        id,
        serde_json::json!({"status": changes.status, "content": changes.changes_content()}),
    )
    .await;

    Ok(HttpResponse::Ok().json(load(&pool, id).await?))
}

/// POST /api/proposals/{id}/vote
pub async fn vote(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<SubmitVote>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    proposal::cast_vote(&pool, id, auth.user_id, body.vote_type, &body.comment, today()).await?;
    audit::record(
        &pool,
        auth.user_id,
        "proposal.voted",
        "proposal",
        id,
        serde_json::json!({"vote_type": body.vote_type}),
    )
    .await;
    Ok(HttpResponse::Ok().json(load(&pool, id).await?))
}
