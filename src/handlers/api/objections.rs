use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::AuthContext;
use crate::errors::AppError;
use crate::models::consensus::ObjectionStatus;
use crate::models::vote;

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub status: ObjectionStatus,
}

/// PUT /api/objections/{id}/status (admin) - VALIDA or INVALIDA, once.
pub async fn resolve(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<ResolveRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let objection_id = path.into_inner();
    let report_id = vote::resolve_objection(&pool, objection_id, body.status, auth.user_id).await?;

    audit::record(
        &pool,
        auth.user_id,
        "objection.resolved",
        "objection",
        objection_id,
        serde_json::json!({"status": body.status, "report_id": report_id}),
    )
    .await;

    let payload = vote::load_votes(&pool, report_id, None).await?;
    Ok(HttpResponse::Ok().json(payload))
}
