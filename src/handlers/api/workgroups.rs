use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::AuthContext;
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::workgroup::{self, JoinRequestStatus, MemberRole, NewWorkgroup};
use crate::models::{report, user};

#[derive(Deserialize)]
pub struct JoinRequestBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
pub struct ResolveJoinRequest {
    pub status: JoinRequestStatus,
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub user_id: i64,
    #[serde(default = "default_member_role")]
    pub role: MemberRole,
}

fn default_member_role() -> MemberRole {
    MemberRole::Member
}

async fn ensure_exists(pool: &PgPool, id: i64) -> Result<(), AppError> {
    if workgroup::exists(pool, id).await? { Ok(()) } else { Err(AppError::NotFound) }
}

/// GET /api/workgroups
pub async fn list(pool: web::Data<PgPool>, _auth: AuthContext) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(workgroup::find_all(&pool).await?))
}

/// POST /api/workgroups (admin)
pub async fn create(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    body: web::Json<NewWorkgroup>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let mut errors = Vec::new();
    errors.extend(validate::validate_required(&body.name, "Name", 200));
    errors.extend(validate::validate_optional(&body.description, "Description", 5000));
    errors.extend(validate::validate_optional(&body.mission, "Mission", 5000));
    validate::into_result(errors)?;

    let id = workgroup::create(&pool, &body).await?;
    log::info!("Workgroup {id} '{}' created by user {}", body.name.trim(), auth.user_id);
    audit::record(
        &pool,
        auth.user_id,
        "workgroup.created",
        "workgroup",
        id,
        serde_json::json!({"name": body.name.trim()}),
    )
    .await;

    let created = workgroup::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/workgroups/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let found = workgroup::find_by_id(&pool, path.into_inner()).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(found))
}

/// GET /api/workgroups/{id}/members
pub async fn members(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_exists(&pool, id).await?;
    Ok(HttpResponse::Ok().json(workgroup::find_members(&pool, id).await?))
}

/// GET /api/workgroups/{id}/join-request - the caller's latest request, or null.
pub async fn own_join_request(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_exists(&pool, id).await?;
    let found = workgroup::find_latest_join_request(&pool, id, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// POST /api/workgroups/{id}/join-request
pub async fn file_join_request(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<JoinRequestBody>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_exists(&pool, id).await?;
    let errors = validate::validate_optional(&body.message, "Message", 2000);
    validate::into_result(errors.into_iter().collect())?;

    let request_id = workgroup::create_join_request(&pool, id, auth.user_id, &body.message).await?;
    log::info!("User {} asked to join workgroup {id}", auth.user_id);
    audit::record(
        &pool,
        auth.user_id,
        "join_request.created",
        "workgroup",
        id,
        serde_json::json!({"request_id": request_id}),
    )
    .await;

    let created = workgroup::find_join_request(&pool, request_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/workgroups/{id}/join-requests (admin) - pending requests.
pub async fn pending_join_requests(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    ensure_exists(&pool, id).await?;
    Ok(HttpResponse::Ok().json(workgroup::find_pending_join_requests(&pool, id).await?))
}

/// PUT /api/join-requests/{id} (admin) - APPROVED or REJECTED.
pub async fn resolve_join_request(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<ResolveJoinRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let approve = match body.status {
        JoinRequestStatus::Approved => true,
        JoinRequestStatus::Rejected => false,
        JoinRequestStatus::Pending => {
            return Err(AppError::Validation("status must be APPROVED or REJECTED".to_string()));
        }
    };

    let request_id = path.into_inner();
    let resolved = workgroup::resolve_join_request(&pool, request_id, approve, auth.user_id).await?;
    log::info!(
        "Join request {request_id} for workgroup {} {}",
        resolved.workgroup_id,
        resolved.status.as_str().to_lowercase()
    );
    audit::record(
        &pool,
        auth.user_id,
        "join_request.resolved",
        "workgroup",
        resolved.workgroup_id,
        serde_json::json!({"request_id": request_id, "status": resolved.status}),
    )
    .await;

    Ok(HttpResponse::Ok().json(resolved))
}

/// GET /api/workgroups/{id}/quarterly-reports
pub async fn reports(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_exists(&pool, id).await?;
    Ok(HttpResponse::Ok().json(report::find_for_workgroup(&pool, id).await?))
}

/// POST /api/workgroups/{id}/add-member - admins and workgroup leaders.
///
/// Adding an existing member changes nothing. Returns the member list.
pub async fn add_member(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    ensure_exists(&pool, id).await?;

    if !auth.is_admin() {
        let role = workgroup::member_role(&pool, id, auth.user_id).await?;
        if role != Some(MemberRole::Leader) {
            return Err(AppError::PermissionDenied(
                "only admins and workgroup leaders can add members".to_string(),
            ));
        }
    }
    if user::find_by_id(&pool, body.user_id).await?.is_none() {
        return Err(AppError::Validation(format!("User {} does not exist", body.user_id)));
    }

    let added = workgroup::add_member(&pool, id, body.user_id, body.role, auth.user_id).await?;
    if added {
        log::info!(
            "User {} added to workgroup {id} as {} by user {}",
            body.user_id,
            body.role,
            auth.user_id
        );
        audit::record(
            &pool,
            auth.user_id,
            "member.added",
            "workgroup",
            id,
            serde_json::json!({"user_id": body.user_id, "role": body.role}),
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(workgroup::find_members(&pool, id).await?))
}
