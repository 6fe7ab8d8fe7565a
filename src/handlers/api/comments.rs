use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::AuthContext;
use crate::errors::AppError;
use crate::models::comment::{self, CommentTarget, NewComment, ReactionKind};
use crate::models::{proposal, report};
use crate::templates_structs::ThreadResponse;

async fn ensure_target_exists(pool: &PgPool, target: CommentTarget) -> Result<(), AppError> {
    let found = match target {
        CommentTarget::Report(id) => report::exists(pool, id).await?,
        CommentTarget::Proposal(id) => proposal::find_creator(pool, id).await?.is_some(),
    };
    if found { Ok(()) } else { Err(AppError::NotFound) }
}

async fn thread(pool: &PgPool, target: CommentTarget) -> Result<HttpResponse, AppError> {
    let comments = comment::find_thread(pool, target).await?;
    Ok(HttpResponse::Ok().json(ThreadResponse { target, comments }))
}

async fn list(pool: &PgPool, target: CommentTarget) -> Result<HttpResponse, AppError> {
    ensure_target_exists(pool, target).await?;
    thread(pool, target).await
}

async fn create(
    pool: &PgPool,
    auth: &AuthContext,
    target: CommentTarget,
    input: &NewComment,
) -> Result<HttpResponse, AppError> {
    ensure_target_exists(pool, target).await?;
    let id = comment::create(pool, target, auth.user_id, input).await?;
    audit::record(
        pool,
        auth.user_id,
        "comment.created",
        "comment",
        id,
        serde_json::json!({"target": target, "parent_id": input.parent_id}),
    )
    .await;
    thread(pool, target).await
}

/// GET /api/reports/{id}/comments
pub async fn list_for_report(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    list(&pool, CommentTarget::Report(path.into_inner())).await
}

/// POST /api/reports/{id}/comments
pub async fn create_for_report(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<NewComment>,
) -> Result<HttpResponse, AppError> {
    create(&pool, &auth, CommentTarget::Report(path.into_inner()), &body).await
}

/// GET /api/proposals/{id}/comment
pub async fn list_for_proposal(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    list(&pool, CommentTarget::Proposal(path.into_inner())).await
}

/// POST /api/proposals/{id}/comment
pub async fn create_for_proposal(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
    body: web::Json<NewComment>,
) -> Result<HttpResponse, AppError> {
    create(&pool, &auth, CommentTarget::Proposal(path.into_inner()), &body).await
}

async fn react(
    pool: &PgPool,
    auth: &AuthContext,
    comment_id: i64,
    kind: ReactionKind,
) -> Result<HttpResponse, AppError> {
    let (target, _) = comment::find_target(pool, comment_id).await?.ok_or(AppError::NotFound)?;
    comment::toggle_reaction(pool, comment_id, auth.user_id, kind).await?;
    thread(pool, target).await
}

/// POST /api/comments/{id}/like
pub async fn like(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    react(&pool, &auth, path.into_inner(), ReactionKind::Like).await
}

/// POST /api/comments/{id}/dislike
pub async fn dislike(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    react(&pool, &auth, path.into_inner(), ReactionKind::Dislike).await
}

/// DELETE /api/comments/{id} - the author or an admin.
pub async fn delete(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let comment_id = path.into_inner();
    let (target, author_id) = comment::find_target(&pool, comment_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if author_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::PermissionDenied(
            "only the author or an admin can delete a comment".to_string(),
        ));
    }

    comment::delete(&pool, comment_id).await?;
    audit::record(
        &pool,
        auth.user_id,
        "comment.deleted",
        "comment",
        comment_id,
        serde_json::json!({"target": target}),
    )
    .await;
    thread(&pool, target).await
}
