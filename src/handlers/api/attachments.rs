use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use super::proposals::{load, require_owner_or_admin};
use crate::audit;
use crate::auth::session::AuthContext;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::attachment::{self, NewAttachment};
use crate::storage::{BlobStore, LocalBlobStore};
use crate::templates_structs::SignedUrlResponse;

const SIGNED_URL_TTL_MINUTES: i64 = 60;

#[derive(Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// POST /api/proposals/{id}/attachment?filename=..
///
/// The request body is the file itself. Replaces any earlier attachment.
pub async fn upload(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    store: web::Data<LocalBlobStore>,
    config: web::Data<AppConfig>,
    auth: AuthContext,
    path: web::Path<i64>,
    query: web::Query<UploadQuery>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let proposal_id = path.into_inner();
    require_owner_or_admin(&pool, &auth, proposal_id).await?;

    let filename = query.filename.trim();
    if filename.is_empty() {
        return Err(AppError::Validation("filename is required".to_string()));
    }

    let bytes = payload
        .to_bytes_limited(config.max_upload_bytes)
        .await
        .map_err(|_| AppError::PayloadTooLarge)?
        .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();

    let url = store.upload_file(&bytes, filename, &content_type).await?;
    let record = NewAttachment {
        proposal_id,
        url: url.clone(),
        filename: filename.to_string(),
        content_type,
        size_bytes: bytes.len() as i64,
        uploaded_by: auth.user_id,
    };
    let previous = match attachment::replace(&pool, &record).await {
        Ok(previous) => previous,
        Err(e) => {
            // Do not leave an orphaned blob behind.
            if let Err(cleanup) = store.delete_file(&url).await {
                log::warn!("Could not remove orphaned blob {url}: {cleanup}");
            }
            return Err(e);
        }
    };
    if let Some(old) = previous {
        if let Err(e) = store.delete_file(&old.url).await {
            log::warn!("Could not remove replaced blob {}: {e}", old.url);
        }
    }

    log::info!(
        "Attachment {filename} ({} bytes) stored for proposal {proposal_id}",
        record.size_bytes
    );
    audit::record(
        &pool,
        auth.user_id,
        "attachment.uploaded",
        "proposal",
        proposal_id,
        serde_json::json!({"filename": filename, "size_bytes": record.size_bytes}),
    )
    .await;

    Ok(HttpResponse::Created().json(load(&pool, proposal_id).await?))
}

/// DELETE /api/proposals/{id}/attachment
pub async fn delete(
    pool: web::Data<PgPool>,
    store: web::Data<LocalBlobStore>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let proposal_id = path.into_inner();
    require_owner_or_admin(&pool, &auth, proposal_id).await?;

    let removed = attachment::delete_for_proposal(&pool, proposal_id)
        .await?
        .ok_or(AppError::NotFound)?;
    store.delete_file(&removed.url).await?;

    audit::record(
        &pool,
        auth.user_id,
        "attachment.deleted",
        "proposal",
        proposal_id,
        serde_json::json!({"filename": removed.filename}),
    )
    .await;

    Ok(HttpResponse::Ok().json(load(&pool, proposal_id).await?))
}

/// GET /api/proposals/{id}/attachment/url
pub async fn signed_url(
    pool: web::Data<PgPool>,
    store: web::Data<LocalBlobStore>,
    _auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let proposal_id = path.into_inner();
    let mut conn = pool.acquire().await?;
    let found = attachment::find_for_proposal(&mut conn, proposal_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let url = store.get_signed_url(&found.url, SIGNED_URL_TTL_MINUTES)?;
    Ok(HttpResponse::Ok().json(SignedUrlResponse {
        url,
        filename: found.filename,
        expires_in_minutes: SIGNED_URL_TTL_MINUTES,
    }))
}
