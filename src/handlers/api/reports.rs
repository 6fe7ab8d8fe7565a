use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::AuthContext;
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::{report, user, workgroup};
use crate::models::report::{NewReport, ReportFilter};
use crate::templates_structs::ReportResponse;

/// Load a report and wrap it with the caller's flags.
pub(crate) async fn report_response(
    pool: &PgPool,
    id: i64,
    auth: &AuthContext,
) -> Result<ReportResponse, AppError> {
    let detail = report::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
    Ok(ReportResponse::new(detail, auth.role))
}

/// GET /api/quarterly-reports?workgroup_id=..&status=..
pub async fn list(
    pool: web::Data<PgPool>,
    _auth: AuthContext,
    query: web::Query<ReportFilter>,
) -> Result<HttpResponse, AppError> {
    let reports = report::find_all(&pool, &query).await?;
    Ok(HttpResponse::Ok().json(reports))
}

/// GET /api/quarterly-reports/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let response = report_response(&pool, path.into_inner(), &auth).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/quarterly-reports - members of the workgroup and admins only.
pub async fn create(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    body: web::Json<NewReport>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner();
    validate::into_result(input.validate())?;

    if !workgroup::exists(&pool, input.workgroup_id).await? {
        return Err(AppError::Validation(format!(
            "Workgroup {} does not exist",
            input.workgroup_id
        )));
    }
    if !auth.is_admin() && !workgroup::is_member(&pool, input.workgroup_id, auth.user_id).await? {
        return Err(AppError::PermissionDenied(
            "only workgroup members can file its reports".to_string(),
        ));
    }
    let missing = user::missing_ids(&pool, &input.participant_ids).await?;
    if !missing.is_empty() {
        return Err(AppError::Validation(format!("Unknown participant ids: {missing:?}")));
    }

    let id = report::create(&pool, &input, auth.user_id).await?;
    log::info!(
        "Report {id} (Q{} {}) created for workgroup {} by user {}",
        input.quarter,
        input.year,
        input.workgroup_id,
        auth.user_id
    );
    audit::record(
        &pool,
        auth.user_id,
        "report.created",
        "quarterly_report",
        id,
        serde_json::json!({
            "workgroup_id": input.workgroup_id,
            "year": input.year,
            "quarter": input.quarter,
        }),
    )
    .await;

    let response = report_response(&pool, id, &auth).await?;
    Ok(HttpResponse::Created().json(response))
}
