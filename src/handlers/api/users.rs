use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::audit;
use crate::auth::session::AuthContext;
use crate::auth::{password, validate};
use crate::errors::AppError;
use crate::models::user::{self, NewUser, Role};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Member
}

/// GET /api/users (admin)
pub async fn list(pool: web::Data<PgPool>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let users = user::find_all(&pool).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// POST /api/users (admin)
pub async fn create(
    pool: web::Data<PgPool>,
    auth: AuthContext,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    if body.role == Role::SuperAdmin && auth.role != Role::SuperAdmin {
        return Err(AppError::PermissionDenied(
            "only a super admin can create super admins".to_string(),
        ));
    }

    let mut errors = Vec::new();
    errors.extend(validate::validate_username(&body.username));
    errors.extend(validate::validate_email(&body.email));
    errors.extend(validate::validate_optional(&body.display_name, "Display name", 100));
    errors.extend(validate::validate_password(&body.password));
    validate::into_result(errors)?;

    let display_name = match body.display_name.trim() {
        "" => body.username.trim().to_string(),
        name => name.to_string(),
    };
    let id = user::create(
        &pool,
        &NewUser {
            username: body.username.trim().to_string(),
            email: body.email.trim().to_string(),
            display_name,
            password_hash: password::hash_password(&body.password)?,
            role: body.role,
        },
    )
    .await?;

    audit::record(
        &pool,
        auth.user_id,
        "user.created",
        "user",
        id,
        serde_json::json!({"role": body.role}),
    )
    .await;

    let created = user::find_display_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Created().json(created))
}
