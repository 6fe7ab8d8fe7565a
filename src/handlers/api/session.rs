use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::session::{self, AuthContext};
use crate::errors::AppError;
use crate::handlers::auth_handlers::authenticate;
use crate::models::user;
use crate::templates_structs::SessionResponse;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// GET /api/session - the signed-in user.
pub async fn current(pool: web::Data<PgPool>, auth: AuthContext) -> Result<HttpResponse, AppError> {
    // A session can outlive its user row.
    let u = user::find_by_id(&pool, auth.user_id).await?.ok_or(AppError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(SessionResponse::from(&u)))
}

/// POST /api/session - JSON login.
pub async fn login(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let u = authenticate(&pool, &body.username, &body.password)
        .await?
        .ok_or(AppError::Unauthorized)?;
    session::sign_in(&session, &u)?;
    log::info!("User {} signed in via API", u.username);
    Ok(HttpResponse::Ok().json(SessionResponse::from(&u)))
}

/// DELETE /api/session
pub async fn logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}
