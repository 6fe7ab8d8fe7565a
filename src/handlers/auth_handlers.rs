use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::PgPool;

use super::see_other;
use crate::auth::{csrf, password, session};
use crate::errors::{AppError, render};
use crate::models::user::{self, User};
use crate::templates_structs::{APP_NAME, LoginTemplate};

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    pub csrf_token: String,
}

/// Look up a user and check the password. `None` for unknown user or wrong password.
pub(crate) async fn authenticate(
    pool: &PgPool,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(found) = user::find_by_username(pool, username.trim()).await? else {
        return Ok(None);
    };
    if password::verify_password(password, &found.password_hash)? {
        Ok(Some(found))
    } else {
        Ok(None)
    }
}

fn login_form(session: &Session, error: Option<String>) -> Result<HttpResponse, AppError> {
    let csrf_token = csrf::get_or_create_token(session)?;
    render(LoginTemplate {
        error,
        app_name: APP_NAME.to_string(),
        csrf_token,
    })
}

pub async fn login_page(session: Session) -> Result<HttpResponse, AppError> {
    if session::has_user(&session) {
        return Ok(see_other("/dashboard"));
    }
    login_form(&session, None)
}

pub async fn login_submit(
    pool: web::Data<PgPool>,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;

    match authenticate(&pool, &form.username, &form.password).await? {
        Some(u) => {
            session::sign_in(&session, &u)?;
            log::info!("User {} signed in", u.username);
            Ok(see_other("/dashboard"))
        }
        None => {
            log::info!("Failed sign-in attempt for '{}'", form.username.trim());
            login_form(&session, Some("Invalid username or password".to_string()))
        }
    }
}

pub async fn logout(session: Session, form: web::Form<CsrfOnly>) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    session.purge();
    Ok(see_other("/login"))
}
