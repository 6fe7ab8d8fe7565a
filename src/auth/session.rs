use std::future::{Ready, ready};

use actix_session::{Session, SessionExt};
use actix_web::{FromRequest, HttpRequest, dev::Payload};

use crate::errors::AppError;
use crate::models::user::{Role, User};

const USER_ID: &str = "user_id";
const USERNAME: &str = "username";
const ROLE: &str = "role";

/// The signed-in user, taken from the session cookie.
///
/// Extracting it from a request without a session fails with
/// `AppError::Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthContext {
    pub fn from_session(session: &Session) -> Result<Self, AppError> {
        let user_id = session
            .get::<i64>(USER_ID)
            .map_err(|e| AppError::Session(e.to_string()))?
            .ok_or(AppError::Unauthorized)?;
        let username = session
            .get::<String>(USERNAME)
            .map_err(|e| AppError::Session(e.to_string()))?
            .ok_or(AppError::Unauthorized)?;
        let role = session
            .get::<String>(ROLE)
            .map_err(|e| AppError::Session(e.to_string()))?
            .ok_or(AppError::Unauthorized)?
            .parse::<Role>()
            .map_err(AppError::Session)?;
        Ok(AuthContext { user_id, username, role })
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fails with 403 unless the user is an ADMIN or SUPER_ADMIN.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("administrator role required".to_string()))
        }
    }
}

impl FromRequest for AuthContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(AuthContext::from_session(&req.get_session()))
    }
}

/// Store the user in the session after a successful login.
pub fn sign_in(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    let insert = |key: &str, result: Result<(), actix_session::SessionInsertError>| {
        result.map_err(|e| AppError::Session(format!("failed to store {key}: {e}")))
    };
    insert(USER_ID, session.insert(USER_ID, user.id))?;
    insert(USERNAME, session.insert(USERNAME, &user.username))?;
    insert(ROLE, session.insert(ROLE, user.role.as_str()))?;
    Ok(())
}

pub fn has_user(session: &Session) -> bool {
    session.get::<i64>(USER_ID).unwrap_or(None).is_some()
}
