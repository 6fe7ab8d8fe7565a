// Template context structures for Askama templates, organized by domain.

use actix_session::Session;

use crate::auth::csrf;
use crate::auth::session::AuthContext;
use crate::errors::AppError;

/// Common context shared by all authenticated pages.
/// Templates access these as `ctx.username`, `ctx.csrf_token`, etc.
pub struct PageContext {
    pub user_id: i64,
    pub username: String,
    pub avatar_initial: String,
    pub is_admin: bool,
    pub app_name: String,
    pub csrf_token: String,
}

impl PageContext {
    pub fn build(session: &Session, auth: &AuthContext) -> Result<Self, AppError> {
        let csrf_token = csrf::get_or_create_token(session)?;
        let avatar_initial = auth.username.chars().next().unwrap_or('?').to_uppercase().to_string();
        Ok(Self {
            user_id: auth.user_id,
            username: auth.username.clone(),
            avatar_initial,
            is_admin: auth.is_admin(),
            app_name: APP_NAME.to_string(),
            csrf_token,
        })
    }
}

pub const APP_NAME: &str = "Consenso";

mod api;
mod common;
mod consensus;
mod dashboard;
mod proposal;
mod workgroup;

pub use self::api::{
    ApiErrorResponse, ReportResponse, SessionResponse, SignedUrlResponse, ThreadResponse,
};
pub use self::common::LoginTemplate;
pub use self::consensus::ConsensusTemplate;
pub use self::dashboard::DashboardTemplate;
pub use self::proposal::ProposalDetailTemplate;
pub use self::workgroup::WorkgroupDetailTemplate;
