use serde::Serialize;

use crate::models::comment::{CommentNode, CommentTarget};
use crate::models::report::ReportDetail;
use crate::models::user::{Role, User};

/// API error response.
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// The signed-in user, as returned by `/api/session`.
#[derive(Serialize, Debug, Clone)]
pub struct SessionResponse {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub is_admin: bool,
}

impl From<&User> for SessionResponse {
    fn from(u: &User) -> Self {
        SessionResponse {
            id: u.id,
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            role: u.role,
            is_admin: u.role.is_admin(),
        }
    }
}

/// Report detail plus the caller-specific flags the report page needs.
#[derive(Serialize, Debug)]
pub struct ReportResponse {
    #[serde(flatten)]
    pub report: ReportDetail,
    pub budget_total: i64,
    pub budget_total_display: String,
    pub can_manage_consensus: bool,
}

impl ReportResponse {
    pub fn new(report: ReportDetail, role: Role) -> Self {
        let can_manage_consensus =
            crate::models::consensus::can_manage_consensus(role, report.consensus_status);
        ReportResponse {
            budget_total: report.budget.total_cents,
            budget_total_display: report.budget.total_display.clone(),
            can_manage_consensus,
            report,
        }
    }
}

/// A full comment thread, returned after every comment mutation.
#[derive(Serialize, Debug)]
pub struct ThreadResponse {
    pub target: CommentTarget,
    pub comments: Vec<CommentNode>,
}

#[derive(Serialize, Debug)]
pub struct SignedUrlResponse {
    pub url: String,
    pub filename: String,
    pub expires_in_minutes: i64,
}
