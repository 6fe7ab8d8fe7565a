use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    pub enum WorkgroupStatus {
        Active => "ACTIVE",
        Inactive => "INACTIVE",
    }
}

text_enum! {
    pub enum MemberRole {
        Member => "MEMBER",
        Leader => "LEADER",
    }
}

text_enum! {
    pub enum JoinRequestStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

/// Workgroup as shown in the list view.
#[derive(Debug, Clone, Serialize)]
pub struct WorkgroupSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: WorkgroupStatus,
    pub member_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkgroupDetail {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub mission: String,
    pub status: WorkgroupStatus,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkgroupMember {
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinRequest {
    pub id: i64,
    pub workgroup_id: i64,
    pub user_id: i64,
    pub username: String,
    pub message: String,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Input for creating a workgroup.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkgroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mission: String,
}
