use askama::Template;

use super::PageContext;
use crate::models::report::ReportSummary;
use crate::models::workgroup::{JoinRequest, WorkgroupDetail, WorkgroupMember};

#[derive(Template)]
#[template(path = "workgroups/detail.html")]
pub struct WorkgroupDetailTemplate {
    pub ctx: PageContext,
    pub workgroup: WorkgroupDetail,
    pub members: Vec<WorkgroupMember>,
    pub reports: Vec<ReportSummary>,
    pub is_member: bool,
    pub join_request: Option<JoinRequest>,
}
