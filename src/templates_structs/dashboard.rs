use askama::Template;

use super::PageContext;
use crate::models::proposal::ProposalSummary;
use crate::models::report::ReportSummary;
use crate::models::workgroup::WorkgroupSummary;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub reports: Vec<ReportSummary>,
    pub proposals: Vec<ProposalSummary>,
    pub workgroups: Vec<WorkgroupSummary>,
}
