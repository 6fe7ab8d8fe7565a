use askama::Template;

use super::PageContext;
use crate::models::comment::CommentNode;
use crate::models::report::ReportDetail;
use crate::models::vote::VotesPayload;

/// Report page: narrative, budget, voting round and discussion.
#[derive(Template)]
#[template(path = "reports/detail.html")]
pub struct ConsensusTemplate {
    pub ctx: PageContext,
    pub report: ReportDetail,
    pub votes: VotesPayload,
    pub comments: Vec<CommentNode>,
    pub can_manage_consensus: bool,
    pub can_vote: bool,
}
