use askama::Template;

use super::PageContext;
use crate::models::comment::CommentNode;
use crate::models::proposal::ProposalDetail;

#[derive(Template)]
#[template(path = "proposals/detail.html")]
pub struct ProposalDetailTemplate {
    pub ctx: PageContext,
    pub proposal: ProposalDetail,
    pub comments: Vec<CommentNode>,
    pub can_edit: bool,
}
