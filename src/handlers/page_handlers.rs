use actix_session::Session;
use actix_web::{HttpResponse, web};
use sqlx::PgPool;

use super::{see_other, today};
use crate::auth::session::AuthContext;
use crate::errors::{AppError, render};
use crate::models::comment::{self, CommentTarget};
use crate::models::consensus;
use crate::models::report::{self, ReportFilter};
use crate::models::{proposal, vote, workgroup};
use crate::templates_structs::{
    ConsensusTemplate, DashboardTemplate, PageContext, ProposalDetailTemplate,
    WorkgroupDetailTemplate,
};

/// Missing pages send the user back to the dashboard lists.
fn or_back_to_list(result: Result<HttpResponse, AppError>) -> Result<HttpResponse, AppError> {
    match result {
        Err(AppError::NotFound) => Ok(see_other("/dashboard")),
        other => other,
    }
}

pub async fn dashboard(
    pool: web::Data<PgPool>,
    session: Session,
    auth: AuthContext,
) -> Result<HttpResponse, AppError> {
    let ctx = PageContext::build(&session, &auth)?;
    let reports = report::find_all(&pool, &ReportFilter::default()).await?;
    let proposals = proposal::find_all(&pool, None, today()).await?;
    let workgroups = workgroup::find_all(&pool).await?;
    render(DashboardTemplate { ctx, reports, proposals, workgroups })
}

pub async fn consensus_page(
    pool: web::Data<PgPool>,
    session: Session,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    or_back_to_list(consensus_view(&pool, &session, &auth, path.into_inner()).await)
}

async fn consensus_view(
    pool: &PgPool,
    session: &Session,
    auth: &AuthContext,
    id: i64,
) -> Result<HttpResponse, AppError> {
    let report = report::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
    let votes = vote::load_votes(pool, id, None).await?;
    let comments = comment::find_thread(pool, CommentTarget::Report(id)).await?;
    let can_manage_consensus = consensus::can_manage_consensus(auth.role, report.consensus_status);
    let can_vote = report.consensus_status.accepts_votes();
    let ctx = PageContext::build(session, auth)?;
    render(ConsensusTemplate { ctx, report, votes, comments, can_manage_consensus, can_vote })
}

pub async fn proposal_page(
    pool: web::Data<PgPool>,
    session: Session,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    or_back_to_list(proposal_view(&pool, &session, &auth, path.into_inner()).await)
}

async fn proposal_view(
    pool: &PgPool,
    session: &Session,
    auth: &AuthContext,
    id: i64,
) -> Result<HttpResponse, AppError> {
    let proposal = proposal::find_by_id(pool, id, today()).await?.ok_or(AppError::NotFound)?;
    let comments = comment::find_thread(pool, CommentTarget::Proposal(id)).await?;
    let can_edit = proposal.created_by.id == auth.user_id || auth.is_admin();
    let ctx = PageContext::build(session, auth)?;
    render(ProposalDetailTemplate { ctx, proposal, comments, can_edit })
}

pub async fn workgroup_page(
    pool: web::Data<PgPool>,
    session: Session,
    auth: AuthContext,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    or_back_to_list(workgroup_view(&pool, &session, &auth, path.into_inner()).await)
}

async fn workgroup_view(
    pool: &PgPool,
    session: &Session,
    auth: &AuthContext,
    id: i64,
) -> Result<HttpResponse, AppError> {
    let workgroup = workgroup::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
    let members = workgroup::find_members(pool, id).await?;
    let reports = report::find_for_workgroup(pool, id).await?;
    let is_member = members.iter().any(|m| m.user_id == auth.user_id);
    let join_request = workgroup::find_latest_join_request(pool, id, auth.user_id).await?;
    let ctx = PageContext::build(session, auth)?;
    render(WorkgroupDetailTemplate { ctx, workgroup, members, reports, is_member, join_request })
}
