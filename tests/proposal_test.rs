//! Proposal lifecycle: creation, editing, voting, and deadline expiry.

mod common;

use common::*;
use consenso::errors::AppError;
use consenso::models::budget::NewBudgetItem;
use consenso::models::consensus::{ProposalStatus, VoteType};
use consenso::models::proposal::{self, ProposalUpdate};
use consenso::models::user::Role;

#[tokio::test]
async fn test_create_and_find() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let today = date(2026, 3, 1);

    let author = create_user(pool, "author", Role::Member).await;
    let wg = create_workgroup(pool, "Garden").await;

    let mut input = new_proposal("Seed library", Some(date(2026, 3, 31)));
    input.workgroup_ids = vec![wg, wg];
    input.links = vec![" https://example.org/plan ".to_string()];
    input.budget_items = vec![NewBudgetItem {
        description: "Seeds".to_string(),
        amount_cents: 1_250,
    }];
    let id = proposal::create(pool, &input, author).await.expect("create");

    let detail = proposal::find_by_id(pool, id, today).await.expect("find").expect("exists");
    assert_eq!(detail.title, "Seed library");
    assert_eq!(detail.status, ProposalStatus::InReview);
    assert_eq!(detail.workgroups.len(), 1);
    assert_eq!(detail.workgroups[0].name, "Garden");
    assert_eq!(detail.links, vec!["https://example.org/plan".to_string()]);
    assert_eq!(detail.budget.total_display, "$12.50");
    assert!(detail.can_vote);
    assert!(detail.attachment.is_none());

    assert_eq!(proposal::find_creator(pool, id).await.expect("creator"), Some(author));
    assert!(proposal::find_by_id(pool, id + 1, today).await.expect("find").is_none());

    db.cleanup().await;
}

#[tokio::test]
async fn test_deadline_day_is_still_open() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let deadline = date(2026, 3, 10);

    let author = create_user(pool, "author", Role::Member).await;
    let voter = create_user(pool, "voter", Role::Member).await;
    let id = create_proposal(pool, author, Some(deadline)).await;

    proposal::cast_vote(pool, id, voter, VoteType::AFavor, "", deadline)
        .await
        .expect("vote on the last day");

    let after = date(2026, 3, 11);
    let late = proposal::cast_vote(pool, id, voter, VoteType::EnContra, "", after).await;
    assert!(matches!(late, Err(AppError::Conflict(_))));

    let detail = proposal::find_by_id(pool, id, after).await.expect("find").expect("exists");
    assert_eq!(detail.status, ProposalStatus::Expired);
    assert!(!detail.can_vote);
    assert_eq!(detail.stats.a_favor, 1);

    db.cleanup().await;
}

#[tokio::test]
async fn test_cast_vote_upserts() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let today = date(2026, 3, 1);

    let author = create_user(pool, "author", Role::Member).await;
    let voter = create_user(pool, "voter", Role::Member).await;
    let id = create_proposal(pool, author, None).await;

    proposal::cast_vote(pool, id, voter, VoteType::AFavor, "yes", today).await.expect("vote");
    proposal::cast_vote(pool, id, voter, VoteType::Abstenerse, "  not sure ", today)
        .await
        .expect("change vote");
    proposal::cast_vote(pool, id, author, VoteType::AFavor, "", today).await.expect("vote");

    let detail = proposal::find_by_id(pool, id, today).await.expect("find").expect("exists");
    assert_eq!(detail.votes.len(), 2);
    assert_eq!(detail.stats.total, 2);
    assert_eq!(detail.stats.abstenerse, 1);
    let mine = detail.votes.iter().find(|v| v.user.id == voter).expect("voter's vote");
    assert_eq!(mine.comment, "not sure");

    let short_objection =
        proposal::cast_vote(pool, id, voter, VoteType::Objetar, "no", today).await;
    assert!(matches!(short_objection, Err(AppError::Validation(_))));

    let missing = proposal::cast_vote(pool, id + 1, voter, VoteType::AFavor, "", today).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    db.cleanup().await;
}

#[tokio::test]
async fn test_update_content_and_status() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let today = date(2026, 3, 1);

    let author = create_user(pool, "author", Role::Member).await;
    let id = create_proposal(pool, author, Some(date(2026, 4, 1))).await;

    let edit = ProposalUpdate {
        title: Some("Community garden, phase 2".to_string()),
        expires_at: Some(None),
        ..Default::default()
    };
    proposal::update(pool, id, &edit, today).await.expect("edit");
    let detail = proposal::find_by_id(pool, id, today).await.expect("find").expect("exists");
    assert_eq!(detail.title, "Community garden, phase 2");
    assert_eq!(detail.expires_at, None);

    let approve = ProposalUpdate { status: Some(ProposalStatus::Approved), ..Default::default() };
    proposal::update(pool, id, &approve, today).await.expect("approve");

    let late_edit = ProposalUpdate { description: Some("more".to_string()), ..Default::default() };
    let result = proposal::update(pool, id, &late_edit, today).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let reopen = ProposalUpdate { status: Some(ProposalStatus::InReview), ..Default::default() };
    let result = proposal::update(pool, id, &reopen, today).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let vote = proposal::cast_vote(pool, id, author, VoteType::AFavor, "", today).await;
    assert!(matches!(vote, Err(AppError::Conflict(_))));

    db.cleanup().await;
}

#[tokio::test]
async fn test_expire_overdue_and_status_filter() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let today = date(2026, 3, 10);

    let author = create_user(pool, "author", Role::Member).await;
    let overdue = create_proposal(pool, author, Some(date(2026, 3, 9))).await;
    let due_today = create_proposal(pool, author, Some(today)).await;
    let open_ended = create_proposal(pool, author, None).await;

    let expired_view = proposal::find_all(pool, Some(ProposalStatus::Expired), today)
        .await
        .expect("list");
    assert_eq!(expired_view.iter().map(|p| p.id).collect::<Vec<_>>(), vec![overdue]);

    let swept = proposal::expire_overdue(pool, today).await.expect("sweep");
    assert_eq!(swept, vec![overdue]);
    assert!(proposal::expire_overdue(pool, today).await.expect("sweep").is_empty());

    let in_review = proposal::find_all(pool, Some(ProposalStatus::InReview), today)
        .await
        .expect("list");
    let mut ids: Vec<i64> = in_review.iter().map(|p| p.id).collect();
    ids.sort();
    assert_eq!(ids, vec![due_today, open_ended]);

    let all = proposal::find_all(pool, None, today).await.expect("list");
    assert_eq!(all.len(), 3);

    db.cleanup().await;
}

#[tokio::test]
async fn test_attachment_replace_and_delete() {
    use consenso::models::attachment::{self, NewAttachment};

    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();
    let today = date(2026, 3, 1);

    let author = create_user(pool, "author", Role::Member).await;
    let id = create_proposal(pool, author, None).await;
    let record = |url: &str, filename: &str| NewAttachment {
        proposal_id: id,
        url: url.to_string(),
        filename: filename.to_string(),
        content_type: "application/pdf".to_string(),
        size_bytes: 4,
        uploaded_by: author,
    };

    let previous = attachment::replace(pool, &record("/files/a-plan.pdf", "plan.pdf"))
        .await
        .expect("attach");
    assert!(previous.is_none());
    let previous = attachment::replace(pool, &record("/files/b-plan2.pdf", "plan2.pdf"))
        .await
        .expect("replace");
    assert_eq!(previous.map(|a| a.url), Some("/files/a-plan.pdf".to_string()));

    let detail = proposal::find_by_id(pool, id, today).await.expect("find").expect("exists");
    assert_eq!(detail.attachment.as_ref().map(|a| a.filename.as_str()), Some("plan2.pdf"));

    let removed = attachment::delete_for_proposal(pool, id).await.expect("delete");
    assert_eq!(removed.map(|a| a.url), Some("/files/b-plan2.pdf".to_string()));
    assert!(attachment::delete_for_proposal(pool, id).await.expect("delete").is_none());

    db.cleanup().await;
}
