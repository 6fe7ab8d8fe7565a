//! Comment threads on reports and proposals.

mod common;

use common::*;
use consenso::errors::AppError;
use consenso::models::comment::{self, CommentTarget, NewComment, ReactionKind};
use consenso::models::user::Role;

fn text(content: &str) -> NewComment {
    NewComment { content: content.to_string(), parent_id: None }
}

fn reply(content: &str, parent_id: i64) -> NewComment {
    NewComment { content: content.to_string(), parent_id: Some(parent_id) }
}

#[tokio::test]
async fn test_thread_with_replies() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let alice = create_user(pool, "alice", Role::Member).await;
    let bob = create_user(pool, "bob", Role::Member).await;
    let wg = create_workgroup(pool, "Outreach").await;
    let target = CommentTarget::Report(create_report(pool, wg, alice).await);

    let root = comment::create(pool, target, alice, &text("  First! ")).await.expect("comment");
    comment::create(pool, target, bob, &reply("Agreed", root)).await.expect("reply");
    comment::create(pool, target, bob, &text("Second thread")).await.expect("comment");

    let thread = comment::find_thread(pool, target).await.expect("thread");
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].content, "First!");
    assert_eq!(thread[0].replies.len(), 1);
    assert_eq!(thread[0].replies[0].author.id, bob);
    assert!(thread[1].replies.is_empty());

    assert_eq!(comment::find_target(pool, root).await.expect("target"), Some((target, alice)));

    db.cleanup().await;
}

#[tokio::test]
async fn test_reply_rules() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let alice = create_user(pool, "alice", Role::Member).await;
    let wg = create_workgroup(pool, "Outreach").await;
    let report = CommentTarget::Report(create_report(pool, wg, alice).await);
    let proposal = CommentTarget::Proposal(create_proposal(pool, alice, None).await);

    let root = comment::create(pool, report, alice, &text("root")).await.expect("comment");
    let child = comment::create(pool, report, alice, &reply("child", root)).await.expect("reply");

    let nested = comment::create(pool, report, alice, &reply("grandchild", child)).await;
    assert!(matches!(nested, Err(AppError::Validation(_))));

    let elsewhere = comment::create(pool, proposal, alice, &reply("wrong item", root)).await;
    assert!(matches!(elsewhere, Err(AppError::Validation(_))));

    let orphan = comment::create(pool, report, alice, &reply("no parent", root + 1000)).await;
    assert!(matches!(orphan, Err(AppError::Validation(_))));

    let blank = comment::create(pool, report, alice, &text("   ")).await;
    assert!(matches!(blank, Err(AppError::Validation(_))));

    db.cleanup().await;
}

#[tokio::test]
async fn test_reactions_toggle_and_switch() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let alice = create_user(pool, "alice", Role::Member).await;
    let bob = create_user(pool, "bob", Role::Member).await;
    let target = CommentTarget::Proposal(create_proposal(pool, alice, None).await);
    let id = comment::create(pool, target, alice, &text("Thoughts?")).await.expect("comment");

    let state = comment::toggle_reaction(pool, id, bob, ReactionKind::Like).await.expect("like");
    assert_eq!(state, Some(ReactionKind::Like));
    comment::toggle_reaction(pool, id, alice, ReactionKind::Like).await.expect("like");

    let thread = comment::find_thread(pool, target).await.expect("thread");
    assert_eq!(thread[0].likes.len(), 2);

    let state = comment::toggle_reaction(pool, id, bob, ReactionKind::Dislike)
        .await
        .expect("switch");
    assert_eq!(state, Some(ReactionKind::Dislike));
    let state = comment::toggle_reaction(pool, id, bob, ReactionKind::Dislike)
        .await
        .expect("clear");
    assert_eq!(state, None);

    let thread = comment::find_thread(pool, target).await.expect("thread");
    assert_eq!(thread[0].likes, vec![alice]);
    assert!(thread[0].dislikes.is_empty());

    let missing = comment::toggle_reaction(pool, id + 1000, bob, ReactionKind::Like).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    db.cleanup().await;
}

#[tokio::test]
async fn test_delete_removes_replies() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let alice = create_user(pool, "alice", Role::Member).await;
    let target = CommentTarget::Proposal(create_proposal(pool, alice, None).await);
    let root = comment::create(pool, target, alice, &text("root")).await.expect("comment");
    comment::create(pool, target, alice, &reply("child", root)).await.expect("reply");
    comment::toggle_reaction(pool, root, alice, ReactionKind::Like).await.expect("like");

    comment::delete(pool, root).await.expect("delete");
    assert!(comment::find_thread(pool, target).await.expect("thread").is_empty());

    let again = comment::delete(pool, root).await;
    assert!(matches!(again, Err(AppError::NotFound)));

    db.cleanup().await;
}
