//! Comment threading and reaction toggles (pure logic).

use chrono::{TimeZone, Utc};

use consenso::models::comment::{
    CommentTarget, FlatComment, ReactionKind, assemble_thread, next_reaction,
};
use consenso::models::user::UserRef;

fn flat(id: i64, parent_id: Option<i64>, author: i64) -> FlatComment {
    FlatComment {
        id,
        parent_id,
        author: UserRef {
            id: author,
            username: format!("user{author}"),
            display_name: format!("User {author}"),
        },
        content: format!("comment {id}"),
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, id as u32).single().expect("time"),
    }
}

#[test]
fn test_next_reaction_toggles_and_switches() {
    assert_eq!(next_reaction(None, ReactionKind::Like), Some(ReactionKind::Like));
    assert_eq!(next_reaction(Some(ReactionKind::Like), ReactionKind::Like), None);
    assert_eq!(
        next_reaction(Some(ReactionKind::Like), ReactionKind::Dislike),
        Some(ReactionKind::Dislike)
    );
    assert_eq!(next_reaction(Some(ReactionKind::Dislike), ReactionKind::Dislike), None);
}

#[test]
fn test_replies_nest_under_their_parent_in_order() {
    let comments = vec![
        flat(1, None, 1),
        flat(2, None, 2),
        flat(3, Some(1), 2),
        flat(4, Some(1), 3),
    ];
    let thread = assemble_thread(comments, &[]);

    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].id, 1);
    assert_eq!(thread[1].id, 2);
    let reply_ids: Vec<i64> = thread[0].replies.iter().map(|r| r.id).collect();
    assert_eq!(reply_ids, vec![3, 4]);
    assert!(thread[1].replies.is_empty());
}

#[test]
fn test_orphaned_replies_are_dropped() {
    let thread = assemble_thread(vec![flat(1, None, 1), flat(5, Some(99), 2)], &[]);
    assert_eq!(thread.len(), 1);
    assert!(thread[0].replies.is_empty());
}

#[test]
fn test_reactions_are_attached_to_their_comment() {
    let comments = vec![flat(1, None, 1), flat(2, Some(1), 2)];
    let reactions = [
        (1, 10, ReactionKind::Like),
        (1, 11, ReactionKind::Like),
        (1, 12, ReactionKind::Dislike),
        (2, 10, ReactionKind::Dislike),
    ];
    let thread = assemble_thread(comments, &reactions);

    assert_eq!(thread[0].likes, vec![10, 11]);
    assert_eq!(thread[0].dislikes, vec![12]);
    assert!(thread[0].replies[0].likes.is_empty());
    assert_eq!(thread[0].replies[0].dislikes, vec![10]);
}

#[test]
fn test_comment_target_serialization() {
    let json = serde_json::to_value(CommentTarget::Proposal(7)).expect("serialize");
    assert_eq!(json, serde_json::json!({"type": "proposal", "id": 7}));
    assert_eq!(CommentTarget::Report(3).id(), 3);
}
