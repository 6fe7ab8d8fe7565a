use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::UserRef;

pub const MAX_COMMENT_CHARS: usize = 5000;

text_enum! {
    pub enum ReactionKind {
        Like => "LIKE",
        Dislike => "DISLIKE",
    }
}

/// Reaction left on a comment after the user presses `pressed`.
///
/// Pressing the active reaction again clears it; pressing the other one switches.
pub fn next_reaction(current: Option<ReactionKind>, pressed: ReactionKind) -> Option<ReactionKind> {
    match current {
        Some(kind) if kind == pressed => None,
        _ => Some(pressed),
    }
}

/// What a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CommentTarget {
    Report(i64),
    Proposal(i64),
}

impl CommentTarget {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            CommentTarget::Report(_) => "report_id",
            CommentTarget::Proposal(_) => "proposal_id",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            CommentTarget::Report(id) | CommentTarget::Proposal(id) => *id,
        }
    }
}

/// A comment as stored, before threading.
#[derive(Debug, Clone)]
pub struct FlatComment {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub author: UserRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub author: UserRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Ids of users who liked the comment.
    pub likes: Vec<i64>,
    /// Ids of users who disliked the comment.
    pub dislikes: Vec<i64>,
    pub replies: Vec<CommentNode>,
}

/// Input for a new comment or reply.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Build the one-level thread from flat rows (ordered oldest first) and reactions.
///
/// Replies whose parent is missing from `comments` are dropped.
pub fn assemble_thread(
    comments: Vec<FlatComment>,
    reactions: &[(i64, i64, ReactionKind)],
) -> Vec<CommentNode> {
    let mut likes: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut dislikes: HashMap<i64, Vec<i64>> = HashMap::new();
    for &(comment_id, user_id, kind) in reactions {
        let bucket = match kind {
            ReactionKind::Like => &mut likes,
            ReactionKind::Dislike => &mut dislikes,
        };
        bucket.entry(comment_id).or_default().push(user_id);
    }

    let mut to_node = |c: FlatComment| CommentNode {
        likes: likes.remove(&c.id).unwrap_or_default(),
        dislikes: dislikes.remove(&c.id).unwrap_or_default(),
        id: c.id,
        parent_id: c.parent_id,
        author: c.author,
        content: c.content,
        created_at: c.created_at,
        replies: Vec::new(),
    };

    let (top, replies): (Vec<FlatComment>, Vec<FlatComment>) =
        comments.into_iter().partition(|c| c.parent_id.is_none());

    let mut roots: Vec<CommentNode> = top.into_iter().map(&mut to_node).collect();
    let index: HashMap<i64, usize> = roots.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

    for reply in replies {
        let Some(parent_id) = reply.parent_id else { continue };
        if let Some(&i) = index.get(&parent_id) {
            let node = to_node(reply);
            roots[i].replies.push(node);
        }
    }
    roots
}
