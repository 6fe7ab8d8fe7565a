use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::consensus::{ConsensusStatus, ObjectionStatus, VoteTally, VoteType};
use crate::models::user::UserRef;

#[derive(Debug, Clone, Serialize)]
pub struct VotingRound {
    pub id: i64,
    pub round_number: i32,
    /// `None` when the round was opened by a member's first vote.
    pub opened_by: Option<i64>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl VotingRound {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Objection {
    pub id: i64,
    pub status: ObjectionStatus,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportVote {
    pub id: i64,
    pub round_number: i32,
    pub user: UserRef,
    pub vote_type: VoteType,
    pub comment: String,
    pub objection: Option<Objection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the report page needs after any vote-related change.
#[derive(Debug, Clone, Serialize)]
pub struct VotesPayload {
    pub report_id: i64,
    pub consensus_status: ConsensusStatus,
    /// The round whose votes are listed: the open one, else the latest.
    pub round: Option<VotingRound>,
    pub rounds: Vec<VotingRound>,
    pub votes: Vec<ReportVote>,
    pub stats: VoteTally,
    /// Set when the mutation that produced this payload opened a new round.
    pub round_created: bool,
}

/// Vote as submitted by a member.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitVote {
    pub vote_type: VoteType,
    #[serde(default)]
    pub comment: String,
}

/// Result of storing a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub vote_id: i64,
    pub round_number: i32,
    pub round_created: bool,
}
