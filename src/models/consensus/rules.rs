use chrono::NaiveDate;

use super::types::{ConsensusStatus, ObjectionStatus, ProposalStatus, VoteType};
use crate::models::user::Role;

/// Minimum length (in characters, after trimming) of an objection's justification.
pub const MIN_OBJECTION_COMMENT_CHARS: usize = 10;

/// Maximum length of any vote comment.
pub const MAX_VOTE_COMMENT_CHARS: usize = 5000;

/// Validate a vote before it is stored. Returns the trimmed comment.
pub fn validate_vote(vote_type: VoteType, comment: &str) -> Result<String, String> {
    let trimmed = comment.trim();
    let len = trimmed.chars().count();
    if vote_type == VoteType::Objetar && len < MIN_OBJECTION_COMMENT_CHARS {
        return Err(format!(
            "An objection requires a justification of at least \
             {MIN_OBJECTION_COMMENT_CHARS} characters"
        ));
    }
    if len > MAX_VOTE_COMMENT_CHARS {
        return Err(format!("Comment must be at most {MAX_VOTE_COMMENT_CHARS} characters"));
    }
    Ok(trimmed.to_string())
}

impl ConsensusStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsensusStatus::Consensed | ConsensusStatus::Rejected)
    }

    /// Votes are accepted until the report reaches a terminal status.
    pub fn accepts_votes(&self) -> bool {
        !self.is_terminal()
    }

    /// A new round may be opened from anything but CONSENSED.
    pub fn can_open_round(&self) -> bool {
        *self != ConsensusStatus::Consensed
    }

    /// Check an admin's request to close the process with `target`.
    pub fn check_mark(&self, target: ConsensusStatus) -> Result<(), String> {
        if !target.is_terminal() {
            return Err(format!(
                "Consensus status can only be set to CONSENSED or REJECTED, not {target}"
            ));
        }
        if self.is_terminal() {
            return Err(format!("Report is already {self}"));
        }
        Ok(())
    }
}

impl ObjectionStatus {
    /// Resolution is one-way: PENDIENTE moves to VALIDA or INVALIDA exactly once.
    pub fn check_resolve(&self, target: ObjectionStatus) -> Result<(), String> {
        if target == ObjectionStatus::Pendiente {
            return Err("An objection can only be resolved as VALIDA or INVALIDA".to_string());
        }
        if *self != ObjectionStatus::Pendiente {
            return Err(format!("Objection has already been resolved as {self}"));
        }
        Ok(())
    }
}

impl ProposalStatus {
    pub fn check_transition(&self, target: ProposalStatus) -> Result<(), String> {
        if *self == target {
            return Ok(());
        }
        match (self, target) {
            (ProposalStatus::InReview, ProposalStatus::Approved)
            | (ProposalStatus::InReview, ProposalStatus::Rejected)
            | (ProposalStatus::InReview, ProposalStatus::Expired) => Ok(()),
            (from, to) => Err(format!("Proposal cannot move from {from} to {to}")),
        }
    }
}

/// Whether the caller may open rounds and mark consensus on a report in `status`.
pub fn can_manage_consensus(role: Role, status: ConsensusStatus) -> bool {
    role.is_admin() && status != ConsensusStatus::Consensed
}

/// A deadline is inclusive of its whole day: expired only once `today` is past it.
pub fn is_past_deadline(expires_at: Option<NaiveDate>, today: NaiveDate) -> bool {
    match expires_at {
        Some(deadline) => today > deadline,
        None => false,
    }
}

pub fn proposal_can_vote(
    status: ProposalStatus,
    expires_at: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    status == ProposalStatus::InReview && !is_past_deadline(expires_at, today)
}

/// Status a proposal should be shown with, accounting for a deadline the sweep has not caught yet.
pub fn effective_proposal_status(
    status: ProposalStatus,
    expires_at: Option<NaiveDate>,
    today: NaiveDate,
) -> ProposalStatus {
    if status == ProposalStatus::InReview && is_past_deadline(expires_at, today) {
        ProposalStatus::Expired
    } else {
        status
    }
}

/// Sum of budget line items, in cents. Saturates at `i64::MAX` instead of wrapping.
pub fn budget_total<I>(amounts_cents: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    amounts_cents
        .into_iter()
        .fold(0i64, |total, amount| total.saturating_add(amount))
}

/// Format cents as dollars: whole amounts drop the decimals ("$350"), others keep two ("$12.50").
pub fn format_usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = group_thousands(abs / 100);
    let rem = abs % 100;
    if rem == 0 {
        format!("{sign}${dollars}")
    } else {
        format!("{sign}${dollars}.{rem:02}")
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
