use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::validate;
use crate::models::attachment::Attachment;
use crate::models::budget::{self, Budget, NewBudgetItem};
use crate::models::consensus::{ProposalStatus, VoteTally, VoteType};
use crate::models::user::UserRef;

const MAX_LINKS: usize = 20;
const MAX_LINK_CHARS: usize = 2000;

/// Proposal as shown in the list view.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalSummary {
    pub id: i64,
    pub title: String,
    pub status: ProposalStatus,
    pub expires_at: Option<NaiveDate>,
    pub created_by: UserRef,
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkgroupRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposalVote {
    pub id: i64,
    pub user: UserRef,
    pub vote_type: VoteType,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full proposal detail. `status` already accounts for a passed deadline.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: ProposalStatus,
    pub expires_at: Option<NaiveDate>,
    pub links: Vec<String>,
    pub workgroups: Vec<WorkgroupRef>,
    pub budget: Budget,
    pub attachment: Option<Attachment>,
    pub created_by: UserRef,
    pub votes: Vec<ProposalVote>,
    pub stats: VoteTally,
    pub can_vote: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProposal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expires_at: Option<NaiveDate>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub workgroup_ids: Vec<i64>,
    #[serde(default)]
    pub budget_items: Vec<NewBudgetItem>,
}

impl NewProposal {
    pub fn validate(&self, today: NaiveDate) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(validate::validate_required(&self.title, "Title", 200));
        errors.extend(validate::validate_optional(&self.description, "Description", 50_000));
        if let Some(expires_at) = self.expires_at {
            if expires_at < today {
                errors.push("Expiry date must not be in the past".to_string());
            }
        }
        errors.extend(validate_links(&self.links));
        errors.extend(budget::validate_items(&self.budget_items));
        errors
    }
}

/// Partial update (PATCH). Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the deadline; `None` leaves it unchanged.
    #[serde(default, deserialize_with = "present_or_null")]
    pub expires_at: Option<Option<NaiveDate>>,
    pub links: Option<Vec<String>>,
    pub workgroup_ids: Option<Vec<i64>>,
    pub budget_items: Option<Vec<NewBudgetItem>>,
    pub status: Option<ProposalStatus>,
}

impl ProposalUpdate {
    /// True when any field besides `status` is being changed.
    pub fn changes_content(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.expires_at.is_some()
            || self.links.is_some()
            || self.workgroup_ids.is_some()
            || self.budget_items.is_some()
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            errors.extend(validate::validate_required(title, "Title", 200));
        }
        if let Some(description) = &self.description {
            errors.extend(validate::validate_optional(description, "Description", 50_000));
        }
        if let Some(links) = &self.links {
            errors.extend(validate_links(links));
        }
        if let Some(items) = &self.budget_items {
            errors.extend(budget::validate_items(items));
        }
        errors
    }
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn validate_links(links: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    if links.len() > MAX_LINKS {
        errors.push(format!("At most {MAX_LINKS} links are allowed"));
    }
    for link in links {
        let link = link.trim();
        if !(link.starts_with("http://") || link.starts_with("https://")) {
            errors.push(format!("Link '{link}' must start with http:// or https://"));
        } else if link.chars().count() > MAX_LINK_CHARS {
            errors.push(format!("Links must be at most {MAX_LINK_CHARS} characters"));
        }
    }
    errors
}
