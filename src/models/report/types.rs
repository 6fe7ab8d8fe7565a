use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::validate;
use crate::models::budget::{self, Budget, NewBudgetItem};
use crate::models::consensus::ConsensusStatus;
use crate::models::user::UserRef;

/// Report as shown in list views.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub id: i64,
    pub workgroup_id: i64,
    pub workgroup_name: String,
    pub year: i32,
    pub quarter: i32,
    pub consensus_status: ConsensusStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// Full quarterly report with its participants, budget, and round state.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    pub id: i64,
    pub workgroup_id: i64,
    pub workgroup_name: String,
    pub year: i32,
    pub quarter: i32,
    pub detail: String,
    pub theory_of_change: String,
    pub challenges: String,
    pub plans: String,
    pub consensus_status: ConsensusStatus,
    pub created_by: UserRef,
    pub participants: Vec<UserRef>,
    pub budget: Budget,
    /// Number of the open round, if voting is in progress.
    pub current_round: Option<i32>,
    pub round_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportDetail {
    pub fn period_label(&self) -> String {
        format!("Q{} {}", self.quarter, self.year)
    }
}

/// Input for creating a quarterly report.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReport {
    pub workgroup_id: i64,
    pub year: i32,
    pub quarter: i32,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub theory_of_change: String,
    #[serde(default)]
    pub challenges: String,
    #[serde(default)]
    pub plans: String,
    #[serde(default)]
    pub participant_ids: Vec<i64>,
    #[serde(default)]
    pub budget_items: Vec<NewBudgetItem>,
}

impl NewReport {
    /// Field-level validation. An empty list means the input is acceptable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(2000..=2100).contains(&self.year) {
            errors.push("Year must be between 2000 and 2100".to_string());
        }
        if !(1..=4).contains(&self.quarter) {
            errors.push("Quarter must be between 1 and 4".to_string());
        }
        errors.extend(validate::validate_optional(&self.detail, "Detail", 20_000));
        errors.extend(validate::validate_optional(
            &self.theory_of_change,
            "Theory of change",
            20_000,
        ));
        errors.extend(validate::validate_optional(&self.challenges, "Challenges", 20_000));
        errors.extend(validate::validate_optional(&self.plans, "Plans", 20_000));
        errors.extend(budget::validate_items(&self.budget_items));
        errors
    }
}

/// Optional filters for the report list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub workgroup_id: Option<i64>,
    pub status: Option<ConsensusStatus>,
}
