//! Budget line items shared by quarterly reports and proposals.

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::errors::AppError;
use crate::models::consensus::{budget_total, format_usd};

/// Largest accepted line item: one hundred billion dollars.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000_000;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BudgetItem {
    pub id: i64,
    pub description: String,
    pub amount_cents: i64,
}

impl BudgetItem {
    pub fn amount_display(&self) -> String {
        format_usd(self.amount_cents)
    }
}

/// Budget line as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBudgetItem {
    pub description: String,
    pub amount_cents: i64,
}

/// Owner of a set of budget items.
#[derive(Debug, Clone, Copy)]
pub enum BudgetOwner {
    Report(i64),
    Proposal(i64),
}

impl BudgetOwner {
    fn column(&self) -> &'static str {
        match self {
            BudgetOwner::Report(_) => "report_id",
            BudgetOwner::Proposal(_) => "proposal_id",
        }
    }

    fn id(&self) -> i64 {
        match self {
            BudgetOwner::Report(id) | BudgetOwner::Proposal(id) => *id,
        }
    }
}

/// Budget items with their total, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub items: Vec<BudgetItem>,
    pub total_cents: i64,
    pub total_display: String,
}

impl Budget {
    pub fn new(items: Vec<BudgetItem>) -> Self {
        let total_cents = budget_total(items.iter().map(|i| i.amount_cents));
        Budget {
            items,
            total_cents,
            total_display: format_usd(total_cents),
        }
    }
}

pub fn validate_items(items: &[NewBudgetItem]) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let line = i + 1;
        if item.description.trim().is_empty() {
            errors.push(format!("Budget item {line}: description is required"));
        } else if item.description.trim().chars().count() > 500 {
            errors.push(format!("Budget item {line}: description must be at most 500 characters"));
        }
        if item.amount_cents < 0 {
            errors.push(format!("Budget item {line}: amount must not be negative"));
        } else if item.amount_cents > MAX_AMOUNT_CENTS {
            errors.push(format!(
                "Budget item {line}: amount must be at most {}",
                format_usd(MAX_AMOUNT_CENTS)
            ));
        }
    }
    errors
}

pub async fn find_for(conn: &mut PgConnection, owner: BudgetOwner) -> Result<Budget, AppError> {
    let items = sqlx::query_as::<_, BudgetItem>(&format!(
        "SELECT id, description, amount_cents FROM budget_items \
         WHERE {} = $1 ORDER BY position, id",
        owner.column()
    ))
    .bind(owner.id())
    .fetch_all(&mut *conn)
    .await?;
    Ok(Budget::new(items))
}

/// Replace every budget item of `owner` with `items`, keeping their order.
pub async fn replace_for(
    conn: &mut PgConnection,
    owner: BudgetOwner,
    items: &[NewBudgetItem],
) -> Result<(), AppError> {
    sqlx::query(&format!("DELETE FROM budget_items WHERE {} = $1", owner.column()))
        .bind(owner.id())
        .execute(&mut *conn)
        .await?;

    for (position, item) in items.iter().enumerate() {
        sqlx::query(&format!(
            "INSERT INTO budget_items ({}, description, amount_cents, position) \
             VALUES ($1, $2, $3, $4)",
            owner.column()
        ))
        .bind(owner.id())
        .bind(item.description.trim())
        .bind(item.amount_cents)
        .bind(position as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
