//! Shared test infrastructure for the database-backed tests.
//!
//! Each test gets its own Postgres schema, so tests can run in parallel
//! against one database. When `DATABASE_URL` is not set, `setup_test_db()`
//! returns `None` and the calling test returns early.

#![allow(dead_code)]

use chrono::NaiveDate;
use rand::Rng;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use consenso::auth::password;
use consenso::models::proposal::{self, NewProposal};
use consenso::models::report::{self, NewReport};
use consenso::models::user::{self, NewUser, Role};
use consenso::models::workgroup::{self, NewWorkgroup};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const TEST_PASSWORD: &str = "password123";
pub const OBJECTION_TEXT: &str = "This budget line is not justified by the plan";

// ============================================================================
// DATABASE SETUP
// ============================================================================

pub struct TestDb {
    pool: PgPool,
    schema: String,
    admin_url: String,
}

impl TestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drop the test schema. Call at the end of a test.
    pub async fn cleanup(self) {
        self.pool.close().await;
        if let Ok(admin) = PgPoolOptions::new().max_connections(1).connect(&self.admin_url).await {
            let _ = admin
                .execute(format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema).as_str())
                .await;
            admin.close().await;
        }
    }
}

/// Connect to `DATABASE_URL`, create a private schema and run the migrations in it.
pub async fn setup_test_db() -> Option<TestDb> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let suffix: u64 = rand::rng().random();
    let schema = format!("test_{suffix:016x}");

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Failed to connect to DATABASE_URL");
    admin
        .execute(format!("CREATE SCHEMA {schema}").as_str())
        .await
        .expect("Failed to create test schema");
    admin.close().await;

    let search_path = schema.clone();
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let statement = format!("SET search_path TO {search_path}");
            Box::pin(async move {
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .expect("Failed to connect test pool");

    consenso::db::run_migrations(&pool).await.expect("Failed to run migrations");

    Some(TestDb { pool, schema, admin_url: url })
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn create_user(pool: &PgPool, username: &str, role: Role) -> i64 {
    user::create(
        pool,
        &NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            display_name: format!("User {username}"),
            password_hash: password::hash_password(TEST_PASSWORD).expect("hash"),
            role,
        },
    )
    .await
    .expect("create user")
}

pub async fn create_workgroup(pool: &PgPool, name: &str) -> i64 {
    workgroup::create(
        pool,
        &NewWorkgroup {
            name: name.to_string(),
            description: format!("{name} workgroup"),
            mission: String::new(),
        },
    )
    .await
    .expect("create workgroup")
}

pub fn new_report(workgroup_id: i64, year: i32, quarter: i32) -> NewReport {
    NewReport {
        workgroup_id,
        year,
        quarter,
        detail: "What we did".to_string(),
        theory_of_change: String::new(),
        challenges: String::new(),
        plans: String::new(),
        participant_ids: Vec::new(),
        budget_items: Vec::new(),
    }
}

pub async fn create_report(pool: &PgPool, workgroup_id: i64, created_by: i64) -> i64 {
    report::create(pool, &new_report(workgroup_id, 2025, 1), created_by)
        .await
        .expect("create report")
}

pub fn new_proposal(title: &str, expires_at: Option<NaiveDate>) -> NewProposal {
    NewProposal {
        title: title.to_string(),
        description: "Proposal description".to_string(),
        expires_at,
        links: Vec::new(),
        workgroup_ids: Vec::new(),
        budget_items: Vec::new(),
    }
}

pub async fn create_proposal(pool: &PgPool, created_by: i64, expires_at: Option<NaiveDate>) -> i64 {
    proposal::create(pool, &new_proposal("Community garden", expires_at), created_by)
        .await
        .expect("create proposal")
}
