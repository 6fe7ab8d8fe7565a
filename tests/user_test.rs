//! Accounts, admin seeding, the audit trail, and the expiry sweep.

mod common;

use std::collections::HashMap;

use common::*;
use consenso::audit;
use consenso::auth::password;
use consenso::config::AppConfig;
use consenso::errors::AppError;
use consenso::models::consensus::ProposalStatus;
use consenso::models::proposal;
use consenso::models::user::{self, NewUser, Role};
use consenso::{db, scheduler};

fn config(admin_password: &str) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://unused".to_string()),
        ("ADMIN_USERNAME", "root".to_string()),
        ("ADMIN_PASSWORD", admin_password.to_string()),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("config")
}

#[tokio::test]
async fn test_seed_admin_only_on_empty_database() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    assert!(db::seed_admin(pool, &config("s3cret-pass")).await.expect("seed"));
    assert!(!db::seed_admin(pool, &config("other-pass")).await.expect("second seed"));
    assert_eq!(user::count(pool).await.expect("count"), 1);

    let root = user::find_by_username(pool, "root").await.expect("find").expect("seeded");
    assert_eq!(root.role, Role::SuperAdmin);
    assert!(password::verify_password("s3cret-pass", &root.password_hash).expect("verify"));

    db.cleanup().await;
}

#[tokio::test]
async fn test_usernames_are_unique() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let id = create_user(pool, "alice", Role::Member).await;
    let duplicate = user::create(
        pool,
        &NewUser {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            display_name: "Another Alice".to_string(),
            password_hash: password::hash_password(TEST_PASSWORD).expect("hash"),
            role: Role::Member,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let shown = user::find_display_by_id(pool, id).await.expect("find").expect("exists");
    assert_eq!(shown.username, "alice");
    assert_eq!(user::missing_ids(pool, &[id, id + 50]).await.expect("missing"), vec![id + 50]);
    assert!(user::missing_ids(pool, &[]).await.expect("missing").is_empty());

    db.cleanup().await;
}

#[tokio::test]
async fn test_audit_entries_are_recorded_per_target() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let admin = create_user(pool, "admin1", Role::Admin).await;
    audit::log(pool, admin, "report.create", "report", 7, serde_json::json!({ "quarter": 1 }))
        .await
        .expect("audit");
    audit::record(
        pool,
        admin,
        "report.mark",
        "report",
        7,
        serde_json::json!({ "status": "CONSENSED" }),
    )
    .await;
    audit::record(pool, admin, "proposal.create", "proposal", 7, serde_json::Value::Null).await;

    let entries = audit::find_for_target(pool, "report", 7).await.expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "report.mark");
    assert_eq!(entries[0].user_id, Some(admin));
    assert!(entries[1].details.contains("quarter"));

    db.cleanup().await;
}

#[tokio::test]
async fn test_expiry_sweep_moves_overdue_proposals() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let author = create_user(pool, "author", Role::Member).await;
    let overdue = create_proposal(pool, author, Some(date(2020, 1, 1))).await;
    let open = create_proposal(pool, author, None).await;

    scheduler::run_expiry_sweep(pool).await;

    let far_past = date(2019, 1, 1);
    let swept = proposal::find_by_id(pool, overdue, far_past).await.expect("find").expect("exists");
    assert_eq!(swept.status, ProposalStatus::Expired);
    let untouched = proposal::find_by_id(pool, open, far_past)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(untouched.status, ProposalStatus::InReview);

    db.cleanup().await;
}
