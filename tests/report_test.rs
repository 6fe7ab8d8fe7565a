//! Quarterly report persistence.

mod common;

use common::*;
use consenso::errors::AppError;
use consenso::models::budget::NewBudgetItem;
use consenso::models::consensus::ConsensusStatus;
use consenso::models::report::{self, ReportFilter};
use consenso::models::user::Role;

#[tokio::test]
async fn test_create_and_load_detail() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let author = create_user(pool, "author", Role::Member).await;
    let helper = create_user(pool, "helper", Role::Member).await;
    let wg = create_workgroup(pool, "Outreach").await;

    let mut input = new_report(wg, 2025, 2);
    input.participant_ids = vec![helper, author, helper];
    input.budget_items = vec![
        NewBudgetItem { description: "Venue".to_string(), amount_cents: 25_000 },
        NewBudgetItem { description: "Snacks".to_string(), amount_cents: 10_000 },
    ];
    let id = report::create(pool, &input, author).await.expect("create report");

    let detail = report::find_by_id(pool, id).await.expect("find").expect("report exists");
    assert_eq!(detail.workgroup_name, "Outreach");
    assert_eq!(detail.period_label(), "Q2 2025");
    assert_eq!(detail.consensus_status, ConsensusStatus::Pending);
    assert_eq!(detail.created_by.id, author);
    assert_eq!(detail.participants.len(), 2);
    assert_eq!(detail.budget.items.len(), 2);
    assert_eq!(detail.budget.total_cents, 35_000);
    assert_eq!(detail.budget.total_display, "$350");
    assert_eq!(detail.current_round, None);
    assert_eq!(detail.round_count, 0);

    assert!(report::exists(pool, id).await.expect("exists"));
    assert!(!report::exists(pool, id + 1).await.expect("exists"));
    assert!(report::find_by_id(pool, id + 1).await.expect("find").is_none());

    db.cleanup().await;
}

#[tokio::test]
async fn test_one_report_per_workgroup_and_quarter() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let author = create_user(pool, "author", Role::Member).await;
    let wg = create_workgroup(pool, "Outreach").await;
    create_report(pool, wg, author).await;

    let duplicate = report::create(pool, &new_report(wg, 2025, 1), author).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    report::create(pool, &new_report(wg, 2025, 2), author)
        .await
        .expect("next quarter is fine");

    db.cleanup().await;
}

#[tokio::test]
async fn test_list_filters() {
    let Some(db) = setup_test_db().await else { return };
    let pool = db.pool();

    let author = create_user(pool, "author", Role::Member).await;
    let outreach = create_workgroup(pool, "Outreach").await;
    let research = create_workgroup(pool, "Research").await;
    report::create(pool, &new_report(outreach, 2024, 4), author).await.expect("create");
    report::create(pool, &new_report(outreach, 2025, 1), author).await.expect("create");
    report::create(pool, &new_report(research, 2025, 1), author).await.expect("create");

    let all = report::find_all(pool, &ReportFilter::default()).await.expect("list");
    assert_eq!(all.len(), 3);
    assert_eq!((all[0].year, all[0].quarter), (2025, 1));
    assert_eq!((all[2].year, all[2].quarter), (2024, 4));

    let outreach_only = report::find_for_workgroup(pool, outreach).await.expect("list");
    assert_eq!(outreach_only.len(), 2);

    let pending = report::find_all(
        pool,
        &ReportFilter { workgroup_id: None, status: Some(ConsensusStatus::Consensed) },
    )
    .await
    .expect("list");
    assert!(pending.is_empty());

    db.cleanup().await;
}

#[test]
fn test_report_validation() {
    let mut input = new_report(1, 1999, 5);
    input.budget_items = vec![NewBudgetItem { description: " ".to_string(), amount_cents: -1 }];
    let errors = input.validate();
    assert_eq!(errors.len(), 4);

    assert!(new_report(1, 2025, 4).validate().is_empty());
}
