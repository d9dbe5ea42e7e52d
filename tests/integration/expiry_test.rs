/// Expiry sweeper tests against a live database.
use crate::{create_test_user, setup_test_db, test_claim};
use sea_orm::EntityTrait;
use storekeep::config::ExpiryConfig;
use storekeep::services::{ExpiryService, ReconciliationService};
use time::Duration;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_sweep_expires_past_due_subscriptions() {
    let db = setup_test_db().await;
    let reconciliation = ReconciliationService::new(db.clone());
    let expiry = ExpiryService::new(db.clone(), &ExpiryConfig::default());
    let user = create_test_user(&db).await;

    // Past due: purchased two days ago, expired a minute ago
    let mut past_due = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::days(2)));
    past_due.purchase_date -= Duration::days(2);
    past_due.expires_at = Some(past_due.purchase_date + Duration::days(2) - Duration::minutes(1));

    // Current: a week of runway left
    let current = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::weeks(1)));

    let past_due_sub = reconciliation
        .reconcile_subscription(user.id, &past_due, "premium")
        .await
        .unwrap();
    // Created in the past-due state already? Status derivation says expired
    // only when expires_at <= now at creation; force it active to exercise
    // the sweep transition.
    let mut active: entity::subscriptions::ActiveModel = past_due_sub.clone().into();
    active.status = sea_orm::Set("active".to_string());
    let past_due_sub = sea_orm::ActiveModelTrait::update(active, &db).await.unwrap();
    assert_eq!(past_due_sub.status, "active");

    let current_sub = reconciliation
        .reconcile_subscription(user.id, &current, "premium")
        .await
        .unwrap();
    assert_eq!(current_sub.status, "active");

    let expired_count = expiry.sweep().await.unwrap();
    assert!(expired_count >= 1, "sweep must count the past-due row");

    let refreshed_past_due = entity::subscriptions::Entity::find_by_id(past_due_sub.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed_past_due.status, "expired");

    let refreshed_current = entity::subscriptions::Entity::find_by_id(current_sub.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed_current.status, "active", "future expiry untouched");
}

#[tokio::test]
#[ignore]
async fn test_sweep_is_idempotent() {
    let db = setup_test_db().await;
    let reconciliation = ReconciliationService::new(db.clone());
    let expiry = ExpiryService::new(db.clone(), &ExpiryConfig::default());
    let user = create_test_user(&db).await;

    let mut claim = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::days(1)));
    claim.purchase_date -= Duration::days(2);
    claim.expires_at = Some(claim.purchase_date + Duration::days(1));

    let subscription = reconciliation
        .reconcile_subscription(user.id, &claim, "premium")
        .await
        .unwrap();
    let mut active: entity::subscriptions::ActiveModel = subscription.clone().into();
    active.status = sea_orm::Set("active".to_string());
    let subscription = sea_orm::ActiveModelTrait::update(active, &db).await.unwrap();

    expiry.sweep().await.unwrap();
    let first_pass = entity::subscriptions::Entity::find_by_id(subscription.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first_pass.status, "expired");

    // Re-running the sweep leaves the already-expired row alone
    expiry.sweep().await.unwrap();
    let second_pass = entity::subscriptions::Entity::find_by_id(subscription.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second_pass.status, "expired");
    assert_eq!(second_pass.updated_at, first_pass.updated_at);
}
