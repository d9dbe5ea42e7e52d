/// Smart restore tests against a live database.
use crate::{create_test_user, setup_test_db, test_claim};
use sea_orm::EntityTrait;
use storekeep::services::reconciliation_service::RestoreOutcome;
use storekeep::services::ReconciliationService;
use time::Duration;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_restore_skips_subscription_already_owned() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user = create_test_user(&db).await;

    let claim = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::days(7)));
    service
        .reconcile_subscription(user.id, &claim, "premium")
        .await
        .unwrap();

    let outcome = service
        .restore_subscription(user.id, &claim, &claim.product_id, "premium")
        .await
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::Skipped);
}

#[tokio::test]
#[ignore]
async fn test_restore_transfers_owner_without_touching_expiry() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user_a = create_test_user(&db).await;
    let user_b = create_test_user(&db).await;

    let claim = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::days(14)));
    let original = service
        .reconcile_subscription(user_a.id, &claim, "premium")
        .await
        .unwrap();

    // A later claim for the same receipt would renew; restore must not
    let mut renewed_claim = claim.clone();
    renewed_claim.expires_at = Some(original.expires_at + Duration::days(30));

    let outcome = service
        .restore_subscription(user_b.id, &renewed_claim, &claim.product_id, "premium")
        .await
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::Restored);

    let transferred = entity::subscriptions::Entity::find_by_id(original.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transferred.user_id, user_b.id);
    assert_eq!(transferred.expires_at, original.expires_at);
    assert_eq!(transferred.status, original.status);
}

#[tokio::test]
#[ignore]
async fn test_restore_creates_unseen_subscription() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user = create_test_user(&db).await;

    let claim = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::days(7)));

    let outcome = service
        .restore_subscription(user.id, &claim, &claim.product_id, "premium")
        .await
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::Restored);

    let active = service.active_subscription(user.id).await.unwrap();
    let active = active.expect("restored subscription should be active");
    assert_eq!(active.original_transaction_id, claim.original_transaction_id);
}
