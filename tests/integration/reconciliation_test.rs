/// Reconciliation engine tests against a live database.
///
/// These verify at-most-once crediting under concurrent duplicate requests,
/// subscription replay idempotence, and ownership transfer.
use crate::{create_test_user, setup_test_db, test_claim};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use storekeep::services::ReconciliationService;
use storekeep::ApiError;
use time::Duration;
use tokio::task::JoinSet;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_concurrent_duplicate_purchases_credit_once() {
    let db = setup_test_db().await;
    let service = Arc::new(ReconciliationService::new(db.clone()));
    let user = create_test_user(&db).await;

    let original_transaction_id = format!("orig-{}", Uuid::new_v4());

    // Spawn 5 concurrent requests for the SAME receipt
    let mut tasks = JoinSet::new();
    for _ in 0..5 {
        let service = service.clone();
        let claim = test_claim(&original_transaction_id, None);
        let user_id = user.id;
        tasks.spawn(async move { service.reconcile_purchase(user_id, &claim, 1000).await });
    }

    let mut success_count = 0;
    let mut duplicate_count = 0;

    while let Some(result) = tasks.join_next().await {
        match result.expect("task panicked") {
            Ok(outcome) => {
                assert_eq!(outcome.credits_added, 1000);
                success_count += 1;
            }
            Err(ApiError::DuplicateTransaction) => duplicate_count += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(success_count, 1, "exactly one request must win");
    assert_eq!(duplicate_count, 4);

    // Balance incremented exactly once
    let refreshed = entity::users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.credit_balance, user.credit_balance + 1000);
}

#[tokio::test]
#[ignore]
async fn test_purchase_replay_is_rejected() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user = create_test_user(&db).await;

    let claim = test_claim(&format!("orig-{}", Uuid::new_v4()), None);

    let outcome = service
        .reconcile_purchase(user.id, &claim, 500)
        .await
        .expect("first purchase should succeed");
    assert_eq!(outcome.credits_added, 500);
    assert_eq!(outcome.total_credits, user.credit_balance + 500);

    let replay = service.reconcile_purchase(user.id, &claim, 500).await;
    assert!(matches!(replay, Err(ApiError::DuplicateTransaction)));

    let refreshed = entity::users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.credit_balance, user.credit_balance + 500);
}

#[tokio::test]
#[ignore]
async fn test_subscription_replay_converges_to_one_row() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user = create_test_user(&db).await;

    let claim = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::days(30)));

    let mut last_id = None;
    for _ in 0..3 {
        let subscription = service
            .reconcile_subscription(user.id, &claim, "premium")
            .await
            .expect("reconcile should succeed");
        assert_eq!(subscription.status, "active");
        assert_eq!(subscription.user_id, user.id);
        if let Some(id) = last_id {
            assert_eq!(subscription.id, id);
        }
        last_id = Some(subscription.id);
    }

    let rows = entity::subscriptions::Entity::find()
        .filter(
            entity::subscriptions::Column::OriginalTransactionId
                .eq(&claim.original_transaction_id),
        )
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_subscription_transfer_between_users() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user_a = create_test_user(&db).await;
    let user_b = create_test_user(&db).await;

    let claim = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::days(7)));

    let first = service
        .reconcile_subscription(user_a.id, &claim, "premium")
        .await
        .unwrap();
    assert_eq!(first.user_id, user_a.id);

    // Same receipt presented by a different identity: ownership moves
    let second = service
        .reconcile_subscription(user_b.id, &claim, "premium")
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.user_id, user_b.id);

    let rows = entity::subscriptions::Entity::find()
        .filter(
            entity::subscriptions::Column::OriginalTransactionId
                .eq(&claim.original_transaction_id),
        )
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1, "transfer must not clone the row");
}

#[tokio::test]
#[ignore]
async fn test_subscription_requires_expiry() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user = create_test_user(&db).await;

    let claim = test_claim(&format!("orig-{}", Uuid::new_v4()), None);

    let result = service.reconcile_subscription(user.id, &claim, "premium").await;
    assert!(matches!(result, Err(ApiError::MissingExpiry)));
}

#[tokio::test]
#[ignore]
async fn test_past_expiry_creates_expired_subscription() {
    let db = setup_test_db().await;
    let service = ReconciliationService::new(db.clone());
    let user = create_test_user(&db).await;

    // expires_at is after purchase_date but already in the past
    let mut claim = test_claim(&format!("orig-{}", Uuid::new_v4()), Some(Duration::hours(1)));
    claim.purchase_date -= Duration::days(2);
    claim.expires_at = Some(claim.purchase_date + Duration::days(1));

    let subscription = service
        .reconcile_subscription(user.id, &claim, "premium")
        .await
        .unwrap();
    assert_eq!(subscription.status, "expired");
}
