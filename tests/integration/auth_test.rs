/// Anonymous user provisioning tests against a live database.
use crate::setup_test_db;
use storekeep::services::UserService;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_find_or_create_is_idempotent_per_device() {
    let db = setup_test_db().await;
    let service = UserService::new(db.clone());
    let device_id = format!("device-{}", Uuid::new_v4());

    let first = service.find_or_create_by_device_id(&device_id).await.unwrap();
    let second = service.find_or_create_by_device_id(&device_id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(first.is_anonymous);
    assert_eq!(first.device_id, device_id);
    assert_eq!(first.credit_balance, 0);
}

#[tokio::test]
#[ignore]
async fn test_distinct_devices_get_distinct_users() {
    let db = setup_test_db().await;
    let service = UserService::new(db.clone());

    let a = service
        .find_or_create_by_device_id(&format!("device-{}", Uuid::new_v4()))
        .await
        .unwrap();
    let b = service
        .find_or_create_by_device_id(&format!("device-{}", Uuid::new_v4()))
        .await
        .unwrap();

    assert_ne!(a.id, b.id);
}
