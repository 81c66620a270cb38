//! Item inserts, versioned updates and uniqueness against PostgreSQL.

use inspection_pipeline_lib::db::{NewInspectionItem, TransactionSource};
use inspection_pipeline_lib::error::AppError;
use inspection_pipeline_lib::models::Progress;

use super::test_helpers::{create_inspection, create_inspection_name, create_test_router};

fn new_item(inspection_id: i64, name: &str) -> NewInspectionItem {
    NewInspectionItem {
        inspection_id,
        item_name_id: None,
        item_name: name.to_string(),
        taken_dt: None,
        image_path: None,
        progress: Progress::INITIAL,
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_insert_starts_at_version_zero_and_update_increments() {
    let router = create_test_router().await;
    let name = create_inspection_name(&router, "Items").await;
    let inspection = create_inspection(&router, name.id).await;

    let mut tx = router.begin().await.unwrap();
    let item = tx.insert_item(new_item(inspection.id, "Front")).await.unwrap();
    assert_eq!(item.version, 0);

    let mut changed = item.clone();
    changed.ai_result = Some("OK".to_string());
    let updated = tx.update_item(&changed).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(updated.version, 1);
    assert_eq!(updated.ai_result.as_deref(), Some("OK"));
    assert!(updated.updated_at >= item.updated_at);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_stale_version_is_a_conflict() {
    let router = create_test_router().await;
    let name = create_inspection_name(&router, "Stale").await;
    let inspection = create_inspection(&router, name.id).await;

    let mut tx = router.begin().await.unwrap();
    let item = tx.insert_item(new_item(inspection.id, "Front")).await.unwrap();
    tx.update_item(&item).await.unwrap();

    let err = tx.update_item(&item).await.unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, AppError::ConcurrencyConflict(_)));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_duplicate_item_name_is_rejected() {
    let router = create_test_router().await;
    let name = create_inspection_name(&router, "Dupes").await;
    let inspection = create_inspection(&router, name.id).await;

    let mut tx = router.begin().await.unwrap();
    tx.insert_item(new_item(inspection.id, "Front")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = router.begin().await.unwrap();
    let err = tx
        .insert_item(new_item(inspection.id, "Front"))
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();

    assert!(matches!(err, AppError::Database(_)));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_rollback_discards_writes() {
    let router = create_test_router().await;
    let name = create_inspection_name(&router, "Rollback").await;
    let inspection = create_inspection(&router, name.id).await;

    let mut tx = router.begin().await.unwrap();
    let item = tx.insert_item(new_item(inspection.id, "Front")).await.unwrap();
    tx.rollback().await.unwrap();

    let mut tx = router.begin().await.unwrap();
    assert!(tx.find_item(item.id).await.unwrap().is_none());
    tx.commit().await.unwrap();
}
