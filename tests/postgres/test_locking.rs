//! Row lock serialisation of concurrent item writers.

use std::time::Duration;

use inspection_pipeline_lib::db::{NewInspectionItem, TransactionSource};
use inspection_pipeline_lib::models::Progress;

use super::test_helpers::{create_inspection, create_inspection_name, create_test_router};

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_locked_writers_both_succeed_in_order() {
    let router = create_test_router().await;
    let name = create_inspection_name(&router, "Locks").await;
    let inspection = create_inspection(&router, name.id).await;

    let mut tx = router.begin().await.unwrap();
    let item = tx
        .insert_item(NewInspectionItem {
            inspection_id: inspection.id,
            item_name_id: None,
            item_name: "Front".to_string(),
            taken_dt: None,
            image_path: None,
            progress: Progress::RequestReceived,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let writer = |label: &'static str, pause: Duration| {
        let router = router.clone();
        let id = item.id;
        tokio::spawn(async move {
            let mut tx = router.begin().await.unwrap();
            let mut locked = tx.find_item_for_update(id).await.unwrap().unwrap();
            tokio::time::sleep(pause).await;
            locked.ai_result = Some(label.to_string());
            let written = tx.update_item(&locked).await.unwrap();
            tx.commit().await.unwrap();
            written.version
        })
    };

    let first = writer("OK", Duration::from_millis(200));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = writer("NG", Duration::ZERO);

    let mut versions = vec![first.await.unwrap(), second.await.unwrap()];
    versions.sort();
    assert_eq!(versions, vec![1, 2]);

    let mut tx = router.begin().await.unwrap();
    let stored = tx.find_item(item.id).await.unwrap().unwrap();
    tx.commit().await.unwrap();
    assert_eq!(stored.ai_result.as_deref(), Some("NG"));
    assert_eq!(stored.version, 2);
}
