//! Shared helpers for the PostgreSQL tests.

use std::sync::Arc;
use std::time::Duration;

use inspection_pipeline_lib::config::{DatabaseSettings, DatabaseTarget, DatabaseTopology};
use inspection_pipeline_lib::db::{DbRouter, NewInspection, TransactionSource};
use inspection_pipeline_lib::entity::{inspection, inspection_name};
use inspection_pipeline_lib::migration::Migrator;
use sea_orm::{ActiveModelTrait, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATIONS_RUN: OnceCell<()> = OnceCell::const_new();

/// Connect to the test database. Migrations run only once.
pub async fn create_test_router() -> Arc<DbRouter> {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a PostgreSQL database");
    let settings = DatabaseSettings {
        topology: DatabaseTopology::Single(DatabaseTarget::Url(url.clone())),
        pool_size: 4,
        pool_timeout: Duration::from_secs(10),
        recycle: Duration::from_secs(60),
        log_queries: false,
    };

    let router = DbRouter::connect(&settings, &url, None)
        .await
        .expect("Failed to connect to database");

    MIGRATIONS_RUN
        .get_or_init(|| async {
            Migrator::up(router.source(), None)
                .await
                .expect("Failed to run migrations");
        })
        .await;

    Arc::new(router)
}

/// Random 10 character worksheet code for test isolation.
pub fn unique_worksheet() -> String {
    let digits: String = Uuid::new_v4()
        .as_u128()
        .to_string()
        .chars()
        .take(10)
        .collect();
    format!("{:0>10}", digits)
}

/// Insert a master inspection name with a unique suffix.
pub async fn create_inspection_name(router: &DbRouter, prefix: &str) -> inspection_name::Model {
    let name = format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..6]);
    inspection_name::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(router.source())
    .await
    .expect("Failed to insert inspection name")
}

/// Create an inspection in its own committed transaction.
pub async fn create_inspection(router: &DbRouter, name_id: i64) -> inspection::Model {
    let mut tx = router.begin().await.expect("Failed to begin");
    let inspection = tx
        .insert_inspection(NewInspection {
            inspection_name_id: name_id,
            worksheet_code: unique_worksheet(),
            receipt_confirmation_date: 20240110,
            inspection_date: 20240115,
            company_code: "C001".to_string(),
        })
        .await
        .expect("Failed to insert inspection");
    tx.commit().await.expect("Failed to commit");
    inspection
}
