//! Migration: Create inspection items table.
//!
//! Items are deleted explicitly by id, so there is no cascade from inspections.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE inspection_items (
                    id BIGSERIAL PRIMARY KEY,
                    inspection_id BIGINT NOT NULL REFERENCES inspections(id),
                    item_name_id BIGINT REFERENCES inspection_item_names(id),
                    item_name VARCHAR(16) NOT NULL,
                    taken_dt TIMESTAMPTZ,

                    -- "bucket/key" of the current image
                    image_path VARCHAR(300),

                    -- Analysis outcome
                    ai_result VARCHAR(4),
                    ng_comment VARCHAR(50),
                    detected_model VARCHAR(20),
                    detected_serial_number VARCHAR(12),
                    edited_model VARCHAR(20),
                    edited_serial_number VARCHAR(12),

                    -- 0 waiting image, 1 local only, 2 saved, 3 requested, 4 analyzing, 5 finished
                    progress SMALLINT NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 5),

                    version BIGINT NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    CONSTRAINT uq_inspection_items_item_name_id UNIQUE (inspection_id, item_name_id),
                    CONSTRAINT uq_inspection_items_item_name UNIQUE (inspection_id, item_name)
                );

                -- Analysis result polling
                CREATE INDEX idx_inspection_items_inspection_updated
                    ON inspection_items(inspection_id, updated_at);

                CREATE TRIGGER update_inspection_items_updated_at
                    BEFORE UPDATE ON inspection_items
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_inspection_items_updated_at ON inspection_items;
                DROP TABLE IF EXISTS inspection_items CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
