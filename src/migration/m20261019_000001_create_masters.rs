//! Migration: Create master data tables.
//!
//! Inspection names, their items (with analysis type and analysis API
//! settings) and the labels an AI analysis must detect.

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
                -- Shared trigger function for updated_at columns
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;

                CREATE TABLE inspection_names (
                    id BIGSERIAL PRIMARY KEY,
                    name VARCHAR(15) NOT NULL UNIQUE
                );

                CREATE TABLE inspection_item_names (
                    id BIGSERIAL PRIMARY KEY,
                    inspection_name_id BIGINT NOT NULL REFERENCES inspection_names(id),
                    item_name VARCHAR(16) NOT NULL,

                    -- 1 = OCR, 2 = AI, 3 = no automated analysis
                    analysis_type SMALLINT NOT NULL CHECK (analysis_type IN (1, 2, 3)),

                    -- External analysis API settings (AI items only)
                    api_url VARCHAR(300),
                    master_image VARCHAR(100),
                    auth_token VARCHAR(100),

                    shoot_type SMALLINT
                );

                CREATE INDEX idx_inspection_item_names_inspection_name_id
                    ON inspection_item_names(inspection_name_id);

                CREATE TABLE labels (
                    id BIGSERIAL PRIMARY KEY,
                    item_name_id BIGINT NOT NULL REFERENCES inspection_item_names(id),
                    label VARCHAR(50) NOT NULL
                );

                CREATE INDEX idx_labels_item_name_id ON labels(item_name_id);
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
                DROP TABLE IF EXISTS labels CASCADE;
                DROP TABLE IF EXISTS inspection_item_names CASCADE;
                DROP TABLE IF EXISTS inspection_names CASCADE;
                DROP FUNCTION IF EXISTS update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }
}
