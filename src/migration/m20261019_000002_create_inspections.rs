//! Migration: Create inspections table.
//!
//! One inspection per worksheet and receipt confirmation date.

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
                CREATE TABLE inspections (
                    id BIGSERIAL PRIMARY KEY,
                    inspection_name_id BIGINT NOT NULL REFERENCES inspection_names(id),
                    worksheet_code VARCHAR(10) NOT NULL,
                    receipt_confirmation_date INTEGER NOT NULL,
                    inspection_date INTEGER NOT NULL,

                    -- 0 pending, 1 in progress, 2 reinspection, 3 conditionally completed, 4 completed
                    status SMALLINT NOT NULL DEFAULT 0 CHECK (status BETWEEN 0 AND 4),
                    evidence_id SMALLINT,
                    company_code VARCHAR(8) NOT NULL,

                    -- Image linkage bookkeeping
                    send_count SMALLINT NOT NULL DEFAULT 0 CHECK (send_count BETWEEN 0 AND 9),
                    is_send BOOLEAN NOT NULL DEFAULT FALSE,

                    version BIGINT NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    CONSTRAINT uq_inspections_worksheet_receipt
                        UNIQUE (worksheet_code, receipt_confirmation_date)
                );

                -- Unsent lookup for the image linkage export
                CREATE INDEX idx_inspections_unsent ON inspections(updated_at)
                    WHERE is_send = FALSE;

                CREATE INDEX idx_inspections_name_date
                    ON inspections(inspection_name_id, inspection_date);

                CREATE TRIGGER update_inspections_updated_at
                    BEFORE UPDATE ON inspections
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
                DROP TRIGGER IF EXISTS update_inspections_updated_at ON inspections;
                DROP TABLE IF EXISTS inspections CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
