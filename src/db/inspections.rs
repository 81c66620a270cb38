//! Database queries for inspections.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::entity::inspection::{self, ActiveModel, Entity as Inspection};
use crate::error::{AppError, AppResult};
use crate::models::InspectionStatus;

use super::router::OperationKind;
use super::store::{ExportFilter, InspectionRecords, NewInspection};
use super::transaction::RoutedTransaction;

fn status_codes(statuses: &[InspectionStatus]) -> Vec<i16> {
    statuses.iter().map(InspectionStatus::as_i16).collect()
}

#[async_trait]
impl InspectionRecords for RoutedTransaction {
    async fn find_inspection(&mut self, id: i64) -> AppResult<Option<inspection::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        Inspection::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get inspection: {}", e)))
    }

    async fn find_inspection_by_key(
        &mut self,
        worksheet_code: &str,
        receipt_confirmation_date: i32,
    ) -> AppResult<Option<inspection::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        Inspection::find()
            .filter(inspection::Column::WorksheetCode.eq(worksheet_code))
            .filter(inspection::Column::ReceiptConfirmationDate.eq(receipt_confirmation_date))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get inspection by key: {}", e)))
    }

    async fn insert_inspection(&mut self, new: NewInspection) -> AppResult<inspection::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            inspection_name_id: Set(new.inspection_name_id),
            worksheet_code: Set(new.worksheet_code),
            receipt_confirmation_date: Set(new.receipt_confirmation_date),
            inspection_date: Set(new.inspection_date),
            status: Set(InspectionStatus::Pending.as_i16()),
            evidence_id: Set(None),
            company_code: Set(new.company_code),
            send_count: Set(0),
            is_send: Set(false),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let conn = self.bind(OperationKind::Write).await?;
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert inspection: {}", e)))
    }

    async fn update_inspection(
        &mut self,
        current: &inspection::Model,
    ) -> AppResult<inspection::Model> {
        let now = Utc::now();
        let next_version = current.version + 1;

        let conn = self.bind(OperationKind::Write).await?;
        let result = Inspection::update_many()
            .col_expr(
                inspection::Column::InspectionDate,
                Expr::value(current.inspection_date),
            )
            .col_expr(inspection::Column::Status, Expr::value(current.status))
            .col_expr(inspection::Column::EvidenceId, Expr::value(current.evidence_id))
            .col_expr(
                inspection::Column::CompanyCode,
                Expr::value(current.company_code.clone()),
            )
            .col_expr(inspection::Column::SendCount, Expr::value(current.send_count))
            .col_expr(inspection::Column::IsSend, Expr::value(current.is_send))
            .col_expr(inspection::Column::Version, Expr::value(next_version))
            .col_expr(inspection::Column::UpdatedAt, Expr::value(now))
            .filter(inspection::Column::Id.eq(current.id))
            .filter(inspection::Column::Version.eq(current.version))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update inspection: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(AppError::ConcurrencyConflict(format!(
                "inspection {} is no longer at version {}",
                current.id, current.version
            )));
        }

        Ok(inspection::Model {
            version: next_version,
            updated_at: now,
            ..current.clone()
        })
    }

    async fn unsent_inspections(
        &mut self,
        statuses: &[InspectionStatus],
    ) -> AppResult<Vec<inspection::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        Inspection::find()
            .filter(inspection::Column::IsSend.eq(false))
            .filter(inspection::Column::Status.is_in(status_codes(statuses)))
            .order_by_asc(inspection::Column::UpdatedAt)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get unsent inspections: {}", e)))
    }

    async fn inspections_by_worksheet(
        &mut self,
        worksheet_code: &str,
        statuses: &[InspectionStatus],
    ) -> AppResult<Vec<inspection::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        Inspection::find()
            .filter(inspection::Column::WorksheetCode.eq(worksheet_code))
            .filter(inspection::Column::Status.is_in(status_codes(statuses)))
            .order_by_asc(inspection::Column::UpdatedAt)
            .all(conn)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to get inspections by worksheet: {}", e))
            })
    }

    async fn inspections_for_export(
        &mut self,
        filter: &ExportFilter,
    ) -> AppResult<Vec<inspection::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        let mut query = Inspection::find()
            .filter(inspection::Column::InspectionNameId.eq(filter.inspection_name_id))
            .filter(inspection::Column::InspectionDate.gte(filter.start_date))
            .filter(inspection::Column::InspectionDate.lte(filter.end_date));

        if let Some(code) = &filter.worksheet_code {
            query = query.filter(inspection::Column::WorksheetCode.eq(code.as_str()));
        }

        query
            .order_by_desc(inspection::Column::InspectionDate)
            .order_by_asc(inspection::Column::Id)
            .limit(filter.limit)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get inspections for export: {}", e)))
    }
}
