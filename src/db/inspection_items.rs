//! Database queries for inspection items.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use crate::entity::inspection_item::{self as item, ActiveModel, Entity as InspectionItem};
use crate::error::{AppError, AppResult};

use super::router::OperationKind;
use super::store::{ItemStore, NewInspectionItem};
use super::transaction::RoutedTransaction;

#[async_trait]
impl ItemStore for RoutedTransaction {
    async fn find_item(&mut self, id: i64) -> AppResult<Option<item::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        InspectionItem::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get inspection item: {}", e)))
    }

    async fn find_item_for_update(&mut self, id: i64) -> AppResult<Option<item::Model>> {
        let conn = self.bind(OperationKind::LockedRead).await?;
        InspectionItem::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to lock inspection item: {}", e)))
    }

    async fn items_of_inspection(&mut self, inspection_id: i64) -> AppResult<Vec<item::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        InspectionItem::find()
            .filter(item::Column::InspectionId.eq(inspection_id))
            .order_by_asc(item::Column::Id)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get inspection items: {}", e)))
    }

    async fn items_updated_since(
        &mut self,
        inspection_id: i64,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<item::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        InspectionItem::find()
            .filter(item::Column::InspectionId.eq(inspection_id))
            .filter(item::Column::UpdatedAt.gte(since))
            .order_by_asc(item::Column::Id)
            .all(conn)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to get updated inspection items: {}", e))
            })
    }

    async fn insert_item(&mut self, new: NewInspectionItem) -> AppResult<item::Model> {
        let now = Utc::now();
        let model = ActiveModel {
            inspection_id: Set(new.inspection_id),
            item_name_id: Set(new.item_name_id),
            item_name: Set(new.item_name),
            taken_dt: Set(new.taken_dt),
            image_path: Set(new.image_path),
            ai_result: Set(None),
            ng_comment: Set(None),
            detected_model: Set(None),
            detected_serial_number: Set(None),
            edited_model: Set(None),
            edited_serial_number: Set(None),
            progress: Set(new.progress.as_i16()),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let conn = self.bind(OperationKind::Write).await?;
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert inspection item: {}", e)))
    }

    async fn update_item(&mut self, current: &item::Model) -> AppResult<item::Model> {
        let now = Utc::now();
        let next_version = current.version + 1;

        let conn = self.bind(OperationKind::Write).await?;
        let result = InspectionItem::update_many()
            .col_expr(item::Column::ItemNameId, Expr::value(current.item_name_id))
            .col_expr(item::Column::ItemName, Expr::value(current.item_name.clone()))
            .col_expr(item::Column::TakenDt, Expr::value(current.taken_dt))
            .col_expr(item::Column::ImagePath, Expr::value(current.image_path.clone()))
            .col_expr(item::Column::AiResult, Expr::value(current.ai_result.clone()))
            .col_expr(item::Column::NgComment, Expr::value(current.ng_comment.clone()))
            .col_expr(
                item::Column::DetectedModel,
                Expr::value(current.detected_model.clone()),
            )
            .col_expr(
                item::Column::DetectedSerialNumber,
                Expr::value(current.detected_serial_number.clone()),
            )
            .col_expr(
                item::Column::EditedModel,
                Expr::value(current.edited_model.clone()),
            )
            .col_expr(
                item::Column::EditedSerialNumber,
                Expr::value(current.edited_serial_number.clone()),
            )
            .col_expr(item::Column::Progress, Expr::value(current.progress))
            .col_expr(item::Column::Version, Expr::value(next_version))
            .col_expr(item::Column::UpdatedAt, Expr::value(now))
            .filter(item::Column::Id.eq(current.id))
            .filter(item::Column::Version.eq(current.version))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update inspection item: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(AppError::ConcurrencyConflict(format!(
                "inspection item {} is no longer at version {}",
                current.id, current.version
            )));
        }

        Ok(item::Model {
            version: next_version,
            updated_at: now,
            ..current.clone()
        })
    }

    async fn delete_items(&mut self, ids: &[i64]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.bind(OperationKind::Write).await?;
        let result = InspectionItem::delete_many()
            .filter(item::Column::Id.is_in(ids.to_vec()))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete inspection items: {}", e)))?;

        Ok(result.rows_affected)
    }
}
