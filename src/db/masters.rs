//! Database queries for master data.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entity::inspection_item_name::{self as item_name, Entity as InspectionItemName};
use crate::entity::inspection_name::{self, Entity as InspectionName};
use crate::entity::label::{self, Entity as Label};
use crate::error::{AppError, AppResult};
use crate::models::ItemMaster;

use super::router::OperationKind;
use super::store::MasterData;
use super::transaction::RoutedTransaction;

#[async_trait]
impl MasterData for RoutedTransaction {
    async fn item_master(&mut self, item_name_id: i64) -> AppResult<Option<ItemMaster>> {
        let conn = self.bind(OperationKind::Read).await?;
        let result = InspectionItemName::find_by_id(item_name_id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get item master: {}", e)))?;

        Ok(result.map(ItemMaster::from))
    }

    async fn item_masters(&mut self, inspection_name_id: i64) -> AppResult<Vec<ItemMaster>> {
        let conn = self.bind(OperationKind::Read).await?;
        let result = InspectionItemName::find()
            .filter(item_name::Column::InspectionNameId.eq(inspection_name_id))
            .order_by_asc(item_name::Column::Id)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get item masters: {}", e)))?;

        Ok(result.into_iter().map(ItemMaster::from).collect())
    }

    async fn labels(&mut self, item_name_id: i64) -> AppResult<Vec<String>> {
        let conn = self.bind(OperationKind::Read).await?;
        let result = Label::find()
            .filter(label::Column::ItemNameId.eq(item_name_id))
            .order_by_asc(label::Column::Id)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get labels: {}", e)))?;

        Ok(result.into_iter().map(|l| l.label).collect())
    }

    async fn inspection_name(&mut self, id: i64) -> AppResult<Option<inspection_name::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        InspectionName::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get inspection name: {}", e)))
    }

    async fn inspection_name_by_name(
        &mut self,
        name: &str,
    ) -> AppResult<Option<inspection_name::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        InspectionName::find()
            .filter(inspection_name::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get inspection name: {}", e)))
    }

    async fn inspection_names(&mut self) -> AppResult<Vec<inspection_name::Model>> {
        let conn = self.bind(OperationKind::Read).await?;
        InspectionName::find()
            .order_by_asc(inspection_name::Column::Id)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to list inspection names: {}", e)))
    }
}
