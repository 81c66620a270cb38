//! Storage seams used by the pipeline services.
//!
//! [`TransactionSource`] opens scoped transactions; [`InspectionStore`] is
//! the set of queries a transaction can run, split per table group. The
//! PostgreSQL implementations live beside this file; tests use an in-memory one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::entity::{inspection, inspection_item, inspection_name};
use crate::error::AppResult;
use crate::models::{InspectionStatus, ItemMaster, Progress};

/// Fields of an inspection item on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInspectionItem {
    pub inspection_id: i64,
    pub item_name_id: Option<i64>,
    pub item_name: String,
    pub taken_dt: Option<DateTime<Utc>>,
    pub image_path: Option<String>,
    pub progress: Progress,
}

impl NewInspectionItem {
    /// Item created for a master entry when its inspection is created.
    pub fn from_master(inspection_id: i64, master: &ItemMaster) -> Self {
        Self {
            inspection_id,
            item_name_id: Some(master.item_name_id),
            item_name: master.item_name.clone(),
            taken_dt: None,
            image_path: None,
            progress: Progress::INITIAL,
        }
    }
}

/// Fields of an inspection on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInspection {
    pub inspection_name_id: i64,
    pub worksheet_code: String,
    pub receipt_confirmation_date: i32,
    pub inspection_date: i32,
    pub company_code: String,
}

/// Filter of the inspection result export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFilter {
    pub inspection_name_id: i64,
    pub worksheet_code: Option<String>,
    /// Inclusive YYYYMMDD range
    pub start_date: i32,
    pub end_date: i32,
    pub limit: u64,
}

/// Inspection item queries.
///
/// Updates compare and increment `version`; a stale version fails with
/// [`crate::error::AppError::ConcurrencyConflict`].
#[async_trait]
pub trait ItemStore: Send {
    async fn find_item(&mut self, id: i64) -> AppResult<Option<inspection_item::Model>>;

    /// Find an item and hold an exclusive row lock on it until the transaction ends.
    async fn find_item_for_update(&mut self, id: i64)
    -> AppResult<Option<inspection_item::Model>>;

    async fn items_of_inspection(
        &mut self,
        inspection_id: i64,
    ) -> AppResult<Vec<inspection_item::Model>>;

    /// Items of an inspection updated at or after `since`.
    async fn items_updated_since(
        &mut self,
        inspection_id: i64,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<inspection_item::Model>>;

    async fn insert_item(&mut self, item: NewInspectionItem) -> AppResult<inspection_item::Model>;

    /// Write every mutable field of `item` if its version is still current.
    async fn update_item(
        &mut self,
        item: &inspection_item::Model,
    ) -> AppResult<inspection_item::Model>;

    /// Delete items by id, returning how many existed.
    async fn delete_items(&mut self, ids: &[i64]) -> AppResult<u64>;
}

/// Inspection queries.
#[async_trait]
pub trait InspectionRecords: Send {
    async fn find_inspection(&mut self, id: i64) -> AppResult<Option<inspection::Model>>;

    async fn find_inspection_by_key(
        &mut self,
        worksheet_code: &str,
        receipt_confirmation_date: i32,
    ) -> AppResult<Option<inspection::Model>>;

    async fn insert_inspection(&mut self, inspection: NewInspection)
    -> AppResult<inspection::Model>;

    async fn update_inspection(
        &mut self,
        inspection: &inspection::Model,
    ) -> AppResult<inspection::Model>;

    /// Unsent inspections in one of `statuses`, oldest update first.
    async fn unsent_inspections(
        &mut self,
        statuses: &[InspectionStatus],
    ) -> AppResult<Vec<inspection::Model>>;

    /// Inspections of a worksheet in one of `statuses`, oldest update first.
    async fn inspections_by_worksheet(
        &mut self,
        worksheet_code: &str,
        statuses: &[InspectionStatus],
    ) -> AppResult<Vec<inspection::Model>>;

    /// Inspections matching the export filter, newest inspection date first.
    async fn inspections_for_export(
        &mut self,
        filter: &ExportFilter,
    ) -> AppResult<Vec<inspection::Model>>;
}

/// Read-only master data queries.
#[async_trait]
pub trait MasterData: Send {
    async fn item_master(&mut self, item_name_id: i64) -> AppResult<Option<ItemMaster>>;

    async fn item_masters(&mut self, inspection_name_id: i64) -> AppResult<Vec<ItemMaster>>;

    async fn labels(&mut self, item_name_id: i64) -> AppResult<Vec<String>>;

    async fn inspection_name(&mut self, id: i64) -> AppResult<Option<inspection_name::Model>>;

    async fn inspection_name_by_name(
        &mut self,
        name: &str,
    ) -> AppResult<Option<inspection_name::Model>>;

    async fn inspection_names(&mut self) -> AppResult<Vec<inspection_name::Model>>;
}

/// Every query a transaction can run.
pub trait InspectionStore: ItemStore + InspectionRecords + MasterData {}

impl<T: ItemStore + InspectionRecords + MasterData> InspectionStore for T {}

/// A scoped transaction. Dropping it without commit rolls back.
#[async_trait]
pub trait StoreTransaction: InspectionStore {
    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Opens transactions.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;
}

/// Commit on success, roll back on failure.
///
/// The error of a failed body is returned unchanged; a failed rollback is
/// only logged since the connection drop rolls back anyway.
pub async fn finish<T>(tx: Box<dyn StoreTransaction>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed after error '{}': {}", e, rollback_err);
            }
            Err(e)
        }
    }
}
