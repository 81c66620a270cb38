//! Result submission: deletions, inspection status and item edits.
//!
//! Storage copies happen inside the transaction; the superseded objects are
//! deleted only after it commits.

use tracing::info;

use super::pipeline::{Pipeline, analysis_type_of};
use super::rename::{PendingDeletion, apply_submission, delete_superseded};
use crate::db::{NewInspectionItem, StoreTransaction, finish};
use crate::error::{AppError, AppResult};
use crate::models::{InspectionResultRequest, Progress, ResultItem};

impl Pipeline {
    /// Record the results of an inspection.
    pub async fn submit_results(&self, req: &InspectionResultRequest) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let result = self.submit_results_in(tx.as_mut(), req).await;
        let superseded = finish(tx, result).await?;

        delete_superseded(self.caps.storage.as_ref(), &superseded).await;
        Ok(())
    }

    async fn submit_results_in(
        &self,
        tx: &mut dyn StoreTransaction,
        req: &InspectionResultRequest,
    ) -> AppResult<Vec<PendingDeletion>> {
        let status = req.status()?;

        let delete_ids: Vec<i64> = req
            .delete_list
            .iter()
            .map(|item| item.inspection_item_id)
            .collect();
        if !delete_ids.is_empty() {
            let deleted = tx.delete_items(&delete_ids).await?;
            info!(
                "Deleted {} of {} listed items from inspection {}",
                deleted,
                delete_ids.len(),
                req.inspection_id
            );
        }

        let mut inspection = tx
            .find_inspection(req.inspection_id)
            .await?
            .ok_or_else(|| {
                AppError::Database(format!("Inspection {} not found", req.inspection_id))
            })?;
        inspection.status = status.as_i16();
        inspection.evidence_id = req.evidence_id;
        inspection.is_send = false;
        tx.update_inspection(&inspection).await?;

        let mut superseded = Vec::new();
        for submitted in &req.inspection_result_items {
            if let Some(deletion) = self.record_result(tx, req.inspection_id, submitted).await? {
                superseded.push(deletion);
            }
        }

        Ok(superseded)
    }

    async fn record_result(
        &self,
        tx: &mut dyn StoreTransaction,
        inspection_id: i64,
        submitted: &ResultItem,
    ) -> AppResult<Option<PendingDeletion>> {
        let Some(item_id) = submitted.inspection_item_id else {
            let item = tx
                .insert_item(NewInspectionItem {
                    inspection_id,
                    item_name_id: None,
                    item_name: submitted.inspection_item_name.clone(),
                    taken_dt: submitted.taken_dt,
                    image_path: submitted.s3_image_path.clone(),
                    progress: Progress::AnalysisFinished,
                })
                .await?;
            info!(
                "Added item {} '{}' to inspection {}",
                item.id, item.item_name, inspection_id
            );
            return Ok(None);
        };

        let mut item = tx
            .find_item(item_id)
            .await?
            .ok_or_else(|| AppError::Database(format!("Inspection item {} not found", item_id)))?;
        let analysis_type = analysis_type_of(tx, item.item_name_id).await?;

        let superseded =
            apply_submission(self.caps.storage.as_ref(), &mut item, analysis_type, submitted)
                .await?;
        tx.update_item(&item).await?;

        Ok(superseded)
    }
}
