//! Image linkage export to the external inspection system.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use super::pipeline::Pipeline;
use super::storage::split_bucket_path;
use crate::db::{StoreTransaction, finish};
use crate::entity::{inspection, inspection_item};
use crate::error::{AppError, AppResult};
use crate::models::{
    AiVerdict, AlignmentRecord, AlignmentSelection, AlignmentShot, InspectionStatus,
    MAX_ALIGNMENT_ITEMS, MAX_SEND_COUNT,
};

impl Pipeline {
    /// Collect inspections for the image linkage export.
    ///
    /// Unsent exports are marked sent in the same transaction.
    pub async fn align_images(
        &self,
        selection: &AlignmentSelection,
    ) -> AppResult<Vec<AlignmentRecord>> {
        let mut tx = self.db.begin().await?;
        let result = self.align_images_in(tx.as_mut(), selection).await;
        finish(tx, result).await
    }

    async fn align_images_in(
        &self,
        tx: &mut dyn StoreTransaction,
        selection: &AlignmentSelection,
    ) -> AppResult<Vec<AlignmentRecord>> {
        let inspections = match selection {
            AlignmentSelection::Unsent => {
                tx.unsent_inspections(&InspectionStatus::EXPORTABLE).await?
            }
            AlignmentSelection::Worksheet(code) => {
                tx.inspections_by_worksheet(code, &InspectionStatus::EXPORTABLE)
                    .await?
            }
        };

        let mut records = Vec::new();
        let mut item_count = 0;

        for inspection in inspections {
            let items = tx.items_of_inspection(inspection.id).await?;
            item_count += items.len();
            if item_count > MAX_ALIGNMENT_ITEMS {
                break;
            }

            records.push(self.alignment_record(tx, &inspection, &items).await?);

            if *selection == AlignmentSelection::Unsent {
                let mut sent = inspection;
                sent.is_send = true;
                if sent.send_count < MAX_SEND_COUNT {
                    sent.send_count += 1;
                }
                tx.update_inspection(&sent).await?;
            }
        }

        info!(
            "Image linkage export selected {} inspections ({:?})",
            records.len(),
            selection
        );
        Ok(records)
    }

    async fn alignment_record(
        &self,
        tx: &mut dyn StoreTransaction,
        inspection: &inspection::Model,
        items: &[inspection_item::Model],
    ) -> AppResult<AlignmentRecord> {
        let name = tx
            .inspection_name(inspection.inspection_name_id)
            .await?
            .ok_or_else(|| {
                AppError::Database(format!(
                    "Inspection name {} not found",
                    inspection.inspection_name_id
                ))
            })?;

        let mut shoot_list = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let shoot_type = match item.item_name_id {
                Some(id) => tx.item_master(id).await?.and_then(|m| m.shoot_type),
                None => None,
            };
            let image = match item.image_path.as_deref().filter(|p| !p.is_empty()) {
                Some(path) => {
                    let (bucket, key) = split_bucket_path(path);
                    Some(STANDARD.encode(self.caps.storage.get(bucket, key).await?))
                }
                None => None,
            };
            shoot_list.push(alignment_shot(index + 1, shoot_type, item, image));
        }

        Ok(AlignmentRecord {
            company_code: inspection.company_code.clone(),
            worksheet_code: inspection.worksheet_code.clone(),
            receipt_confirmation_date: inspection.receipt_confirmation_date,
            inspection_name: name.name,
            evidence_id: inspection.evidence_id,
            send_count: inspection.send_count,
            shoot_count: shoot_list.len(),
            shoot_list,
        })
    }
}

/// One exported image. Edited model and serial number take precedence over detected ones.
fn alignment_shot(
    shoot_no: usize,
    shoot_type: Option<i16>,
    item: &inspection_item::Model,
    image: Option<String>,
) -> AlignmentShot {
    AlignmentShot {
        shoot_no,
        shoot_type,
        item_name: item.item_name.clone(),
        taken_at: item
            .taken_dt
            .and_then(|dt| dt.format("%Y%m%d%H%M").to_string().parse().ok()),
        verdict: item
            .ai_result
            .as_deref()
            .and_then(AiVerdict::from_label)
            .map(|verdict| verdict.code()),
        image,
        ng_comment: item.ng_comment.clone(),
        model: item
            .edited_model
            .clone()
            .or_else(|| item.detected_model.clone()),
        serial_number: item
            .edited_serial_number
            .clone()
            .or_else(|| item.detected_serial_number.clone()),
    }
}
