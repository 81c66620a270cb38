//! Inspection pipeline operations.
//!
//! Each public operation runs inside one routed transaction obtained from
//! [`TransactionSource`]: it commits when the body succeeds and rolls back
//! and returns the body's error otherwise. External capabilities are held as
//! trait objects so the pipeline runs against fakes in tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::analysis_api::AnalysisApi;
use super::interpreter::PlateReader;
use super::queue::MessageQueue;
use super::storage::ObjectStore;
use super::text_detection::TextDetector;
use crate::config::{ExportSettings, QueueSettings};
use crate::db::{NewInspection, NewInspectionItem, StoreTransaction, TransactionSource, finish};
use crate::entity::inspection;
use crate::error::{AppError, AppResult};
use crate::models::{
    AnalysisAccepted, AnalysisRequest, AnalysisResultItem, AnalysisResultsResponse, AnalysisType,
    InspectionItemView, InspectionItemsRequest, InspectionItemsResponse, InspectionNameView,
    InspectionNamesResponse, InspectionSchedule, ProgressEvent,
};

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Capabilities {
    pub storage: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn MessageQueue>,
    pub text: Arc<dyn TextDetector>,
    pub analysis: Arc<dyn AnalysisApi>,
}

/// Inspection pipeline service shared by the HTTP handlers and queue consumers.
pub struct Pipeline {
    pub(crate) db: Arc<dyn TransactionSource>,
    pub(crate) caps: Capabilities,
    pub(crate) plate_reader: PlateReader,
    pub(crate) queues: QueueSettings,
    pub(crate) export: ExportSettings,
}

impl Pipeline {
    pub fn new(
        db: Arc<dyn TransactionSource>,
        caps: Capabilities,
        plate_reader: PlateReader,
        queues: QueueSettings,
        export: ExportSettings,
    ) -> Self {
        Self {
            db,
            caps,
            plate_reader,
            queues,
            export,
        }
    }

    pub fn queues(&self) -> &QueueSettings {
        &self.queues
    }

    /// Outbound queue of an analysis type. OTHER has none.
    pub(crate) fn queue_for(&self, analysis_type: AnalysisType) -> Option<&str> {
        match analysis_type {
            AnalysisType::Ocr => Some(&self.queues.ocr_queue_url),
            AnalysisType::Ai => Some(&self.queues.ai_queue_url),
            AnalysisType::Other => None,
        }
    }

    // ------------------------------------------------------------------------
    // Inspection item lookup
    // ------------------------------------------------------------------------

    /// Find the items of an inspection, creating the inspection and its
    /// items from the master on first lookup.
    pub async fn inspection_items(
        &self,
        req: &InspectionItemsRequest,
    ) -> AppResult<InspectionItemsResponse> {
        let mut tx = self.db.begin().await?;
        let result = lookup_items(tx.as_mut(), req).await;
        finish(tx, result).await
    }

    // ------------------------------------------------------------------------
    // Begin analysis
    // ------------------------------------------------------------------------

    /// Mark an item as requested and dispatch it to its analysis queue.
    pub async fn begin_analysis(&self, req: &AnalysisRequest) -> AppResult<AnalysisAccepted> {
        let mut tx = self.db.begin().await?;
        let result = self.begin_analysis_in(tx.as_mut(), req).await;
        finish(tx, result).await
    }

    async fn begin_analysis_in(
        &self,
        tx: &mut dyn StoreTransaction,
        req: &AnalysisRequest,
    ) -> AppResult<AnalysisAccepted> {
        let Some(mut item) = tx.find_item_for_update(req.inspection_item_id).await? else {
            warn!(
                "Inspection item {} not found for analysis request",
                req.inspection_item_id
            );
            return Err(AppError::MissingRecord(format!(
                "inspection item {}",
                req.inspection_item_id
            )));
        };

        let analysis_type = analysis_type_of(tx, item.item_name_id).await?;

        let Some(queue_url) = self.queue_for(analysis_type) else {
            warn!(
                "Inspection item {} has no automated analysis",
                req.inspection_item_id
            );
            return Err(AppError::UnmatchedAnalysisTarget(format!(
                "inspection item {}",
                req.inspection_item_id
            )));
        };

        let next = item
            .progress()
            .apply(ProgressEvent::AnalysisRequested)
            .map_err(|e| AppError::Unexpected(e.to_string()))?;
        item.taken_dt = None;
        item.progress = next.as_i16();
        let item = tx.update_item(&item).await?;

        let body = serde_json::to_string(req).map_err(|e| {
            AppError::Unexpected(format!("Failed to serialize analysis request: {}", e))
        })?;
        self.caps
            .queue
            .enqueue(queue_url, &self.queues.message_group_id, &body)
            .await?;

        info!(
            "Queued {:?} analysis for inspection item {}",
            analysis_type, item.id
        );

        Ok(AnalysisAccepted {
            inspection_id: req.inspection_id,
            inspection_item_id: item.id,
            progress: item.progress(),
            version: item.version,
        })
    }

    // ------------------------------------------------------------------------
    // Analysis results
    // ------------------------------------------------------------------------

    /// Items of an inspection updated at or after `since`.
    pub async fn analysis_results(
        &self,
        inspection_id: i64,
        since: DateTime<Utc>,
    ) -> AppResult<AnalysisResultsResponse> {
        let mut tx = self.db.begin().await?;
        let result = tx
            .items_updated_since(inspection_id, since)
            .await
            .map(|items| AnalysisResultsResponse {
                analysis_result_items: items.iter().map(AnalysisResultItem::from).collect(),
            });
        finish(tx, result).await
    }

    // ------------------------------------------------------------------------
    // Master data
    // ------------------------------------------------------------------------

    pub async fn inspection_names(&self) -> AppResult<InspectionNamesResponse> {
        let mut tx = self.db.begin().await?;
        let result = tx
            .inspection_names()
            .await
            .map(|names| InspectionNamesResponse {
                inspection_names: names
                    .into_iter()
                    .map(|name| InspectionNameView {
                        inspection_name_id: name.id,
                        inspection_name: name.name,
                    })
                    .collect(),
            });
        finish(tx, result).await
    }
}

/// Analysis type of an item from its master. Items without a master are OTHER.
pub(crate) async fn analysis_type_of(
    tx: &mut dyn StoreTransaction,
    item_name_id: Option<i64>,
) -> AppResult<AnalysisType> {
    let Some(item_name_id) = item_name_id else {
        return Ok(AnalysisType::Other);
    };
    Ok(tx
        .item_master(item_name_id)
        .await?
        .map(|master| master.analysis_type)
        .unwrap_or(AnalysisType::Other))
}

async fn lookup_items(
    tx: &mut dyn StoreTransaction,
    req: &InspectionItemsRequest,
) -> AppResult<InspectionItemsResponse> {
    let inspection = match tx
        .find_inspection_by_key(&req.worksheet_code, req.receipt_confirmation_date)
        .await?
    {
        Some(inspection) => inspection,
        None => create_inspection(tx, req).await?,
    };

    let items = tx.items_of_inspection(inspection.id).await?;

    let mut refreshed = inspection;
    refreshed.company_code = req.company_code.clone();
    refreshed.inspection_date = req.inspection_date;
    let inspection = tx.update_inspection(&refreshed).await?;

    Ok(InspectionItemsResponse {
        schedule: InspectionSchedule {
            id: inspection.id,
            inspection_name_id: inspection.inspection_name_id,
            status: inspection.status,
        },
        items: items.iter().map(InspectionItemView::from).collect(),
    })
}

async fn create_inspection(
    tx: &mut dyn StoreTransaction,
    req: &InspectionItemsRequest,
) -> AppResult<inspection::Model> {
    let name = tx
        .inspection_name_by_name(&req.inspection_name)
        .await?
        .ok_or_else(|| {
            AppError::Database(format!(
                "Inspection name '{}' is not registered",
                req.inspection_name
            ))
        })?;

    let inspection = tx
        .insert_inspection(NewInspection {
            inspection_name_id: name.id,
            worksheet_code: req.worksheet_code.clone(),
            receipt_confirmation_date: req.receipt_confirmation_date,
            inspection_date: req.inspection_date,
            company_code: req.company_code.clone(),
        })
        .await?;

    let masters = tx.item_masters(name.id).await?;
    for master in &masters {
        tx.insert_item(NewInspectionItem::from_master(inspection.id, master))
            .await?;
    }

    info!(
        "Created inspection {} for worksheet {} with {} items",
        inspection.id,
        req.worksheet_code,
        masters.len()
    );
    Ok(inspection)
}
