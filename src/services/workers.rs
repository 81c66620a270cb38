//! Analysis queue consumers.
//!
//! One background task per analysis queue long-polls for messages and
//! processes each batch in order. A failure stops the batch so the rest of
//! the FIFO group is redelivered behind the failed message; processed and
//! skipped messages are acknowledged.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::analysis_api::{AnalysisImage, file_name_of};
use super::interpreter::{PlateReading, interpret_ai};
use super::pipeline::Pipeline;
use super::rename::{plate_key, verdict_key};
use super::storage::join_bucket_path;
use crate::db::{StoreTransaction, finish};
use crate::entity::inspection_item;
use crate::error::{AppError, AppResult};
use crate::models::{AiVerdict, AnalysisApiResponse, AnalysisRequest, ItemMaster, ProgressEvent};

/// Pause after a failed poll before polling again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Analysis queue served by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisQueue {
    Ocr,
    Ai,
}

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The analysis result was written.
    Recorded,
    /// Nothing to do for this message.
    Skipped,
}

/// Start one consumer per analysis queue.
pub fn start_analysis_workers(pipeline: Arc<Pipeline>) {
    if !pipeline.queues().workers_enabled {
        info!("Analysis workers disabled");
        return;
    }

    for queue in [AnalysisQueue::Ocr, AnalysisQueue::Ai] {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            info!(
                "Starting {:?} analysis worker on {}",
                queue,
                pipeline.queue_url(queue)
            );

            loop {
                if let Err(e) = pipeline.poll_queue(queue).await {
                    error!("{:?} analysis worker error: {}", queue, e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        });
    }
}

impl Pipeline {
    pub(crate) fn queue_url(&self, queue: AnalysisQueue) -> &str {
        match queue {
            AnalysisQueue::Ocr => &self.queues.ocr_queue_url,
            AnalysisQueue::Ai => &self.queues.ai_queue_url,
        }
    }

    /// Receive one batch and process it in order, returning how many
    /// messages were acknowledged.
    pub async fn poll_queue(&self, queue: AnalysisQueue) -> AppResult<usize> {
        let url = self.queue_url(queue);
        let messages = self
            .caps
            .queue
            .receive(url, self.queues.batch_size, self.queues.wait_secs)
            .await?;

        let mut acknowledged = 0;
        for message in messages {
            let outcome = self.handle_message(queue, &message.body).await?;
            debug!("{:?} message finished: {:?}", queue, outcome);
            self.caps.queue.ack(url, &message.receipt_handle).await?;
            acknowledged += 1;
        }
        Ok(acknowledged)
    }

    /// Process one message body.
    ///
    /// Bodies that are not analysis requests can never succeed and are skipped.
    pub async fn handle_message(
        &self,
        queue: AnalysisQueue,
        body: &str,
    ) -> AppResult<MessageOutcome> {
        let req: AnalysisRequest = match serde_json::from_str(body) {
            Ok(req) => req,
            Err(e) => {
                error!("Discarding undecodable {:?} message: {}", queue, e);
                return Ok(MessageOutcome::Skipped);
            }
        };

        match queue {
            AnalysisQueue::Ocr => self.run_ocr(&req).await,
            AnalysisQueue::Ai => self.run_ai(&req).await,
        }
    }

    // ------------------------------------------------------------------------
    // OCR
    // ------------------------------------------------------------------------

    /// Read the name plate on the trimmed image and record it.
    pub async fn run_ocr(&self, req: &AnalysisRequest) -> AppResult<MessageOutcome> {
        let image = self
            .caps
            .storage
            .get(&req.bucket_name, &req.trimming_image_path)
            .await?;
        let blocks = self.caps.text.detect_text(image).await?;
        let reading = self.plate_reader.read(&blocks);

        let mut tx = self.db.begin().await?;
        let result = self.record_plate(tx.as_mut(), req, &reading).await;
        finish(tx, result).await
    }

    async fn record_plate(
        &self,
        tx: &mut dyn StoreTransaction,
        req: &AnalysisRequest,
        reading: &PlateReading,
    ) -> AppResult<MessageOutcome> {
        let Some(mut item) = lock_for_result(tx, req).await? else {
            return Ok(MessageOutcome::Skipped);
        };

        let dest = plate_key(&req.original_image_path, reading);
        item.image_path = Some(self.copy_analysed(req, &dest).await?);
        item.ai_result = Some(AiVerdict::Ok.label().to_string());
        item.detected_model = Some(reading.model.clone());
        item.detected_serial_number = Some(reading.serial_number.clone());
        item.edited_model = None;
        item.edited_serial_number = None;
        complete(&mut item)?;
        tx.update_item(&item).await?;

        info!(
            "OCR result recorded for inspection item {}: {} {}",
            item.id, reading.model, reading.serial_number
        );
        Ok(MessageOutcome::Recorded)
    }

    // ------------------------------------------------------------------------
    // AI
    // ------------------------------------------------------------------------

    /// Send the trimmed image to the item's analysis API and record the verdict.
    pub async fn run_ai(&self, req: &AnalysisRequest) -> AppResult<MessageOutcome> {
        let image = AnalysisImage {
            file_name: file_name_of(&req.trimming_image_path).to_string(),
            data: self
                .caps
                .storage
                .get(&req.bucket_name, &req.trimming_image_path)
                .await?,
        };

        let mut tx = self.db.begin().await?;
        let result = self.record_verdict(tx.as_mut(), req, image).await;
        finish(tx, result).await
    }

    async fn record_verdict(
        &self,
        tx: &mut dyn StoreTransaction,
        req: &AnalysisRequest,
        image: AnalysisImage,
    ) -> AppResult<MessageOutcome> {
        let Some(mut item) = lock_for_result(tx, req).await? else {
            return Ok(MessageOutcome::Skipped);
        };

        let master = match item.item_name_id {
            Some(id) => tx.item_master(id).await?,
            None => None,
        };
        let Some(master) = master else {
            warn!(
                "Inspection item {} has no item master, skipping AI analysis",
                item.id
            );
            return Ok(MessageOutcome::Skipped);
        };

        let labels = tx.labels(master.item_name_id).await?;
        let response = self.call_analysis_api(&master, image).await;
        let verdict = interpret_ai(&response, &labels);

        let dest = verdict_key(&req.original_image_path, verdict);
        item.image_path = Some(self.copy_analysed(req, &dest).await?);
        item.ai_result = Some(verdict.label().to_string());
        item.ng_comment = None;
        complete(&mut item)?;
        tx.update_item(&item).await?;

        info!(
            "AI result recorded for inspection item {}: {}",
            item.id,
            verdict.label()
        );
        Ok(MessageOutcome::Recorded)
    }

    /// Call the analysis API. Any failure reads as a failed analysis.
    async fn call_analysis_api(
        &self,
        master: &ItemMaster,
        image: AnalysisImage,
    ) -> AnalysisApiResponse {
        let Some(url) = master.api_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!("Item master {} has no analysis API URL", master.item_name_id);
            return AnalysisApiResponse::failed();
        };

        match self
            .caps
            .analysis
            .post_image(
                url,
                master.auth_token.as_deref().unwrap_or_default(),
                master.master_image.as_deref().unwrap_or_default(),
                image,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Analysis API call for item master {} failed: {}",
                    master.item_name_id, e
                );
                AnalysisApiResponse::failed()
            }
        }
    }

    /// Copy the uploaded image to its analysed name, returning the stored path.
    async fn copy_analysed(&self, req: &AnalysisRequest, dest: &str) -> AppResult<String> {
        if dest == req.original_image_path {
            return Ok(join_bucket_path(&req.bucket_name, dest));
        }
        self.caps
            .storage
            .copy(&req.bucket_name, &req.original_image_path, dest)
            .await
    }
}

/// Lock the target item if it may take an analysis result.
async fn lock_for_result(
    tx: &mut dyn StoreTransaction,
    req: &AnalysisRequest,
) -> AppResult<Option<inspection_item::Model>> {
    match tx.find_item_for_update(req.inspection_item_id).await? {
        None => {
            warn!(
                "Inspection item {} not found for analysis result",
                req.inspection_item_id
            );
            Ok(None)
        }
        Some(item) if !item.progress().accepts_analysis_result() => {
            warn!(
                "Inspection item {} is at {:?}, not awaiting an analysis result",
                item.id,
                item.progress()
            );
            Ok(None)
        }
        Some(item) => Ok(Some(item)),
    }
}

fn complete(item: &mut inspection_item::Model) -> AppResult<()> {
    let next = item
        .progress()
        .apply(ProgressEvent::AnalysisCompleted)
        .map_err(|e| AppError::Unexpected(e.to_string()))?;
    item.progress = next.as_i16();
    Ok(())
}
