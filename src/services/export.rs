//! Inspection result export.
//!
//! Writes the analysed item master list as a JSON object and the flattened
//! inspection and item rows as a DEFLATE zip holding
//! `inspection_results.json`, and hands out presigned download URLs.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use super::pipeline::Pipeline;
use crate::db::{ExportFilter, StoreTransaction, finish};
use crate::entity::{inspection, inspection_item};
use crate::error::{AppError, AppResult};
use crate::models::{
    AnalysisType, ExportItemMaster, ExportQuery, ExportResponse, ExportResultRow, ItemMaster,
    format_date_number,
};

const JSON_CONTENT_TYPE: &str = "application/json";
const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Entry name the result archive consumers open.
pub const RESULTS_ENTRY: &str = "inspection_results.json";

impl Pipeline {
    pub async fn export_results(&self, query: &ExportQuery) -> AppResult<ExportResponse> {
        let (start_date, end_date) = query.date_range()?;
        let filter = ExportFilter {
            inspection_name_id: query.inspection_name_id,
            worksheet_code: query.worksheet_code().map(str::to_string),
            start_date,
            end_date,
            limit: query.output_count,
        };

        let mut tx = self.db.begin().await?;
        let result = collect_export(tx.as_mut(), &filter).await;
        let (masters, rows) = finish(tx, result).await?;

        let file_id = Uuid::new_v4();
        let masters_key = format!("{}inspection_item_results_{}.json", self.export.prefix, file_id);
        let rows_key = format!("{}inspection_results_{}.zip", self.export.prefix, file_id);

        let inspection_item_results_url = self
            .publish(&masters_key, to_json(&masters)?, JSON_CONTENT_TYPE, &[])
            .await?;
        let archive = zip_entry(RESULTS_ENTRY, &to_json(&rows)?)?;
        let inspection_results_url = self
            .publish(
                &rows_key,
                archive,
                ZIP_CONTENT_TYPE,
                &[("count", rows.len().to_string())],
            )
            .await?;

        info!(
            "Exported {} item masters and {} result rows for inspection name {}",
            masters.len(),
            rows.len(),
            filter.inspection_name_id
        );

        Ok(ExportResponse {
            inspection_item_results_url,
            inspection_results_url,
        })
    }

    /// Store `body` in the export bucket and presign it.
    async fn publish(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &[(&str, String)],
    ) -> AppResult<String> {
        let storage = &self.caps.storage;
        storage
            .put(&self.export.bucket, key, body, content_type, metadata)
            .await?;
        storage
            .presign_get(&self.export.bucket, key, self.export.url_expires)
            .await
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| AppError::Unexpected(format!("Failed to serialize export: {}", e)))
}

/// A zip archive holding one DEFLATE-compressed entry.
fn zip_entry(name: &str, data: &[u8]) -> AppResult<Vec<u8>> {
    let zip_err = |e: zip::result::ZipError| {
        AppError::Unexpected(format!("Failed to build export archive: {}", e))
    };

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(name, options).map_err(zip_err)?;
    writer
        .write_all(data)
        .map_err(|e| AppError::Unexpected(format!("Failed to write export archive: {}", e)))?;
    Ok(writer.finish().map_err(zip_err)?.into_inner())
}

fn is_analysed(master: &ItemMaster) -> bool {
    matches!(master.analysis_type, AnalysisType::Ocr | AnalysisType::Ai)
}

/// Masters ordered by analysis type, then id.
fn sort_masters(masters: &mut [ItemMaster]) {
    masters.sort_by_key(|m| (m.analysis_type.as_i16(), m.item_name_id));
}

async fn collect_export(
    tx: &mut dyn StoreTransaction,
    filter: &ExportFilter,
) -> AppResult<(Vec<ExportItemMaster>, Vec<ExportResultRow>)> {
    let mut masters: Vec<ItemMaster> = tx
        .item_masters(filter.inspection_name_id)
        .await?
        .into_iter()
        .filter(is_analysed)
        .collect();
    sort_masters(&mut masters);

    let master_rows = masters
        .iter()
        .map(|m| ExportItemMaster {
            item_name_id: m.item_name_id,
            item_name: m.item_name.clone(),
            analysis_type: m.analysis_type.as_i16(),
        })
        .collect();

    let Some(name) = tx.inspection_name(filter.inspection_name_id).await? else {
        return Ok((master_rows, Vec::new()));
    };

    let by_id: HashMap<i64, &ItemMaster> = masters.iter().map(|m| (m.item_name_id, m)).collect();
    let mut rows = Vec::new();
    for inspection in tx.inspections_for_export(filter).await? {
        let items = tx.items_of_inspection(inspection.id).await?;
        rows.extend(result_rows(&name.name, &inspection, &items, &by_id));
    }

    Ok((master_rows, rows))
}

/// Rows of one inspection: one per analysed item, or a single row without
/// item fields when it has none.
fn result_rows(
    inspection_name: &str,
    inspection: &inspection::Model,
    items: &[inspection_item::Model],
    masters: &HashMap<i64, &ItemMaster>,
) -> Vec<ExportResultRow> {
    let mut analysed: Vec<(&inspection_item::Model, &ItemMaster)> = items
        .iter()
        .filter_map(|item| {
            let master = masters.get(&item.item_name_id?)?;
            Some((item, *master))
        })
        .collect();
    analysed.sort_by_key(|(_, m)| (m.analysis_type.as_i16(), m.item_name_id));

    let base = ExportResultRow {
        inspection_name: inspection_name.to_string(),
        inspection_id: inspection.id,
        worksheet_code: inspection.worksheet_code.clone(),
        inspection_date: format_date_number(inspection.inspection_date),
        item_name_id: None,
        analysis_type: None,
        model: String::new(),
        edited_model: String::new(),
        serial_number: String::new(),
        edited_serial_number: String::new(),
        ai_result: String::new(),
        ng_comment: String::new(),
        s3_image_path: String::new(),
    };

    if analysed.is_empty() {
        return vec![base];
    }

    analysed
        .into_iter()
        .map(|(item, master)| ExportResultRow {
            item_name_id: Some(master.item_name_id),
            analysis_type: Some(master.analysis_type.as_i16()),
            model: item.detected_model.clone().unwrap_or_default(),
            edited_model: item.edited_model.clone().unwrap_or_default(),
            serial_number: item.detected_serial_number.clone().unwrap_or_default(),
            edited_serial_number: item.edited_serial_number.clone().unwrap_or_default(),
            ai_result: item.ai_result.clone().unwrap_or_default(),
            ng_comment: item.ng_comment.clone().unwrap_or_default(),
            s3_image_path: item.image_path.clone().unwrap_or_default(),
            ..base.clone()
        })
        .collect()
}
