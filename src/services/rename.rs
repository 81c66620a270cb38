//! Keeps stored image names in step with analysis results.
//!
//! Result markers are part of the uploaded file name. When a result or a
//! manual edit changes, the object is copied to a name carrying the new
//! values, the item is pointed at the copy, and the old object is deleted
//! only after the owning transaction has committed.

use tracing::{info, warn};

use super::interpreter::PlateReading;
use super::storage::{ObjectStore, split_bucket_path};
use crate::entity::inspection_item;
use crate::error::AppResult;
use crate::models::{
    AiVerdict, AnalysisType, COMMENT_MARKER, Progress, ProgressEvent, RESULT_COMMENT_MARKER,
    RESULT_MARKER, ResultItem,
};

/// An object superseded by a rename, deleted once the transaction commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub bucket: String,
    pub key: String,
}

/// Delete superseded objects. Failures are logged and do not fail the caller.
pub async fn delete_superseded(storage: &dyn ObjectStore, deletions: &[PendingDeletion]) {
    for deletion in deletions {
        match storage.delete(&deletion.bucket, &deletion.key).await {
            Ok(()) => info!("Deleted superseded object {}/{}", deletion.bucket, deletion.key),
            Err(e) => warn!(
                "Superseded object {}/{} left in place: {}",
                deletion.bucket, deletion.key, e
            ),
        }
    }
}

/// Non-empty value, or `None`.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Swap the model and serial number segments of a key.
///
/// The model is matched as `_{model}_` and the serial number as `_{serial}`.
pub fn substitute_plate(
    key: &str,
    old_model: &str,
    old_serial: &str,
    new_model: &str,
    new_serial: &str,
) -> String {
    key.replace(&format!("_{}_", old_model), &format!("_{}_", new_model))
        .replace(&format!("_{}", old_serial), &format!("_{}", new_serial))
}

/// Apply submitted OCR edits to `item`, returning the key to rename `key` to.
///
/// `None` means the path is taken from the submission as is.
pub fn revise_plate(
    item: &mut inspection_item::Model,
    submitted: &ResultItem,
    key: &str,
) -> Option<String> {
    let new_model = submitted.edited_model.as_deref();
    let new_serial = submitted.edited_serial_number.as_deref();

    // Edits unchanged
    if item.edited_model.as_deref() == new_model
        && item.edited_serial_number.as_deref() == new_serial
    {
        return None;
    }

    let (Some(nm), Some(ns)) = (present(new_model), present(new_serial)) else {
        if item.detected_model.as_deref() == new_model
            && item.detected_serial_number.as_deref() == new_serial
        {
            record_plate_edit(item, new_model, new_serial);
        }
        return None;
    };

    // Edited before: swap the previous edit for the new one
    if let (Some(dm), Some(ds)) = (
        present(item.edited_model.as_deref()),
        present(item.edited_serial_number.as_deref()),
    ) {
        let dest = substitute_plate(key, dm, ds, nm, ns);
        record_plate_edit(item, new_model, new_serial);
        return Some(dest);
    }

    // First edit that accepts the detected values keeps the name
    if item.detected_model.as_deref() == new_model
        && item.detected_serial_number.as_deref() == new_serial
    {
        record_plate_edit(item, new_model, new_serial);
        return None;
    }

    // First edit with new values: swap the detected values out
    let mut dest = key.to_string();
    if let Some(model) = present(item.detected_model.as_deref()) {
        dest = dest.replace(&format!("_{}_", model), &format!("_{}_", nm));
    }
    if let Some(serial) = present(item.detected_serial_number.as_deref()) {
        dest = dest.replace(&format!("_{}", serial), &format!("_{}", ns));
    }
    record_plate_edit(item, new_model, new_serial);
    Some(dest)
}

fn record_plate_edit(
    item: &mut inspection_item::Model,
    model: Option<&str>,
    serial: Option<&str>,
) {
    item.edited_model = model.map(str::to_string);
    item.edited_serial_number = serial.map(str::to_string);
}

/// Apply a submitted NG comment to `item`, returning the key to rename `key` to.
pub fn revise_comment(
    item: &mut inspection_item::Model,
    submitted: &ResultItem,
    key: &str,
) -> Option<String> {
    let new_comment = submitted.ng_comment.as_deref();
    if item.ng_comment.as_deref() == new_comment {
        return None;
    }

    let comment = present(new_comment)?;
    let dest = match present(item.ng_comment.as_deref()) {
        Some(old) => key.replace(old, comment),
        None => key.replace(COMMENT_MARKER, comment),
    };
    item.ng_comment = Some(comment.to_string());
    Some(dest)
}

/// Apply one submitted result to an existing item.
///
/// Renames the stored object when the submission changes a value that is
/// part of its name, and returns the superseded object.
pub async fn apply_submission(
    storage: &dyn ObjectStore,
    item: &mut inspection_item::Model,
    analysis_type: AnalysisType,
    submitted: &ResultItem,
) -> AppResult<Option<PendingDeletion>> {
    let mut superseded = None;

    match analysis_type {
        AnalysisType::Ocr | AnalysisType::Ai => {
            let current = item.image_path.clone().filter(|p| !p.is_empty());
            let (bucket, key) = current
                .as_deref()
                .map(split_bucket_path)
                .unwrap_or(("", ""));

            let dest = if analysis_type == AnalysisType::Ocr {
                revise_plate(item, submitted, key)
            } else {
                revise_comment(item, submitted, key)
            };

            match dest {
                Some(dest) if current.is_some() && !dest.is_empty() && dest != key => {
                    let new_path = storage.copy(bucket, key, &dest).await?;
                    info!("Renamed {}/{} to {}", bucket, key, new_path);
                    item.image_path = Some(new_path);
                    superseded = Some(PendingDeletion {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                // Name already matches
                Some(_) if current.is_some() => {}
                _ => item.image_path = submitted.s3_image_path.clone(),
            }
        }
        AnalysisType::Other => {
            if let Some(path) = present(submitted.s3_image_path.as_deref()) {
                item.image_path = Some(path.to_string());
                item.progress = advance(item.progress(), ProgressEvent::ResultSubmitted);
            }
        }
    }

    item.taken_dt = submitted.taken_dt;
    Ok(superseded)
}

fn advance(progress: Progress, event: ProgressEvent) -> i16 {
    progress.apply(event).unwrap_or(progress).as_i16()
}

/// Key of an OCR analysed image.
pub fn plate_key(original_key: &str, reading: &PlateReading) -> String {
    original_key.replace(RESULT_COMMENT_MARKER, &reading.path_segment())
}

/// Key of an AI analysed image.
///
/// OK drops the comment marker along with the verdict; other verdicts keep
/// it for the NG comment added later.
pub fn verdict_key(original_key: &str, verdict: AiVerdict) -> String {
    match verdict {
        AiVerdict::Ok => original_key.replace(RESULT_COMMENT_MARKER, verdict.label()),
        _ => original_key.replace(RESULT_MARKER, verdict.label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStorage, item_model};

    fn submitted(model: Option<&str>, serial: Option<&str>, comment: Option<&str>) -> ResultItem {
        ResultItem {
            inspection_item_id: Some(1),
            inspection_item_name: "Plate".to_string(),
            taken_dt: None,
            edited_model: model.map(str::to_string),
            edited_serial_number: serial.map(str::to_string),
            ng_comment: comment.map(str::to_string),
            s3_image_path: Some("bucket/submitted.jpg".to_string()),
        }
    }

    #[test]
    fn test_substitute_plate_round_trip() {
        let renamed = substitute_plate("A_M1_S1.jpg", "M1", "S1", "M2", "S2");
        assert_eq!(renamed, "A_M2_S2.jpg");
        assert_eq!(
            substitute_plate(&renamed, "M2", "S2", "M1", "S1"),
            "A_M1_S1.jpg"
        );
    }

    #[test]
    fn test_plate_unchanged_takes_submitted_path() {
        let mut item = item_model(1);
        item.edited_model = Some("M1".to_string());
        item.edited_serial_number = Some("S1".to_string());
        let dest = revise_plate(&mut item, &submitted(Some("M1"), Some("S1"), None), "A_M1_S1.jpg");
        assert_eq!(dest, None);
    }

    #[test]
    fn test_plate_re_edit_swaps_previous_edit() {
        let mut item = item_model(1);
        item.detected_model = Some("HE-000".to_string());
        item.detected_serial_number = Some("5000000".to_string());
        item.edited_model = Some("M1".to_string());
        item.edited_serial_number = Some("S1".to_string());

        let dest = revise_plate(&mut item, &submitted(Some("M2"), Some("S2"), None), "A_M1_S1.jpg");
        assert_eq!(dest.as_deref(), Some("A_M2_S2.jpg"));
        assert_eq!(item.edited_model.as_deref(), Some("M2"));
        assert_eq!(item.edited_serial_number.as_deref(), Some("S2"));
    }

    #[test]
    fn test_plate_accepting_detected_values_keeps_name() {
        let mut item = item_model(1);
        item.detected_model = Some("HE-123".to_string());
        item.detected_serial_number = Some("5123456".to_string());

        let dest = revise_plate(
            &mut item,
            &submitted(Some("HE-123"), Some("5123456"), None),
            "A_HE-123_5123456.jpg",
        );
        assert_eq!(dest, None);
        assert_eq!(item.edited_model.as_deref(), Some("HE-123"));
        assert_eq!(item.edited_serial_number.as_deref(), Some("5123456"));
    }

    #[test]
    fn test_plate_first_edit_swaps_detected_values() {
        let mut item = item_model(1);
        item.detected_model = Some("ReadError".to_string());
        item.detected_serial_number = Some("ReadError".to_string());

        let dest = revise_plate(
            &mut item,
            &submitted(Some("HE-9"), Some("5999999"), None),
            "dir/A_ReadError_ReadError.jpg",
        );
        assert_eq!(dest.as_deref(), Some("dir/A_HE-9_5999999.jpg"));
        assert_eq!(item.edited_model.as_deref(), Some("HE-9"));
    }

    #[test]
    fn test_plate_partial_edit_falls_through() {
        let mut item = item_model(1);
        item.detected_model = Some("HE-1".to_string());
        item.detected_serial_number = Some("5111111".to_string());

        let dest = revise_plate(&mut item, &submitted(Some("HE-2"), None, None), "A_HE-1_5111111.jpg");
        assert_eq!(dest, None);
        assert_eq!(item.edited_model, None);
        assert_eq!(item.edited_serial_number, None);
    }

    #[test]
    fn test_comment_first_time_replaces_marker() {
        let mut item = item_model(1);
        let dest = revise_comment(
            &mut item,
            &submitted(None, None, Some("scratch")),
            "dir/Lid_NG_NGコメント.jpg",
        );
        assert_eq!(dest.as_deref(), Some("dir/Lid_NG_scratch.jpg"));
        assert_eq!(item.ng_comment.as_deref(), Some("scratch"));
    }

    #[test]
    fn test_comment_change_replaces_old_comment() {
        let mut item = item_model(1);
        item.ng_comment = Some("scratch".to_string());
        let dest = revise_comment(
            &mut item,
            &submitted(None, None, Some("dent")),
            "dir/Lid_NG_scratch.jpg",
        );
        assert_eq!(dest.as_deref(), Some("dir/Lid_NG_dent.jpg"));
    }

    #[test]
    fn test_comment_cleared_is_not_recorded() {
        let mut item = item_model(1);
        item.ng_comment = Some("scratch".to_string());
        let dest = revise_comment(&mut item, &submitted(None, None, Some("")), "k.jpg");
        assert_eq!(dest, None);
        assert_eq!(item.ng_comment.as_deref(), Some("scratch"));
    }

    #[tokio::test]
    async fn test_apply_submission_renames_and_defers_delete() {
        let storage = FakeStorage::default();
        storage.insert("bucket", "dir/Lid_NG_NGコメント.jpg", b"img".to_vec());

        let mut item = item_model(1);
        item.image_path = Some("bucket/dir/Lid_NG_NGコメント.jpg".to_string());
        let req = submitted(None, None, Some("dent"));

        let superseded = apply_submission(&storage, &mut item, AnalysisType::Ai, &req)
            .await
            .unwrap();

        assert_eq!(item.image_path.as_deref(), Some("bucket/dir/Lid_NG_dent.jpg"));
        assert_eq!(
            superseded,
            Some(PendingDeletion {
                bucket: "bucket".to_string(),
                key: "dir/Lid_NG_NGコメント.jpg".to_string(),
            })
        );
        // Old object still present until the transaction commits
        assert!(storage.contains("bucket", "dir/Lid_NG_NGコメント.jpg"));
        assert!(storage.contains("bucket", "dir/Lid_NG_dent.jpg"));
    }

    #[tokio::test]
    async fn test_apply_submission_without_stored_path_passes_through() {
        let storage = FakeStorage::default();
        let mut item = item_model(1);
        let req = submitted(Some("M2"), Some("S2"), None);

        let superseded = apply_submission(&storage, &mut item, AnalysisType::Ocr, &req)
            .await
            .unwrap();

        assert_eq!(superseded, None);
        assert_eq!(item.image_path.as_deref(), Some("bucket/submitted.jpg"));
        assert_eq!(item.edited_model.as_deref(), Some("M2"));
        assert_eq!(storage.copies(), 0);
    }

    #[tokio::test]
    async fn test_apply_submission_same_name_skips_copy() {
        let storage = FakeStorage::default();
        let mut item = item_model(1);
        item.image_path = Some("bucket/dir/Lid_NG.jpg".to_string());
        let req = submitted(None, None, Some("dent"));

        let superseded = apply_submission(&storage, &mut item, AnalysisType::Ai, &req)
            .await
            .unwrap();

        assert_eq!(superseded, None);
        assert_eq!(req.s3_image_path.as_deref(), Some("bucket/submitted.jpg"));
        assert_eq!(item.image_path.as_deref(), Some("bucket/dir/Lid_NG.jpg"));
        assert_eq!(item.ng_comment.as_deref(), Some("dent"));
        assert_eq!(storage.copies(), 0);
    }

    #[tokio::test]
    async fn test_apply_submission_other_sets_path_and_finishes() {
        let storage = FakeStorage::default();
        let mut item = item_model(1);
        let req = submitted(None, None, None);

        apply_submission(&storage, &mut item, AnalysisType::Other, &req)
            .await
            .unwrap();

        assert_eq!(item.image_path.as_deref(), Some("bucket/submitted.jpg"));
        assert_eq!(item.progress(), Progress::AnalysisFinished);
    }

    #[tokio::test]
    async fn test_apply_submission_other_without_path_keeps_progress() {
        let storage = FakeStorage::default();
        let mut item = item_model(1);
        let mut req = submitted(None, None, None);
        req.s3_image_path = None;

        apply_submission(&storage, &mut item, AnalysisType::Other, &req)
            .await
            .unwrap();

        assert_eq!(item.image_path, None);
        assert_eq!(item.progress(), Progress::WaitingImageSave);
    }

    #[test]
    fn test_analysed_keys() {
        let reading = PlateReading {
            model: "HE-1".to_string(),
            serial_number: "5123456".to_string(),
        };
        assert_eq!(
            plate_key("d/Plate_AI判定結果_NGコメント.jpg", &reading),
            "d/Plate_HE-1_5123456.jpg"
        );
        assert_eq!(
            verdict_key("d/Lid_AI判定結果_NGコメント.jpg", AiVerdict::Ok),
            "d/Lid_OK.jpg"
        );
        assert_eq!(
            verdict_key("d/Lid_AI判定結果_NGコメント.jpg", AiVerdict::Ng),
            "d/Lid_NG_NGコメント.jpg"
        );
        assert_eq!(
            verdict_key("d/Lid_AI判定結果_NGコメント.jpg", AiVerdict::Failed),
            "d/Lid_解析失敗_NGコメント.jpg"
        );
    }
}
