//! In-memory store and fake capabilities for pipeline tests.
//!
//! [`MemoryDb`] applies writes directly to shared state and keeps an undo
//! log per transaction, so a rollback (or a dropped transaction) restores
//! the previous rows. Row locks are per-item async mutexes held until the
//! transaction ends, which serialises competing transactions the way
//! `SELECT ... FOR UPDATE` does.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::config::{Environment, tests::test_config};
use crate::db::{
    ExportFilter, InspectionRecords, ItemStore, MasterData, NewInspection, NewInspectionItem,
    StoreTransaction, TransactionSource,
};
use crate::entity::{inspection, inspection_item, inspection_name};
use crate::error::{AppError, AppResult};
use crate::models::{AnalysisApiResponse, AnalysisType, InspectionStatus, ItemMaster};
use crate::services::analysis_api::{AnalysisApi, AnalysisImage};
use crate::services::interpreter::PlateReader;
use crate::services::queue::{MessageQueue, QueueMessage};
use crate::services::storage::{ObjectStore, join_bucket_path};
use crate::services::text_detection::{TextBlock, TextDetector};
use crate::services::{Capabilities, Pipeline};

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
}

pub fn item_model(id: i64) -> inspection_item::Model {
    inspection_item::Model {
        id,
        inspection_id: 1,
        item_name_id: None,
        item_name: format!("Item {}", id),
        taken_dt: None,
        image_path: None,
        ai_result: None,
        ng_comment: None,
        detected_model: None,
        detected_serial_number: None,
        edited_model: None,
        edited_serial_number: None,
        progress: 0,
        version: 0,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

pub fn inspection_model(id: i64) -> inspection::Model {
    inspection::Model {
        id,
        inspection_name_id: 1,
        worksheet_code: "0000012345".to_string(),
        receipt_confirmation_date: 20240110,
        inspection_date: 20240115,
        status: InspectionStatus::Pending.as_i16(),
        evidence_id: None,
        company_code: "C001".to_string(),
        send_count: 0,
        is_send: false,
        version: 0,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

fn master_name(item_name_id: i64) -> String {
    format!("Master {}", item_name_id)
}

/// Item master fixture; `item_name_id` 0 gets an id and a matching name from [`MemoryDb::add_master`].
pub fn master(item_name_id: i64, analysis_type: AnalysisType) -> ItemMaster {
    ItemMaster {
        item_name_id,
        inspection_name_id: 1,
        item_name: master_name(item_name_id),
        analysis_type,
        api_url: Some("https://ai.example/analyze".to_string()),
        master_image: Some("master.jpg".to_string()),
        auth_token: Some("token".to_string()),
        shoot_type: Some(1),
    }
}

// ----------------------------------------------------------------------------
// In-memory store
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryState {
    pub inspection_names: Vec<inspection_name::Model>,
    pub masters: Vec<ItemMaster>,
    pub labels: Vec<(i64, String)>,
    pub inspections: BTreeMap<i64, inspection::Model>,
    pub items: BTreeMap<i64, inspection_item::Model>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

enum Undo {
    Item(i64, Option<inspection_item::Model>),
    Inspection(i64, Option<inspection::Model>),
}

/// Shared in-memory database.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<MemoryState>>,
    row_locks: Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
    commits: Arc<AtomicUsize>,
    rollbacks: Arc<AtomicUsize>,
}

impl MemoryDb {
    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn add_inspection_name(&self, name: &str) -> i64 {
        let mut state = self.state();
        let id = state.next_id();
        state.inspection_names.push(inspection_name::Model {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_master(&self, mut master: ItemMaster) -> i64 {
        let mut state = self.state();
        if master.item_name_id == 0 {
            master.item_name_id = state.next_id();
            if master.item_name == master_name(0) {
                master.item_name = master_name(master.item_name_id);
            }
        }
        let id = master.item_name_id;
        state.masters.push(master);
        id
    }

    pub fn add_label(&self, item_name_id: i64, label: &str) {
        self.state().labels.push((item_name_id, label.to_string()));
    }

    pub fn add_inspection(&self, mut inspection: inspection::Model) -> i64 {
        let mut state = self.state();
        if inspection.id == 0 {
            inspection.id = state.next_id();
        }
        let id = inspection.id;
        state.inspections.insert(id, inspection);
        id
    }

    pub fn add_item(&self, mut item: inspection_item::Model) -> i64 {
        let mut state = self.state();
        if item.id == 0 {
            item.id = state.next_id();
        }
        let id = item.id;
        state.items.insert(id, item);
        id
    }

    pub fn item(&self, id: i64) -> Option<inspection_item::Model> {
        self.state().items.get(&id).cloned()
    }

    pub fn inspection(&self, id: i64) -> Option<inspection::Model> {
        self.state().inspections.get(&id).cloned()
    }

    fn row_lock(&self, id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.row_locks
            .lock()
            .unwrap()
            .entry(id)
            .or_default()
            .clone()
    }
}

#[async_trait]
impl TransactionSource for MemoryDb {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTx {
            db: self.clone(),
            undo: Vec::new(),
            locks: Vec::new(),
            locked_ids: HashSet::new(),
        }))
    }
}

pub struct MemoryTx {
    db: MemoryDb,
    undo: Vec<Undo>,
    locks: Vec<OwnedMutexGuard<()>>,
    locked_ids: HashSet<i64>,
}

impl MemoryTx {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.db.state()
    }

    fn restore(&mut self) {
        let mut state = self.db.state.lock().unwrap();
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Item(id, Some(previous)) => {
                    state.items.insert(id, previous);
                }
                Undo::Item(id, None) => {
                    state.items.remove(&id);
                }
                Undo::Inspection(id, Some(previous)) => {
                    state.inspections.insert(id, previous);
                }
                Undo::Inspection(id, None) => {
                    state.inspections.remove(&id);
                }
            }
        }
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        self.restore();
    }
}

fn unique_violation(constraint: &str) -> AppError {
    AppError::Database(format!(
        "duplicate key value violates unique constraint \"{}\"",
        constraint
    ))
}

#[async_trait]
impl ItemStore for MemoryTx {
    async fn find_item(&mut self, id: i64) -> AppResult<Option<inspection_item::Model>> {
        Ok(self.state().items.get(&id).cloned())
    }

    async fn find_item_for_update(
        &mut self,
        id: i64,
    ) -> AppResult<Option<inspection_item::Model>> {
        if self.locked_ids.insert(id) {
            let guard = self.db.row_lock(id).lock_owned().await;
            self.locks.push(guard);
        }
        Ok(self.state().items.get(&id).cloned())
    }

    async fn items_of_inspection(
        &mut self,
        inspection_id: i64,
    ) -> AppResult<Vec<inspection_item::Model>> {
        Ok(self
            .state()
            .items
            .values()
            .filter(|item| item.inspection_id == inspection_id)
            .cloned()
            .collect())
    }

    async fn items_updated_since(
        &mut self,
        inspection_id: i64,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<inspection_item::Model>> {
        Ok(self
            .state()
            .items
            .values()
            .filter(|item| item.inspection_id == inspection_id && item.updated_at >= since)
            .cloned()
            .collect())
    }

    async fn insert_item(&mut self, new: NewInspectionItem) -> AppResult<inspection_item::Model> {
        let item = {
            let mut state = self.state();
            let duplicate = state.items.values().find(|item| {
                item.inspection_id == new.inspection_id
                    && ((new.item_name_id.is_some() && item.item_name_id == new.item_name_id)
                        || item.item_name == new.item_name)
            });
            if let Some(existing) = duplicate {
                return Err(if existing.item_name == new.item_name {
                    unique_violation("uq_inspection_items_inspection_item_name")
                } else {
                    unique_violation("uq_inspection_items_inspection_item_name_id")
                });
            }

            let now = Utc::now();
            let item = inspection_item::Model {
                id: state.next_id(),
                inspection_id: new.inspection_id,
                item_name_id: new.item_name_id,
                item_name: new.item_name,
                taken_dt: new.taken_dt,
                image_path: new.image_path,
                ai_result: None,
                ng_comment: None,
                detected_model: None,
                detected_serial_number: None,
                edited_model: None,
                edited_serial_number: None,
                progress: new.progress.as_i16(),
                version: 0,
                created_at: now,
                updated_at: now,
            };
            state.items.insert(item.id, item.clone());
            item
        };
        self.undo.push(Undo::Item(item.id, None));
        Ok(item)
    }

    async fn update_item(
        &mut self,
        item: &inspection_item::Model,
    ) -> AppResult<inspection_item::Model> {
        let (previous, updated) = {
            let mut state = self.state();
            let Some(stored) = state.items.get(&item.id).cloned() else {
                return Err(AppError::ConcurrencyConflict(format!(
                    "inspection item {} no longer exists",
                    item.id
                )));
            };
            if stored.version != item.version {
                return Err(AppError::ConcurrencyConflict(format!(
                    "inspection item {} is at version {}, not {}",
                    item.id, stored.version, item.version
                )));
            }
            let mut updated = item.clone();
            updated.version += 1;
            updated.updated_at = Utc::now();
            state.items.insert(item.id, updated.clone());
            (stored, updated)
        };
        self.undo.push(Undo::Item(item.id, Some(previous)));
        Ok(updated)
    }

    async fn delete_items(&mut self, ids: &[i64]) -> AppResult<u64> {
        let removed: Vec<inspection_item::Model> = {
            let mut state = self.state();
            ids.iter().filter_map(|id| state.items.remove(id)).collect()
        };
        let count = removed.len() as u64;
        for item in removed {
            self.undo.push(Undo::Item(item.id, Some(item)));
        }
        Ok(count)
    }
}

fn status_in(inspection: &inspection::Model, statuses: &[InspectionStatus]) -> bool {
    statuses.iter().any(|s| s.as_i16() == inspection.status)
}

#[async_trait]
impl InspectionRecords for MemoryTx {
    async fn find_inspection(&mut self, id: i64) -> AppResult<Option<inspection::Model>> {
        Ok(self.state().inspections.get(&id).cloned())
    }

    async fn find_inspection_by_key(
        &mut self,
        worksheet_code: &str,
        receipt_confirmation_date: i32,
    ) -> AppResult<Option<inspection::Model>> {
        Ok(self
            .state()
            .inspections
            .values()
            .find(|i| {
                i.worksheet_code == worksheet_code
                    && i.receipt_confirmation_date == receipt_confirmation_date
            })
            .cloned())
    }

    async fn insert_inspection(&mut self, new: NewInspection) -> AppResult<inspection::Model> {
        let inspection = {
            let mut state = self.state();
            if state.inspections.values().any(|i| {
                i.worksheet_code == new.worksheet_code
                    && i.receipt_confirmation_date == new.receipt_confirmation_date
            }) {
                return Err(unique_violation("uq_inspections_worksheet_receipt"));
            }
            let now = Utc::now();
            let inspection = inspection::Model {
                id: state.next_id(),
                inspection_name_id: new.inspection_name_id,
                worksheet_code: new.worksheet_code,
                receipt_confirmation_date: new.receipt_confirmation_date,
                inspection_date: new.inspection_date,
                status: InspectionStatus::Pending.as_i16(),
                evidence_id: None,
                company_code: new.company_code,
                send_count: 0,
                is_send: false,
                version: 0,
                created_at: now,
                updated_at: now,
            };
            state.inspections.insert(inspection.id, inspection.clone());
            inspection
        };
        self.undo.push(Undo::Inspection(inspection.id, None));
        Ok(inspection)
    }

    async fn update_inspection(
        &mut self,
        inspection: &inspection::Model,
    ) -> AppResult<inspection::Model> {
        let (previous, updated) = {
            let mut state = self.state();
            let Some(stored) = state.inspections.get(&inspection.id).cloned() else {
                return Err(AppError::ConcurrencyConflict(format!(
                    "inspection {} no longer exists",
                    inspection.id
                )));
            };
            if stored.version != inspection.version {
                return Err(AppError::ConcurrencyConflict(format!(
                    "inspection {} is at version {}, not {}",
                    inspection.id, stored.version, inspection.version
                )));
            }
            let mut updated = inspection.clone();
            updated.version += 1;
            updated.updated_at = Utc::now();
            state.inspections.insert(inspection.id, updated.clone());
            (stored, updated)
        };
        self.undo
            .push(Undo::Inspection(inspection.id, Some(previous)));
        Ok(updated)
    }

    async fn unsent_inspections(
        &mut self,
        statuses: &[InspectionStatus],
    ) -> AppResult<Vec<inspection::Model>> {
        let mut found: Vec<_> = self
            .state()
            .inspections
            .values()
            .filter(|i| !i.is_send && status_in(i, statuses))
            .cloned()
            .collect();
        found.sort_by_key(|i| (i.updated_at, i.id));
        Ok(found)
    }

    async fn inspections_by_worksheet(
        &mut self,
        worksheet_code: &str,
        statuses: &[InspectionStatus],
    ) -> AppResult<Vec<inspection::Model>> {
        let mut found: Vec<_> = self
            .state()
            .inspections
            .values()
            .filter(|i| i.worksheet_code == worksheet_code && status_in(i, statuses))
            .cloned()
            .collect();
        found.sort_by_key(|i| (i.updated_at, i.id));
        Ok(found)
    }

    async fn inspections_for_export(
        &mut self,
        filter: &ExportFilter,
    ) -> AppResult<Vec<inspection::Model>> {
        let mut found: Vec<_> = self
            .state()
            .inspections
            .values()
            .filter(|i| {
                i.inspection_name_id == filter.inspection_name_id
                    && (filter.start_date..=filter.end_date).contains(&i.inspection_date)
                    && filter
                        .worksheet_code
                        .as_ref()
                        .is_none_or(|code| &i.worksheet_code == code)
            })
            .cloned()
            .collect();
        found.sort_by_key(|i| (std::cmp::Reverse(i.inspection_date), i.id));
        found.truncate(filter.limit as usize);
        Ok(found)
    }
}

#[async_trait]
impl MasterData for MemoryTx {
    async fn item_master(&mut self, item_name_id: i64) -> AppResult<Option<ItemMaster>> {
        Ok(self
            .state()
            .masters
            .iter()
            .find(|m| m.item_name_id == item_name_id)
            .cloned())
    }

    async fn item_masters(&mut self, inspection_name_id: i64) -> AppResult<Vec<ItemMaster>> {
        Ok(self
            .state()
            .masters
            .iter()
            .filter(|m| m.inspection_name_id == inspection_name_id)
            .cloned()
            .collect())
    }

    async fn labels(&mut self, item_name_id: i64) -> AppResult<Vec<String>> {
        Ok(self
            .state()
            .labels
            .iter()
            .filter(|(id, _)| *id == item_name_id)
            .map(|(_, label)| label.clone())
            .collect())
    }

    async fn inspection_name(&mut self, id: i64) -> AppResult<Option<inspection_name::Model>> {
        Ok(self
            .state()
            .inspection_names
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn inspection_name_by_name(
        &mut self,
        name: &str,
    ) -> AppResult<Option<inspection_name::Model>> {
        Ok(self
            .state()
            .inspection_names
            .iter()
            .find(|n| n.name == name)
            .cloned())
    }

    async fn inspection_names(&mut self) -> AppResult<Vec<inspection_name::Model>> {
        let mut names = self.state().inspection_names.clone();
        names.sort_by_key(|n| n.id);
        Ok(names)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTx {
    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        self.undo.clear();
        self.db.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> AppResult<()> {
        self.restore();
        self.db.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Fake capabilities
// ----------------------------------------------------------------------------

/// Content type and user metadata recorded by [`FakeStorage::put`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHeaders {
    pub content_type: String,
    pub metadata: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    copies: AtomicUsize,
    deleted: Mutex<Vec<(String, String)>>,
    headers: Mutex<HashMap<(String, String), StoredHeaders>>,
    pub fail_copy: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FakeStorage {
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn headers(&self, bucket: &str, key: &str) -> Option<StoredHeaders> {
        self.headers
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for FakeStorage {
    async fn get(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>> {
        self.object(bucket, key)
            .ok_or_else(|| AppError::Storage(format!("NoSuchKey: {}/{}", bucket, key)))
    }

    async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> AppResult<String> {
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(AppError::Storage("copy refused".to_string()));
        }
        let data = self.get(bucket, source_key).await?;
        self.insert(bucket, dest_key, data);
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(join_bucket_path(bucket, dest_key))
    }

    async fn delete(&self, bucket: &str, key: &str) -> AppResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Storage("delete refused".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        self.deleted
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &[(&str, String)],
    ) -> AppResult<()> {
        self.headers.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredHeaders {
                content_type: content_type.to_string(),
                metadata: metadata
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect(),
            },
        );
        self.insert(bucket, key, data);
        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> AppResult<String> {
        Ok(format!(
            "https://{}.storage.example/{}?expires={}",
            bucket,
            key,
            expires.as_secs()
        ))
    }
}

/// Message recorded by [`FakeQueue::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub queue_url: String,
    pub group_id: String,
    pub body: String,
}

#[derive(Default)]
pub struct FakeQueue {
    sent: Mutex<Vec<SentMessage>>,
    inbox: Mutex<HashMap<String, VecDeque<QueueMessage>>>,
    acked: Mutex<Vec<String>>,
    pub fail_enqueue: AtomicBool,
}

impl FakeQueue {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    /// Make a message available to `receive`.
    pub fn deliver(&self, queue_url: &str, receipt_handle: &str, body: &str) {
        self.inbox
            .lock()
            .unwrap()
            .entry(queue_url.to_string())
            .or_default()
            .push_back(QueueMessage {
                receipt_handle: receipt_handle.to_string(),
                body: body.to_string(),
            });
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn enqueue(&self, queue_url: &str, group_id: &str, body: &str) -> AppResult<()> {
        // Let competing transactions run while this one holds its locks
        tokio::task::yield_now().await;
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(AppError::Queue("queue unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            queue_url: queue_url.to_string(),
            group_id: group_id.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn receive(
        &self,
        queue_url: &str,
        max_messages: i32,
        _wait_secs: i32,
    ) -> AppResult<Vec<QueueMessage>> {
        let mut inbox = self.inbox.lock().unwrap();
        let Some(queue) = inbox.get_mut(queue_url) else {
            return Ok(Vec::new());
        };
        let take = (max_messages.max(0) as usize).min(queue.len());
        Ok(queue.drain(..take).collect())
    }

    async fn ack(&self, _queue_url: &str, receipt_handle: &str) -> AppResult<()> {
        self.acked.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTextDetector {
    lines: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeTextDetector {
    pub fn set_lines(&self, lines: &[&str]) {
        *self.lines.lock().unwrap() = lines.iter().map(|l| l.to_string()).collect();
    }
}

#[async_trait]
impl TextDetector for FakeTextDetector {
    async fn detect_text(&self, _image: Vec<u8>) -> AppResult<Vec<TextBlock>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::TextDetection("throttled".to_string()));
        }
        Ok(self
            .lines
            .lock()
            .unwrap()
            .iter()
            .map(|line| TextBlock::line(line))
            .collect())
    }
}

/// Call recorded by [`FakeAnalysisApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisCall {
    pub url: String,
    pub auth_token: String,
    pub master_image: String,
    pub file_name: String,
}

pub struct FakeAnalysisApi {
    response: Mutex<Result<AnalysisApiResponse, String>>,
    calls: Mutex<Vec<AnalysisCall>>,
}

impl Default for FakeAnalysisApi {
    fn default() -> Self {
        Self {
            response: Mutex::new(Ok(AnalysisApiResponse {
                status: 1,
                value: "1,,".to_string(),
            })),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeAnalysisApi {
    pub fn respond(&self, status: i32, value: &str) {
        *self.response.lock().unwrap() = Ok(AnalysisApiResponse {
            status,
            value: value.to_string(),
        });
    }

    pub fn fail(&self, message: &str) {
        *self.response.lock().unwrap() = Err(message.to_string());
    }

    pub fn calls(&self) -> Vec<AnalysisCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisApi for FakeAnalysisApi {
    async fn post_image(
        &self,
        url: &str,
        auth_token: &str,
        master_image: &str,
        image: AnalysisImage,
    ) -> AppResult<AnalysisApiResponse> {
        self.calls.lock().unwrap().push(AnalysisCall {
            url: url.to_string(),
            auth_token: auth_token.to_string(),
            master_image: master_image.to_string(),
            file_name: image.file_name,
        });
        self.response
            .lock()
            .unwrap()
            .clone()
            .map_err(AppError::ExternalApi)
    }
}

// ----------------------------------------------------------------------------
// Pipeline harness
// ----------------------------------------------------------------------------

/// A pipeline wired to the in-memory store and fakes.
pub struct TestPipeline {
    pub db: MemoryDb,
    pub storage: Arc<FakeStorage>,
    pub queue: Arc<FakeQueue>,
    pub text: Arc<FakeTextDetector>,
    pub analysis: Arc<FakeAnalysisApi>,
    pub pipeline: Arc<Pipeline>,
}

impl TestPipeline {
    pub fn new() -> Self {
        let config = test_config(Environment::Development);
        let db = MemoryDb::default();
        let storage = Arc::new(FakeStorage::default());
        let queue = Arc::new(FakeQueue::default());
        let text = Arc::new(FakeTextDetector::default());
        let analysis = Arc::new(FakeAnalysisApi::default());

        let pipeline = Pipeline::new(
            Arc::new(db.clone()),
            Capabilities {
                storage: storage.clone(),
                queue: queue.clone(),
                text: text.clone(),
                analysis: analysis.clone(),
            },
            PlateReader::new().unwrap(),
            config.queues,
            config.export,
        );

        Self {
            db,
            storage,
            queue,
            text,
            analysis,
            pipeline: Arc::new(pipeline),
        }
    }
}
