// file: src/store/memory.rs
// description: in-memory document store recording every call, for tests
// reference: internal test support

use crate::error::{Result, TroviError};
use crate::models::{FileRecord, SearchHit};
use crate::store::{
    DeleteStatus, DocumentStore, SearchPage, SearchRequest, UpsertStatus, document_key,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upsert(String),
    Exists(String),
    Delete(String),
    DeleteIndex,
    PutPipeline,
    Search(String),
    Scroll(String),
    ClearScroll(String),
}

/// Documents keyed by escaped path. Searches snapshot the matching documents, like a
/// backend scroll context, so deletes during iteration do not shift later pages.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, FileRecord>>,
    calls: Mutex<Vec<Call>>,
    scrolls: Mutex<HashMap<String, (usize, VecDeque<SearchHit>)>>,
    failing_paths: Mutex<HashSet<String>>,
    next_scroll: AtomicU64,
    reported_total: Mutex<Option<u64>>,
    pub fail_pipeline: AtomicBool,
    pub fail_delete_index: AtomicBool,
    pub fail_scroll: AtomicBool,
    pub fail_search: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: FileRecord) {
        let key = document_key(&record.full_path);
        self.docs.lock().unwrap().insert(key, record);
    }

    pub fn get(&self, id: &str) -> Option<FileRecord> {
        self.docs.lock().unwrap().get(&document_key(id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn upserts(&self) -> usize {
        self.count(|c| matches!(c, Call::Upsert(_)))
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Make every operation on `id` fail with a backend error.
    pub fn fail_on(&self, id: &str) {
        self.failing_paths.lock().unwrap().insert(document_key(id));
    }

    /// Report `total` from search regardless of the stored documents.
    pub fn report_total(&self, total: u64) {
        *self.reported_total.lock().unwrap() = Some(total);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing_paths.lock().unwrap().contains(key) {
            return Err(TroviError::Backend {
                status: 400,
                body: format!("rejected {}", key),
            });
        }
        Ok(())
    }

    fn next_page(&self, scroll_id: &str) -> Option<Vec<SearchHit>> {
        let mut scrolls = self.scrolls.lock().unwrap();
        let (page_size, remaining) = scrolls.get_mut(scroll_id)?;
        let take = (*page_size).min(remaining.len());
        Some(remaining.drain(..take).collect())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(&self, id: &str, record: &FileRecord) -> Result<UpsertStatus> {
        let key = document_key(id);
        self.record(Call::Upsert(key.clone()));
        self.check(&key)?;

        let mut stored = record.clone();
        stored.data.clear();
        let previous = self.docs.lock().unwrap().insert(key, stored);
        Ok(if previous.is_some() {
            UpsertStatus::Updated
        } else {
            UpsertStatus::Created
        })
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let key = document_key(id);
        self.record(Call::Exists(key.clone()));
        self.check(&key)?;
        Ok(self.docs.lock().unwrap().contains_key(&key))
    }

    async fn delete(&self, id: &str) -> Result<DeleteStatus> {
        let key = document_key(id);
        self.record(Call::Delete(key.clone()));
        self.check(&key)?;
        Ok(match self.docs.lock().unwrap().remove(&key) {
            Some(_) => DeleteStatus::Deleted,
            None => DeleteStatus::NotFound,
        })
    }

    async fn delete_index(&self) -> Result<()> {
        self.record(Call::DeleteIndex);
        if self.fail_delete_index.load(Ordering::SeqCst) {
            return Err(TroviError::Backend {
                status: 500,
                body: "delete index failed".to_string(),
            });
        }
        self.docs.lock().unwrap().clear();
        Ok(())
    }

    async fn put_pipeline(&self) -> Result<()> {
        self.record(Call::PutPipeline);
        if self.fail_pipeline.load(Ordering::SeqCst) {
            return Err(TroviError::Backend {
                status: 400,
                body: "no attachment plugin".to_string(),
            });
        }
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        self.record(Call::Search(request.query.clone()));
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(TroviError::Backend {
                status: 404,
                body: "index_not_found_exception".to_string(),
            });
        }

        let hits: VecDeque<SearchHit> = self
            .docs
            .lock()
            .unwrap()
            .values()
            .filter(|doc| request.query == "*" || doc.full_path.contains(&request.query))
            .map(|doc| SearchHit::new(1.0, doc.clone(), Vec::new()))
            .collect();
        let total = self
            .reported_total
            .lock()
            .unwrap()
            .unwrap_or(hits.len() as u64);

        let scroll_id = format!("scroll-{}", self.next_scroll.fetch_add(1, Ordering::SeqCst));
        self.scrolls
            .lock()
            .unwrap()
            .insert(scroll_id.clone(), (request.page_size.max(1), hits));
        let first = self.next_page(&scroll_id).unwrap_or_default();

        Ok(SearchPage {
            total,
            scroll_id: Some(scroll_id),
            hits: first,
        })
    }

    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage> {
        self.record(Call::Scroll(scroll_id.to_string()));
        if self.fail_scroll.load(Ordering::SeqCst) {
            return Err(TroviError::Backend {
                status: 404,
                body: "search_context_missing_exception".to_string(),
            });
        }

        let hits = self.next_page(scroll_id).ok_or_else(|| TroviError::Backend {
            status: 404,
            body: format!("no scroll {}", scroll_id),
        })?;

        Ok(SearchPage {
            total: 0,
            scroll_id: Some(scroll_id.to_string()),
            hits,
        })
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<()> {
        self.record(Call::ClearScroll(scroll_id.to_string()));
        self.scrolls.lock().unwrap().remove(scroll_id);
        Ok(())
    }
}
