// file: src/store/mod.rs
// description: document store abstraction over the search backend
// reference: internal module structure

pub mod client;
#[cfg(test)]
pub mod memory;
pub mod retry;

pub use client::ElasticClient;
pub use retry::RetryPolicy;

use crate::error::Result;
use crate::models::{FileRecord, SearchHit};
use async_trait::async_trait;

/// Content field the backend extracts from `data`; highlights are requested on it.
pub const HIGHLIGHT_FIELD: &str = "attachment.content";

/// Stored fields returned with each hit. `data` is deliberately absent.
pub const SOURCE_FIELDS: [&str; 9] = [
    "filename",
    "fullpath",
    "path",
    "size",
    "extension",
    "hash",
    "isfolder",
    "date",
    "mode",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStatus {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    Deleted,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub highlight: bool,
    pub page_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub total: u64,
    pub scroll_id: Option<String>,
    pub hits: Vec<SearchHit>,
}

/// Operations the reconciliation engine and query consumer need from the backend.
///
/// `id` is always the raw absolute path; implementations derive the wire key with
/// [`document_key`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upsert(&self, id: &str, record: &FileRecord) -> Result<UpsertStatus>;

    async fn exists(&self, id: &str) -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<DeleteStatus>;

    /// Succeeds when the index is already absent.
    async fn delete_index(&self) -> Result<()>;

    async fn put_pipeline(&self) -> Result<()>;

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage>;

    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage>;

    async fn clear_scroll(&self, scroll_id: &str) -> Result<()>;
}

/// Document key for a path: the full path, percent-encoded (so `/` becomes `%2F`).
pub fn document_key(full_path: &str) -> String {
    urlencoding::encode(full_path).into_owned()
}
