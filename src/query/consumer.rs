// file: src/query/consumer.rs
// description: paginated scroll consumer delivering every hit to a handler
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/paginate-search-results.html

use crate::error::Result;
use crate::models::SearchHit;
use crate::query::builder::build_query;
use crate::store::{DocumentStore, SearchRequest};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub text: String,
    pub paths: Vec<PathBuf>,
    pub highlight: bool,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            paths: Vec::new(),
            highlight: false,
        }
    }

    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryProgress {
    pub total: u64,
    /// Hits still to come after the current one.
    pub remaining: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryReport {
    pub total: u64,
    pub delivered: u64,
    pub page_sizes: Vec<usize>,
    /// False when pagination stopped before every reported match was delivered.
    pub complete: bool,
}

#[async_trait]
pub trait HitHandler: Send {
    async fn handle(&mut self, hit: SearchHit, progress: QueryProgress);
}

pub struct QueryConsumer<'a> {
    store: &'a dyn DocumentStore,
    page_size: usize,
    cancel: CancellationToken,
}

impl<'a> QueryConsumer<'a> {
    pub fn new(store: &'a dyn DocumentStore, page_size: usize, cancel: CancellationToken) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            cancel,
        }
    }

    /// Drain every page of `request` into `handler`.
    ///
    /// Only a failing first search is an error. A later failure, an early empty page or
    /// cancellation ends the loop with a partial report.
    pub async fn run<H>(&self, request: &QueryRequest, handler: &mut H) -> Result<QueryReport>
    where
        H: HitHandler + ?Sized,
    {
        let query = build_query(&request.text, &request.paths)?;
        debug!("Running query {}", query);

        let first = self
            .store
            .search(&SearchRequest {
                query,
                highlight: request.highlight,
                page_size: self.page_size,
            })
            .await?;

        let total = first.total;
        let mut current = total;
        let mut scroll_id = first.scroll_id;
        let mut report = QueryReport {
            total,
            ..QueryReport::default()
        };

        deliver(first.hits, total, &mut current, &mut report, handler).await;

        while current > 0 {
            if self.cancel.is_cancelled() {
                warn!("Query cancelled with {} of {} hits outstanding", current, total);
                break;
            }

            let Some(id) = scroll_id.as_deref() else {
                warn!("Backend returned no scroll handle; {} hits not fetched", current);
                break;
            };

            match self.store.scroll(id).await {
                Ok(page) if page.hits.is_empty() => {
                    warn!("Result pages ran out with {} of {} hits outstanding", current, total);
                    break;
                }
                Ok(page) => {
                    if page.scroll_id.is_some() {
                        scroll_id = page.scroll_id;
                    }
                    deliver(page.hits, total, &mut current, &mut report, handler).await;
                }
                Err(e) => {
                    error!("Failed to fetch next result page: {}", e);
                    break;
                }
            }
        }

        report.complete = current == 0;

        if let Some(id) = scroll_id
            && let Err(e) = self.store.clear_scroll(&id).await
        {
            debug!("Failed to clear scroll context: {}", e);
        }

        Ok(report)
    }
}

async fn deliver<H>(
    hits: Vec<SearchHit>,
    total: u64,
    current: &mut u64,
    report: &mut QueryReport,
    handler: &mut H,
) where
    H: HitHandler + ?Sized,
{
    report.page_sizes.push(hits.len());
    for hit in hits {
        *current = current.saturating_sub(1);
        report.delivered += 1;
        handler
            .handle(
                hit,
                QueryProgress {
                    total,
                    remaining: *current,
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRecord;
    use crate::store::memory::{Call, MemoryStore};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct Collect {
        paths: Vec<String>,
        remaining: Vec<u64>,
    }

    #[async_trait]
    impl HitHandler for Collect {
        async fn handle(&mut self, hit: SearchHit, progress: QueryProgress) {
            self.paths.push(hit.record.full_path);
            self.remaining.push(progress.remaining);
        }
    }

    fn store_with(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store.insert(FileRecord {
                full_path: format!("/data/file{:02}.txt", i),
                ..FileRecord::default()
            });
        }
        store
    }

    #[tokio::test]
    async fn test_pages_until_total_delivered() {
        let store = store_with(25);
        let consumer = QueryConsumer::new(&store, 10, CancellationToken::new());
        let mut handler = Collect::default();

        let report = consumer
            .run(&QueryRequest::new("*"), &mut handler)
            .await
            .unwrap();

        assert_eq!(report.total, 25);
        assert_eq!(report.delivered, 25);
        assert_eq!(report.page_sizes, vec![10, 10, 5]);
        assert!(report.complete);
        assert_eq!(handler.paths.len(), 25);
        assert_eq!(handler.remaining.iter().filter(|&&r| r == 0).count(), 1);
        assert_eq!(handler.remaining.first(), Some(&24));
        assert_eq!(store.count(|c| matches!(c, Call::Scroll(_))), 2);
        assert_eq!(store.count(|c| matches!(c, Call::ClearScroll(_))), 1);
    }

    #[tokio::test]
    async fn test_empty_result_makes_no_scroll_calls() {
        let store = store_with(0);
        let consumer = QueryConsumer::new(&store, 10, CancellationToken::new());
        let mut handler = Collect::default();

        let report = consumer
            .run(&QueryRequest::new("*"), &mut handler)
            .await
            .unwrap();

        assert!(report.complete);
        assert_eq!(report.delivered, 0);
        assert_eq!(store.count(|c| matches!(c, Call::Scroll(_))), 0);
    }

    #[tokio::test]
    async fn test_exhausted_pages_stop_early() {
        let store = store_with(5);
        store.report_total(8);
        let consumer = QueryConsumer::new(&store, 5, CancellationToken::new());
        let mut handler = Collect::default();

        let report = consumer
            .run(&QueryRequest::new("*"), &mut handler)
            .await
            .unwrap();

        assert!(!report.complete);
        assert_eq!(report.delivered, 5);
        assert_eq!(store.count(|c| matches!(c, Call::Scroll(_))), 1);
    }

    #[tokio::test]
    async fn test_scroll_error_gives_partial_delivery() {
        let store = store_with(15);
        store.fail_scroll.store(true, Ordering::SeqCst);
        let consumer = QueryConsumer::new(&store, 10, CancellationToken::new());
        let mut handler = Collect::default();

        let report = consumer
            .run(&QueryRequest::new("*"), &mut handler)
            .await
            .unwrap();

        assert!(!report.complete);
        assert_eq!(handler.paths.len(), 10);
    }

    #[tokio::test]
    async fn test_cancelled_query_stops_after_first_page() {
        let store = store_with(15);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let consumer = QueryConsumer::new(&store, 10, cancel);
        let mut handler = Collect::default();

        let report = consumer
            .run(&QueryRequest::new("*"), &mut handler)
            .await
            .unwrap();

        assert_eq!(report.delivered, 10);
        assert!(!report.complete);
    }

    #[tokio::test]
    async fn test_path_filters_reach_backend() {
        let store = store_with(1);
        let consumer = QueryConsumer::new(&store, 10, CancellationToken::new());
        let mut handler = Collect::default();
        let request = QueryRequest::new("filename:x").with_paths(vec![PathBuf::from("/data")]);

        consumer.run(&request, &mut handler).await.unwrap();

        assert_eq!(
            store.calls()[0],
            Call::Search("(path:\"/data\") AND filename:x".to_string())
        );
    }
}
