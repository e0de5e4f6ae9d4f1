// file: src/store/client.rs
// description: Elasticsearch HTTP client implementing the document store
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/rest-apis.html

use crate::config::BackendConfig;
use crate::error::{Result, TroviError};
use crate::models::{FileRecord, SearchHit};
use crate::store::retry::RetryPolicy;
use crate::store::{
    DeleteStatus, DocumentStore, HIGHLIGHT_FIELD, SOURCE_FIELDS, SearchPage, SearchRequest,
    UpsertStatus, document_key,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    #[serde(default)]
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: FileRecord,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
}

#[derive(Clone)]
pub struct ElasticClient {
    http: Client,
    base_url: String,
    index: String,
    pipeline: String,
    scroll_keep_alive: String,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl ElasticClient {
    pub fn new(config: &BackendConfig, cancel: CancellationToken) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            http,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            index: config.index.clone(),
            pipeline: config.pipeline.clone(),
            scroll_keep_alive: config.scroll_keep_alive.clone(),
            retry: RetryPolicy::from_config(config),
            cancel,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Cluster version reported by the root endpoint.
    pub async fn ping(&self) -> Result<String> {
        debug!("Checking backend at {}", self.base_url);
        let response = self
            .execute("ping", || self.http.get(format!("{}/", self.base_url)))
            .await?;
        let body: Value = ensure_success(response).await?.json().await?;
        let version = body["version"]["number"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();
        info!("Connected to backend {} (version {})", self.base_url, version);
        Ok(version)
    }

    fn doc_url(&self, id: &str) -> String {
        format!("{}/{}/_doc/{}", self.base_url, self.index, document_key(id))
    }

    /// One request with retries. Cancellation aborts whatever is outstanding.
    async fn execute<F>(&self, operation: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        self.retry
            .run(operation, &self.cancel, || {
                let request = build();
                async move {
                    let response = tokio::select! {
                        _ = self.cancel.cancelled() => return Err(TroviError::Cancelled),
                        response = request.send() => response?,
                    };
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        return Err(backend_error(response).await);
                    }
                    Ok(response)
                }
            })
            .await
    }
}

#[async_trait]
impl DocumentStore for ElasticClient {
    async fn upsert(&self, id: &str, record: &FileRecord) -> Result<UpsertStatus> {
        let url = self.doc_url(id);
        let body = serde_json::to_vec(record)?;
        trace!("PUT {}", url);

        let response = self
            .execute("upsert", || {
                self.http
                    .put(&url)
                    .query(&[("pipeline", self.pipeline.as_str()), ("refresh", "true")])
                    .header("Content-Type", "application/json; charset=utf-8")
                    .body(body.clone())
            })
            .await?;

        let response = ensure_success(response).await?;
        Ok(if response.status() == StatusCode::CREATED {
            UpsertStatus::Created
        } else {
            UpsertStatus::Updated
        })
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let url = self.doc_url(id);
        let response = self.execute("exists", || self.http.head(&url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(backend_error(response).await),
        }
    }

    async fn delete(&self, id: &str) -> Result<DeleteStatus> {
        let url = self.doc_url(id);
        let response = self
            .execute("delete", || self.http.delete(&url).query(&[("refresh", "true")]))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteStatus::NotFound),
            status if status.is_success() => Ok(DeleteStatus::Deleted),
            _ => Err(backend_error(response).await),
        }
    }

    async fn delete_index(&self) -> Result<()> {
        let url = format!("{}/{}", self.base_url, self.index);
        let response = self.execute("delete index", || self.http.delete(&url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("Index {} did not exist", self.index);
                Ok(())
            }
            status if status.is_success() => {
                info!("Deleted index {}", self.index);
                Ok(())
            }
            _ => Err(backend_error(response).await),
        }
    }

    async fn put_pipeline(&self) -> Result<()> {
        let url = format!("{}/_ingest/pipeline/{}", self.base_url, self.pipeline);
        let body = pipeline_body();
        let response = self
            .execute("put pipeline", || self.http.put(&url).json(&body))
            .await?;
        ensure_success(response).await?;
        debug!("Ingest pipeline {} ready", self.pipeline);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let body = search_body(request);
        debug!("Search query: {}", request.query);

        let response = self
            .execute("search", || {
                self.http
                    .post(&url)
                    .query(&[("scroll", self.scroll_keep_alive.as_str())])
                    .json(&body)
            })
            .await?;

        let raw: RawSearchResponse = ensure_success(response).await?.json().await?;
        Ok(into_page(raw))
    }

    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage> {
        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({ "scroll": self.scroll_keep_alive, "scroll_id": scroll_id });

        let response = self
            .execute("scroll", || self.http.post(&url).json(&body))
            .await?;

        let raw: RawSearchResponse = ensure_success(response).await?.json().await?;
        Ok(into_page(raw))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<()> {
        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({ "scroll_id": scroll_id });
        let response = self
            .execute("clear scroll", || self.http.delete(&url).json(&body))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            _ => ensure_success(response).await.map(|_| ()),
        }
    }
}

fn pipeline_body() -> Value {
    json!({
        "description": "Extract attachment content from base64 file data",
        "processors": [
            { "attachment": { "field": "data", "ignore_missing": true } },
            { "remove": { "field": "data", "ignore_missing": true } }
        ]
    })
}

fn search_body(request: &SearchRequest) -> Value {
    let mut body = json!({
        "query": { "query_string": { "query": request.query } },
        "size": request.page_size,
        "track_total_hits": true,
        "_source": SOURCE_FIELDS,
    });
    if request.highlight {
        let mut fields = serde_json::Map::new();
        fields.insert(HIGHLIGHT_FIELD.to_string(), json!({}));
        body["highlight"] = json!({ "fields": fields });
    }
    body
}

fn into_page(raw: RawSearchResponse) -> SearchPage {
    let total = match raw.hits.total {
        Some(RawTotal::Object { value }) | Some(RawTotal::Count(value)) => value,
        None => raw.hits.hits.len() as u64,
    };

    let hits = raw
        .hits
        .hits
        .into_iter()
        .map(|mut hit| {
            let highlights = hit.highlight.remove(HIGHLIGHT_FIELD).unwrap_or_default();
            SearchHit::new(hit.score.unwrap_or_default(), hit.source, highlights)
        })
        .collect();

    SearchPage {
        total,
        scroll_id: raw.scroll_id,
        hits,
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(backend_error(response).await)
    }
}

async fn backend_error(response: Response) -> TroviError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    TroviError::Backend { status, body }
}
