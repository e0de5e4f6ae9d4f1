// file: src/sync/engine.rs
// description: reconciles the remote index with the configured folders
// reference: orchestrates walk, fingerprint and upload phases with a bounded worker pool

use crate::config::{Config, ExclusionRules, IndexSpec};
use crate::error::{Result, TroviError};
use crate::models::file_record::modified_string;
use crate::models::{FileRecord, SearchHit};
use crate::query::{
    HitHandler, MATCH_ALL, QueryConsumer, QueryProgress, QueryReport, QueryRequest,
};
use crate::scan::{ExclusionFilter, Fingerprinter, HashAlgorithm, TreeWalker, WalkEntry};
use crate::store::{DocumentStore, UpsertStatus};
use crate::sync::progress::{PassReport, ProgressReporter, SyncCounters};
use crate::utils::telemetry::OperationTimer;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Drop the index and upload everything.
    Forced,
    /// Repair indexed documents comparing hashes and dates, then add missing files.
    Update,
    /// Like `Update`, comparing dates only.
    UpdateFast,
}

impl FromStr for SyncMode {
    type Err = TroviError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "forced" => Ok(Self::Forced),
            "update" => Ok(Self::Update),
            "update-fast" | "updateFast" => Ok(Self::UpdateFast),
            other => Err(TroviError::Validation(format!(
                "unknown sync mode {:?} (expected forced, update or update-fast)",
                other
            ))),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forced => "forced",
            Self::Update => "update",
            Self::UpdateFast => "update-fast",
        })
    }
}

/// What the sync pass does with each included entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    Upsert,
    AddIfMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Uploaded,
    Added,
    AlreadyIndexed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Unchanged,
    Deleted,
    Reuploaded,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub checked: u64,
    pub unchanged: u64,
    pub deleted: u64,
    pub reuploaded: u64,
    pub failed: u64,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub mode: SyncMode,
    pub update: Option<UpdateReport>,
    pub passes: Vec<PassReport>,
}

impl RunReport {
    pub fn added(&self) -> usize {
        self.passes.iter().map(|p| p.added).sum()
    }

    pub fn failed(&self) -> usize {
        let update_failed = self.update.as_ref().map_or(0, |u| u.failed as usize);
        self.passes.iter().map(|p| p.failed).sum::<usize>() + update_failed
    }
}

pub struct ReconcileEngine {
    store: Arc<dyn DocumentStore>,
    index: Vec<IndexSpec>,
    rules: ExclusionRules,
    algorithm: HashAlgorithm,
    jobs: usize,
    page_size: usize,
    progress: Arc<dyn ProgressReporter>,
    counters: SyncCounters,
    cancel: CancellationToken,
}

impl ReconcileEngine {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        progress: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            index: config
                .index
                .iter()
                .map(|spec| {
                    let mut spec = spec.clone();
                    if let Err(e) = spec.absolutize() {
                        warn!("Keeping folder {} as given: {}", spec.folder.display(), e);
                    }
                    spec
                })
                .collect(),
            rules: config.exclude.clone(),
            algorithm: config.hash,
            jobs: config.sync.jobs.max(1),
            page_size: config.backend.page_size.max(1),
            progress,
            counters: SyncCounters::default(),
            cancel,
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub async fn run(&self, mode: SyncMode) -> Result<RunReport> {
        let timer = OperationTimer::new(&format!("{} sync", mode));

        let report = match mode {
            SyncMode::Forced => RunReport {
                mode,
                update: None,
                passes: self.forced().await?,
            },
            SyncMode::Update | SyncMode::UpdateFast => {
                let update = self.update(mode == SyncMode::Update).await?;
                self.ensure_running()?;
                RunReport {
                    mode,
                    update: Some(update),
                    passes: self.add_missing().await?,
                }
            }
        };

        timer.finish_with_count(report.passes.iter().map(|p| p.processed).sum());
        Ok(report)
    }

    /// Rebuild the index from scratch. Index or pipeline failures abort the run.
    pub async fn forced(&self) -> Result<Vec<PassReport>> {
        info!("Performing forced sync");

        self.store.delete_index().await.inspect_err(|e| {
            error!("Unable to delete index: {}", e);
        })?;
        self.store.put_pipeline().await.inspect_err(|e| {
            error!("Unable to set ingest pipeline: {}", e);
        })?;

        self.sync_all(EntryAction::Upsert).await
    }

    /// Upload only entries whose documents are absent.
    pub async fn add_missing(&self) -> Result<Vec<PassReport>> {
        info!("Adding files missing from the index");
        self.ensure_pipeline().await;
        self.sync_all(EntryAction::AddIfMissing).await
    }

    /// Walk every indexed document, removing vanished files and re-uploading stale ones.
    pub async fn update(&self, use_hash: bool) -> Result<UpdateReport> {
        info!(
            "Updating indexed documents ({})",
            if use_hash { "hash and date" } else { "date only" }
        );
        self.ensure_pipeline().await;

        let timer = OperationTimer::new("update indexed documents");
        let consumer = QueryConsumer::new(self.store.as_ref(), self.page_size, self.cancel.clone());
        let mut handler = UpdateHandler {
            engine: self,
            use_hash,
            report: UpdateReport::default(),
        };

        let query = match consumer.run(&QueryRequest::new(MATCH_ALL), &mut handler).await {
            Ok(query) => query,
            Err(TroviError::Cancelled) => return Err(TroviError::Cancelled),
            Err(e) => {
                // a fresh index has nothing to repair yet
                warn!("Unable to list indexed documents, skipping update: {}", e);
                QueryReport::default()
            }
        };
        let mut report = handler.report;
        report.complete = query.complete;
        self.progress.clear();
        self.progress.flush();

        timer.finish_with_count(report.checked as usize);
        info!(
            "Checked {} documents: {} unchanged, {} re-uploaded, {} deleted, {} failed",
            report.checked, report.unchanged, report.reuploaded, report.deleted, report.failed
        );

        self.ensure_running()?;
        Ok(report)
    }

    async fn sync_all(&self, action: EntryAction) -> Result<Vec<PassReport>> {
        let mut reports = Vec::with_capacity(self.index.len());
        for spec in &self.index {
            self.ensure_running()?;
            reports.push(self.sync_folder(spec, action).await?);
        }
        Ok(reports)
    }

    /// Count pass, then the action pass. Both walks finish before the report is taken.
    pub async fn sync_folder(&self, spec: &IndexSpec, action: EntryAction) -> Result<PassReport> {
        info!("- {}", spec.folder.display());
        let timer = OperationTimer::new(&format!("sync {}", spec.folder.display()));
        let filter = ExclusionFilter::new(spec, &self.rules);

        let total = count_entries(spec.folder.clone(), filter.clone()).await?;
        info!("Found files: {}", total);
        self.counters.reset(total);

        let (tx, mut rx) = mpsc::channel::<WalkEntry>(self.jobs * 2);
        let root = spec.folder.clone();
        let cancel = self.cancel.clone();
        let walker = tokio::task::spawn_blocking(move || {
            TreeWalker::new().walk(&root, &filter, |entry| {
                if cancel.is_cancelled() || tx.blocking_send(entry).is_err() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
        });

        stream::poll_fn(move |cx| rx.poll_recv(cx))
            .map(|entry| self.apply(action, entry))
            .buffer_unordered(self.jobs)
            .for_each(|_| futures::future::ready(()))
            .await;

        let walk = walker.await.map_err(join_error)?;
        let duration = timer.finish_with_count(self.counters.snapshot().processed);
        self.progress.clear();
        self.progress.flush();

        let report = PassReport::new(spec.folder.clone(), self.counters.snapshot(), duration);
        debug!(
            "Pass over {} done: {:?} ({} walk failures)",
            spec.folder.display(),
            report,
            walk.failed
        );
        self.ensure_running()?;
        Ok(report)
    }

    async fn apply(&self, action: EntryAction, entry: WalkEntry) -> EntryOutcome {
        if self.cancel.is_cancelled() {
            return EntryOutcome::Cancelled;
        }

        let id = entry.path.to_string_lossy().into_owned();
        trace!("Sync file: {}", id);

        let result = match action {
            EntryAction::Upsert => self.upload(&entry.path).await.map(|_| EntryOutcome::Uploaded),
            EntryAction::AddIfMissing => match self.store.exists(&id).await {
                Ok(true) => Ok(EntryOutcome::AlreadyIndexed),
                Ok(false) => self.upload(&entry.path).await.map(|_| EntryOutcome::Added),
                Err(e) => Err(e),
            },
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(TroviError::Cancelled) => return EntryOutcome::Cancelled,
            Err(e) => {
                error!("Skipping {}: {}", id, e);
                EntryOutcome::Failed
            }
        };

        match outcome {
            EntryOutcome::Uploaded => self.counters.inc_uploaded(),
            EntryOutcome::Added => {
                self.counters.inc_uploaded();
                self.counters.inc_added();
            }
            EntryOutcome::Failed => self.counters.inc_failed(),
            EntryOutcome::AlreadyIndexed | EntryOutcome::Cancelled => {}
        }

        let processed = self.counters.inc_processed();
        let total = self.counters.snapshot().total;
        self.report_line(&format!("Synchronizing ({}/{}) files...", processed, total));
        outcome
    }

    async fn refresh(&self, stored: FileRecord, use_hash: bool) -> RefreshOutcome {
        let path = PathBuf::from(&stored.full_path);

        let metadata = match tokio::fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("{} is gone ({}), removing from index", stored.full_path, e);
                return match self.store.delete(&stored.full_path).await {
                    Ok(_) => RefreshOutcome::Deleted,
                    Err(e) => {
                        error!("Failed to delete {}: {}", stored.full_path, e);
                        RefreshOutcome::Failed
                    }
                };
            }
        };

        let mut stale = false;
        if use_hash && !metadata.is_dir() {
            match digest(path.clone(), self.algorithm).await {
                Ok(hash) => stale = hash != stored.hash,
                Err(e) => {
                    error!("Skipping {}: {}", stored.full_path, e);
                    return RefreshOutcome::Failed;
                }
            }
        }
        if !stale {
            stale = modified_string(&metadata) != stored.modified;
        }
        if !stale {
            return RefreshOutcome::Unchanged;
        }

        debug!("{} changed, re-uploading", stored.full_path);
        match self.upload(&path).await {
            Ok(_) => RefreshOutcome::Reuploaded,
            Err(e) => {
                error!("Skipping {}: {}", stored.full_path, e);
                RefreshOutcome::Failed
            }
        }
    }

    async fn upload(&self, path: &Path) -> Result<UpsertStatus> {
        let record = build_record(path.to_path_buf(), self.algorithm).await?;
        self.store.upsert(&record.full_path, &record).await
    }

    async fn ensure_pipeline(&self) {
        if let Err(e) = self.store.put_pipeline().await {
            warn!("Unable to set ingest pipeline, continuing: {}", e);
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TroviError::Cancelled);
        }
        Ok(())
    }

    fn report_line(&self, line: &str) {
        self.progress.clear();
        self.progress.write(line);
        self.progress.flush();
    }
}

struct UpdateHandler<'e> {
    engine: &'e ReconcileEngine,
    use_hash: bool,
    report: UpdateReport,
}

#[async_trait]
impl HitHandler for UpdateHandler<'_> {
    async fn handle(&mut self, hit: SearchHit, progress: QueryProgress) {
        let outcome = self.engine.refresh(hit.record, self.use_hash).await;

        self.report.checked += 1;
        match outcome {
            RefreshOutcome::Unchanged => self.report.unchanged += 1,
            RefreshOutcome::Deleted => self.report.deleted += 1,
            RefreshOutcome::Reuploaded => self.report.reuploaded += 1,
            RefreshOutcome::Failed => self.report.failed += 1,
        }

        self.engine.report_line(&format!(
            "Checking ({}/{}) indexed documents...",
            progress.total - progress.remaining,
            progress.total
        ));
    }
}

async fn count_entries(root: PathBuf, filter: ExclusionFilter) -> Result<usize> {
    tokio::task::spawn_blocking(move || {
        let mut count = 0;
        TreeWalker::new().walk(&root, &filter, |_| {
            count += 1;
            ControlFlow::Continue(())
        });
        count
    })
    .await
    .map_err(join_error)
}

/// Each call hashes with a fresh fingerprinter on a blocking thread.
async fn build_record(path: PathBuf, algorithm: HashAlgorithm) -> Result<FileRecord> {
    tokio::task::spawn_blocking(move || {
        let mut fingerprinter = Fingerprinter::new(algorithm);
        FileRecord::from_path(&path, &mut fingerprinter)
    })
    .await
    .map_err(join_error)?
}

async fn digest(path: PathBuf, algorithm: HashAlgorithm) -> Result<String> {
    tokio::task::spawn_blocking(move || Fingerprinter::new(algorithm).digest_file(&path))
        .await
        .map_err(join_error)?
}

fn join_error(e: tokio::task::JoinError) -> TroviError {
    TroviError::Io(std::io::Error::other(format!("worker task failed: {}", e)))
}
