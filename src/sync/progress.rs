// file: src/sync/progress.rs
// description: progress reporting and per-pass counters for synchronization runs
// reference: uses indicatif for the status line and atomics for counters shared by workers

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Sink for "processed/total" status lines. Calls are best-effort and never block.
pub trait ProgressReporter: Send + Sync {
    fn clear(&self);
    fn write(&self, line: &str);
    fn flush(&self);
}

pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new(colored: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        let template = if colored {
            "{spinner:.green} [{elapsed_precise}] {msg:.cyan}"
        } else {
            "{spinner} [{elapsed_precise}] {msg}"
        };
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for TerminalProgress {
    fn clear(&self) {
        self.bar.set_message("");
    }

    fn write(&self, line: &str) {
        self.bar.set_message(line.to_string());
    }

    fn flush(&self) {
        self.bar.tick();
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn clear(&self) {}
    fn write(&self, _line: &str) {}
    fn flush(&self) {}
}

/// Live counters for one folder pass, updated by whichever worker finishes a file.
#[derive(Debug, Default)]
pub struct SyncCounters {
    total: AtomicUsize,
    processed: AtomicUsize,
    added: AtomicUsize,
    uploaded: AtomicUsize,
    failed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total: usize,
    pub processed: usize,
    pub added: usize,
    pub uploaded: usize,
    pub failed: usize,
}

impl SyncCounters {
    pub fn reset(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.processed.store(0, Ordering::SeqCst);
        self.added.store(0, Ordering::SeqCst);
        self.uploaded.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }

    pub fn inc_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn inc_added(&self) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    pub fn inc_uploaded(&self) {
        self.uploaded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.total.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            added: self.added.load(Ordering::SeqCst),
            uploaded: self.uploaded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Final counts of one folder pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub folder: PathBuf,
    pub total: usize,
    pub processed: usize,
    pub added: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub duration_secs: f64,
}

impl PassReport {
    pub fn new(folder: PathBuf, counters: CounterSnapshot, duration: Duration) -> Self {
        Self {
            folder,
            total: counters.total,
            processed: counters.processed,
            added: counters.added,
            uploaded: counters.uploaded,
            failed: counters.failed,
            duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn files_per_second(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / self.duration_secs
    }
}
