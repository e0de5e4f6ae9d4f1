// file: src/sync/mod.rs
// description: index reconciliation module exports
// reference: internal module structure

pub mod engine;
pub mod progress;

pub use engine::{EntryAction, ReconcileEngine, RunReport, SyncMode, UpdateReport};
pub use progress::{
    CounterSnapshot, PassReport, ProgressReporter, SilentProgress, SyncCounters, TerminalProgress,
};
