// file: src/scan/walker.rs
// description: Directory walking and entry discovery with exclusion filtering
// reference: https://docs.rs/walkdir

use crate::scan::filter::{Decision, ExclusionFilter};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, error, trace};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub included: usize,
    pub skipped_entries: usize,
    pub skipped_subtrees: usize,
    pub failed: usize,
    pub stopped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TreeWalker {
    follow_links: bool,
}

impl TreeWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth-first walk below `root`, calling `on_include` for every entry the filter admits.
    ///
    /// The root itself is never reported. An entry that cannot be read is logged and
    /// treated as a skipped subtree; the walk carries on with its siblings. Returning
    /// `ControlFlow::Break` from `on_include` ends the walk early.
    pub fn walk<F>(&self, root: &Path, filter: &ExclusionFilter, mut on_include: F) -> WalkStats
    where
        F: FnMut(WalkEntry) -> ControlFlow<()>,
    {
        debug!("Walking {}", root.display());
        let mut stats = WalkStats::default();

        let mut entries = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.follow_links)
            .into_iter();

        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    error!("Failed to access {}: {}", path, e);
                    stats.failed += 1;
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    error!("Failed to stat {}: {}", entry.path().display(), e);
                    stats.failed += 1;
                    if is_dir {
                        entries.skip_current_dir();
                    }
                    continue;
                }
            };

            let size = if is_dir { 0 } else { metadata.len() };
            match filter.decide(entry.path(), is_dir, size) {
                Decision::SkipSubtree => {
                    trace!("Skipping folder {}", entry.path().display());
                    stats.skipped_subtrees += 1;
                    entries.skip_current_dir();
                }
                Decision::SkipEntry => {
                    trace!("Skipping {}", entry.path().display());
                    stats.skipped_entries += 1;
                }
                Decision::Include => {
                    stats.included += 1;
                    let walk_entry = WalkEntry {
                        path: entry.into_path(),
                        is_dir,
                        size,
                    };
                    if on_include(walk_entry).is_break() {
                        stats.stopped = true;
                        break;
                    }
                }
            }
        }

        debug!(
            "Walked {}: {} included, {} skipped, {} subtrees pruned, {} failed",
            root.display(),
            stats.included,
            stats.skipped_entries,
            stats.skipped_subtrees,
            stats.failed
        );
        stats
    }
}
