// file: src/scan/filter.rs
// description: per-entry exclusion decisions for the tree walker
// reference: configurable path-based classification

use crate::config::{ExclusionRules, IndexSpec};
use crate::utils::validation::Validator;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Include,
    /// Omit this entry only.
    SkipEntry,
    /// Omit this directory and never descend into it.
    SkipSubtree,
}

/// Combines the global rules with the exclude paths of one indexed root.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    excluded_paths: HashSet<PathBuf>,
    excluded_folders: HashSet<String>,
    excluded_extensions: HashSet<String>,
    max_size: u64,
}

impl ExclusionFilter {
    pub fn new(spec: &IndexSpec, rules: &ExclusionRules) -> Self {
        Self {
            excluded_paths: spec.exclude.iter().cloned().collect(),
            excluded_folders: rules.folder.iter().cloned().collect(),
            excluded_extensions: rules
                .extension
                .iter()
                .map(|ext| Validator::normalize_extension(ext))
                .collect(),
            max_size: rules.size,
        }
    }

    /// First matching rule wins: exclude path, folder name, extension, size.
    pub fn decide(&self, path: &Path, is_dir: bool, size: u64) -> Decision {
        if is_dir {
            if self.excluded_paths.contains(path) {
                return Decision::SkipSubtree;
            }

            let name = path.file_name().map(|n| n.to_string_lossy());
            if name.is_some_and(|n| self.excluded_folders.contains(n.as_ref())) {
                return Decision::SkipSubtree;
            }

            return Decision::Include;
        }

        if self.excluded_extensions.contains(&extension_of(path)) {
            return Decision::SkipEntry;
        }

        if self.max_size > 0 && size > self.max_size {
            return Decision::SkipEntry;
        }

        Decision::Include
    }
}

/// Extension with its leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
