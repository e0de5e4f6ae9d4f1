// file: src/query/builder.rs
// description: query string construction with optional path restrictions
// reference: https://lucene.apache.org/core/2_9_4/queryparsersyntax.html

use crate::error::{Result, TroviError};
use std::path::{Path, PathBuf};

pub const MATCH_ALL: &str = "*";

/// `(path:"<abs1>" OR path:"<abs2>") AND <text>`, or `<text>` alone without paths.
pub fn build_query(text: &str, paths: &[PathBuf]) -> Result<String> {
    let text = if text.trim().is_empty() { MATCH_ALL } else { text };
    if paths.is_empty() {
        return Ok(text.to_string());
    }

    let filters = paths
        .iter()
        .map(|p| absolute(p).map(|abs| format!("path:\"{}\"", escape_phrase(&abs))))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!("({}) AND {}", filters.join(" OR "), text))
}

fn absolute(path: &Path) -> Result<String> {
    std::path::absolute(path)
        .map(|abs| abs.to_string_lossy().into_owned())
        .map_err(|e| TroviError::file(path, e))
}

fn escape_phrase(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
