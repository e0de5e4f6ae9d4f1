// file: src/models/file_record.rs
// description: indexed file document model and its construction from disk
// reference: internal data structures

use crate::error::{Result, TroviError};
use crate::scan::Fingerprinter;
use crate::scan::filter::extension_of;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::path::Path;

/// Document stored per file or folder. Field names are the wire names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "filename", default)]
    pub file_name: String,
    #[serde(rename = "fullpath", default)]
    pub full_path: String,
    #[serde(rename = "path", default)]
    pub directory: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub hash: String,
    /// Base64 file content; consumed by the ingest pipeline and never read back.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(rename = "isfolder", default)]
    pub is_folder: bool,
    #[serde(rename = "date", default)]
    pub modified: String,
    #[serde(default)]
    pub mode: String,
}

impl FileRecord {
    /// Stat `path` and build its record. Files are read once for both hash and content.
    pub fn from_path(path: &Path, fingerprinter: &mut Fingerprinter) -> Result<Self> {
        let metadata = fs::symlink_metadata(path).map_err(|e| TroviError::file(path, e))?;

        let mut record = Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            full_path: path.to_string_lossy().into_owned(),
            directory: path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            is_folder: metadata.is_dir(),
            modified: modified_string(&metadata),
            mode: permission_string(&metadata),
            ..Self::default()
        };

        if !metadata.is_dir() {
            let (hash, content) = fingerprinter.digest_file_with_content(path)?;
            record.size = metadata.len();
            record.extension = extension_of(path);
            record.hash = hash;
            record.data = STANDARD.encode(content);
        }

        Ok(record)
    }

    pub fn is_executable(&self) -> bool {
        self.mode.contains('x')
    }
}

/// Modification time as RFC 3339 UTC with nanoseconds; compared verbatim for staleness.
pub fn modified_string(metadata: &Metadata) -> String {
    metadata
        .modified()
        .map(|time| DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true))
        .unwrap_or_default()
}

/// `ls -l` style permission string such as `-rw-r--r--`.
#[cfg(unix)]
pub fn permission_string(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let file_type = metadata.file_type();
    let kind = if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'L'
    } else {
        '-'
    };

    let bits = metadata.permissions().mode();
    let mut out = String::with_capacity(10);
    out.push(kind);
    for (shift, flag) in [(8, 'r'), (7, 'w'), (6, 'x'), (5, 'r'), (4, 'w'), (3, 'x'), (2, 'r'), (1, 'w'), (0, 'x')] {
        out.push(if bits & (1 << shift) != 0 { flag } else { '-' });
    }
    out
}

#[cfg(not(unix))]
pub fn permission_string(metadata: &Metadata) -> String {
    let kind = if metadata.is_dir() { 'd' } else { '-' };
    let write = if metadata.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}-r--r--")
}
