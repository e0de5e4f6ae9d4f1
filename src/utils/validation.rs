// file: src/utils/validation.rs
// description: configuration value validation and normalization helpers
// reference: input validation patterns

use crate::error::{Result, TroviError};
use std::path::Path;

/// Largest page a scroll search may request.
pub const MAX_PAGE_SIZE: usize = 10_000;

pub struct Validator;

impl Validator {
    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(TroviError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(TroviError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        let Some((_, rest)) = url
            .strip_prefix("http://")
            .map(|r| ("http", r))
            .or_else(|| url.strip_prefix("https://").map(|r| ("https", r)))
        else {
            return Err(TroviError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        };

        if rest.is_empty() || rest.starts_with(':') || rest.starts_with('/') {
            return Err(TroviError::Validation(format!("URL has no host: {}", url)));
        }
        Ok(())
    }

    pub fn validate_jobs(jobs: usize) -> Result<()> {
        if jobs == 0 {
            return Err(TroviError::Validation(
                "Worker count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_page_size(size: usize) -> Result<()> {
        if size == 0 {
            return Err(TroviError::Validation(
                "Page size must be greater than 0".to_string(),
            ));
        }

        if size > MAX_PAGE_SIZE {
            return Err(TroviError::Validation(format!(
                "Page size too large (max {})",
                MAX_PAGE_SIZE
            )));
        }

        Ok(())
    }

    /// `"o"`, `".o"` and `" .o "` all become `".o"`.
    pub fn normalize_extension(ext: &str) -> String {
        let ext = ext.trim();
        if ext.is_empty() || ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{}", ext)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(Validator::validate_directory(temp.path()).is_ok());
        assert!(Validator::validate_directory(&file).is_err());
        assert!(Validator::validate_directory(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(Validator::validate_url("http://localhost:9200").is_ok());
        assert!(Validator::validate_url("https://search.internal").is_ok());
        assert!(Validator::validate_url("localhost:9200").is_err());
        assert!(Validator::validate_url("http://:9200").is_err());
        assert!(Validator::validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_jobs() {
        assert!(Validator::validate_jobs(1).is_ok());
        assert!(Validator::validate_jobs(0).is_err());
    }

    #[test]
    fn test_validate_page_size() {
        assert!(Validator::validate_page_size(100).is_ok());
        assert!(Validator::validate_page_size(0).is_err());
        assert!(Validator::validate_page_size(10_001).is_err());
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(Validator::normalize_extension("o"), ".o");
        assert_eq!(Validator::normalize_extension(".zip"), ".zip");
        assert_eq!(Validator::normalize_extension(" mkv "), ".mkv");
        assert_eq!(Validator::normalize_extension(""), "");
    }
}
