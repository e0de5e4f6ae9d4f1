// file: src/models/search_hit.rs
// description: Search hit model with relevance score and highlight snippets
// reference: Used for paginated query results

use crate::models::FileRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Backend relevance score
    pub score: f64,

    /// Stored document (without content)
    pub record: FileRecord,

    /// Highlighted fragments of the extracted content, in backend order
    pub highlights: Vec<String>,
}

impl SearchHit {
    pub fn new(score: f64, record: FileRecord, highlights: Vec<String>) -> Self {
        Self {
            score,
            record,
            highlights,
        }
    }

    pub fn full_path(&self) -> &str {
        &self.record.full_path
    }
}
