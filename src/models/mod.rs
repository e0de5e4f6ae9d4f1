// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod file_record;
pub mod search_hit;

pub use file_record::FileRecord;
pub use search_hit::SearchHit;
