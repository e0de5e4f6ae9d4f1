// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod scan;
pub mod store;
pub mod sync;
pub mod utils;

pub use config::{BackendConfig, Config, ExclusionRules, IndexSpec, SyncConfig};
pub use error::{Result, TroviError};
pub use models::{FileRecord, SearchHit};
pub use query::{HitHandler, QueryConsumer, QueryProgress, QueryReport, QueryRequest};
pub use scan::{Decision, ExclusionFilter, Fingerprinter, HashAlgorithm, TreeWalker};
pub use store::{DocumentStore, ElasticClient, RetryPolicy, document_key};
pub use sync::{PassReport, ReconcileEngine, RunReport, SyncMode, TerminalProgress};
pub use utils::{OperationTimer, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(HashAlgorithm::default(), config.hash);
        assert_eq!(document_key("/data/a.txt"), "%2Fdata%2Fa.txt");
    }
}
