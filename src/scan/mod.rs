// file: src/scan/mod.rs
// description: Local filesystem scanning module exports
// reference: Internal module structure

pub mod filter;
pub mod fingerprint;
pub mod walker;

pub use filter::{Decision, ExclusionFilter};
pub use fingerprint::{Fingerprinter, HashAlgorithm};
pub use walker::{TreeWalker, WalkEntry, WalkStats};
