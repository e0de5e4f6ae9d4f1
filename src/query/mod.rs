// file: src/query/mod.rs
// description: document query module exports
// reference: internal module structure

pub mod builder;
pub mod consumer;
pub mod render;

pub use builder::{MATCH_ALL, build_query};
pub use consumer::{HitHandler, QueryConsumer, QueryProgress, QueryReport, QueryRequest};
pub use render::{RenderOptions, found_header, render_hit};
