//! # Segdex
//!
//! Schema-typed segment building and multi-segment search for Rust.
//!
//! ## Features
//!
//! - Schemas with exact, full-text and stored field capabilities
//! - Segment builders bounded by an arena budget
//! - Immutable, byte-exportable segments with a checksummed format
//! - Search over the union of registered segments with BM25 scoring
//! - Deterministic release tracking for builders, segments and indexes
//!
//! ## Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> segdex::error::Result<()> {
//! use segdex::prelude::*;
//!
//! engine::initialize(EngineConfig::default()).await?;
//!
//! let schema = Schema::from_json(r#"{"id": {"exact": true, "stored": true}, "body": {"text": true}}"#)?;
//! let mut builder = SegmentBuilder::new(schema, DEFAULT_ARENA_BYTES)?;
//! builder.add_document(Document::new().with_field("id", "1").with_field("body", "red fox"))?;
//! builder.add_document(Document::new().with_field("id", "2").with_field("body", "red dog"))?;
//! let segment = builder.finalize()?;
//!
//! let index = SearchIndex::new()?;
//! index.register_segment(&segment)?;
//! let hits = index.search("fox", &SearchOptions::new().fields(["id"]))?;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].get("id"), Some("1"));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod document;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod schema;
pub mod search;
pub mod segment;
pub mod util;

pub mod prelude {
    pub use crate::document::Document;
    pub use crate::engine::{self, Engine, EngineConfig, InvertedEngine};
    pub use crate::error::{ErrorKind, Result, SegdexError};
    pub use crate::schema::{FieldOptions, Schema};
    pub use crate::search::{DirectorySummary, SearchHit, SearchIndex, SearchOptions};
    pub use crate::segment::builder::DEFAULT_ARENA_BYTES;
    pub use crate::segment::{Segment, SegmentBuilder, SegmentBuilderConfig, SegmentMerger};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
