//! The indexing and search engine behind segments.
//!
//! Builders, segments and indexes never touch postings or the byte format
//! directly. They go through the [`Engine`] trait, which covers the four
//! capabilities the segment layer needs: tokenize (via [`Engine::analyzer`]),
//! index, score and serialize. [`InvertedEngine`] is the bundled
//! implementation.
//!
//! The engine must be initialized once per process before the convenience
//! constructors ([`crate::segment::SegmentBuilder::new`],
//! [`crate::segment::Segment::from_bytes`], [`crate::search::SearchIndex::new`])
//! can be used; before that they fail with an uninitialized error. The
//! `with_engine` constructors accept an engine explicitly and need no
//! initialization.
//!
//! # Examples
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> segdex::error::Result<()> {
//! use segdex::engine::{self, EngineConfig};
//!
//! let engine = engine::initialize(EngineConfig::default()).await?;
//! assert_eq!(engine.name(), "inverted");
//! assert!(engine::is_initialized());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::analysis::Analyzer;
use crate::analysis::tokenizer::TokenizerKind;
use crate::document::Document;
use crate::error::{Result, SegdexError};
use crate::schema::Schema;

pub mod codec;
pub mod data;
pub mod inverted;
pub mod query;
pub mod scoring;

pub use data::SegmentData;
pub use inverted::InvertedEngine;
pub use query::Query;
pub use scoring::Bm25Config;

/// A document hit inside one segment of a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    /// Position of the segment in the slice handed to [`Engine::search`].
    pub segment: usize,
    pub doc_id: u32,
    pub score: f32,
}

/// Capability surface of an indexing/search engine.
pub trait Engine: Send + Sync + fmt::Debug {
    /// Short name, for logs and summaries.
    fn name(&self) -> &'static str;

    /// Analyzer applied to text fields and text query terms.
    fn analyzer(&self) -> &dyn Analyzer;

    /// Compile documents into a segment. Documents must already conform to
    /// `schema`; doc ids are assigned in slice order.
    fn index(&self, schema: &Arc<Schema>, documents: &[Document]) -> Result<SegmentData>;

    /// Parse a query string against a schema.
    fn parse_query(&self, schema: &Schema, query: &str) -> Result<Query> {
        Query::parse(query, schema, self.analyzer())
    }

    /// Execute `query` over the union of `segments`, returning at most
    /// `limit` hits in descending score order.
    fn search(&self, segments: &[&SegmentData], query: &Query, limit: usize)
    -> Result<Vec<ScoredDoc>>;

    /// Concatenate segments sharing one schema into a single segment.
    fn merge(&self, segments: &[&SegmentData]) -> Result<SegmentData>;

    /// Encode a segment to its exchange bytes.
    fn serialize(&self, segment: &SegmentData) -> Result<Vec<u8>>;

    /// Decode exchange bytes; malformed input is corrupt data.
    fn deserialize(&self, bytes: &[u8]) -> Result<SegmentData>;
}

/// Configuration for the bundled [`InvertedEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tokenizer used for text fields.
    pub tokenizer: TokenizerKind,

    /// Lowercase text tokens (and text query terms).
    pub lowercase: bool,

    /// BM25 parameters.
    pub bm25: Bm25Config,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tokenizer: TokenizerKind::default(),
            lowercase: true,
            bm25: Bm25Config::default(),
        }
    }
}

impl EngineConfig {
    pub fn tokenizer(mut self, tokenizer: TokenizerKind) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn bm25(mut self, bm25: Bm25Config) -> Self {
        self.bm25 = bm25;
        self
    }
}

static ENGINE: OnceCell<Arc<dyn Engine>> = OnceCell::const_new();

/// Initialize the process-wide engine with the bundled implementation.
///
/// Idempotent: once an engine is installed, later calls return it and
/// ignore `config`.
pub async fn initialize(config: EngineConfig) -> Result<Arc<dyn Engine>> {
    let engine = ENGINE
        .get_or_try_init(|| async move {
            let engine: Arc<dyn Engine> = Arc::new(InvertedEngine::new(config)?);
            log::debug!("initialized engine '{}'", engine.name());
            Ok::<_, SegdexError>(engine)
        })
        .await?;
    Ok(Arc::clone(engine))
}

/// Install a custom process-wide engine.
///
/// Fails with a state error if an engine is already installed.
pub fn initialize_with(engine: Arc<dyn Engine>) -> Result<()> {
    let name = engine.name();
    ENGINE
        .set(engine)
        .map_err(|_| SegdexError::state("engine is already initialized"))?;
    log::debug!("installed engine '{name}'");
    Ok(())
}

/// Whether the process-wide engine is installed.
pub fn is_initialized() -> bool {
    ENGINE.initialized()
}

/// The process-wide engine.
pub fn global() -> Result<Arc<dyn Engine>> {
    ENGINE.get().cloned().ok_or_else(|| {
        SegdexError::uninitialized("call segdex::engine::initialize() before creating objects")
    })
}
