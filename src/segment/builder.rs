//! Bounded, single-writer accumulation of documents into a segment.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::engine::{self, Engine};
use crate::error::{Result, SegdexError};
use crate::lifecycle::{ResourceKind, Tracked};
use crate::schema::Schema;
use crate::segment::Segment;

/// Default arena budget in bytes.
pub const DEFAULT_ARENA_BYTES: usize = 50_000_000;

/// Configuration for a [`SegmentBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentBuilderConfig {
    /// Upper bound on the encoded size of accumulated documents.
    pub arena_bytes: usize,

    /// Documents added between scheduler yields in
    /// [`SegmentBuilder::add_documents_async`].
    pub yield_every: usize,
}

impl Default for SegmentBuilderConfig {
    fn default() -> Self {
        SegmentBuilderConfig {
            arena_bytes: DEFAULT_ARENA_BYTES,
            yield_every: 1000,
        }
    }
}

impl SegmentBuilderConfig {
    pub fn arena_bytes(mut self, arena_bytes: usize) -> Self {
        self.arena_bytes = arena_bytes;
        self
    }

    pub fn yield_every(mut self, yield_every: usize) -> Self {
        self.yield_every = yield_every;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.arena_bytes == 0 {
            return Err(SegdexError::config("arena budget must be a positive number of bytes"));
        }
        if self.yield_every == 0 {
            return Err(SegdexError::config("yield_every must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BuilderState {
    documents: Vec<Document>,
    arena_used: usize,
}

/// Accumulates documents within an arena budget and finalizes them into a
/// [`Segment`] exactly once.
#[derive(Debug)]
pub struct SegmentBuilder {
    engine: Arc<dyn Engine>,
    schema: Arc<Schema>,
    config: SegmentBuilderConfig,
    state: Tracked<BuilderState>,
}

impl SegmentBuilder {
    /// Create a builder with the process-wide engine.
    pub fn new(schema: impl Into<Arc<Schema>>, arena_bytes: usize) -> Result<Self> {
        Self::with_config(schema, SegmentBuilderConfig::default().arena_bytes(arena_bytes))
    }

    pub fn with_config(schema: impl Into<Arc<Schema>>, config: SegmentBuilderConfig) -> Result<Self> {
        Self::with_engine(engine::global()?, schema, config)
    }

    pub fn with_engine(
        engine: Arc<dyn Engine>,
        schema: impl Into<Arc<Schema>>,
        config: SegmentBuilderConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(SegmentBuilder {
            engine,
            schema: schema.into(),
            config,
            state: Tracked::new(ResourceKind::SegmentBuilder, BuilderState::default(), 0),
        })
    }

    /// Add one document.
    ///
    /// Nothing is appended or charged when this fails.
    pub fn add_document(&mut self, document: Document) -> Result<()> {
        let budget = self.config.arena_bytes;
        let state = self.state.get_mut()?;
        document.validate(&self.schema)?;

        let size = document.encoded_size(&self.schema);
        let used = state.arena_used.saturating_add(size);
        if used > budget {
            return Err(SegdexError::capacity(format!(
                "document of {size} bytes exceeds arena budget ({} of {budget} bytes used)",
                state.arena_used
            )));
        }

        state.documents.push(document);
        state.arena_used = used;
        self.state.resize(used);
        log::trace!("added document ({size} bytes, {used} of {budget} used)");
        Ok(())
    }

    /// Add documents in order, stopping at the first failure. Documents added
    /// before the failure are kept. Returns the number added.
    pub fn add_documents<I>(&mut self, documents: I) -> Result<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut added = 0;
        for document in documents {
            self.add_document(document)?;
            added += 1;
        }
        Ok(added)
    }

    /// Like [`SegmentBuilder::add_documents`], yielding to the tokio scheduler
    /// every `yield_every` documents. Dropping the future stops adding;
    /// documents already added are kept.
    pub async fn add_documents_async<I>(&mut self, documents: I) -> Result<usize>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut added = 0;
        for document in documents {
            self.add_document(document)?;
            added += 1;
            if added % self.config.yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }
        Ok(added)
    }

    /// Discard accumulated documents and reset arena usage.
    pub fn remove_documents(&mut self) -> Result<()> {
        let state = self.state.get_mut()?;
        let removed = state.documents.len();
        state.documents.clear();
        state.arena_used = 0;
        self.state.resize(0);
        log::trace!("removed {removed} documents");
        Ok(())
    }

    /// Compile the accumulated documents into a segment. The builder is
    /// consumed afterwards; every further mutation fails with a state error.
    pub fn finalize(&mut self) -> Result<Segment> {
        let state = self.state.get()?;
        let data = self.engine.index(&self.schema, &state.documents)?;
        let BuilderState { arena_used, .. } = self.state.transfer()?;
        let segment = Segment::from_data(Arc::clone(&self.engine), data, arena_used);
        log::debug!(
            "finalized segment {} with {} documents ({arena_used} arena bytes)",
            segment.id(),
            segment.num_docs()
        );
        Ok(segment)
    }

    pub fn num_docs(&self) -> usize {
        self.state.get().map_or(0, |state| state.documents.len())
    }

    pub fn arena_used(&self) -> usize {
        self.state.get().map_or(0, |state| state.arena_used)
    }

    pub fn arena_budget(&self) -> usize {
        self.config.arena_bytes
    }

    pub fn is_finalized(&self) -> bool {
        !self.state.is_live()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &SegmentBuilderConfig {
        &self.config
    }
}
