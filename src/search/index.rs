//! The search index: registered segments and query execution.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::{self, Engine, SegmentData};
use crate::error::{Result, SegdexError};
use crate::lifecycle::{ResourceKind, Tracked};
use crate::schema::Schema;
use crate::search::options::{SearchHit, SearchOptions};
use crate::search::summary::DirectorySummary;
use crate::segment::Segment;

/// Aggregates registered segments and searches their union.
///
/// Registration and removal take `&self`, so an index can be shared across
/// threads behind an `Arc`. A search runs against a snapshot of the
/// registered set taken when it starts.
#[derive(Debug)]
pub struct SearchIndex {
    engine: Arc<dyn Engine>,
    segments: Tracked<RwLock<Vec<Segment>>>,
}

impl SearchIndex {
    /// Create an empty index with the process-wide engine.
    pub fn new() -> Result<Self> {
        Ok(Self::with_engine(engine::global()?))
    }

    pub fn with_engine(engine: Arc<dyn Engine>) -> Self {
        SearchIndex {
            engine,
            segments: Tracked::new(ResourceKind::SearchIndex, RwLock::new(Vec::new()), 0),
        }
    }

    /// Register a segment instance.
    ///
    /// Fails if this instance is already registered, or if its schema differs
    /// from the schema of the segments already registered.
    pub fn register_segment(&self, segment: &Segment) -> Result<()> {
        let mut segments = self.segments.get()?.write();
        if segments.iter().any(|s| s.same_instance(segment)) {
            return Err(SegdexError::duplicate_segment(format!(
                "segment {} is already registered",
                segment.id()
            )));
        }
        if let Some(first) = segments.first().filter(|f| f.schema() != segment.schema()) {
            return Err(SegdexError::schema_mismatch(format!(
                "segment {} has fields {:?}, the index has {:?}",
                segment.id(),
                segment.schema().field_names(),
                first.schema().field_names()
            )));
        }
        segments.push(segment.clone());
        self.segments.resize(segments.iter().map(Segment::size_hint).sum());
        log::debug!("registered segment {} ({} segments)", segment.id(), segments.len());
        Ok(())
    }

    /// Remove a registered segment instance.
    pub fn remove_segment(&self, segment: &Segment) -> Result<()> {
        let mut segments = self.segments.get()?.write();
        let position = segments
            .iter()
            .position(|s| s.same_instance(segment))
            .ok_or_else(|| {
                SegdexError::not_registered(format!("segment {} is not registered", segment.id()))
            })?;
        segments.remove(position);
        self.segments.resize(segments.iter().map(Segment::size_hint).sum());
        log::debug!("removed segment {} ({} segments)", segment.id(), segments.len());
        Ok(())
    }

    /// Registered segments, in registration order.
    pub fn segments(&self) -> Result<Vec<Segment>> {
        Ok(self.segments.get()?.read().clone())
    }

    pub fn num_segments(&self) -> usize {
        self.segments.get().map_or(0, |s| s.read().len())
    }

    pub fn num_docs(&self) -> u64 {
        self.segments.get().map_or(0, |s| {
            s.read().iter().map(|segment| segment.num_docs() as u64).sum()
        })
    }

    pub fn contains(&self, segment: &Segment) -> bool {
        self.segments
            .get()
            .is_ok_and(|s| s.read().iter().any(|r| r.same_instance(segment)))
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Search the registered segments.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let snapshot = self.segments()?;
        execute(self.engine.as_ref(), &snapshot, query, options)
    }

    /// [`SearchIndex::search`] on tokio's blocking pool.
    pub async fn search_async(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let snapshot = self.segments()?;
        let engine = Arc::clone(&self.engine);
        let query = query.to_string();
        let options = options.clone();
        tokio::task::spawn_blocking(move || execute(engine.as_ref(), &snapshot, &query, &options))
            .await
            .map_err(|e| SegdexError::state(format!("search task failed: {e}")))?
    }

    /// Segment count, document count and exported size of the registered set.
    pub fn directory_summary(&self) -> Result<DirectorySummary> {
        let mut summary = DirectorySummary::default();
        for segment in self.segments()? {
            summary.push(segment.id(), segment.num_docs(), segment.size_bytes()?);
        }
        Ok(summary)
    }

    /// Unregister every segment and release the index.
    pub fn close(self) -> Result<()> {
        let SearchIndex { mut segments, .. } = self;
        let count = segments.get()?.read().len();
        segments.release()?;
        log::debug!("closed search index with {count} segments");
        Ok(())
    }
}

fn execute(
    engine: &dyn Engine,
    segments: &[Segment],
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchHit>> {
    let limit = options.effective_limit();
    let Some(first) = segments.first() else {
        return Ok(Vec::new());
    };
    if limit == 0 {
        return Ok(Vec::new());
    }

    let schema = first.schema();
    let projection = projection(schema, options)?;
    let parsed = engine.parse_query(schema, query)?;
    let data = segments
        .iter()
        .map(Segment::data)
        .collect::<Result<Vec<&SegmentData>>>()?;

    let hits = engine
        .search(&data, &parsed, limit)?
        .into_iter()
        .map(|scored| {
            let mut fields = data
                .get(scored.segment)
                .and_then(|segment| segment.stored_document(scored.doc_id))
                .unwrap_or_default();
            fields.retain(|name, _| projection.iter().any(|p| p == name));
            SearchHit {
                score: scored.score,
                fields,
            }
        })
        .collect();
    Ok(hits)
}

fn projection(schema: &Schema, options: &SearchOptions) -> Result<Vec<String>> {
    let Some(fields) = &options.fields else {
        return Ok(schema.stored_fields().into_iter().map(String::from).collect());
    };
    for name in fields {
        match schema.field(name) {
            None => return Err(SegdexError::query(format!("unknown field '{name}'"))),
            Some(options) if !options.is_stored() => {
                return Err(SegdexError::query(format!("field '{name}' is not stored")));
            }
            Some(_) => {}
        }
    }
    Ok(fields.clone())
}
