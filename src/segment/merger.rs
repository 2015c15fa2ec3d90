//! Merging several segments into one.

use std::sync::Arc;

use crate::engine::{self, Engine, SegmentData};
use crate::error::{Result, SegdexError};
use crate::segment::Segment;

/// Collects segments sharing one schema and merges them into a single
/// segment whose documents are the concatenation in insertion order.
#[derive(Debug)]
pub struct SegmentMerger {
    engine: Arc<dyn Engine>,
    segments: Vec<Segment>,
}

impl SegmentMerger {
    /// Create a merger with the process-wide engine.
    pub fn new() -> Result<Self> {
        Ok(Self::with_engine(engine::global()?))
    }

    pub fn with_engine(engine: Arc<dyn Engine>) -> Self {
        SegmentMerger {
            engine,
            segments: Vec::new(),
        }
    }

    pub fn add_segment(&mut self, segment: &Segment) -> &mut Self {
        self.segments.push(segment.clone());
        self
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Merge the collected segments.
    ///
    /// A single segment is returned as is, without copying.
    pub fn merge(mut self) -> Result<Segment> {
        match self.segments.len() {
            0 => Err(SegdexError::state("no segments to merge")),
            1 => Ok(self.segments.remove(0)),
            n => {
                let data = self
                    .segments
                    .iter()
                    .map(Segment::data)
                    .collect::<Result<Vec<&SegmentData>>>()?;
                let merged = self.engine.merge(&data)?;
                let size_hint = self.segments.iter().map(Segment::size_hint).sum();
                let segment = Segment::from_data(Arc::clone(&self.engine), merged, size_hint);
                log::debug!(
                    "merged {n} segments into {} ({} documents)",
                    segment.id(),
                    segment.num_docs()
                );
                Ok(segment)
            }
        }
    }
}
