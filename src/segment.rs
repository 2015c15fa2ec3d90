//! Segments: immutable, serializable units of indexed documents.
//!
//! A [`Segment`] is produced by finalizing a [`SegmentBuilder`], by
//! importing bytes previously exported from a segment, or by merging
//! segments with a [`SegmentMerger`]. Either way it is immutable; clones
//! share the same instance.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use segdex::document::Document;
//! use segdex::engine::InvertedEngine;
//! use segdex::schema::{FieldOptions, Schema};
//! use segdex::segment::{Segment, SegmentBuilder, SegmentBuilderConfig};
//!
//! # fn main() -> segdex::error::Result<()> {
//! let engine = InvertedEngine::shared()?;
//! let schema = Schema::builder()
//!     .add_field("title", FieldOptions::text_stored())
//!     .build()?;
//!
//! let mut builder = SegmentBuilder::with_engine(
//!     Arc::clone(&engine),
//!     schema,
//!     SegmentBuilderConfig::default(),
//! )?;
//! builder.add_document(Document::new().with_field("title", "hello world"))?;
//! let segment = builder.finalize()?;
//!
//! let bytes = segment.export()?;
//! let imported = Segment::from_bytes_with_engine(engine, &bytes)?;
//! assert_eq!(imported.export()?, bytes);
//! assert_ne!(imported.id(), segment.id());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use uuid::Uuid;

use crate::engine::{self, Engine, SegmentData};
use crate::error::{Result, SegdexError};
use crate::lifecycle::{ResourceKind, Tracked};
use crate::schema::Schema;

pub mod builder;
pub mod merger;

pub use builder::{SegmentBuilder, SegmentBuilderConfig};
pub use merger::SegmentMerger;

/// Identity of a segment instance. Not part of the exported bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(Uuid);

impl SegmentId {
    fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

struct SegmentInner {
    id: SegmentId,
    engine: Arc<dyn Engine>,
    data: Tracked<SegmentData>,
    schema: Arc<Schema>,
    num_docs: u32,
    size_hint: usize,
    exported_len: OnceLock<usize>,
}

/// An immutable compiled segment.
#[derive(Clone)]
pub struct Segment {
    inner: Arc<SegmentInner>,
}

impl Segment {
    pub(crate) fn from_data(engine: Arc<dyn Engine>, data: SegmentData, size_hint: usize) -> Self {
        let schema = Arc::clone(&data.schema);
        let num_docs = data.num_docs();
        let segment = Segment {
            inner: Arc::new(SegmentInner {
                id: SegmentId::new(),
                engine,
                data: Tracked::new(ResourceKind::Segment, data, size_hint),
                schema,
                num_docs,
                size_hint,
                exported_len: OnceLock::new(),
            }),
        };
        log::trace!("created segment {} with {num_docs} documents", segment.id());
        segment
    }

    /// Import a segment from exported bytes with the process-wide engine.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_engine(engine::global()?, data)
    }

    /// Import a segment from exported bytes with `engine`.
    pub fn from_bytes_with_engine(engine: Arc<dyn Engine>, data: &[u8]) -> Result<Self> {
        let decoded = engine.deserialize(data)?;
        let segment = Self::from_data(engine, decoded, data.len());
        let _ = segment.inner.exported_len.set(data.len());
        Ok(segment)
    }

    /// Serialize the segment to its exchange bytes.
    pub fn export(&self) -> Result<Vec<u8>> {
        let bytes = self.inner.engine.serialize(self.data()?)?;
        let _ = self.inner.exported_len.set(bytes.len());
        Ok(bytes)
    }

    pub fn id(&self) -> SegmentId {
        self.inner.id
    }

    pub fn num_docs(&self) -> u32 {
        self.inner.num_docs
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.inner.engine
    }

    /// Size of the exported bytes.
    pub fn size_bytes(&self) -> Result<usize> {
        if let Some(len) = self.inner.exported_len.get() {
            return Ok(*len);
        }
        Ok(self.export()?.len())
    }

    /// Stored fields of a document, keyed by field name.
    pub fn stored_document(&self, doc_id: u32) -> Result<Option<BTreeMap<String, String>>> {
        Ok(self.data()?.stored_document(doc_id))
    }

    /// True if both handles are the same instance.
    pub fn same_instance(&self, other: &Segment) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this instance, including this one.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Release the segment now instead of when its last handle drops.
    ///
    /// Fails with a state error while other handles (clones, index
    /// registrations) share the instance; this handle is dropped either way.
    pub fn release(self) -> Result<()> {
        let id = self.id();
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.data.release()?;
                log::debug!("released segment {id}");
                Ok(())
            }
            Err(inner) => Err(SegdexError::state(format!(
                "segment {id} is still shared by {} other handles",
                Arc::strong_count(&inner) - 1
            ))),
        }
    }

    pub(crate) fn data(&self) -> Result<&SegmentData> {
        self.inner.data.get()
    }

    pub(crate) fn size_hint(&self) -> usize {
        self.inner.size_hint
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for Segment {}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.inner.id)
            .field("num_docs", &self.inner.num_docs)
            .field("fields", &self.inner.schema.field_names())
            .field("engine", &self.inner.engine.name())
            .finish()
    }
}
