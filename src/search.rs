//! Multi-segment search.
//!
//! A [`SearchIndex`] holds registered [`crate::segment::Segment`]s and runs
//! queries over their union. Each search works on a snapshot of the
//! registered set taken when it starts; registering or removing segments
//! affects later searches only.

pub mod index;
pub mod options;
pub mod summary;

pub use index::SearchIndex;
pub use options::{SearchHit, SearchOptions};
pub use summary::{DirectorySummary, SegmentSummary};
