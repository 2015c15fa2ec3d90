//! Aggregate storage summary of a search index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::segment::SegmentId;

/// One registered segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub id: String,
    pub num_docs: u32,
    pub size_bytes: usize,
}

/// Storage across all registered segments, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySummary {
    pub segment_count: usize,
    pub doc_count: u64,
    pub total_bytes: usize,
    pub segments: Vec<SegmentSummary>,
}

impl DirectorySummary {
    pub(crate) fn push(&mut self, id: SegmentId, num_docs: u32, size_bytes: usize) {
        self.segment_count += 1;
        self.doc_count += num_docs as u64;
        self.total_bytes += size_bytes;
        self.segments.push(SegmentSummary {
            id: id.to_string(),
            num_docs,
            size_bytes,
        });
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for DirectorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} segments, {} documents, {} bytes",
            self.segment_count, self.doc_count, self.total_bytes
        )?;
        for (ord, segment) in self.segments.iter().enumerate() {
            writeln!(
                f,
                "  [{ord}] {} docs={} bytes={}",
                segment.id, segment.num_docs, segment.size_bytes
            )?;
        }
        Ok(())
    }
}
