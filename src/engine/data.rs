//! In-memory representation of a compiled segment.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::schema::Schema;

/// Which dictionary of a field a term lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    /// Whole, unanalyzed field values.
    Exact,
    /// Analyzed tokens.
    Text,
}

/// One document occurrence of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u32,
    pub term_freq: u32,
}

/// Postings of a term, sorted by ascending doc id.
pub type PostingList = Vec<Posting>;

/// Term dictionary of one field; `BTreeMap` keeps terms sorted for the codec.
pub type TermDictionary = BTreeMap<String, PostingList>;

/// Index structures of a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIndex {
    /// Present iff the field is exact-searchable.
    pub exact: Option<TermDictionary>,
    /// Present iff the field is text-searchable.
    pub text: Option<TermDictionary>,
    /// Token count per document; populated iff the field is text-searchable.
    pub norms: Vec<u32>,
}

impl FieldIndex {
    pub fn dictionary(&self, kind: TermKind) -> Option<&TermDictionary> {
        match kind {
            TermKind::Exact => self.exact.as_ref(),
            TermKind::Text => self.text.as_ref(),
        }
    }

    /// Total number of tokens indexed in this field.
    pub fn total_tokens(&self) -> u64 {
        self.norms.iter().map(|&n| n as u64).sum()
    }
}

/// Stored fields of one document as `(ordinal, value)`, sorted by ordinal.
pub type StoredDocument = Vec<(u32, String)>;

/// A compiled, immutable segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentData {
    pub schema: Arc<Schema>,
    /// Stored fields, indexed by doc id.
    pub stored: Vec<StoredDocument>,
    /// Field indexes, indexed by field ordinal.
    pub fields: Vec<FieldIndex>,
}

impl SegmentData {
    /// An empty segment for `schema`.
    pub fn empty(schema: Arc<Schema>) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|field| {
                let options = field.options();
                FieldIndex {
                    exact: options.is_exact().then(TermDictionary::new),
                    text: options.is_text().then(TermDictionary::new),
                    norms: Vec::new(),
                }
            })
            .collect();
        SegmentData {
            schema,
            stored: Vec::new(),
            fields,
        }
    }

    pub fn num_docs(&self) -> u32 {
        self.stored.len() as u32
    }

    /// Postings of `term` in the given field dictionary.
    pub fn postings(&self, field: usize, kind: TermKind, term: &str) -> Option<&PostingList> {
        self.fields.get(field)?.dictionary(kind)?.get(term)
    }

    /// Number of documents containing `term`.
    pub fn doc_freq(&self, field: usize, kind: TermKind, term: &str) -> u64 {
        self.postings(field, kind, term)
            .map_or(0, |postings| postings.len() as u64)
    }

    /// Token count of `field` in `doc_id`.
    pub fn field_len(&self, field: usize, doc_id: u32) -> u32 {
        self.fields
            .get(field)
            .and_then(|index| index.norms.get(doc_id as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Stored fields of a document keyed by field name.
    pub fn stored_document(&self, doc_id: u32) -> Option<BTreeMap<String, String>> {
        let stored = self.stored.get(doc_id as usize)?;
        Some(
            stored
                .iter()
                .filter_map(|(ordinal, value)| {
                    self.schema
                        .field_at(*ordinal as usize)
                        .map(|field| (field.name().to_string(), value.clone()))
                })
                .collect(),
        )
    }

    /// Number of distinct terms over every dictionary.
    pub fn num_terms(&self) -> usize {
        self.fields
            .iter()
            .map(|f| f.exact.as_ref().map_or(0, |d| d.len()) + f.text.as_ref().map_or(0, |d| d.len()))
            .sum()
    }
}
