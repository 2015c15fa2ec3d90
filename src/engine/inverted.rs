//! The bundled inverted-index engine.

use std::sync::Arc;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::analysis::{Analyzer, PipelineAnalyzer};
use crate::document::Document;
use crate::engine::codec;
use crate::engine::data::{Posting, PostingList, SegmentData, TermDictionary, TermKind};
use crate::engine::query::{Occur, Query, TermLookup};
use crate::engine::scoring::{Bm25, TermStats};
use crate::engine::{Engine, EngineConfig, ScoredDoc};
use crate::error::{Result, SegdexError};
use crate::schema::Schema;

/// Inverted-index engine: per-field term dictionaries with
/// `(doc id, term frequency)` postings, scored with BM25.
#[derive(Debug)]
pub struct InvertedEngine {
    config: EngineConfig,
    analyzer: PipelineAnalyzer,
}

impl InvertedEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.bm25.validate()?;
        let analyzer = PipelineAnalyzer::from_kind(&config.tokenizer, config.lowercase)?;
        Ok(InvertedEngine { config, analyzer })
    }

    /// A default-configured engine behind an `Arc`, ready to inject.
    pub fn shared() -> Result<Arc<dyn Engine>> {
        Ok(Arc::new(Self::new(EngineConfig::default())?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn term_stats(&self, segments: &[&SegmentData], lookup: &TermLookup) -> TermStats {
        let total_docs: u64 = segments.iter().map(|s| s.num_docs() as u64).sum();
        let doc_freq = segments
            .iter()
            .map(|s| s.doc_freq(lookup.field, lookup.kind, &lookup.term))
            .sum();
        let avg_field_len = match lookup.kind {
            TermKind::Exact => 0.0,
            TermKind::Text if total_docs > 0 => {
                let tokens: u64 = segments
                    .iter()
                    .filter_map(|s| s.fields.get(lookup.field))
                    .map(|f| f.total_tokens())
                    .sum();
                tokens as f32 / total_docs as f32
            }
            TermKind::Text => 0.0,
        };
        TermStats {
            total_docs,
            doc_freq,
            avg_field_len,
        }
    }
}

/// Bit masks of a query's clauses by occurrence.
#[derive(Debug, Clone, Copy, Default)]
struct ClauseMasks {
    must: u64,
    must_not: u64,
    should: u64,
}

impl ClauseMasks {
    fn of(query: &Query) -> Self {
        let mut masks = ClauseMasks::default();
        for (i, clause) in query.clauses.iter().enumerate() {
            let bit = 1u64 << i;
            match clause.occur {
                Occur::Must => masks.must |= bit,
                Occur::MustNot => masks.must_not |= bit,
                Occur::Should => masks.should |= bit,
            }
        }
        masks
    }

    fn accepts(&self, matched: u64) -> bool {
        matched & self.must == self.must
            && matched & self.must_not == 0
            && (self.must != 0 || matched & self.should != 0)
    }
}

fn score_segment(
    segment_ord: usize,
    segment: &SegmentData,
    query: &Query,
    scorers: &AHashMap<&TermLookup, Bm25>,
    masks: ClauseMasks,
) -> Vec<ScoredDoc> {
    let mut matches: AHashMap<u32, (f32, u64)> = AHashMap::new();

    for (i, clause) in query.clauses.iter().enumerate() {
        let bit = 1u64 << i;
        for lookup in &clause.terms {
            let (Some(postings), Some(scorer)) = (
                segment.postings(lookup.field, lookup.kind, &lookup.term),
                scorers.get(lookup),
            ) else {
                continue;
            };
            for posting in postings {
                let entry = matches.entry(posting.doc_id).or_insert((0.0, 0));
                entry.1 |= bit;
                if clause.occur != Occur::MustNot {
                    entry.0 += match lookup.kind {
                        TermKind::Exact => scorer.score_exact(),
                        TermKind::Text => scorer.score(
                            posting.term_freq,
                            segment.field_len(lookup.field, posting.doc_id),
                        ),
                    };
                }
            }
        }
    }

    matches
        .into_iter()
        .filter(|(_, (_, matched))| masks.accepts(*matched))
        .map(|(doc_id, (score, _))| ScoredDoc {
            segment: segment_ord,
            doc_id,
            score,
        })
        .collect()
}

fn append_postings(target: &mut TermDictionary, source: &TermDictionary, offset: u32) {
    for (term, postings) in source {
        target
            .entry(term.clone())
            .or_default()
            .extend(postings.iter().map(|p| Posting {
                doc_id: p.doc_id + offset,
                term_freq: p.term_freq,
            }));
    }
}

fn into_dictionary(accumulated: AHashMap<String, PostingList>) -> TermDictionary {
    accumulated.into_iter().collect()
}

impl Engine for InvertedEngine {
    fn name(&self) -> &'static str {
        "inverted"
    }

    fn analyzer(&self) -> &dyn Analyzer {
        &self.analyzer
    }

    fn index(&self, schema: &Arc<Schema>, documents: &[Document]) -> Result<SegmentData> {
        if documents.len() > u32::MAX as usize {
            return Err(SegdexError::capacity(format!(
                "{} documents exceed the per-segment limit of {}",
                documents.len(),
                u32::MAX
            )));
        }

        let mut segment = SegmentData::empty(Arc::clone(schema));
        let mut exact: Vec<AHashMap<String, PostingList>> = vec![AHashMap::new(); schema.len()];
        let mut text: Vec<AHashMap<String, PostingList>> = vec![AHashMap::new(); schema.len()];

        for (doc_id, document) in documents.iter().enumerate() {
            document.validate(schema)?;
            let doc_id = doc_id as u32;
            let mut stored = Vec::new();

            for (ordinal, field) in schema.fields().iter().enumerate() {
                let options = field.options();
                let value = document.get(field.name());

                if let Some(value) = value.filter(|v| options.is_exact() && !v.is_empty()) {
                    exact[ordinal].entry(value.to_string()).or_default().push(Posting {
                        doc_id,
                        term_freq: 1,
                    });
                }

                if options.is_text() {
                    let mut counts: AHashMap<String, u32> = AHashMap::new();
                    let mut field_len = 0u32;
                    if let Some(value) = value {
                        for token in self.analyzer.analyze(value)? {
                            *counts.entry(token.term).or_insert(0) += 1;
                            field_len = field_len.saturating_add(1);
                        }
                    }
                    segment.fields[ordinal].norms.push(field_len);
                    for (term, term_freq) in counts {
                        text[ordinal]
                            .entry(term)
                            .or_default()
                            .push(Posting { doc_id, term_freq });
                    }
                }

                if let Some(value) = value.filter(|_| options.is_stored()) {
                    stored.push((ordinal as u32, value.to_string()));
                }
            }
            segment.stored.push(stored);
        }

        for (index, (exact, text)) in segment.fields.iter_mut().zip(exact.into_iter().zip(text)) {
            if index.exact.is_some() {
                index.exact = Some(into_dictionary(exact));
            }
            if index.text.is_some() {
                index.text = Some(into_dictionary(text));
            }
        }

        log::trace!(
            "indexed {} documents into {} terms",
            segment.num_docs(),
            segment.num_terms()
        );
        Ok(segment)
    }

    fn search(
        &self,
        segments: &[&SegmentData],
        query: &Query,
        limit: usize,
    ) -> Result<Vec<ScoredDoc>> {
        if limit == 0 || query.is_empty() || segments.is_empty() {
            return Ok(Vec::new());
        }

        let scorers: AHashMap<&TermLookup, Bm25> = query
            .lookups()
            .into_iter()
            .map(|lookup| (lookup, Bm25::new(self.config.bm25, self.term_stats(segments, lookup))))
            .collect();
        let masks = ClauseMasks::of(query);

        let mut hits: Vec<ScoredDoc> = segments
            .par_iter()
            .enumerate()
            .flat_map_iter(|(ord, segment)| score_segment(ord, segment, query, &scorers, masks))
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.segment.cmp(&b.segment))
                .then(a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    fn merge(&self, segments: &[&SegmentData]) -> Result<SegmentData> {
        let Some(first) = segments.first() else {
            return Err(SegdexError::state("cannot merge zero segments"));
        };
        if let Some(other) = segments.iter().find(|s| s.schema != first.schema) {
            return Err(SegdexError::schema_mismatch(format!(
                "cannot merge segments with different schemas: {:?} vs {:?}",
                first.schema.field_names(),
                other.schema.field_names()
            )));
        }
        let total: u64 = segments.iter().map(|s| s.num_docs() as u64).sum();
        if total > u32::MAX as u64 {
            return Err(SegdexError::capacity(format!(
                "merged segment would hold {total} documents"
            )));
        }

        let mut merged = SegmentData::empty(Arc::clone(&first.schema));
        let mut offset = 0u32;
        for segment in segments {
            merged.stored.extend(segment.stored.iter().cloned());
            for (target, source) in merged.fields.iter_mut().zip(&segment.fields) {
                if let (Some(target), Some(source)) = (target.exact.as_mut(), source.exact.as_ref()) {
                    append_postings(target, source, offset);
                }
                if let (Some(target), Some(source)) = (target.text.as_mut(), source.text.as_ref()) {
                    append_postings(target, source, offset);
                }
                target.norms.extend_from_slice(&source.norms);
            }
            offset += segment.num_docs();
        }
        Ok(merged)
    }

    fn serialize(&self, segment: &SegmentData) -> Result<Vec<u8>> {
        codec::encode(segment)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<SegmentData> {
        codec::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldOptions;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .add_field("id", FieldOptions::exact_stored())
                .add_field("body", FieldOptions::new().text(true))
                .build()
                .unwrap(),
        )
    }

    fn docs(bodies: &[&str]) -> Vec<Document> {
        bodies
            .iter()
            .enumerate()
            .map(|(i, body)| Document::new().with_field("id", i.to_string()).with_field("body", *body))
            .collect()
    }

    fn search(engine: &InvertedEngine, segments: &[&SegmentData], q: &str) -> Vec<(usize, u32)> {
        let query = engine.parse_query(&segments[0].schema, q).unwrap();
        engine
            .search(segments, &query, 10)
            .unwrap()
            .into_iter()
            .map(|hit| (hit.segment, hit.doc_id))
            .collect()
    }

    #[test]
    fn test_index_builds_postings_and_norms() {
        let engine = InvertedEngine::new(EngineConfig::default()).unwrap();
        let segment = engine.index(&schema(), &docs(&["Red fox", "red red dog"])).unwrap();

        assert_eq!(segment.num_docs(), 2);
        let body = schema().ordinal("body").unwrap();
        assert_eq!(
            segment.postings(body, TermKind::Text, "red").unwrap(),
            &vec![
                Posting { doc_id: 0, term_freq: 1 },
                Posting { doc_id: 1, term_freq: 2 }
            ]
        );
        assert_eq!(segment.fields[body].norms, vec![2, 3]);
        let id = schema().ordinal("id").unwrap();
        assert_eq!(segment.doc_freq(id, TermKind::Exact, "1"), 1);
        // body is not stored
        assert_eq!(
            segment.stored_document(0).unwrap().into_iter().collect::<Vec<_>>(),
            vec![("id".to_string(), "0".to_string())]
        );
    }

    #[test]
    fn test_search_modifiers() {
        let engine = InvertedEngine::new(EngineConfig::default()).unwrap();
        let segment = engine
            .index(&schema(), &docs(&["red fox", "blue fox", "red dog"]))
            .unwrap();
        let segments = [&segment];

        let mut hits = search(&engine, &segments, "fox");
        hits.sort();
        assert_eq!(hits, vec![(0, 0), (0, 1)]);

        assert_eq!(search(&engine, &segments, "+fox +red"), vec![(0, 0)]);
        assert_eq!(search(&engine, &segments, "fox -red"), vec![(0, 1)]);
        assert!(search(&engine, &segments, "-fox").is_empty());
        assert_eq!(search(&engine, &segments, "id:2"), vec![(0, 2)]);
        assert!(search(&engine, &segments, "cat").is_empty());
    }

    #[test]
    fn test_quoted_value_matches_any_term() {
        let engine = InvertedEngine::new(EngineConfig::default()).unwrap();
        let segment = engine
            .index(&schema(), &docs(&["red fox", "fox red", "blue cat"]))
            .unwrap();
        let segments = [&segment];

        let mut hits = search(&engine, &segments, "body:\"red dog\"");
        hits.sort();
        assert_eq!(hits, vec![(0, 0), (0, 1)]);
        assert!(search(&engine, &segments, "+body:\"green dog\"").is_empty());
    }

    #[test]
    fn test_search_ranks_by_relevance() {
        let engine = InvertedEngine::new(EngineConfig::default()).unwrap();
        let segment = engine
            .index(&schema(), &docs(&["fox", "fox fox fox jumps", "dog"]))
            .unwrap();
        let query = engine.parse_query(&segment.schema, "fox").unwrap();
        let hits = engine.search(&[&segment], &query, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_search_limit_zero_and_empty_query() {
        let engine = InvertedEngine::new(EngineConfig::default()).unwrap();
        let segment = engine.index(&schema(), &docs(&["red fox"])).unwrap();
        let query = engine.parse_query(&segment.schema, "fox").unwrap();
        assert!(engine.search(&[&segment], &query, 0).unwrap().is_empty());

        let empty = engine.parse_query(&segment.schema, "").unwrap();
        assert!(engine.search(&[&segment], &empty, 10).unwrap().is_empty());
    }

    #[test]
    fn test_merge_offsets_doc_ids() {
        let engine = InvertedEngine::new(EngineConfig::default()).unwrap();
        let a = engine.index(&schema(), &docs(&["red fox"])).unwrap();
        let b = engine.index(&schema(), &docs(&["blue fox", "red dog"])).unwrap();
        let merged = engine.merge(&[&a, &b]).unwrap();

        assert_eq!(merged.num_docs(), 3);
        let body = schema().ordinal("body").unwrap();
        let red: Vec<u32> = merged
            .postings(body, TermKind::Text, "red")
            .unwrap()
            .iter()
            .map(|p| p.doc_id)
            .collect();
        assert_eq!(red, vec![0, 2]);
        assert_eq!(merged.fields[body].norms, vec![2, 2, 2]);

        let err = engine.merge(&[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::State);
    }

    #[test]
    fn test_merge_rejects_schema_mismatch() {
        let engine = InvertedEngine::new(EngineConfig::default()).unwrap();
        let a = engine.index(&schema(), &docs(&["red fox"])).unwrap();
        let other = Arc::new(
            Schema::builder()
                .add_field("title", FieldOptions::text_stored())
                .build()
                .unwrap(),
        );
        let b = engine
            .index(&other, &[Document::new().with_field("title", "fox")])
            .unwrap();
        let err = engine.merge(&[&a, &b]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMismatch);
    }
}
