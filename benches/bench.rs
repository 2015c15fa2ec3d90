//! Criterion benchmarks for Segdex.
//!
//! Covers the stages of the segment pipeline:
//! - Text analysis
//! - Segment building and finalization
//! - Export and import
//! - Multi-segment search

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segdex::analysis::{Analyzer, PipelineAnalyzer};
use segdex::document::Document;
use segdex::engine::{Engine, InvertedEngine};
use segdex::schema::{FieldOptions, Schema};
use segdex::search::{SearchIndex, SearchOptions};
use segdex::segment::{Segment, SegmentBuilder, SegmentBuilderConfig};

const WORDS: &[&str] = &[
    "search", "engine", "segment", "index", "query", "document", "field", "term", "arena",
    "builder", "schema", "stored", "exact", "text", "score", "merge", "export", "import",
    "token", "posting", "dictionary", "red", "blue", "fox", "dog",
];

/// Generate documents of random words with a fixed seed.
fn generate_documents(count: usize, words_per_doc: usize) -> Vec<Document> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|i| {
            let body: Vec<&str> = (0..words_per_doc)
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect();
            Document::new()
                .with_field("id", i.to_string())
                .with_field("body", body.join(" "))
        })
        .collect()
}

fn schema() -> Schema {
    Schema::builder()
        .add_field("id", FieldOptions::exact_stored())
        .add_field("body", FieldOptions::new().text(true))
        .build()
        .expect("valid schema")
}

fn build_segment(engine: &Arc<dyn Engine>, documents: &[Document]) -> Segment {
    let mut builder =
        SegmentBuilder::with_engine(Arc::clone(engine), schema(), SegmentBuilderConfig::default())
            .expect("builder");
    builder
        .add_documents(documents.iter().cloned())
        .expect("documents fit the arena");
    builder.finalize().expect("finalize")
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    let analyzer = PipelineAnalyzer::standard().expect("analyzer");
    let documents = generate_documents(100, 50);

    group.throughput(Throughput::Elements(documents.len() as u64));
    group.bench_function("analyze_batch", |b| {
        b.iter(|| {
            for doc in &documents {
                let tokens = analyzer.terms(black_box(doc.get("body").unwrap_or_default()));
                let _ = black_box(tokens);
            }
        })
    });

    group.finish();
}

fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment");
    let engine = InvertedEngine::shared().expect("engine");
    let documents = generate_documents(1000, 30);

    group.throughput(Throughput::Elements(documents.len() as u64));
    group.bench_function("build_and_finalize", |b| {
        b.iter(|| black_box(build_segment(&engine, &documents)))
    });

    let segment = build_segment(&engine, &documents);
    let bytes = segment.export().expect("export");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("export", |b| b.iter(|| black_box(segment.export())));
    group.bench_function("import", |b| {
        b.iter(|| black_box(Segment::from_bytes_with_engine(Arc::clone(&engine), &bytes)))
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let engine = InvertedEngine::shared().expect("engine");
    let index = SearchIndex::with_engine(Arc::clone(&engine));
    for chunk in generate_documents(4000, 30).chunks(1000) {
        index
            .register_segment(&build_segment(&engine, chunk))
            .expect("register");
    }

    let options = SearchOptions::new().limit(10);
    for query in ["fox", "+red -dog", "search engine index", "id:42"] {
        group.bench_function(query, |b| {
            b.iter(|| black_box(index.search(black_box(query), &options)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analysis, bench_segment, bench_search);
criterion_main!(benches);
